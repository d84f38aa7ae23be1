use crate::cache::{ListCache, RetrieverCache};
use crate::error::QueryError;
use crate::jobs::spawn_detached;
use crate::models::{
    DocumentMeta, DocumentRecord, DocumentStatus, DocumentStatusReport, QaAnswer, QuestionRecord,
};
use crate::synthesizer::AnswerSynthesizer;
use crate::traits::{DocumentStore, VectorIndex};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_QUERY_DEADLINE: Duration = Duration::from_secs(60);
pub const DEFAULT_LIST_CACHE_TTL: Duration = Duration::from_secs(5);

/// Serves questions against ready documents: existence check, cached
/// retriever handle, retrieval, synthesis, response shaping, and a
/// fire-and-forget audit log write.
pub struct QueryOrchestrator {
    documents: Arc<dyn DocumentStore>,
    index: Arc<dyn VectorIndex>,
    retrievers: RetrieverCache,
    synthesizer: AnswerSynthesizer,
    list_cache: ListCache,
    top_k: usize,
    deadline: Duration,
}

impl QueryOrchestrator {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        index: Arc<dyn VectorIndex>,
        retrievers: RetrieverCache,
        synthesizer: AnswerSynthesizer,
        top_k: usize,
        deadline: Duration,
        list_cache_ttl: Duration,
    ) -> Self {
        Self {
            documents,
            index,
            retrievers,
            synthesizer,
            list_cache: ListCache::new(list_cache_ttl),
            top_k: top_k.max(1),
            deadline,
        }
    }

    async fn require_document(&self, document_id: &str) -> Result<DocumentRecord, QueryError> {
        self.documents
            .fetch_document(document_id)
            .await?
            .ok_or_else(|| QueryError::NotFound(document_id.to_string()))
    }

    /// Answer one question against one document. The external-call
    /// section runs under a deadline so a slow dependency cannot hang
    /// the query path; the audit write happens after the response is
    /// shaped and never delays or fails it.
    pub async fn answer(&self, document_id: &str, question: &str) -> Result<QaAnswer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let record = self.require_document(document_id).await?;
        match record.status {
            DocumentStatus::Ready => {}
            DocumentStatus::Pending => {
                return Err(QueryError::NotReady(format!(
                    "document {document_id} is still being ingested"
                )));
            }
            DocumentStatus::Failed => {
                return Err(QueryError::NotReady(format!(
                    "ingestion failed for document {document_id}"
                )));
            }
        }

        let answer = tokio::time::timeout(self.deadline, async {
            let handle = self.retrievers.handle(document_id, self.top_k).await;
            let retrieved = handle.query(question).await?;
            self.synthesizer.synthesize(question, &retrieved).await
        })
        .await
        .map_err(|_| QueryError::DeadlineExceeded(self.deadline))??;

        let audit = QuestionRecord {
            document_id: document_id.to_string(),
            question: question.to_string(),
            answer: answer.answer.clone(),
            asked_at: Utc::now(),
        };
        let documents = Arc::clone(&self.documents);
        spawn_detached("question-audit-log", async move {
            documents.append_question(&audit).await
        });

        Ok(answer)
    }

    /// Bounded-staleness list view.
    pub async fn list_documents(&self) -> Result<Vec<DocumentMeta>, QueryError> {
        if let Some(cached) = self.list_cache.get().await {
            return Ok(cached);
        }
        let listed = self.documents.list_documents().await?;
        self.list_cache.put(listed.clone()).await;
        Ok(listed)
    }

    pub async fn document_with_history(
        &self,
        document_id: &str,
    ) -> Result<(DocumentRecord, Vec<QuestionRecord>), QueryError> {
        let record = self.require_document(document_id).await?;
        let history = self.documents.question_history(document_id).await?;
        Ok((record, history))
    }

    /// Readiness check: persisted status plus whether any index
    /// entries exist yet.
    pub async fn status(&self, document_id: &str) -> Result<DocumentStatusReport, QueryError> {
        let record = self.require_document(document_id).await?;
        let indexed = self.index.entry_count(document_id).await? > 0;
        Ok(DocumentStatusReport {
            id: record.id,
            status: record.status,
            indexed,
        })
    }

    /// Invalidation hook called on any mutation of the document set.
    pub async fn invalidate(&self, document_id: &str) {
        self.retrievers.invalidate(document_id).await;
        self.list_cache.invalidate().await;
    }

    pub fn retriever_cache(&self) -> &RetrieverCache {
        &self.retrievers
    }
}
