use crate::error::DependencyError;
use crate::models::{DocumentMeta, DocumentRecord, DocumentStatus, QuestionRecord};
use crate::traits::DocumentStore;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use url::Url;

/// Row store speaking PostgREST conventions: one `documents` and one
/// `questions` table, filtered with `column=eq.value` query params and
/// authenticated with an `apikey` header plus bearer token when a key
/// is configured.
pub struct PostgrestStore {
    endpoint: Url,
    api_key: Option<String>,
    client: Client,
}

impl PostgrestStore {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, DependencyError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            api_key,
            client: Client::new(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.endpoint.as_str().trim_end_matches('/'), table)
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn expect_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, DependencyError> {
        if !response.status().is_success() {
            return Err(DependencyError::BackendResponse {
                service: "rowstore".to_string(),
                details: response.status().to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl DocumentStore for PostgrestStore {
    async fn insert_document(&self, record: &DocumentRecord) -> Result<(), DependencyError> {
        let response = self
            .authenticated(self.client.post(self.table_url("documents")))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn fetch_document(&self, id: &str) -> Result<Option<DocumentRecord>, DependencyError> {
        let response = self
            .authenticated(self.client.get(self.table_url("documents")))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        let mut rows: Vec<DocumentRecord> = Self::expect_success(response).await?.json().await?;
        Ok(rows.pop())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentMeta>, DependencyError> {
        let response = self
            .authenticated(self.client.get(self.table_url("documents")))
            .query(&[
                ("select", "id,filename,uploaded_at"),
                ("order", "uploaded_at.desc"),
            ])
            .send()
            .await?;
        Ok(Self::expect_success(response).await?.json().await?)
    }

    async fn mark_ready(&self, id: &str, content: &str) -> Result<(), DependencyError> {
        let response = self
            .authenticated(self.client.patch(self.table_url("documents")))
            .query(&[("id", format!("eq.{id}"))])
            .json(&json!({ "content": content, "status": DocumentStatus::Ready }))
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn mark_failed(&self, id: &str) -> Result<(), DependencyError> {
        let response = self
            .authenticated(self.client.patch(self.table_url("documents")))
            .query(&[("id", format!("eq.{id}"))])
            .json(&json!({ "status": DocumentStatus::Failed }))
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn delete_document(&self, id: &str) -> Result<(), DependencyError> {
        let response = self
            .authenticated(self.client.delete(self.table_url("documents")))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn append_question(&self, record: &QuestionRecord) -> Result<(), DependencyError> {
        let response = self
            .authenticated(self.client.post(self.table_url("questions")))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn question_history(
        &self,
        document_id: &str,
    ) -> Result<Vec<QuestionRecord>, DependencyError> {
        let response = self
            .authenticated(self.client.get(self.table_url("questions")))
            .query(&[
                ("document_id", format!("eq.{document_id}")),
                ("order", "asked_at.asc".to_string()),
            ])
            .send()
            .await?;
        Ok(Self::expect_success(response).await?.json().await?)
    }

    async fn delete_questions(&self, document_id: &str) -> Result<(), DependencyError> {
        let response = self
            .authenticated(self.client.delete(self.table_url("questions")))
            .query(&[("document_id", format!("eq.{document_id}"))])
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }
}
