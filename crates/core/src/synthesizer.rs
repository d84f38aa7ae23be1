use crate::error::DependencyError;
use crate::models::{QaAnswer, RetrievedChunk, Snippet};
use crate::traits::CompletionModel;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Response payloads carry at most this many context snippets; the
/// truncation bounds payload size, it is not an error condition.
pub const MAX_SNIPPETS: usize = 3;

/// Grounding policy handed to the completion service with every
/// question.
pub const GROUNDING_PROMPT: &str = "\
You answer questions about a single uploaded document. Use only the \
context passages provided for each question. If the context does not \
contain the answer, reply that the information is not available in the \
document; do not invent an answer. Only if the user repeatedly insists \
on an answer beyond the document may you use general knowledge, and \
then you must state explicitly that the answer is not derived from the \
document.";

pub fn build_context_block(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return "(no context was retrieved for this question)".to_string();
    }

    chunks
        .iter()
        .map(|chunk| format!("[page {}]\n{}", chunk.page, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_user_message(question: &str, chunks: &[RetrievedChunk]) -> String {
    format!(
        "Context passages:\n==================\n{}\n\nQuestion:\n==================\n{}",
        build_context_block(chunks),
        question
    )
}

/// Combines retrieved chunks and the question into one grounded
/// completion call, then shapes the response: distinct sorted source
/// pages plus the top retrieved snippets.
pub struct AnswerSynthesizer {
    completion: Arc<dyn CompletionModel>,
}

impl AnswerSynthesizer {
    pub fn new(completion: Arc<dyn CompletionModel>) -> Self {
        Self { completion }
    }

    pub async fn synthesize(
        &self,
        question: &str,
        retrieved: &[RetrievedChunk],
    ) -> Result<QaAnswer, DependencyError> {
        let user_message = build_user_message(question, retrieved);
        let answer = self
            .completion
            .complete(GROUNDING_PROMPT, &user_message)
            .await?;

        Ok(shape_answer(answer, retrieved))
    }
}

/// Pages deduplicated and ascending; snippets in descending relevance
/// order, truncated to [`MAX_SNIPPETS`].
pub fn shape_answer(answer: String, retrieved: &[RetrievedChunk]) -> QaAnswer {
    let source_pages: Vec<u32> = retrieved
        .iter()
        .map(|chunk| chunk.page)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut ranked: Vec<&RetrievedChunk> = retrieved.iter().collect();
    ranked.sort_by(|left, right| right.score.total_cmp(&left.score));

    let snippets = ranked
        .into_iter()
        .take(MAX_SNIPPETS)
        .map(|chunk| Snippet {
            page: chunk.page,
            text: chunk.text.clone(),
        })
        .collect();

    QaAnswer {
        answer,
        source_pages,
        snippets,
    }
}
