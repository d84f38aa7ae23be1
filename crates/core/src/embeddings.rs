use crate::error::DependencyError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;

/// Transient embedding-service failures are retried this many times
/// before they become fatal to the calling job.
pub const EMBEDDING_MAX_ATTEMPTS: usize = 3;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DependencyError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DependencyError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// OpenAI-style `/embeddings` client with bounded retries on transient
/// failures.
pub struct RestEmbedder {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    max_attempts: usize,
}

impl RestEmbedder {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, DependencyError> {
        Ok(Self {
            client: Client::new(),
            endpoint: Url::parse(endpoint)?,
            api_key,
            model: model.into(),
            dimensions,
            max_attempts: EMBEDDING_MAX_ATTEMPTS,
        })
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn request_url(&self) -> String {
        format!("{}/embeddings", self.endpoint.as_str().trim_end_matches('/'))
    }

    async fn request_vectors(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DependencyError> {
        let mut request = self.client.post(self.request_url()).json(&json!({
            "model": self.model,
            "input": texts,
        }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(DependencyError::BackendResponse {
                service: "embedding".to_string(),
                details: response.status().to_string(),
            });
        }

        let payload: EmbeddingResponse = response.json().await?;
        let mut data = payload.data;
        data.sort_by_key(|item| item.index);

        if data.len() != texts.len() {
            return Err(DependencyError::BackendResponse {
                service: "embedding".to_string(),
                details: format!("expected {} vectors, got {}", texts.len(), data.len()),
            });
        }

        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for RestEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DependencyError> {
        let input = [text.to_string()];
        let vectors = self.embed_batch(&input).await?;
        vectors.into_iter().next().ok_or_else(|| {
            DependencyError::BackendResponse {
                service: "embedding".to_string(),
                details: "empty embedding response".to_string(),
            }
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DependencyError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 1;
        loop {
            match self.request_vectors(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(error) if attempt < self.max_attempts => {
                    warn!(attempt, %error, "embedding request failed, retrying");
                    tokio::time::sleep(RETRY_BASE_DELAY * attempt as u32).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Deterministic character-trigram embedder. Needs no network, which
/// makes it the development-mode and test backend.
#[derive(Debug, Clone, Copy)]
pub struct HashedEmbedder {
    pub dimensions: usize,
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl HashedEmbedder {
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for HashedEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DependencyError> {
        Ok(self.embed_sync(text))
    }
}
