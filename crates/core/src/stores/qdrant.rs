use crate::error::DependencyError;
use crate::models::{IndexEntry, RetrievedChunk};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

/// Qdrant REST client holding one collection of per-document index
/// entries. Every operation filters on the `document_id` payload field
/// so one document's entries never leak into another's answers.
pub struct QdrantStore {
    endpoint: Url,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: &str,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Result<Self, DependencyError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}{}",
            self.endpoint.as_str().trim_end_matches('/'),
            self.collection,
            suffix
        )
    }

    fn document_filter(document_id: &str) -> Value {
        json!({
            "must": [
                { "key": "document_id", "match": { "value": document_id } }
            ]
        })
    }

    /// Create the collection if it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), DependencyError> {
        let response = self.client.get(self.collection_url("")).send().await?;

        if response.status().is_success() {
            return Ok(());
        }
        if !response.status().is_client_error() {
            return Err(DependencyError::BackendResponse {
                service: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let response = self
            .client
            .put(self.collection_url(""))
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DependencyError::Request(format!(
                "qdrant collection setup failed with {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn upsert_entries(&self, entries: &[IndexEntry]) -> Result<(), DependencyError> {
        if entries.is_empty() {
            return Ok(());
        }

        let points = entries
            .iter()
            .map(|entry| {
                if entry.vector.len() != self.vector_size {
                    return Err(DependencyError::Request(format!(
                        "embedding dimension {} != {}",
                        entry.vector.len(),
                        self.vector_size
                    )));
                }
                Ok(json!({
                    "id": entry.id,
                    "vector": entry.vector,
                    "payload": {
                        "document_id": entry.document_id,
                        "page": entry.page,
                        "text": entry.text,
                    },
                }))
            })
            .collect::<Result<Vec<_>, DependencyError>>()?;

        let response = self
            .client
            .put(self.collection_url("/points?wait=true"))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DependencyError::BackendResponse {
                service: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn search(
        &self,
        document_id: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, DependencyError> {
        if vector.len() != self.vector_size {
            return Err(DependencyError::Request(format!(
                "query vector dim {} is not {}",
                vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(self.collection_url("/points/search"))
            .json(&json!({
                "vector": vector,
                "limit": k,
                "with_payload": true,
                "filter": Self::document_filter(document_id),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DependencyError::BackendResponse {
                service: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            let page = hit
                .pointer("/payload/page")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32;
            let text = hit
                .pointer("/payload/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

            result.push(RetrievedChunk { page, text, score });
        }

        Ok(result)
    }

    async fn entry_count(&self, document_id: &str) -> Result<u64, DependencyError> {
        let response = self
            .client
            .post(self.collection_url("/points/count"))
            .json(&json!({
                "filter": Self::document_filter(document_id),
                "exact": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DependencyError::BackendResponse {
                service: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), DependencyError> {
        let response = self
            .client
            .post(self.collection_url("/points/delete?wait=true"))
            .json(&json!({ "filter": Self::document_filter(document_id) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DependencyError::BackendResponse {
                service: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn entry(document_id: &str, page: u32, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: "00000000-0000-0000-0000-000000000001".to_string(),
            document_id: document_id.to_string(),
            page,
            text: "some text".to_string(),
            vector,
        }
    }

    #[tokio::test]
    async fn upsert_sends_points_with_document_payload() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/chunks/points")
                    .json_body_partial(
                        r#"{ "points": [ { "payload": { "document_id": "doc-1", "page": 3 } } ] }"#,
                    );
                then.status(200).json_body(serde_json::json!({"status": "ok"}));
            })
            .await;

        let store = QdrantStore::new(&server.base_url(), "chunks", 2).expect("store");
        store
            .upsert_entries(&[entry("doc-1", 3, vec![0.1, 0.2])])
            .await
            .expect("upsert");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn search_applies_the_document_filter_and_parses_hits() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/chunks/points/search")
                    .json_body_partial(
                        r#"{ "filter": { "must": [ { "key": "document_id", "match": { "value": "doc-1" } } ] } }"#,
                    );
                then.status(200).json_body(serde_json::json!({
                    "result": [
                        { "score": 0.87, "payload": { "document_id": "doc-1", "page": 2, "text": "hit text" } }
                    ]
                }));
            })
            .await;

        let store = QdrantStore::new(&server.base_url(), "chunks", 2).expect("store");
        let hits = store.search("doc-1", &[0.5, 0.5], 4).await.expect("search");

        mock.assert_async().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page, 2);
        assert_eq!(hits[0].text, "hit text");
        assert!((hits[0].score - 0.87).abs() < 1e-9);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected_before_any_request() {
        let store = QdrantStore::new("http://localhost:6333", "chunks", 4).expect("store");
        let result = store.upsert_entries(&[entry("doc", 1, vec![0.1])]).await;
        assert!(matches!(result, Err(DependencyError::Request(_))));
    }

    #[tokio::test]
    async fn entry_count_reads_the_count_result() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/chunks/points/count");
                then.status(200)
                    .json_body(serde_json::json!({ "result": { "count": 12 } }));
            })
            .await;

        let store = QdrantStore::new(&server.base_url(), "chunks", 2).expect("store");
        assert_eq!(store.entry_count("doc-1").await.expect("count"), 12);
    }
}
