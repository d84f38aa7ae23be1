use crate::error::DependencyError;
use crate::traits::BlobStore;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

/// Bucket-object REST client for raw PDF bytes, one object per
/// document id. Auth headers attach only when a key is configured.
pub struct BucketObjectStore {
    endpoint: Url,
    bucket: String,
    api_key: Option<String>,
    client: Client,
}

impl BucketObjectStore {
    pub fn new(
        endpoint: &str,
        bucket: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, DependencyError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            bucket: bucket.into(),
            api_key,
            client: Client::new(),
        })
    }

    fn object_url(&self, document_id: &str) -> String {
        format!(
            "{}/object/{}/{}.pdf",
            self.endpoint.as_str().trim_end_matches('/'),
            self.bucket,
            document_id
        )
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl BlobStore for BucketObjectStore {
    async fn put_document(
        &self,
        document_id: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DependencyError> {
        let response = self
            .authenticated(self.client.post(self.object_url(document_id)))
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DependencyError::BackendResponse {
                service: "objectstore".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), DependencyError> {
        let response = self
            .authenticated(self.client.delete(self.object_url(document_id)))
            .send()
            .await?;

        // Deleting an absent object keeps delete idempotent.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(DependencyError::BackendResponse {
                service: "objectstore".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }
}
