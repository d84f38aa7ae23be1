use crate::error::DependencyError;
use crate::traits::CompletionModel;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";

/// OpenAI-style `/chat/completions` client. One request per answer,
/// no streaming.
pub struct RestCompletionClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
}

impl RestCompletionClient {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, DependencyError> {
        Ok(Self {
            client: Client::new(),
            endpoint: Url::parse(endpoint)?,
            api_key,
            model: model.into(),
        })
    }

    fn request_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.endpoint.as_str().trim_end_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[async_trait]
impl CompletionModel for RestCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, DependencyError> {
        let mut request = self.client.post(self.request_url()).json(&json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(DependencyError::BackendResponse {
                service: "completion".to_string(),
                details: response.status().to_string(),
            });
        }

        let payload: CompletionResponse = response.json().await?;
        let answer = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| DependencyError::BackendResponse {
                service: "completion".to_string(),
                details: "response contained no choices".to_string(),
            })?;

        Ok(answer.trim().to_string())
    }
}
