//! OpenAI Chat Completions バックエンド

use super::request::{ChatRequest, ChatResponseRaw};
use super::CompletionBackend;
use crate::error::{RecycleError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct OpenAiBackend {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecycleError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                RecycleError::Upstream(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(RecycleError::Upstream(format!("status {}: {}", status, error_text)));
        }

        let chat_response: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| RecycleError::Upstream(format!("unreadable completion body: {}", e)))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RecycleError::Upstream("no content in completion".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI chat completion"
        );

        Ok(content)
    }
}
