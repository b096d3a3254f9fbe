//! OpenAI-compatible chat completion client
//!
//! Streams the completion for one prompt. The API key is optional at
//! construction time so the service can start without it; requests then
//! fail with [`ExplainError::NotConfigured`].

use async_trait::async_trait;
use pergamo_common::config::ExplainConfig;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::upstream::content_stream;
use super::{ExplainError, ExplanationProvider, TextStream};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

/// Chat completion client for the explanation endpoint
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    config: ExplainConfig,
}

impl LlmClient {
    pub fn new(config: ExplainConfig) -> Result<Self, ExplainError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("pergamo-qs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExplainError::Transport(e.to_string()))?;

        if config.api_key.is_none() {
            warn!("No LLM API key configured; explanations are disabled");
        }

        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ExplanationProvider for LlmClient {
    async fn explain(&self, prompt: String) -> Result<TextStream, ExplainError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ExplainError::NotConfigured)?;

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: true,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Explanation request failed: {}", e);
                ExplainError::Transport(e.to_string())
            })?;

        let status = response.status();
        debug!("Explanation upstream responded {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            let detail = response.text().await.unwrap_or_default();
            warn!("Explanation upstream rate limited: {}", detail);
            return Err(ExplainError::RateLimited);
        }

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Explanation upstream error {}: {}", status, detail);
            return Err(ExplainError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        let idle = Duration::from_secs(self.config.idle_timeout_secs);
        Ok(Box::pin(content_stream(response.bytes_stream(), idle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "llama-3.1-8b-instant",
            messages: vec![ChatMessage {
                role: "user",
                content: "oi",
            }],
            max_tokens: 500,
            temperature: 0.7,
            stream: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 500);
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_endpoint_joins_base() {
        let config = ExplainConfig {
            api_base: "http://localhost:9999/v1/".to_string(),
            ..ExplainConfig::default()
        };
        let client = LlmClient::new(config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = LlmClient::new(ExplainConfig::default()).unwrap();
        let result = client.explain("prompt".to_string()).await;
        assert!(matches!(result, Err(ExplainError::NotConfigured)));
    }
}
