//! OpenAI-compatible chat-completions client.
//!
//! Works against any server exposing `POST {base_url}/chat/completions`
//! (hosted APIs, LM Studio, vLLM, Ollama's compatibility layer).

use crate::secure_string::SecureString;
use crate::traits::{ConnectorError, ConnectorResult};
use async_trait::async_trait;
use iw_core::reasoning::{extract_json_object, ReasoningCapability, ReasoningError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Instruction appended to every user prompt.
pub const JSON_ONLY_SUFFIX: &str =
    "\n\nYou MUST respond with ONLY valid JSON. Do not include any explanation.";

/// Connection settings for the reasoning backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Bearer token; omitted from requests when empty.
    #[serde(default)]
    pub api_key: SecureString,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_model() -> String {
    "gpt-oss-20b".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: SecureString::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Full chat-completions endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Reasoning capability backed by an OpenAI-compatible endpoint.
pub struct OpenAiReasoner {
    client: Client,
    config: LlmConfig,
    endpoint: String,
}

impl OpenAiReasoner {
    pub fn new(config: LlmConfig) -> ConnectorResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ConnectorError::ConfigError("llm base_url is empty".into()));
        }
        if config.model.trim().is_empty() {
            return Err(ConnectorError::ConfigError("llm model is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConnectorError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            config,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn build_request<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        temperature: f32,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
        }
    }

    async fn send(&self, request: &ChatRequest<'_>) -> ConnectorResult<String> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(self.config.api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ConnectorError::Timeout(e.to_string())
            } else if e.is_connect() {
                ConnectorError::ConnectionFailed(e.to_string())
            } else {
                ConnectorError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ConnectorError::AuthenticationFailed("Unauthorized".into()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::RequestFailed(format!(
                "status {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))
    }
}

/// Pulls the first choice's content out of a chat-completions body.
fn reply_content(body: &str) -> Result<String, ReasoningError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        ReasoningError::Transport(format!("unexpected chat-completions body: {}", e))
    })?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| ReasoningError::Malformed("reply has no choices".to_string()))
}

#[async_trait]
impl ReasoningCapability for OpenAiReasoner {
    #[instrument(skip(self, system, user), fields(model = %self.config.model))]
    async fn invoke(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<Map<String, Value>, ReasoningError> {
        let user = format!("{}{}", user, JSON_ONLY_SUFFIX);
        let request = self.build_request(system, &user, temperature);

        let body = self.send(&request).await.map_err(|e| {
            warn!(error = %e, "Reasoning request failed");
            ReasoningError::Transport(e.to_string())
        })?;

        let content = reply_content(&body)?;
        debug!(length = content.len(), "Received reasoning reply");
        extract_json_object(&content)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reasoner() -> OpenAiReasoner {
        OpenAiReasoner::new(LlmConfig {
            base_url: "http://localhost:1234/v1/".into(),
            model: "test-model".into(),
            api_key: "sk-test".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            reasoner().endpoint,
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let reasoner = reasoner();
        let request = reasoner.build_request("sys", "usr", 0.01);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert!((body["temperature"].as_f64().unwrap() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_reply_content_first_choice() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "{\"a\": 1}"}}]}"#;
        assert_eq!(reply_content(body).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_reply_without_choices_is_malformed() {
        assert!(matches!(
            reply_content(r#"{"choices": []}"#),
            Err(ReasoningError::Malformed(_))
        ));
        assert!(matches!(
            reply_content("<html>bad gateway</html>"),
            Err(ReasoningError::Transport(_))
        ));
    }

    #[test]
    fn test_null_content_becomes_empty() {
        let body = r#"{"choices": [{"message": {"content": null}}]}"#;
        let content = reply_content(body).unwrap();
        assert!(matches!(
            extract_json_object(&content),
            Err(ReasoningError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_blank_model() {
        let config = LlmConfig {
            model: " ".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            OpenAiReasoner::new(config),
            Err(ConnectorError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let reasoner = OpenAiReasoner::new(LlmConfig {
            base_url: "http://127.0.0.1:9/v1".into(),
            timeout_secs: 2,
            ..LlmConfig::default()
        })
        .unwrap();
        assert!(matches!(
            reasoner.invoke("s", "u", 0.1).await,
            Err(ReasoningError::Transport(_))
        ));
    }

    #[test]
    fn test_model_name() {
        assert_eq!(reasoner().model(), "test-model");
    }
}
