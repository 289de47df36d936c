//! Language-model collaborator.
//!
//! The dialogue engine treats the model as an opaque function from the
//! conversation history to free text. [`OllamaClient`] calls a local Ollama
//! server's `/api/chat`; [`MockLanguageModel`] replays scripted replies.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use medibook_core::config::LlmConfig;

use crate::types::Turn;

/// Errors from the language-model call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("cannot reach language model at {0}")]
    Connection(String),
    #[error("language model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("language model timed out after {0}s")]
    Timeout(u64),
    #[error("could not parse language model response: {0}")]
    ResponseParsing(String),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Chat-completion interface used by the dialogue session.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for diagnostics.
    fn model(&self) -> &str;

    /// Produce the next assistant message for the given history.
    async fn complete(&self, history: &[Turn]) -> Result<String, LlmError>;
}

// =============================================================================
// Ollama
// =============================================================================

/// Ollama HTTP client for local chat completion.
pub struct OllamaClient {
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        tracing::info!(host = %config.host, model = %config.model, "Ollama client configured");

        Ok(Self {
            base_url: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, history: &[Turn]) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: history,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        tracing::debug!(model = %self.model, turns = history.len(), "Calling language model");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        Ok(parsed.message.content)
    }
}

// =============================================================================
// Mock
// =============================================================================

/// Scripted language model for tests.
///
/// Replies are consumed in order; once the script runs out the fallback
/// reply is returned. Every history it is shown is recorded.
pub struct MockLanguageModel {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    seen: Mutex<Vec<Vec<Turn>>>,
}

impl MockLanguageModel {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            fallback: r#"{"response": "How can I help you?"}"#.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// A model that answers every turn with the same text.
    pub fn always(reply: &str) -> Self {
        let mut model = Self::new(Vec::new());
        model.fallback = reply.to_string();
        model
    }

    /// Queue a failure as the next reply.
    pub fn then_fail(self, message: &str) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(message.to_string()));
        }
        self
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// History passed to the most recent completion.
    pub fn last_history(&self) -> Option<Vec<Turn>> {
        self.seen.lock().ok().and_then(|s| s.last().cloned())
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, history: &[Turn]) -> Result<String, LlmError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(history.to_vec());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LlmError::Connection(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Connection("http://localhost:11434".to_string());
        assert_eq!(
            err.to_string(),
            "cannot reach language model at http://localhost:11434"
        );

        let err = LlmError::Status {
            status: 404,
            body: "model 'x' not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "language model returned status 404: model 'x' not found"
        );

        let err = LlmError::Timeout(120);
        assert_eq!(err.to_string(), "language model timed out after 120s");

        let err = LlmError::ResponseParsing("missing field `message`".to_string());
        assert!(err.to_string().starts_with("could not parse language model response"));
    }

    #[test]
    fn test_chat_request_shape() {
        let history = vec![Turn::system("be brief"), Turn::user("hi")];
        let body = ChatRequest {
            model: "deepseek-r1:1.5b",
            messages: &history,
            stream: false,
            options: ChatOptions {
                temperature: 0.5,
                num_predict: 500,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "deepseek-r1:1.5b");
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["options"]["num_predict"], 500);
        assert_eq!(value["options"]["temperature"], 0.5);
    }

    #[test]
    fn test_chat_response_parse() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"model": "m", "message": {"role": "assistant", "content": "hello"}, "done": true}"#,
        )
        .unwrap();
        assert_eq!(parsed.message.content, "hello");
    }

    #[tokio::test]
    async fn test_mock_replays_script_then_fallback() {
        let model = MockLanguageModel::new(vec!["one", "two"]);
        let history = vec![Turn::user("hi")];
        assert_eq!(model.complete(&history).await.unwrap(), "one");
        assert_eq!(model.complete(&history).await.unwrap(), "two");
        assert_eq!(
            model.complete(&history).await.unwrap(),
            r#"{"response": "How can I help you?"}"#
        );
        assert_eq!(model.calls(), 3);
        assert_eq!(model.last_history().unwrap(), history);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let model = MockLanguageModel::new(vec![]).then_fail("ollama down");
        let err = model.complete(&[]).await.unwrap_err();
        assert!(err.to_string().contains("ollama down"));
    }

    #[tokio::test]
    async fn test_ollama_unreachable() {
        let config = LlmConfig {
            host: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.model(), "deepseek-r1:1.5b");
        let err = client.complete(&[Turn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Connection(_)), "unexpected: {err:?}");
    }
}
