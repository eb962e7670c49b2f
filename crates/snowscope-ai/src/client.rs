//! Chat completion interface and its OpenAI-compatible implementation

use crate::error::{AiError, Result};
use serde::{Deserialize, Serialize};
use snowscope_core::LlmConfig;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A system + user message pair with sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub temperature: f32,
}

/// Anything that turns a chat request into completion text
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AiError::NotConfigured("OpenAI API key is required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Client for the configured endpoint, key read from `api_key_env`
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            AiError::NotConfigured(format!(
                "OpenAI API key is required (set {})",
                config.api_key_env
            ))
        })?;
        Self::new(config.api_base.clone(), api_key)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = CompletionBody {
            model: &request.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        };

        tracing::debug!(model = %request.model, prompt_chars = request.user.len(), "Requesting completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::RequestError(e.to_string()))?
            .error_for_status()
            .map_err(|e| AiError::RequestError(e.to_string()))?;

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// Remove a surrounding Markdown code fence, if any
///
/// Strips a leading ` ``` ` line with an optional alphabetic language tag and
/// a trailing ` ``` ` line; each side independently.
pub fn strip_code_fence(text: &str) -> &str {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix("```") {
        if let Some((tag, body)) = rest.split_once('\n') {
            if tag.chars().all(|c| c.is_ascii_alphabetic()) {
                text = body;
            }
        }
    }

    if let Some(body) = text.strip_suffix("\n```") {
        text = body;
    }

    text
}

/// Chat model answering with canned replies, for tests and demos
#[derive(Clone, Default)]
pub struct MockChatModel {
    reply: String,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockChatModel {
    /// Model that always answers `reply`
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests received so far, in order
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().await.push(request.clone());
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fence("```dot\ndigraph G {}\n```"), "digraph G {}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  digraph G {}  "), "digraph G {}");
        assert_eq!(strip_code_fence("digraph G {}\n```"), "digraph G {}");
    }

    #[test]
    fn fence_with_odd_tag_is_kept() {
        assert_eq!(strip_code_fence("```c++\nx\n```"), "```c++\nx");
    }

    #[test]
    fn missing_key_is_not_configured() {
        assert!(matches!(
            OpenAiClient::new("https://api.openai.com/v1", "  "),
            Err(AiError::NotConfigured(_))
        ));

        let config = LlmConfig {
            api_key_env: "SNOWSCOPE_TEST_UNSET_KEY".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            OpenAiClient::from_config(&config),
            Err(AiError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn completion_round_trip() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            l.to_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if received.len() >= header_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let body = r#"{"choices":[{"message":{"role":"assistant","content":"digraph G {}"}}]}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&received).to_string()
        });

        let client = OpenAiClient::new(format!("http://{}/v1/", addr), "sk-test").unwrap();
        let reply = client
            .complete(&ChatRequest {
                system: "You are terse.".to_string(),
                user: "Draw it.".to_string(),
                model: "gpt-4o-mini".to_string(),
                temperature: 0.1,
            })
            .await
            .unwrap();
        assert_eq!(reply, "digraph G {}");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions"));
        assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains(r#""role":"system""#));
        assert!(request.contains(r#""model":"gpt-4o-mini""#));
    }

    #[tokio::test]
    async fn mock_records_requests() {
        let model = MockChatModel::new("{}");
        let request = ChatRequest {
            system: "s".to_string(),
            user: "u".to_string(),
            model: "m".to_string(),
            temperature: 0.2,
        };

        assert_eq!(model.complete(&request).await.unwrap(), "{}");
        assert_eq!(model.requests().await, vec![request]);
    }
}
