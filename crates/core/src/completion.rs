//! Chat completion client.
//!
//! [`CompletionClient`] is the seam between the generation service and a language-model
//! provider: one request in, the model's raw text out. [`OpenAiCompletionClient`] speaks the
//! OpenAI-compatible `/chat/completions` protocol.

use crate::config::GenerationConfig;
use crate::error::CompletionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Longest provider error body kept in [`CompletionError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// A two-part conversation: the fixed system instruction followed by the user's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: system.into(),
                },
                ChatMessage {
                    role: Role::User,
                    content: user.into(),
                },
            ],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Content of the user message.
    pub fn user_text(&self) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// A text-completion capability.
///
/// Implementations perform exactly one round trip per call and never retry.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the raw text of the model's reply.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// [`CompletionClient`] for OpenAI-compatible chat completion APIs.
#[derive(Clone, Debug)]
pub struct OpenAiCompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    json_mode: bool,
}

impl OpenAiCompletionClient {
    /// Builds a client from the generation configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::Transport`] if the HTTP client cannot be constructed (for
    /// example when the TLS backend fails to initialise).
    pub fn new(cfg: &GenerationConfig) -> Result<Self, CompletionError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = cfg.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(CompletionError::Transport)?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", cfg.base_url()),
            api_key: cfg.api_key().to_owned(),
            model: cfg.model().to_owned(),
            json_mode: cfg.json_mode(),
        })
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: request.messages(),
            response_format: self.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        tracing::debug!(model = %self.model, "sending chat completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(CompletionError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(CompletionError::Decode)?;

        // A reply without content is the model's problem, not the transport's: hand back an
        // empty string and let the parser report it as malformed output.
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured {
        body: Arc<Mutex<Option<Value>>>,
        auth: Arc<Mutex<Option<String>>>,
    }

    async fn spawn_provider(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn client_for(base_url: &str, json_mode: bool) -> OpenAiCompletionClient {
        let cfg = GenerationConfig::new("sk-test", "gpt-4o", base_url)
            .unwrap()
            .with_json_mode(json_mode);
        OpenAiCompletionClient::new(&cfg).unwrap()
    }

    async fn echo_handler(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        *captured.auth.lock().unwrap() = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        *captured.body.lock().unwrap() = Some(body);

        Json(json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"flashcards\":[]}"}}
            ]
        }))
    }

    #[tokio::test]
    async fn test_complete_sends_two_part_conversation() {
        let captured = Captured::default();
        let router = Router::new()
            .route("/v1/chat/completions", post(echo_handler))
            .with_state(captured.clone());
        let base_url = spawn_provider(router).await;

        let client = client_for(&base_url, true);
        let reply = client
            .complete(&CompletionRequest::new("system prompt", "photosynthesis"))
            .await
            .unwrap();

        assert_eq!(reply, "{\"flashcards\":[]}");
        assert_eq!(
            captured.auth.lock().unwrap().as_deref(),
            Some("Bearer sk-test")
        );

        let body = captured.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "system prompt");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "photosynthesis");
    }

    #[tokio::test]
    async fn test_complete_omits_response_format_without_json_mode() {
        let captured = Captured::default();
        let router = Router::new()
            .route("/v1/chat/completions", post(echo_handler))
            .with_state(captured.clone());
        let base_url = spawn_provider(router).await;

        client_for(&base_url, false)
            .complete(&CompletionRequest::new("s", "u"))
            .await
            .unwrap();

        let body = captured.body.lock().unwrap().clone().unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[tokio::test]
    async fn test_complete_reports_error_status() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );
        let base_url = spawn_provider(router).await;

        let err = client_for(&base_url, true)
            .complete(&CompletionRequest::new("s", "u"))
            .await
            .unwrap_err();

        match err {
            CompletionError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_reports_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(&format!("http://{addr}/v1"), true)
            .complete(&CompletionRequest::new("s", "u"))
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::Transport(_)));
    }

    #[tokio::test]
    async fn test_complete_returns_empty_text_for_null_content() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                Json(json!({"choices": [{"message": {"role": "assistant", "content": null}}]}))
            }),
        );
        let base_url = spawn_provider(router).await;

        let reply = client_for(&base_url, true)
            .complete(&CompletionRequest::new("s", "u"))
            .await
            .unwrap();

        assert_eq!(reply, "");
    }

    #[test]
    fn test_completion_request_user_text() {
        let request = CompletionRequest::new("sys", "the French revolution");
        assert_eq!(request.messages().len(), 2);
        assert_eq!(request.user_text(), "the French revolution");
    }
}
