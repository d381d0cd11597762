//! Chat-completion call: prompt in, summary text out.
//!
//! One non-streaming POST to an Ollama-style `/api/chat` endpoint carrying
//! exactly two messages (system, user). There is no retry: a local model
//! either answers within the timeout or the run fails.
//!
//! ## Response normalisation
//!
//! Hosts differ in what they hand back from an HTTP call: raw text, a parsed
//! JSON value, or a JSON value that is itself a string of JSON. All three are
//! folded into one [`ResponseBody`] and decoded the same way, so the
//! orchestrator only ever sees [`SummaryResponse`] or an [`InferenceError`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::SummaryConfig;
use crate::error::InferenceError;
use crate::prompts::Prompt;

/// Longest error body kept in [`InferenceError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Everything needed for one summarization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub system_instruction: String,
    pub user_content: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl SummaryRequest {
    /// Assemble the request from the prompt, the extracted text and the
    /// run's configuration.
    pub fn new(prompt: &Prompt, extracted: &str, config: &SummaryConfig) -> Self {
        Self {
            system_instruction: prompt.system_instruction.clone(),
            user_content: prompt.user_content(extracted),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            timeout: config.timeout,
        }
    }
}

/// The model's answer. An empty `content` is a valid, if unhelpful, answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResponse {
    pub content: String,
    /// Model that answered, when the endpoint reports it.
    pub model: Option<String>,
}

/// A chat message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Request body of `/api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl From<&SummaryRequest> for ChatRequest {
    fn from(req: &SummaryRequest) -> Self {
        Self {
            model: req.model.clone(),
            messages: vec![
                ChatMessage::system(req.system_instruction.as_str()),
                ChatMessage::user(req.user_content.as_str()),
            ],
            stream: false,
        }
    }
}

/// A response body as a host may deliver it.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Raw response text.
    Text(String),
    /// Already-parsed JSON, possibly a string holding JSON.
    Json(Value),
}

impl ResponseBody {
    /// Decode into the canonical response.
    pub fn into_response(self) -> Result<SummaryResponse, InferenceError> {
        let value = match self {
            ResponseBody::Text(text) => unwrap_json_string(serde_json::from_str(&text)?)?,
            ResponseBody::Json(value) => unwrap_json_string(value)?,
        };

        let content = match value.get("message").and_then(|m| m.get("content")) {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(InferenceError::MissingContent),
        };
        let model = value
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(SummaryResponse { content, model })
    }
}

/// A JSON string whose contents are JSON is decoded once more.
fn unwrap_json_string(value: Value) -> Result<Value, InferenceError> {
    match value {
        Value::String(inner) => Ok(serde_json::from_str(&inner)?),
        other => Ok(other),
    }
}

/// Anything that can answer a [`SummaryRequest`].
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &SummaryRequest) -> Result<SummaryResponse, InferenceError>;
}

/// HTTP client for Ollama's `/api/chat`.
#[derive(Debug, Clone, Default)]
pub struct OllamaClient {
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing client (proxies, custom TLS).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn complete(&self, request: &SummaryRequest) -> Result<SummaryResponse, InferenceError> {
        let body = ChatRequest::from(request);
        debug!(
            model = %request.model,
            endpoint = %request.endpoint,
            prompt_chars = request.user_content.len(),
            "Sending chat request"
        );

        let request_error = |source| InferenceError::Request {
            endpoint: request.endpoint.clone(),
            source,
        };
        let resp = self
            .http
            .post(&request.endpoint)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(request_error)?;
        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        ResponseBody::Text(text).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(endpoint: String) -> SummaryRequest {
        SummaryRequest {
            system_instruction: "sys".into(),
            user_content: "user".into(),
            model: "llama3.1".into(),
            endpoint,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn wire_body_has_two_messages_and_no_streaming() {
        let body = serde_json::to_value(ChatRequest::from(&request("http://x".into()))).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "llama3.1",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "user"}
                ],
                "stream": false
            })
        );
    }

    #[test]
    fn body_shapes_normalise_to_one_response() {
        let plain = r#"{"model":"llama3.1","message":{"role":"assistant","content":"S"}}"#;
        let expected = SummaryResponse {
            content: "S".into(),
            model: Some("llama3.1".into()),
        };

        assert_eq!(ResponseBody::Text(plain.into()).into_response().unwrap(), expected);
        assert_eq!(
            ResponseBody::Json(serde_json::from_str(plain).unwrap())
                .into_response()
                .unwrap(),
            expected
        );
        assert_eq!(
            ResponseBody::Json(Value::String(plain.into()))
                .into_response()
                .unwrap(),
            expected
        );
        let double = serde_json::to_string(plain).unwrap();
        assert_eq!(ResponseBody::Text(double).into_response().unwrap(), expected);
    }

    #[test]
    fn missing_or_null_content_is_an_error() {
        for body in [
            json!({"message": {"role": "assistant"}}),
            json!({"message": {"content": null}}),
            json!({"error": "model not found"}),
        ] {
            assert!(matches!(
                ResponseBody::Json(body).into_response(),
                Err(InferenceError::MissingContent)
            ));
        }
    }

    #[test]
    fn empty_content_is_valid() {
        let r = ResponseBody::Json(json!({"message": {"content": ""}}))
            .into_response()
            .unwrap();
        assert_eq!(r.content, "");
    }

    #[tokio::test]
    async fn posts_to_endpoint_and_reads_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"model": "llama3.1", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.1",
                "message": {"role": "assistant", "content": "A concise summary."},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = OllamaClient::new()
            .complete(&request(format!("{}/api/chat", server.uri())))
            .await
            .unwrap();
        assert_eq!(resp.content, "A concise summary.");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model 'era' not found"))
            .mount(&server)
            .await;

        let err = OllamaClient::new()
            .complete(&request(format!("{}/api/chat", server.uri())))
            .await
            .unwrap_err();
        match err {
            InferenceError::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("this is not json {{{"))
            .mount(&server)
            .await;

        let err = OllamaClient::new()
            .complete(&request(format!("{}/api/chat", server.uri())))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Json(_)), "got: {err}");
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": {"content": "late"}}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let mut req = request(format!("{}/api/chat", server.uri()));
        req.timeout = Duration::from_millis(100);
        let err = OllamaClient::new().complete(&req).await.unwrap_err();
        assert!(err.is_timeout(), "got: {err}");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_error() {
        let err = OllamaClient::new()
            .complete(&request("http://127.0.0.1:9/api/chat".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Request { .. }), "got: {err}");
    }
}
