//! Minimal OpenAI client and the `Oracle` seam the provider talks to.
//!
//! We only call chat.completions and request either plain text or a strict JSON object.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::OracleSettings;
use crate::error::{CoachError, OracleError};

/// One system + user exchange with the model.
#[derive(Clone, Debug, PartialEq)]
pub struct OracleRequest<'a> {
  pub model: &'a str,
  pub system: &'a str,
  pub user: &'a str,
  pub temperature: f32,
  /// Ask the service to constrain the reply to a single JSON object.
  pub json_object: bool,
}

/// Opaque text-completion service. One call is one round trip.
#[async_trait]
pub trait Oracle: Send + Sync {
  async fn complete(&self, req: OracleRequest<'_>) -> Result<String, OracleError>;
}

#[derive(Clone)]
pub struct OpenAI {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub timeout: Duration,
}

impl OpenAI {
  /// Build the HTTP client with a single per-request timeout.
  pub fn new(settings: &OracleSettings) -> Result<Self, CoachError> {
    let client = reqwest::Client::builder()
      .timeout(settings.timeout)
      .build()
      .map_err(|e| CoachError::Configuration(format!("cannot build HTTP client: {e}")))?;

    Ok(Self {
      client,
      api_key: settings.api_key.clone(),
      base_url: settings.base_url.clone(),
      timeout: settings.timeout,
    })
  }

  fn transport_error(&self, e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
      OracleError::Timeout(self.timeout)
    } else {
      OracleError::Transport(e.to_string())
    }
  }
}

#[async_trait]
impl Oracle for OpenAI {
  #[instrument(
    level = "info",
    skip(self, req),
    fields(model = %req.model, json_object = req.json_object, system_len = req.system.len(), user_len = req.user.len())
  )]
  async fn complete(&self, req: OracleRequest<'_>) -> Result<String, OracleError> {
    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatCompletionRequest {
      model: req.model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: req.system.into() },
        ChatMessageReq { role: "user".into(), content: req.user.into() },
      ],
      temperature: req.temperature,
      response_format: req.json_object.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, concat!("code-coach/", env!("CARGO_PKG_VERSION")))
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&body).send().await.map_err(|e| self.transport_error(e))?;

    if !res.status().is_success() {
      let status = res.status();
      let text = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&text).unwrap_or(text);
      warn!(%status, elapsed = ?start.elapsed(), "OpenAI returned an error status");
      return Err(OracleError::Http { status: status.as_u16(), message });
    }

    let parsed: ChatCompletionResponse = res.json().await.map_err(|e| {
      if e.is_timeout() { OracleError::Timeout(self.timeout) } else { OracleError::Body(e.to_string()) }
    })?;
    if let Some(usage) = &parsed.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = first_choice_text(parsed);
    debug!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Text of the first choice; a missing choice or null content reads as empty.
fn first_choice_text(body: ChatCompletionResponse) -> String {
  body.choices.into_iter().next()
    .and_then(|c| c.message.content)
    .unwrap_or_default()
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client(server: &MockServer, timeout: Duration) -> OpenAI {
    OpenAI::new(&OracleSettings {
      api_key: "sk-test".into(),
      base_url: server.uri(),
      model: "gpt-test".into(),
      timeout,
    })
    .expect("client")
  }

  fn request(json_object: bool) -> OracleRequest<'static> {
    OracleRequest {
      model: "gpt-test",
      system: "You grade code.",
      user: "Score this.",
      temperature: 0.2,
      json_object,
    }
  }

  #[tokio::test]
  async fn json_request_reaches_the_wire_and_returns_choice_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("authorization", "Bearer sk-test"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": "{\"score\": 90}"}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
      })))
      .expect(1)
      .mount(&server)
      .await;

    let text = client(&server, Duration::from_secs(5)).complete(request(true)).await.unwrap();
    assert_eq!(text, r#"{"score": 90}"#);

    let received = server.received_requests().await.expect("recording enabled");
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["response_format"], json!({"type": "json_object"}));
    assert_eq!(body["model"], "gpt-test");
    assert_eq!(body["messages"][0], json!({"role": "system", "content": "You grade code."}));
    assert_eq!(body["messages"][1], json!({"role": "user", "content": "Score this."}));
  }

  #[tokio::test]
  async fn error_status_carries_the_api_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({
        "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
      })))
      .mount(&server)
      .await;

    match client(&server, Duration::from_secs(5)).complete(request(false)).await {
      Err(OracleError::Http { status, message }) => {
        assert_eq!(status, 401);
        assert_eq!(message, "Incorrect API key provided");
      }
      other => panic!("expected Http error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn slow_reply_becomes_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
          .set_delay(Duration::from_secs(3)),
      )
      .mount(&server)
      .await;

    let err = client(&server, Duration::from_secs(1)).complete(request(false)).await.unwrap_err();
    assert!(matches!(err, OracleError::Timeout(t) if t == Duration::from_secs(1)), "got {err:?}");
  }

  #[test]
  fn json_requests_carry_response_format() {
    let req = ChatCompletionRequest {
      model: "gpt-test".into(),
      messages: vec![ChatMessageReq { role: "user".into(), content: "hi".into() }],
      temperature: 0.2,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["response_format"], json!({"type": "json_object"}));
    assert_eq!(v["messages"][0]["role"], "user");
  }

  #[test]
  fn plain_requests_omit_response_format() {
    let req = ChatCompletionRequest {
      model: "gpt-test".into(),
      messages: vec![],
      temperature: 0.8,
      response_format: None,
    };
    let v = serde_json::to_value(&req).unwrap();
    assert!(v.get("response_format").is_none());
  }

  #[test]
  fn reads_first_choice_content() {
    let body: ChatCompletionResponse = serde_json::from_value(json!({
      "choices": [{"message": {"role": "assistant", "content": "def f(): pass"}}],
      "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })).unwrap();
    assert_eq!(first_choice_text(body), "def f(): pass");

    let empty: ChatCompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
    assert_eq!(first_choice_text(empty), "");

    let null: ChatCompletionResponse = serde_json::from_value(json!({
      "choices": [{"message": {"content": null}}]
    })).unwrap();
    assert_eq!(first_choice_text(null), "");
  }

  #[test]
  fn unwraps_api_error_messages() {
    let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Incorrect API key provided"));
    assert_eq!(extract_openai_error("<html>bad gateway</html>"), None);
  }
}
