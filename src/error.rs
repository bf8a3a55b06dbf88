//! Error taxonomy for the coaching loop.

use std::time::Duration;

/// Failures surfaced by configuration, the provider and the session driver.
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
  /// Missing credential or unusable configuration. Fatal before any session starts.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// Menu selection that does not map to an option. Recoverable: re-prompt.
  #[error("invalid selection: {0}")]
  Input(String),

  /// Challenge generation failed or returned nothing usable.
  #[error("challenge generation failed: {0}")]
  Generation(String),

  /// Reading the solution or writing to the console failed mid-session.
  #[error("console I/O failed: {0}")]
  Console(String),

  /// The evaluation call failed at the transport/auth/timeout level.
  #[error("evaluation request failed: {0}")]
  OracleCall(#[source] OracleError),

  /// The evaluation call returned a payload that fails validation.
  /// `raw` keeps the payload for diagnostics.
  #[error("malformed evaluation response: {reason}")]
  MalformedResponse { reason: String, raw: String },
}

impl CoachError {
  pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
    CoachError::MalformedResponse { reason: reason.into(), raw: raw.to_string() }
  }
}

/// Failures of a single oracle round trip.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
  #[error("request timed out after {0:?}")]
  Timeout(Duration),

  #[error("transport error: {0}")]
  Transport(String),

  #[error("OpenAI HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("unreadable response body: {0}")]
  Body(String),
}
