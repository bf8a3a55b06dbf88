//! Domain models: variants, findings kind, challenge and evaluation.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Built-in coaching variants. Each one selects a default `Profile`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
  /// Python snippets, context = difficulty tier, findings = improvements made.
  #[default]
  Python,
  /// Any language, context = target language, findings = errors still present.
  Polyglot,
}

/// What the findings list of an evaluation describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingsKind {
  Improvements,
  Errors,
}

impl FindingsKind {
  /// JSON field name the oracle is asked to use.
  pub fn field_name(self) -> &'static str {
    match self {
      FindingsKind::Improvements => "improvements",
      FindingsKind::Errors => "errors",
    }
  }

  pub fn heading(self) -> &'static str {
    match self {
      FindingsKind::Improvements => "Improvements made:",
      FindingsKind::Errors => "Errors still present:",
    }
  }

  pub fn bullet(self) -> &'static str {
    match self {
      FindingsKind::Improvements => "✓",
      FindingsKind::Errors => "✗",
    }
  }
}

/// A generated, intentionally defective snippet. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
  code: String,
  concept: String,
  context: String,
}

impl Challenge {
  pub(crate) fn new(code: String, concept: String, context: String) -> Self {
    Self { code, concept, context }
  }

  pub fn code(&self) -> &str { &self.code }
  pub fn concept(&self) -> &str { &self.concept }
  pub fn context(&self) -> &str { &self.context }
}

/// Validated scoring result. Only ever built by `evaluation::parse_evaluation`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
  pub score: u8,
  pub findings: Vec<String>,
  pub suggestions: Vec<String>,
  pub explanation: Option<String>,
}
