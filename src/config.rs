//! Configuration: command line/env flags, optional TOML file, built-in profiles.
//!
//! Precedence is command line (or its env var) > TOML file > built-in defaults.
//! `OPENAI_API_KEY` is read once here and handed to the oracle client; nothing
//! else in the crate touches the environment.

use std::{fmt, path::{Path, PathBuf}, time::Duration};

use clap::Parser;
use serde::Deserialize;
use tracing::info;

use crate::domain::{FindingsKind, Variant};
use crate::error::CoachError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Command line flags. Every flag can also come from its env var.
#[derive(Debug, Default, Parser)]
#[command(name = "code-coach", version, about = "Fix LLM-generated buggy code and get it scored")]
pub struct Args {
  /// Coaching variant (selects the built-in profile)
  #[arg(long, env = "COACH_VARIANT", value_enum)]
  pub variant: Option<Variant>,

  /// Model identifier sent with every request
  #[arg(long, env = "OPENAI_MODEL")]
  pub model: Option<String>,

  /// OpenAI-compatible API base URL
  #[arg(long, env = "OPENAI_BASE_URL")]
  pub base_url: Option<String>,

  /// Per-request timeout in seconds
  #[arg(long, env = "OPENAI_TIMEOUT_SECS")]
  pub timeout_secs: Option<u64>,

  /// TOML file with prompt/profile overrides
  #[arg(long, env = "COACH_CONFIG_PATH")]
  pub config: Option<PathBuf>,
}

/// Everything the oracle client needs. Lives from process start to process end.
#[derive(Clone)]
pub struct OracleSettings {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
}

impl fmt::Debug for OracleSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OracleSettings")
      .field("api_key", &"<redacted>")
      .field("base_url", &self.base_url)
      .field("model", &self.model)
      .field("timeout", &self.timeout)
      .finish()
  }
}

/// Prompts, option sets and presentation for one coaching variant.
#[derive(Clone, Debug)]
pub struct Profile {
  pub concepts: Vec<String>,
  pub contexts: Vec<String>,
  /// Menu title for the context axis ("difficulty" or "language").
  pub context_label: String,
  /// Template with `{concept}` and `{context}`.
  pub challenge_heading: String,
  pub findings: FindingsKind,
  pub sentinel: String,
  pub generation_system: String,
  /// Template with `{concept}` and `{context}`.
  pub generation_template: String,
  pub evaluation_system: String,
  /// Template with `{original_code}`, `{user_solution}`, `{findings_field}` and `{rubric}`.
  pub evaluation_template: String,
  pub rubric: String,
  pub generation_temperature: f32,
  pub evaluation_temperature: f32,
}

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

const CONCEPTS: &[&str] = &[
  "list comprehension", "error handling", "file handling",
  "class implementation", "data processing", "sorting algorithm",
  "recursive function", "decorator implementation", "API interaction",
  "database operations",
];

impl Profile {
  pub fn builtin(variant: Variant) -> Self {
    match variant {
      Variant::Python => Self {
        concepts: strings(CONCEPTS),
        contexts: strings(&["beginner", "intermediate", "advanced"]),
        context_label: "difficulty".into(),
        challenge_heading: "Here's a {context} level challenge about {concept}:".into(),
        findings: FindingsKind::Improvements,
        sentinel: "DONE".into(),
        generation_system: "You are a coding instructor creating practice exercises.".into(),
        generation_template: "Create a Python code snippet about {concept} at {context} level that:\n\
1. Contains 2-3 bugs that a student should be able to identify\n\
2. Has inconsistent naming issues\n\
3. Could be improved for better readability\n\
4. Is between 15-20 lines of code\n\n\
Return only the code without any explanations.".into(),
        evaluation_system: "You are a coding instructor evaluating student solutions.".into(),
        evaluation_template: "Compare the original buggy code and the user's solution:\n\n\
Original code:\n{original_code}\n\n\
User's solution:\n{user_solution}\n\n\
Provide an evaluation in the following JSON format:\n\
{\n  \"score\": <integer between 0-100>,\n  \"{findings_field}\": [<improvements made by the user in the original code>],\n  \"suggestions\": [<list of potential further improvements>],\n  \"explanation\": \"<brief explanation of the score>\"\n}\n\n\
Base the score on:\n{rubric}\n\n\
Ensure the response is valid JSON.".into(),
        rubric: "- Bug fixes (40 points)\n- Code style improvements (30 points)\n- Code efficiency/readability (30 points)".into(),
        generation_temperature: 0.8,
        evaluation_temperature: 0.2,
      },
      Variant::Polyglot => Self {
        concepts: strings(CONCEPTS),
        contexts: strings(&["Python", "JavaScript", "TypeScript", "Rust", "Go", "Java"]),
        context_label: "language".into(),
        challenge_heading: "Here's a {context} challenge about {concept}:".into(),
        findings: FindingsKind::Errors,
        sentinel: "DONE".into(),
        generation_system: "You are a programming tutor writing debugging exercises.".into(),
        generation_template: "Write a short {context} program demonstrating {concept}.\n\
Introduce 2-3 intentional bugs (logic errors, off-by-one mistakes, misuse of the language) \
that a student should be able to find and fix.\n\
Keep it under 25 lines.\n\n\
Return only the code, with no comments that reveal the bugs and no surrounding explanation.".into(),
        evaluation_system: "You are a strict code reviewer grading a student's bug fixes.".into(),
        evaluation_template: "The original code contained intentional bugs. Review the student's rewrite.\n\n\
Original code:\n{original_code}\n\n\
Student's solution:\n{user_solution}\n\n\
Reply with a single JSON object and nothing else:\n\
{\n  \"score\": <integer between 0-100>,\n  \"{findings_field}\": [<errors still present in the student's solution>],\n  \"suggestions\": [<further improvement hints>]\n}\n\n\
Scoring rubric:\n{rubric}".into(),
        rubric: "- Correctness of bug fixes (50 points)\n- Idiomatic use of the language (30 points)\n- Readability (20 points)".into(),
        generation_temperature: 0.8,
        evaluation_temperature: 0.2,
      },
    }
  }

  fn apply(&mut self, o: ProfileOverrides) {
    if let Some(v) = o.concepts { self.concepts = v; }
    if let Some(v) = o.contexts { self.contexts = v; }
    if let Some(v) = o.context_label { self.context_label = v; }
    if let Some(v) = o.challenge_heading { self.challenge_heading = v; }
    if let Some(v) = o.findings { self.findings = v; }
    if let Some(v) = o.sentinel { self.sentinel = v; }
    if let Some(v) = o.generation_system { self.generation_system = v; }
    if let Some(v) = o.generation_template { self.generation_template = v; }
    if let Some(v) = o.evaluation_system { self.evaluation_system = v; }
    if let Some(v) = o.evaluation_template { self.evaluation_template = v; }
    if let Some(v) = o.rubric { self.rubric = v; }
    if let Some(v) = o.generation_temperature { self.generation_temperature = v; }
    if let Some(v) = o.evaluation_temperature { self.evaluation_temperature = v; }
  }

  fn validate(&self) -> Result<(), CoachError> {
    if self.concepts.is_empty() {
      return Err(CoachError::Configuration("concept list is empty".into()));
    }
    if self.contexts.is_empty() {
      return Err(CoachError::Configuration(format!("{} list is empty", self.context_label)));
    }
    if self.sentinel.trim().is_empty() {
      return Err(CoachError::Configuration("solution sentinel is empty".into()));
    }
    Ok(())
  }
}

/// TOML schema. All keys optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
  #[serde(default)] pub variant: Option<Variant>,
  #[serde(default)] pub model: Option<String>,
  #[serde(default)] pub base_url: Option<String>,
  #[serde(default)] pub timeout_secs: Option<u64>,
  #[serde(default)] pub profile: ProfileOverrides,
}

/// Per-field overrides applied on top of the selected built-in profile.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileOverrides {
  #[serde(default)] pub concepts: Option<Vec<String>>,
  #[serde(default)] pub contexts: Option<Vec<String>>,
  #[serde(default)] pub context_label: Option<String>,
  #[serde(default)] pub challenge_heading: Option<String>,
  #[serde(default)] pub findings: Option<FindingsKind>,
  #[serde(default)] pub sentinel: Option<String>,
  #[serde(default)] pub generation_system: Option<String>,
  #[serde(default)] pub generation_template: Option<String>,
  #[serde(default)] pub evaluation_system: Option<String>,
  #[serde(default)] pub evaluation_template: Option<String>,
  #[serde(default)] pub rubric: Option<String>,
  #[serde(default)] pub generation_temperature: Option<f32>,
  #[serde(default)] pub evaluation_temperature: Option<f32>,
}

/// Resolved process configuration.
#[derive(Clone, Debug)]
pub struct Settings {
  pub variant: Variant,
  pub oracle: OracleSettings,
  pub profile: Profile,
}

impl Settings {
  /// Read the credential from the environment and the optional TOML file, then resolve.
  pub fn load(args: &Args) -> Result<Self, CoachError> {
    let api_key = std::env::var("OPENAI_API_KEY").ok();
    let file = match &args.config {
      Some(path) => Some(load_file_config(path)?),
      None => None,
    };
    Self::resolve(args, api_key, file)
  }

  /// Pure resolution step, separated from env/file access.
  pub fn resolve(args: &Args, api_key: Option<String>, file: Option<FileConfig>) -> Result<Self, CoachError> {
    let api_key = api_key
      .map(|k| k.trim().to_string())
      .filter(|k| !k.is_empty())
      .ok_or_else(|| CoachError::Configuration("OPENAI_API_KEY is not set".into()))?;

    let file = file.unwrap_or_default();
    let variant = args.variant.or(file.variant).unwrap_or_default();
    let model = args.model.clone().or(file.model).unwrap_or_else(|| DEFAULT_MODEL.into());
    if model.trim().is_empty() {
      return Err(CoachError::Configuration("model identifier is empty".into()));
    }
    let base_url = args.base_url.clone().or(file.base_url).unwrap_or_else(|| DEFAULT_BASE_URL.into());
    let timeout_secs = args.timeout_secs.or(file.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
      return Err(CoachError::Configuration("timeout must be at least one second".into()));
    }

    let mut profile = Profile::builtin(variant);
    profile.apply(file.profile);
    profile.validate()?;

    Ok(Self {
      variant,
      oracle: OracleSettings {
        api_key,
        base_url: base_url.trim_end_matches('/').to_string(),
        model,
        timeout: Duration::from_secs(timeout_secs),
      },
      profile,
    })
  }
}

/// A named config file that cannot be read or parsed is fatal.
pub fn load_file_config(path: &Path) -> Result<FileConfig, CoachError> {
  let s = std::fs::read_to_string(path)
    .map_err(|e| CoachError::Configuration(format!("cannot read {}: {e}", path.display())))?;
  let cfg = toml::from_str::<FileConfig>(&s)
    .map_err(|e| CoachError::Configuration(format!("cannot parse {}: {e}", path.display())))?;
  info!(target: "code_coach", path = %path.display(), "Loaded coach config (TOML)");
  Ok(cfg)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key() -> Option<String> { Some("sk-test".into()) }

  #[test]
  fn missing_or_blank_key_is_a_configuration_error() {
    let args = Args::default();
    assert!(matches!(Settings::resolve(&args, None, None), Err(CoachError::Configuration(_))));
    assert!(matches!(Settings::resolve(&args, Some("  ".into()), None), Err(CoachError::Configuration(_))));
  }

  #[test]
  fn defaults_select_the_python_profile() {
    let s = Settings::resolve(&Args::default(), key(), None).unwrap();
    assert_eq!(s.variant, Variant::Python);
    assert_eq!(s.oracle.model, DEFAULT_MODEL);
    assert_eq!(s.oracle.base_url, DEFAULT_BASE_URL);
    assert_eq!(s.oracle.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    assert_eq!(s.profile.contexts, vec!["beginner", "intermediate", "advanced"]);
    assert_eq!(s.profile.concepts.len(), 10);
    assert_eq!(s.profile.findings, FindingsKind::Improvements);
  }

  #[test]
  fn toml_overrides_profile_and_flags_win_over_file() {
    let file: FileConfig = toml::from_str(
      r#"
        variant = "polyglot"
        model = "from-file"
        base_url = "http://localhost:8080/v1/"

        [profile]
        contexts = ["Rust", "Zig"]
        sentinel = "END"
      "#,
    )
    .unwrap();
    let args = Args { model: Some("from-flag".into()), ..Args::default() };
    let s = Settings::resolve(&args, key(), Some(file)).unwrap();
    assert_eq!(s.variant, Variant::Polyglot);
    assert_eq!(s.oracle.model, "from-flag");
    assert_eq!(s.oracle.base_url, "http://localhost:8080/v1");
    assert_eq!(s.profile.contexts, vec!["Rust", "Zig"]);
    assert_eq!(s.profile.sentinel, "END");
    assert_eq!(s.profile.findings, FindingsKind::Errors);
  }

  #[test]
  fn empty_option_sets_are_rejected() {
    let file: FileConfig = toml::from_str("[profile]\nconcepts = []").unwrap();
    assert!(matches!(Settings::resolve(&Args::default(), key(), Some(file)), Err(CoachError::Configuration(_))));
  }

  #[test]
  fn unknown_toml_keys_fail_to_parse() {
    assert!(toml::from_str::<FileConfig>("[profile]\nconcept = [\"x\"]").is_err());
  }

  #[test]
  fn api_key_is_redacted_in_debug() {
    let s = Settings::resolve(&Args::default(), Some("sk-secret".into()), None).unwrap();
    let dbg = format!("{:?}", s.oracle);
    assert!(!dbg.contains("sk-secret"));
    assert!(dbg.contains("<redacted>"));
  }

  #[test]
  fn flags_parse_from_command_line() {
    let args = Args::try_parse_from(["code-coach", "--variant", "polyglot", "--timeout-secs", "5"]).unwrap();
    assert_eq!(args.variant, Some(Variant::Polyglot));
    assert_eq!(args.timeout_secs, Some(5));
  }
}
