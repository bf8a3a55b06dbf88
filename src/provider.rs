//! Challenge provider: the capability the session driver depends on.
//!
//! One implementation, `OracleChallengeProvider`, varied by its `Profile`.
//! Each call is exactly one oracle round trip: no retries, no caching,
//! no conversation memory between calls.

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::config::Profile;
use crate::domain::{Challenge, Evaluation};
use crate::error::CoachError;
use crate::evaluation::parse_evaluation;
use crate::openai::{Oracle, OracleRequest};
use crate::prompts::PromptBuilder;
use crate::util::trunc_for_log;

#[async_trait]
pub trait ChallengeProvider: Send + Sync {
  /// Option sets, labels and presentation the provider was configured with.
  fn profile(&self) -> &Profile;

  /// Fabricate a buggy snippet for `concept` in `context`.
  async fn generate(&self, concept: &str, context: &str) -> Result<Challenge, CoachError>;

  /// Score `user_solution` against the original snippet.
  async fn evaluate(&self, original_code: &str, user_solution: &str) -> Result<Evaluation, CoachError>;
}

pub struct OracleChallengeProvider<O> {
  oracle: O,
  model: String,
  profile: Profile,
}

impl<O: Oracle> OracleChallengeProvider<O> {
  pub fn new(oracle: O, model: impl Into<String>, profile: Profile) -> Self {
    Self { oracle, model: model.into(), profile }
  }

  pub fn model(&self) -> &str {
    &self.model
  }

  #[cfg(test)]
  pub(crate) fn oracle(&self) -> &O {
    &self.oracle
  }
}

#[async_trait]
impl<O: Oracle> ChallengeProvider for OracleChallengeProvider<O> {
  fn profile(&self) -> &Profile {
    &self.profile
  }

  #[instrument(level = "info", skip(self), fields(model = %self.model))]
  async fn generate(&self, concept: &str, context: &str) -> Result<Challenge, CoachError> {
    let user = PromptBuilder::new(&self.profile).generation_prompt(concept, context);
    let req = OracleRequest {
      model: &self.model,
      system: &self.profile.generation_system,
      user: &user,
      temperature: self.profile.generation_temperature,
      json_object: false,
    };

    let text = self.oracle.complete(req).await.map_err(|e| {
      error!(target: "challenge", error = %e, "Model call failed during challenge generation");
      CoachError::Generation(e.to_string())
    })?;

    let code = text.trim();
    if code.is_empty() {
      warn!(target: "challenge", "Model returned an empty challenge");
      return Err(CoachError::Generation("the model returned no code".into()));
    }

    info!(target: "challenge", code_len = code.len(), lines = code.lines().count(), "Challenge generated");
    Ok(Challenge::new(code.to_string(), concept.to_string(), context.to_string()))
  }

  #[instrument(
    level = "info",
    skip(self, original_code, user_solution),
    fields(model = %self.model, original_len = original_code.len(), solution_len = user_solution.len())
  )]
  async fn evaluate(&self, original_code: &str, user_solution: &str) -> Result<Evaluation, CoachError> {
    let user = PromptBuilder::new(&self.profile).evaluation_prompt(original_code, user_solution);
    let req = OracleRequest {
      model: &self.model,
      system: &self.profile.evaluation_system,
      user: &user,
      temperature: self.profile.evaluation_temperature,
      json_object: true,
    };

    let raw = self.oracle.complete(req).await.map_err(|e| {
      error!(target: "challenge", error = %e, "Model call failed during evaluation");
      CoachError::OracleCall(e)
    })?;

    let evaluation = parse_evaluation(&raw, self.profile.findings).map_err(|e| {
      warn!(target: "challenge", error = %e, raw = %trunc_for_log(&raw, 400), "Rejected evaluation payload");
      e
    })?;
    info!(target: "challenge", score = evaluation.score, findings = evaluation.findings.len(), suggestions = evaluation.suggestions.len(), "Solution evaluated");
    Ok(evaluation)
  }
}

/// Scripted oracle for tests: replays queued replies and records every request.
#[cfg(test)]
pub(crate) mod fakes {
  use std::collections::VecDeque;
  use std::sync::Mutex;

  use async_trait::async_trait;

  use crate::error::OracleError;
  use crate::openai::{Oracle, OracleRequest};

  #[derive(Clone, Debug, PartialEq)]
  pub struct Recorded {
    pub model: String,
    pub system: String,
    pub user: String,
    pub json_object: bool,
  }

  #[derive(Default)]
  pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    calls: Mutex<Vec<Recorded>>,
  }

  impl ScriptedOracle {
    pub fn new(replies: Vec<Result<String, OracleError>>) -> Self {
      Self { replies: Mutex::new(replies.into()), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<Recorded> {
      self.calls.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl Oracle for ScriptedOracle {
    async fn complete(&self, req: OracleRequest<'_>) -> Result<String, OracleError> {
      self.calls.lock().unwrap().push(Recorded {
        model: req.model.to_string(),
        system: req.system.to_string(),
        user: req.user.to_string(),
        json_object: req.json_object,
      });
      self.replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(OracleError::Transport("no scripted reply left".into())))
    }
  }
}
