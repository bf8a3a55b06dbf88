//! Code Coach · interactive debugging practice
//!
//! - Asks an OpenAI-compatible model for a buggy snippet on a chosen concept
//! - Collects the user's rewrite from the console (terminated by a sentinel line)
//! - Asks the model to score the rewrite and prints the report
//!
//! Important env variables:
//!   OPENAI_API_KEY      : required
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_MODEL        : default "gpt-3.5-turbo"
//!   OPENAI_TIMEOUT_SECS : per-request timeout, default 60
//!   COACH_VARIANT       : "python" (default) or "polyglot"
//!   COACH_CONFIG_PATH   : path to TOML config (profile/prompt overrides)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod config;
mod domain;
mod error;
mod evaluation;
mod openai;
mod prompts;
mod provider;
mod session;
mod telemetry;
mod util;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use crate::config::{Args, Settings};
use crate::openai::OpenAI;
use crate::provider::OracleChallengeProvider;
use crate::session::{SessionController, SessionOutcome};

#[tokio::main]
async fn main() -> ExitCode {
  let args = Args::parse();
  telemetry::init_tracing();

  // Configuration problems end the process before any session state exists.
  let settings = match Settings::load(&args) {
    Ok(settings) => settings,
    Err(e) => {
      error!(target: "code_coach", error = %e, "Startup failed");
      eprintln!("{e}");
      return ExitCode::FAILURE;
    }
  };
  let oracle = match OpenAI::new(&settings.oracle) {
    Ok(oracle) => oracle,
    Err(e) => {
      error!(target: "code_coach", error = %e, "Could not build the OpenAI client");
      eprintln!("{e}");
      return ExitCode::FAILURE;
    }
  };
  info!(
    target: "code_coach",
    variant = ?settings.variant,
    base_url = %oracle.base_url,
    model = %settings.oracle.model,
    timeout = ?oracle.timeout,
    "OpenAI enabled."
  );

  let provider = OracleChallengeProvider::new(oracle, settings.oracle.model.clone(), settings.profile);

  println!("Welcome to Code Coach AI!");
  let summary = SessionController::new(&provider, io::stdin().lock(), io::stdout()).run().await;
  if let Err(e) = io::stdout().flush() {
    warn!(target: "code_coach", error = %e, "Could not flush stdout");
  }

  // Session failures were already reported to the user; the process still exits cleanly.
  match summary.outcome {
    SessionOutcome::Completed(evaluation) => {
      info!(target: "code_coach", model = %provider.model(), score = evaluation.score, "Session completed");
    }
    SessionOutcome::Errored(e) => {
      info!(target: "code_coach", error = %e, "Session ended with an error");
    }
    SessionOutcome::Abandoned => eprintln!("Session ended before a challenge was requested."),
  }
  ExitCode::SUCCESS
}
