//! Session driver: one coaching round from parameter selection to report.
//!
//! States advance strictly in order:
//! `SelectingParameters -> Generating -> AwaitingSolution -> Evaluating -> Reporting -> Done`,
//! with `Errored` reachable from `Generating` and `Evaluating`. `run` consumes the
//! controller, so every new session starts from a fresh `SelectingParameters`.

use std::io::{self, BufRead, Write};

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Evaluation, FindingsKind};
use crate::error::CoachError;
use crate::prompts::PromptBuilder;
use crate::provider::ChallengeProvider;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
  SelectingParameters,
  Generating,
  AwaitingSolution,
  Evaluating,
  Reporting,
  Done,
  Errored,
}

#[derive(Debug)]
pub enum SessionOutcome {
  /// The report was rendered.
  Completed(Evaluation),
  /// Generation or evaluation failed; the message was shown to the user.
  Errored(CoachError),
  /// Input closed (or the console failed) before a challenge was requested.
  Abandoned,
}

/// Outcome plus the ordered trail of states the session went through.
#[derive(Debug)]
pub struct SessionSummary {
  pub outcome: SessionOutcome,
  pub states: Vec<SessionState>,
}

pub struct SessionController<'p, P: ?Sized, R, W> {
  provider: &'p P,
  input: R,
  output: W,
  states: Vec<SessionState>,
}

impl<'p, P, R, W> SessionController<'p, P, R, W>
where
  P: ChallengeProvider + ?Sized,
  R: BufRead,
  W: Write,
{
  pub fn new(provider: &'p P, input: R, output: W) -> Self {
    Self { provider, input, output, states: Vec::new() }
  }

  /// Drive a single session to `Done` or `Errored`; `Abandoned` only if the console
  /// gives out during menu selection. Never panics on provider or console failures.
  #[instrument(level = "info", name = "session", skip_all, fields(session_id = %Uuid::new_v4()))]
  pub async fn run(mut self) -> SessionSummary {
    let outcome = match self.drive().await {
      Ok(outcome) => outcome,
      Err(e) => {
        warn!(target: "code_coach", error = %e, "Console I/O failed; ending session");
        SessionOutcome::Abandoned
      }
    };
    info!(target: "code_coach", states = ?self.states, "Session finished");
    SessionSummary { outcome, states: self.states }
  }

  async fn drive(&mut self) -> io::Result<SessionOutcome> {
    let provider = self.provider;
    let profile = provider.profile();

    self.enter(SessionState::SelectingParameters);
    let Some(concept) = self.select(
      "Available concepts:",
      "Choose a concept (enter number): ",
      &profile.concepts,
    )?
    else {
      return Ok(SessionOutcome::Abandoned);
    };
    let Some(context) = self.select(
      &format!("Available {} options:", profile.context_label),
      &format!("Choose {} (enter number): ", profile.context_label),
      &profile.contexts,
    )?
    else {
      return Ok(SessionOutcome::Abandoned);
    };

    // Past selection, console failures end the session like any other failure.
    match self.play(concept, context).await {
      Ok(outcome) => Ok(outcome),
      Err(e) => {
        warn!(target: "code_coach", error = %e, "Console I/O failed mid-session");
        Ok(self.fail(CoachError::Console(e.to_string())))
      }
    }
  }

  async fn play(&mut self, concept: &str, context: &str) -> io::Result<SessionOutcome> {
    let provider = self.provider;
    let profile = provider.profile();

    self.enter(SessionState::Generating);
    writeln!(self.output, "\nGenerating challenge...")?;
    self.output.flush()?;
    let challenge = match provider.generate(concept, context).await {
      Ok(challenge) => challenge,
      Err(e) => return Ok(self.fail(e)),
    };

    self.enter(SessionState::AwaitingSolution);
    let heading = PromptBuilder::new(profile).challenge_heading(challenge.concept(), challenge.context());
    writeln!(self.output, "\n{heading}")?;
    writeln!(self.output, "\n{}", challenge.code())?;
    writeln!(self.output, "\nPlease provide your improved version of the code.")?;
    writeln!(
      self.output,
      "Enter your solution (type '{}' on a new line when finished):",
      profile.sentinel
    )?;
    self.output.flush()?;
    let solution = self.capture_solution(&profile.sentinel)?;

    self.enter(SessionState::Evaluating);
    writeln!(self.output, "\nEvaluating your solution...")?;
    self.output.flush()?;
    let evaluation = match provider.evaluate(challenge.code(), &solution).await {
      Ok(evaluation) => evaluation,
      Err(e) => return Ok(self.fail(e)),
    };

    self.enter(SessionState::Reporting);
    for line in render_report(&evaluation, profile.findings) {
      writeln!(self.output, "{line}")?;
    }
    self.output.flush()?;

    self.enter(SessionState::Done);
    Ok(SessionOutcome::Completed(evaluation))
  }

  fn enter(&mut self, state: SessionState) {
    debug!(target: "code_coach", ?state, "Session state");
    self.states.push(state);
  }

  fn fail(&mut self, e: CoachError) -> SessionOutcome {
    self.enter(SessionState::Errored);
    let shown = writeln!(self.output, "An error occurred: {e}").and_then(|_| self.output.flush());
    if let Err(io) = shown {
      warn!(target: "code_coach", error = %io, "Could not show session error");
    }
    SessionOutcome::Errored(e)
  }

  /// Numbered menu; loops on invalid entries. `None` when input is closed.
  fn select<'o>(&mut self, heading: &str, prompt: &str, options: &'o [String]) -> io::Result<Option<&'o str>> {
    loop {
      writeln!(self.output, "\n{heading}")?;
      for (i, option) in options.iter().enumerate() {
        writeln!(self.output, "{}. {}", i + 1, option)?;
      }
      write!(self.output, "\n{prompt}")?;
      self.output.flush()?;

      let Some(entry) = self.read_line()? else {
        return Ok(None);
      };
      match pick_option(&entry, options) {
        Ok(choice) => return Ok(Some(choice)),
        Err(e) => {
          debug!(target: "code_coach", error = %e, "Rejected menu entry");
          writeln!(self.output, "{e}. Please try again.")?;
        }
      }
    }
  }

  /// Lines up to (not including) the sentinel, newline-joined.
  /// End of input terminates capture like the sentinel.
  fn capture_solution(&mut self, sentinel: &str) -> io::Result<String> {
    let mut lines = Vec::new();
    while let Some(line) = self.read_line()? {
      if line == sentinel {
        break;
      }
      lines.push(line);
    }
    Ok(lines.join("\n"))
  }

  /// One line without its terminator. Bytes that are not UTF-8 are replaced, not rejected.
  fn read_line(&mut self) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if self.input.read_until(b'\n', &mut buf)? == 0 {
      return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
      buf.pop();
      if buf.last() == Some(&b'\r') {
        buf.pop();
      }
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
  }
}

/// Map a 1-based menu entry onto `options`.
pub fn pick_option<'o>(entry: &str, options: &'o [String]) -> Result<&'o str, CoachError> {
  let entry = entry.trim();
  let n: usize = entry
    .parse()
    .map_err(|_| CoachError::Input(format!("'{entry}' is not a number")))?;
  n.checked_sub(1)
    .and_then(|i| options.get(i))
    .map(String::as_str)
    .ok_or_else(|| CoachError::Input(format!("{n} is not between 1 and {}", options.len())))
}

/// Report lines: score, findings, suggestions (only when present), explanation (only when present).
pub fn render_report(evaluation: &Evaluation, findings: FindingsKind) -> Vec<String> {
  let mut lines = vec![
    String::new(),
    format!("Score: {}/100", evaluation.score),
    String::new(),
    findings.heading().to_string(),
  ];
  lines.extend(evaluation.findings.iter().map(|f| format!("{} {f}", findings.bullet())));

  if !evaluation.suggestions.is_empty() {
    lines.push(String::new());
    lines.push("Suggestions for further improvement:".into());
    lines.extend(evaluation.suggestions.iter().map(|s| format!("• {s}")));
  }

  if let Some(explanation) = &evaluation.explanation {
    lines.push(String::new());
    lines.push(format!("Explanation: {explanation}"));
  }
  lines
}
