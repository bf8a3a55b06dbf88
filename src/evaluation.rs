//! Evaluation payload validation.
//!
//! The oracle is asked for a JSON object; nothing it returns is trusted.
//! Every field is extracted and checked individually, and any mismatch
//! rejects the whole payload.

use serde_json::{Map, Value};

use crate::domain::{Evaluation, FindingsKind};
use crate::error::CoachError;

const SCORE: &str = "score";
const SUGGESTIONS: &str = "suggestions";
const EXPLANATION: &str = "explanation";

/// Parse and validate the raw evaluation text.
pub fn parse_evaluation(raw: &str, findings: FindingsKind) -> Result<Evaluation, CoachError> {
  let value: Value = serde_json::from_str(raw)
    .map_err(|e| CoachError::malformed(format!("not valid JSON: {e}"), raw))?;
  let Value::Object(obj) = value else {
    return Err(CoachError::malformed("expected a JSON object", raw));
  };

  let findings_field = findings.field_name();
  if let Some(extra) = obj
    .keys()
    .find(|k| ![SCORE, findings_field, SUGGESTIONS, EXPLANATION].contains(&k.as_str()))
  {
    return Err(CoachError::malformed(format!("unexpected field `{extra}`"), raw));
  }

  Ok(Evaluation {
    score: score(&obj, raw)?,
    findings: string_list(&obj, findings_field, raw)?,
    suggestions: string_list(&obj, SUGGESTIONS, raw)?,
    explanation: explanation(&obj, raw)?,
  })
}

fn score(obj: &Map<String, Value>, raw: &str) -> Result<u8, CoachError> {
  let n = match obj.get(SCORE) {
    Some(Value::Number(n)) => n,
    Some(other) => return Err(CoachError::malformed(format!("`score` must be an integer, got {other}"), raw)),
    None => return Err(CoachError::malformed("missing `score`", raw)),
  };
  if n.is_f64() {
    return Err(CoachError::malformed(format!("`score` must be an integer, got {n}"), raw));
  }
  match n.as_u64() {
    Some(v) if v <= 100 => Ok(v as u8),
    _ => Err(CoachError::malformed(format!("`score` {n} is outside 0-100"), raw)),
  }
}

fn string_list(obj: &Map<String, Value>, field: &str, raw: &str) -> Result<Vec<String>, CoachError> {
  let items = match obj.get(field) {
    Some(Value::Array(items)) => items,
    Some(_) => return Err(CoachError::malformed(format!("`{field}` must be a list of strings"), raw)),
    None => return Err(CoachError::malformed(format!("missing `{field}`"), raw)),
  };
  items
    .iter()
    .enumerate()
    .map(|(i, item)| match item {
      Value::String(s) => Ok(s.clone()),
      _ => Err(CoachError::malformed(format!("`{field}[{i}]` is not a string"), raw)),
    })
    .collect()
}

fn explanation(obj: &Map<String, Value>, raw: &str) -> Result<Option<String>, CoachError> {
  match obj.get(EXPLANATION) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.clone())),
    Some(_) => Err(CoachError::malformed("`explanation` must be a string", raw)),
  }
}
