//! Prompt rendering for the two oracle round trips.
//!
//! Pure functions over a `Profile`: same inputs, byte-identical output.

use crate::config::Profile;
use crate::util::fill_template;

/// Renders generation/evaluation prompts from the profile's templates.
#[derive(Clone, Copy, Debug)]
pub struct PromptBuilder<'a> {
  profile: &'a Profile,
}

impl<'a> PromptBuilder<'a> {
  pub fn new(profile: &'a Profile) -> Self {
    Self { profile }
  }

  /// User prompt asking for a snippet with a few injected defects, code only.
  pub fn generation_prompt(&self, concept: &str, context: &str) -> String {
    fill_template(
      &self.profile.generation_template,
      &[("concept", concept), ("context", context)],
    )
  }

  /// User prompt asking for a JSON verdict on `user_solution` against `original_code`.
  pub fn evaluation_prompt(&self, original_code: &str, user_solution: &str) -> String {
    fill_template(
      &self.profile.evaluation_template,
      &[
        ("original_code", original_code),
        ("user_solution", user_solution),
        ("findings_field", self.profile.findings.field_name()),
        ("rubric", &self.profile.rubric),
      ],
    )
  }

  /// Heading shown above a generated challenge.
  pub fn challenge_heading(&self, concept: &str, context: &str) -> String {
    fill_template(
      &self.profile.challenge_heading,
      &[("concept", concept), ("context", context)],
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Variant;

  #[test]
  fn generation_prompt_embeds_parameters_and_defect_request() {
    for variant in [Variant::Python, Variant::Polyglot] {
      let profile = Profile::builtin(variant);
      let p = PromptBuilder::new(&profile).generation_prompt("sorting algorithm", "beginner");
      assert!(p.contains("sorting algorithm"));
      assert!(p.contains("beginner"));
      assert!(p.contains("2-3"));
      assert!(p.to_lowercase().contains("only"));
    }
  }

  #[test]
  fn evaluation_prompt_embeds_texts_verbatim() {
    let profile = Profile::builtin(Variant::Python);
    let original = "def f(xs):\n    return [x for x in xs if x > {limit}]";
    let solution = "def f(xs, limit):\n    return [x for x in xs if x > limit]  # {rubric}";
    let p = PromptBuilder::new(&profile).evaluation_prompt(original, solution);
    assert!(p.contains(original));
    assert!(p.contains(solution));
    assert!(p.contains("\"score\""));
    assert!(p.contains("\"improvements\""));
    assert!(p.contains("\"suggestions\""));
    assert!(p.contains("\"explanation\""));
    assert!(p.contains("Bug fixes (40 points)"));
  }

  #[test]
  fn polyglot_prompt_asks_for_errors_without_explanation() {
    let profile = Profile::builtin(Variant::Polyglot);
    let p = PromptBuilder::new(&profile).evaluation_prompt("a", "b");
    assert!(p.contains("\"errors\""));
    assert!(!p.contains("\"explanation\""));
    assert!(p.contains("(50 points)"));
  }

  #[test]
  fn builtin_rubrics_sum_to_one_hundred() {
    for variant in [Variant::Python, Variant::Polyglot] {
      let rubric = Profile::builtin(variant).rubric;
      let total: u32 = rubric
        .lines()
        .filter_map(|l| l.rsplit('(').next())
        .filter_map(|t| t.split_whitespace().next())
        .filter_map(|n| n.parse::<u32>().ok())
        .sum();
      assert_eq!(total, 100, "{variant:?}");
    }
  }

  #[test]
  fn rendering_is_idempotent() {
    let profile = Profile::builtin(Variant::Python);
    let b = PromptBuilder::new(&profile);
    assert_eq!(b.generation_prompt("recursion", "advanced"), b.generation_prompt("recursion", "advanced"));
    assert_eq!(b.evaluation_prompt("x = 1", ""), b.evaluation_prompt("x = 1", ""));
  }

  #[test]
  fn heading_uses_context_and_concept() {
    let profile = Profile::builtin(Variant::Python);
    assert_eq!(
      PromptBuilder::new(&profile).challenge_heading("error handling", "beginner"),
      "Here's a beginner level challenge about error handling:"
    );
  }
}
