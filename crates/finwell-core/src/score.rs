//! The financial-health scoring engine.
//!
//! Pure and total: any well-formed answer set produces a score. Absent
//! answers are skipped (no penalty, no weight); malformed ones contribute
//! zero. The caller persists the result as an [`AssessmentRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::questionnaire::{AnswerSet, AnswerValue, Question, QuestionKind};

// ─── Tier ────────────────────────────────────────────────────────────────────

/// Qualitative bucket derived from the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
  Developing,
  Stable,
  Optimized,
}

impl Tier {
  /// Thresholds are exclusive upper bounds: `< 34` Developing, `< 67`
  /// Stable, otherwise Optimized.
  pub fn for_score(raw_score: f64) -> Self {
    if raw_score < 34.0 {
      Self::Developing
    } else if raw_score < 67.0 {
      Self::Stable
    } else {
      Self::Optimized
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      Self::Developing => "Building foundation",
      Self::Stable => "Solid foundation",
      Self::Optimized => "Excellent health",
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Developing => "Developing",
      Self::Stable => "Stable",
      Self::Optimized => "Optimized",
    }
  }
}

// ─── HealthScore ─────────────────────────────────────────────────────────────

/// The computed result of one assessment submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthScore {
  /// Weighted average on the 0–100 scale, rounded to 2 decimal places.
  pub raw_score:        f64,
  /// Round-half-up mapping of the raw score onto 1–10; never below 1.
  pub score_out_of_ten: u8,
  pub tier:             Tier,
  pub tier_description: &'static str,
}

// ─── Scoring ─────────────────────────────────────────────────────────────────

/// Compute the weighted financial-health score for `answers` against the
/// ordered `questions`.
///
/// The result is independent of question order: each answered question
/// contributes `score * weight` to the numerator and `weight` to the
/// denominator, nothing else.
pub fn compute_health_score(
  answers: &AnswerSet,
  questions: &[Question],
) -> HealthScore {
  let mut total_score = 0.0;
  let mut total_weight = 0.0;

  for question in questions {
    let Some(answer) = answers.get(&question.id) else {
      // Unanswered questions are skipped entirely; they neither penalise
      // nor contribute weight.
      continue;
    };

    let score = match (&question.kind, answer) {
      (QuestionKind::Numeric { max_value }, AnswerValue::Number(n)) => {
        let normalized =
          if *max_value > 0.0 { n / max_value * 100.0 } else { 0.0 };
        // Upper clamp only: a negative answer may drive a negative
        // per-question score.
        normalized.min(100.0)
      }
      (QuestionKind::MultipleChoice { options }, AnswerValue::Choice(v)) => {
        options
          .iter()
          .find(|o| o.value == *v)
          .map(|o| o.score)
          .unwrap_or(0.0)
      }
      (QuestionKind::Boolean { positive_answer }, AnswerValue::Bool(b)) => {
        if b == positive_answer { 100.0 } else { 0.0 }
      }
      // An answer whose shape does not match the question kind scores zero
      // but still contributes its weight, the same as an unmatched
      // multiple-choice value.
      _ => 0.0,
    };

    total_score += score * question.weight;
    total_weight += question.weight;
  }

  let raw = if total_weight > 0.0 { total_score / total_weight } else { 0.0 };
  let tier = Tier::for_score(raw);

  // Round-half-up onto 1..=10; a raw score of 0 still maps to 1.
  let score_out_of_ten =
    (((raw / 10.0) + 0.5).floor() as i64).clamp(1, 10) as u8;

  HealthScore {
    raw_score: (raw * 100.0).round() / 100.0,
    score_out_of_ten,
    tier,
    tier_description: tier.description(),
  }
}

// ─── AssessmentRecord ────────────────────────────────────────────────────────

/// A persisted assessment: the raw answers plus the derived score and tier.
/// Created on each submission, never mutated; deleted only by cascade when
/// the owning user is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRecord {
  pub assessment_id: Uuid,
  pub user_id:       Uuid,
  pub answers:       AnswerSet,
  pub raw_score:     f64,
  pub tier:          Tier,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::WellnessStore::record_assessment`].
/// `created_at` is always set by the store.
#[derive(Debug, Clone)]
pub struct NewAssessment {
  pub user_id:   Uuid,
  pub answers:   AnswerSet,
  pub raw_score: f64,
  pub tier:      Tier,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::questionnaire::{ChoiceOption, QuestionnaireDefinition};

  fn numeric(id: &str, max_value: f64, weight: f64) -> Question {
    Question {
      id:     id.to_string(),
      prompt: format!("numeric {id}"),
      weight,
      unit:   None,
      kind:   QuestionKind::Numeric { max_value },
    }
  }

  fn answers(pairs: &[(&str, AnswerValue)]) -> AnswerSet {
    pairs
      .iter()
      .map(|(id, v)| (id.to_string(), v.clone()))
      .collect()
  }

  #[test]
  fn maximum_scoring_answers_give_100() {
    let def = QuestionnaireDefinition::standard();
    let answers: AnswerSet = def
      .questions
      .iter()
      .map(|q| {
        let best = match &q.kind {
          QuestionKind::Numeric { max_value } => {
            AnswerValue::Number(*max_value)
          }
          QuestionKind::Boolean { positive_answer } => {
            AnswerValue::Bool(*positive_answer)
          }
          QuestionKind::MultipleChoice { options } => AnswerValue::Choice(
            options
              .iter()
              .max_by(|a, b| a.score.total_cmp(&b.score))
              .map(|o| o.value.clone())
              .unwrap(),
          ),
        };
        (q.id.clone(), best)
      })
      .collect();

    let result = compute_health_score(&answers, &def.questions);
    assert_eq!(result.raw_score, 100.0);
    assert_eq!(result.score_out_of_ten, 10);
    assert_eq!(result.tier, Tier::Optimized);
  }

  #[test]
  fn empty_answers_score_zero_but_scale_is_one() {
    let def = QuestionnaireDefinition::standard();
    let result = compute_health_score(&AnswerSet::new(), &def.questions);
    assert_eq!(result.raw_score, 0.0);
    assert_eq!(result.score_out_of_ten, 1);
    assert_eq!(result.tier, Tier::Developing);
  }

  #[test]
  fn tier_boundaries_are_exact() {
    // A single numeric question with max 1000 and weight 1 makes the raw
    // score equal to answer / 10.
    let questions = vec![numeric("q", 1000.0, 1.0)];
    let score_for = |answer: f64| {
      compute_health_score(
        &answers(&[("q", AnswerValue::Number(answer))]),
        &questions,
      )
    };

    assert_eq!(score_for(339.99).tier, Tier::Developing);
    assert_eq!(score_for(340.0).tier, Tier::Stable);
    assert_eq!(score_for(669.99).tier, Tier::Stable);
    assert_eq!(score_for(670.0).tier, Tier::Optimized);
  }

  #[test]
  fn question_order_does_not_change_the_result() {
    let def = QuestionnaireDefinition::standard();
    let set = answers(&[
      ("q1", AnswerValue::Number(250_000.0)),
      ("q4", AnswerValue::Bool(false)),
      ("q5", AnswerValue::Choice("monthly".to_string())),
      ("q8", AnswerValue::Number(40.0)),
    ]);

    let forward = compute_health_score(&set, &def.questions);
    let mut reversed = def.questions.clone();
    reversed.reverse();
    let backward = compute_health_score(&set, &reversed);

    assert_eq!(forward, backward);
  }

  #[test]
  fn partial_answers_use_only_answered_weight() {
    // q1: 500000 of max 1000000 at weight 2 → 50 * 2
    // q4: true, positive at weight 1       → 100 * 1
    // total 200 over weight 3 → 66.67
    let def = QuestionnaireDefinition::standard();
    let set = answers(&[
      ("q1", AnswerValue::Number(500_000.0)),
      ("q4", AnswerValue::Bool(true)),
    ]);

    let result = compute_health_score(&set, &def.questions);
    assert_eq!(result.raw_score, 66.67);
    assert_eq!(result.tier, Tier::Stable);
    assert_eq!(result.score_out_of_ten, 7);
  }

  #[test]
  fn numeric_answers_clamp_only_the_upper_bound() {
    let questions = vec![numeric("q", 100.0, 1.0)];

    let over = compute_health_score(
      &answers(&[("q", AnswerValue::Number(250.0))]),
      &questions,
    );
    assert_eq!(over.raw_score, 100.0);

    // Negative answers are not clamped and drive the score below zero.
    let under = compute_health_score(
      &answers(&[("q", AnswerValue::Number(-50.0))]),
      &questions,
    );
    assert_eq!(under.raw_score, -50.0);
    assert_eq!(under.tier, Tier::Developing);
    assert_eq!(under.score_out_of_ten, 1);
  }

  #[test]
  fn unmatched_choice_scores_zero_but_keeps_its_weight() {
    let questions = vec![
      Question {
        id:     "pick".to_string(),
        prompt: "pick one".to_string(),
        weight: 1.0,
        unit:   None,
        kind:   QuestionKind::MultipleChoice {
          options: vec![ChoiceOption {
            value: "yes".to_string(),
            label: "Yes".to_string(),
            score: 100.0,
          }],
        },
      },
      numeric("q", 100.0, 1.0),
    ];

    let result = compute_health_score(
      &answers(&[
        ("pick", AnswerValue::Choice("nope".to_string())),
        ("q", AnswerValue::Number(100.0)),
      ]),
      &questions,
    );
    // 0 * 1 + 100 * 1 over weight 2.
    assert_eq!(result.raw_score, 50.0);
  }

  #[test]
  fn mismatched_answer_shape_scores_zero_but_keeps_its_weight() {
    let questions =
      vec![numeric("q", 100.0, 1.0), numeric("r", 100.0, 1.0)];

    let result = compute_health_score(
      &answers(&[
        ("q", AnswerValue::Bool(true)),
        ("r", AnswerValue::Number(100.0)),
      ]),
      &questions,
    );
    assert_eq!(result.raw_score, 50.0);
  }

  #[test]
  fn raw_score_rounds_to_two_decimals() {
    // 1/3 of 100 → 33.333… → 33.33.
    let questions = vec![numeric("q", 300.0, 1.0)];
    let result = compute_health_score(
      &answers(&[("q", AnswerValue::Number(100.0))]),
      &questions,
    );
    assert_eq!(result.raw_score, 33.33);
  }

  #[test]
  fn scale_mapping_rounds_half_up() {
    let questions = vec![numeric("q", 100.0, 1.0)];
    let score_for = |answer: f64| {
      compute_health_score(
        &answers(&[("q", AnswerValue::Number(answer))]),
        &questions,
      )
      .score_out_of_ten
    };

    assert_eq!(score_for(44.9), 4);
    assert_eq!(score_for(45.0), 5);
    assert_eq!(score_for(54.9), 5);
    assert_eq!(score_for(55.0), 6);
    assert_eq!(score_for(4.9), 1);
  }
}
