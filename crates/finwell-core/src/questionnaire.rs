//! Questionnaire definition types.
//!
//! A questionnaire is static configuration: an ordered sequence of weighted
//! questions, loaded once and immutable thereafter. Answers are collected per
//! submission and scored by [`crate::score::compute_health_score`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ─── Questions ───────────────────────────────────────────────────────────────

/// One selectable option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
  /// The machine value submitted in an answer; matched exactly.
  pub value: String,
  pub label: String,
  /// Contribution when chosen, on the 0–100 scale.
  pub score: f64,
}

/// The kind-specific parameters of a question.
///
/// Modelled as a sum type so the scoring routine can pattern-match
/// exhaustively instead of branching on a string tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
  /// Normalised as `answer / max_value * 100`, upper-clamped at 100.
  Numeric { max_value: f64 },
  /// Scores 100 when the submitted boolean equals `positive_answer`.
  Boolean { positive_answer: bool },
  /// Scores the matched option's `score`; an unmatched value scores 0.
  MultipleChoice { options: Vec<ChoiceOption> },
}

/// A single question of a questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
  /// Unique within the questionnaire; the key answers are submitted under.
  pub id:     String,
  pub prompt: String,
  /// Positive weight applied to this question's normalised score.
  pub weight: f64,
  /// Display unit, e.g. `"$"` or `"%"`. Presentation only.
  pub unit:   Option<String>,
  #[serde(flatten)]
  pub kind:   QuestionKind,
}

/// An ordered, immutable questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireDefinition {
  pub title:       String,
  pub description: String,
  pub questions:   Vec<Question>,
}

// ─── Answers ─────────────────────────────────────────────────────────────────

/// A raw answer value as submitted. Untagged: JSON booleans, numbers, and
/// strings map onto the three variants directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
  Bool(bool),
  Number(f64),
  Choice(String),
}

/// A mapping from question id to raw answer. Questions absent from the map
/// are skipped entirely during scoring.
pub type AnswerSet = BTreeMap<String, AnswerValue>;

// ─── Standard definition ─────────────────────────────────────────────────────

impl QuestionnaireDefinition {
  /// The standard eight-question financial-health assessment.
  pub fn standard() -> Self {
    fn q(
      id: &str,
      prompt: &str,
      weight: f64,
      unit: Option<&str>,
      kind: QuestionKind,
    ) -> Question {
      Question {
        id: id.to_string(),
        prompt: prompt.to_string(),
        weight,
        unit: unit.map(str::to_string),
        kind,
      }
    }

    fn opt(value: &str, label: &str, score: f64) -> ChoiceOption {
      ChoiceOption {
        value: value.to_string(),
        label: label.to_string(),
        score,
      }
    }

    Self {
      title: "Financial Health Assessment".to_string(),
      description: "Help us understand your financial situation to provide \
                    personalized insights."
        .to_string(),
      questions: vec![
        q(
          "q1",
          "What is your current monthly revenue?",
          2.0,
          Some("$"),
          QuestionKind::Numeric { max_value: 1_000_000.0 },
        ),
        q(
          "q2",
          "How many months of operating expenses do you have in cash \
           reserves?",
          2.0,
          Some("months"),
          QuestionKind::Numeric { max_value: 12.0 },
        ),
        q(
          "q3",
          "What percentage of your invoices are paid within 30 days?",
          1.5,
          Some("%"),
          QuestionKind::Numeric { max_value: 100.0 },
        ),
        q(
          "q4",
          "Do you have a formal budget in place?",
          1.0,
          None,
          QuestionKind::Boolean { positive_answer: true },
        ),
        q(
          "q5",
          "How often do you review your financial statements?",
          1.5,
          None,
          QuestionKind::MultipleChoice {
            options: vec![
              opt("daily", "Daily", 100.0),
              opt("weekly", "Weekly", 80.0),
              opt("monthly", "Monthly", 60.0),
              opt("quarterly", "Quarterly", 40.0),
              opt("annually", "Annually or Less", 20.0),
            ],
          },
        ),
        q(
          "q6",
          "What is your current debt-to-income ratio?",
          2.0,
          None,
          QuestionKind::MultipleChoice {
            options: vec![
              opt("below_25", "Below 25%", 100.0),
              opt("25_50", "25-50%", 75.0),
              opt("50_75", "50-75%", 50.0),
              opt("above_75", "Above 75%", 25.0),
            ],
          },
        ),
        q(
          "q7",
          "Do you use accounting software to track your finances?",
          1.0,
          None,
          QuestionKind::Boolean { positive_answer: true },
        ),
        q(
          "q8",
          "What is your average profit margin?",
          2.0,
          Some("%"),
          QuestionKind::Numeric { max_value: 100.0 },
        ),
      ],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn standard_definition_has_unique_ids_and_positive_weights() {
    let def = QuestionnaireDefinition::standard();
    assert_eq!(def.questions.len(), 8);

    let mut ids: Vec<&str> =
      def.questions.iter().map(|q| q.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8, "question ids must be unique");

    assert!(def.questions.iter().all(|q| q.weight > 0.0));
  }

  #[test]
  fn answer_values_deserialize_untagged() {
    let set: AnswerSet = serde_json::from_str(
      r#"{"q1": 500000, "q4": true, "q5": "weekly"}"#,
    )
    .unwrap();
    assert_eq!(set["q1"], AnswerValue::Number(500_000.0));
    assert_eq!(set["q4"], AnswerValue::Bool(true));
    assert_eq!(set["q5"], AnswerValue::Choice("weekly".to_string()));
  }

  #[test]
  fn multiple_choice_scores_stay_on_the_0_100_scale() {
    let def = QuestionnaireDefinition::standard();
    for question in &def.questions {
      if let QuestionKind::MultipleChoice { options } = &question.kind {
        assert!(!options.is_empty());
        assert!(
          options.iter().all(|o| (0.0..=100.0).contains(&o.score)),
          "question {} has an out-of-range option score",
          question.id
        );
      }
    }
  }
}
