use std::collections::BTreeSet;

use serde::Serialize;

use crate::errors::DegenerateInputError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Partial,
    Incorrect,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Correct => "Correct",
            Outcome::Partial => "Partially Correct",
            Outcome::Incorrect => "Incorrect",
        }
    }
}

/// How a single choice is highlighted once feedback is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceMark {
    Correct,
    Incorrect,
    Unmarked,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuestionFeedback {
    pub question_id: i64,
    pub chosen: BTreeSet<usize>,
    pub correct: BTreeSet<usize>,
    pub score: f64,
    pub outcome: Outcome,
}

impl QuestionFeedback {
    /// Correct positions are always highlighted, wrong picks are flagged.
    pub fn mark(&self, position: usize) -> ChoiceMark {
        if self.correct.contains(&position) {
            ChoiceMark::Correct
        } else if self.chosen.contains(&position) {
            ChoiceMark::Incorrect
        } else {
            ChoiceMark::Unmarked
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub feedback: Vec<QuestionFeedback>,
    /// Aggregate score in percent, rounded to two decimals.
    pub percentage: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DegenerateInputError>,
}

impl SubmissionResult {
    pub fn feedback_for(&self, question_id: i64) -> Option<&QuestionFeedback> {
        self.feedback.iter().find(|f| f.question_id == question_id)
    }

    pub fn percentage_display(&self) -> String {
        format!("{:.2}%", self.percentage)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.feedback.iter().filter(|f| f.outcome == outcome).count()
    }
}
