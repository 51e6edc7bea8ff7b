use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A multiple-choice question as handed to the grading engine.
///
/// Choices are addressed by their position in `choices`, not by `Choice::id`.
/// Choice ids are not stable across edits, so selections and answer keys are
/// both expressed as positions.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    pub id: i64,
    #[serde(alias = "question_text")]
    pub text: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub is_multiple_choice: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Choice {
    #[serde(default)]
    pub id: i64,
    #[serde(alias = "choice_text")]
    pub text: String,
    pub is_correct: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum QuestionType {
    Single, // Exactly one correct option, radio semantics
    Multi,  // Any number of correct options
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        if self.is_multiple_choice {
            QuestionType::Multi
        } else {
            QuestionType::Single
        }
    }

    pub fn correct_positions(&self) -> BTreeSet<usize> {
        self.choices
            .iter()
            .enumerate()
            .filter(|(_, choice)| choice.is_correct)
            .map(|(position, _)| position)
            .collect()
    }

    pub fn choice_at(&self, position: usize) -> Option<&Choice> {
        self.choices.get(position)
    }
}

impl Choice {
    pub fn new(id: i64, text: &str, is_correct: bool) -> Self {
        Self {
            id,
            text: text.to_string(),
            is_correct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_positions_follow_choice_order() {
        let question = Question {
            id: 1,
            text: "Pick the primes".to_string(),
            choices: vec![
                Choice::new(10, "2", true),
                Choice::new(11, "4", false),
                Choice::new(12, "5", true),
            ],
            is_multiple_choice: true,
            image_path: None,
        };

        assert_eq!(question.correct_positions(), BTreeSet::from([0, 2]));
        assert_eq!(question.question_type(), QuestionType::Multi);
        assert_eq!(question.choice_at(1).map(|c| c.text.as_str()), Some("4"));
        assert!(question.choice_at(3).is_none());
    }

    #[test]
    fn test_question_accepts_api_field_names() {
        let question: Question = serde_json::from_str(
            r#"{
                "id": 3,
                "question_text": "Capital of France?",
                "choices": [
                    {"choice_text": "Paris", "is_correct": true},
                    {"choice_text": "Rome", "is_correct": false}
                ]
            }"#,
        )
        .expect("question should deserialize");

        assert_eq!(question.text, "Capital of France?");
        assert_eq!(question.question_type(), QuestionType::Single);
        assert_eq!(question.correct_positions(), BTreeSet::from([0]));
    }
}
