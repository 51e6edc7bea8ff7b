use std::collections::BTreeSet;

use log::warn;

use crate::errors::DegenerateInputError;
use crate::models::domain::question::{Question, QuestionType};
use crate::models::domain::selection::Selections;
use crate::models::domain::submission::{Outcome, QuestionFeedback, SubmissionResult};

pub struct GradingService;

impl GradingService {
    /// Grade every question against the learner's selections.
    ///
    /// Pure and deterministic: inputs are only borrowed and the same inputs
    /// always produce the same result.
    pub fn grade(questions: &[Question], selections: &Selections) -> SubmissionResult {
        let mut issues = Vec::new();

        if questions.is_empty() {
            warn!("Grading requested with no questions loaded");
            issues.push(DegenerateInputError::NoQuestions);
        }

        let feedback: Vec<QuestionFeedback> = questions
            .iter()
            .map(|question| {
                let feedback = Self::grade_question(question, &selections.chosen(question.id));
                if feedback.correct.is_empty() {
                    warn!("Question {} has no correct choice, scoring it zero", question.id);
                    issues.push(DegenerateInputError::NoCorrectChoice {
                        question_id: question.id,
                    });
                }
                feedback
            })
            .collect();

        let percentage = if feedback.is_empty() {
            0.0
        } else {
            let total: f64 = feedback.iter().map(|f| f.score).sum();
            round_to_hundredths(total / feedback.len() as f64 * 100.0)
        };

        SubmissionResult {
            feedback,
            percentage,
            issues,
        }
    }

    /// Grade an individual question based on type
    pub fn grade_question(question: &Question, chosen: &BTreeSet<usize>) -> QuestionFeedback {
        let correct = question.correct_positions();

        let (score, outcome) = match question.question_type() {
            QuestionType::Single => {
                // All or nothing: exactly one pick, and it must be the first
                // correct position. No partial credit for single choice.
                let is_correct = chosen.len() == 1 && chosen.first() == correct.first();
                if is_correct {
                    (1.0, Outcome::Correct)
                } else {
                    (0.0, Outcome::Incorrect)
                }
            }
            QuestionType::Multi => {
                let has_extraneous = !chosen.is_subset(&correct);
                if correct.is_empty() || has_extraneous {
                    (0.0, Outcome::Incorrect)
                } else {
                    let matched = chosen.intersection(&correct).count();
                    let score = matched as f64 / correct.len() as f64;
                    let outcome = if matched == correct.len() {
                        Outcome::Correct
                    } else if matched > 0 {
                        Outcome::Partial
                    } else {
                        Outcome::Incorrect
                    };
                    (score, outcome)
                }
            }
        };

        QuestionFeedback {
            question_id: question.id,
            chosen: chosen.clone(),
            correct,
            score,
            outcome,
        }
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
