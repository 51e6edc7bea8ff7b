use log::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::models::domain::question::{Question, QuestionType};
use crate::models::domain::selection::Selections;
use crate::models::domain::submission::SubmissionResult;
use crate::services::grading_service::GradingService;

/// One learner's pass through an exam.
///
/// Owns the selections until `submit` freezes them.
#[derive(Clone, Debug)]
pub struct ExamAttempt {
    exam_id: i64,
    questions: Vec<Question>,
    selections: Selections,
    result: Option<SubmissionResult>,
}

impl ExamAttempt {
    pub fn new(exam_id: i64, questions: Vec<Question>) -> Self {
        Self {
            exam_id,
            questions,
            selections: Selections::new(),
            result: None,
        }
    }

    pub fn exam_id(&self) -> i64 {
        self.exam_id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn result(&self) -> Option<&SubmissionResult> {
        self.result.as_ref()
    }

    pub fn is_submitted(&self) -> bool {
        self.result.is_some()
    }

    /// Multi-choice questions flip the position, single-choice questions
    /// replace the current pick.
    pub fn toggle(&mut self, question_id: i64, position: usize) -> AppResult<()> {
        if self.is_submitted() {
            return Err(AppError::AttemptFinalized);
        }

        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| AppError::NotFound(format!("Question {} not in exam", question_id)))?;

        if question.choice_at(position).is_none() {
            return Err(AppError::ValidationError(format!(
                "Question {} has no choice at position {}",
                question_id, position
            )));
        }

        match question.question_type() {
            QuestionType::Multi => {
                self.selections.toggle(question_id, position);
            }
            QuestionType::Single => self.selections.select_only(question_id, position),
        }
        debug!(
            "Question {} selection is now {:?}",
            question_id,
            self.selections.chosen(question_id)
        );

        Ok(())
    }

    /// Grades the frozen selections. Submitting again regrades the same input.
    pub fn submit(&mut self) -> &SubmissionResult {
        let result = GradingService::grade(&self.questions, &self.selections);
        info!(
            "Exam {} submitted, score {}",
            self.exam_id,
            result.percentage_display()
        );
        self.result.insert(result)
    }
}
