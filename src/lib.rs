pub mod auth;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod session;

#[cfg(test)]
pub mod test_utils;

use models::domain::{question::Question, selection::Selections, submission::SubmissionResult};

pub use services::grading_service::GradingService;

/// Grades `selections` against the answer key carried by `questions`.
pub fn grade(questions: &[Question], selections: &Selections) -> SubmissionResult {
    GradingService::grade(questions, selections)
}
