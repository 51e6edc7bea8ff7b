pub mod attempt;
pub mod exam;
pub mod question;
pub mod selection;
pub mod submission;
pub use attempt::ExamAttempt;
pub use exam::Exam;
pub use question::{Choice, Question, QuestionType};
pub use selection::Selections;
pub use submission::{ChoiceMark, Outcome, QuestionFeedback, SubmissionResult};
