pub mod request;
pub mod response;

pub use request::{ChoiceDraft, ExamDraft, QuestionDraft};
pub use response::{ChoiceDto, QuestionDto, TokenResponse, VerifyTokenResponse};
