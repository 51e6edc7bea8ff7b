use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Attempt already submitted")]
    AttemptFinalized,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NetworkError(_) => "NETWORK_ERROR",
            AppError::StorageError(_) => "STORAGE_ERROR",
            AppError::AttemptFinalized => "ATTEMPT_FINALIZED",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::NetworkError(err.to_string())
    }
}
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON error: {}", err))
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// A credential whose claims cannot be proven.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("credential must have three dot-separated segments, found {0}")]
    MalformedStructure(usize),

    #[error("payload segment is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("payload is not a JSON object: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("claim `{0}` is missing")]
    MissingClaim(&'static str),

    #[error("claim `{claim}` is invalid: {reason}")]
    InvalidClaim { claim: &'static str, reason: String },

    #[error("credential signature rejected: {0}")]
    Signature(#[from] jsonwebtoken::errors::Error),
}

/// The remote exchange refused or could not produce a new credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("refresh rejected with status {0}")]
    Rejected(u16),

    #[error("refresh endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("refresh response unusable: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RefreshError::Rejected(status.as_u16()),
            None if err.is_decode() => RefreshError::InvalidResponse(err.to_string()),
            None => RefreshError::Unreachable(err.to_string()),
        }
    }
}

/// Grading input that yields a defined zero result instead of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegenerateInputError {
    #[error("no questions to grade")]
    NoQuestions,

    #[error("question {question_id} has no correct choice")]
    NoCorrectChoice { question_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NotFound("exam".into()).error_code(), "NOT_FOUND");
        assert_eq!(
            AppError::Unauthorized("test".into()).error_code(),
            "UNAUTHORIZED"
        );
        assert_eq!(AppError::AttemptFinalized.error_code(), "ATTEMPT_FINALIZED");
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::NotFound("exam 4".into());
        assert_eq!(err.to_string(), "Not found: exam 4");

        let err = DegenerateInputError::NoCorrectChoice { question_id: 7 };
        assert_eq!(err.to_string(), "question 7 has no correct choice");
    }

    #[test]
    fn test_degenerate_input_serializes_with_kind_tag() {
        let json = serde_json::to_value(DegenerateInputError::NoCorrectChoice { question_id: 3 })
            .expect("degenerate input should serialize");

        assert_eq!(json["kind"], "no_correct_choice");
        assert_eq!(json["question_id"], 3);
    }
}
