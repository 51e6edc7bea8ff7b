use serde::Deserialize;

use crate::models::domain::question::{Choice, Question};

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyTokenResponse {
    pub message: String,
    pub access_token: String,
}

/// Error body returned by the server on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub detail: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDto {
    pub id: i64,
    pub question_text: String,
    #[serde(default)]
    pub exam_id: Option<i64>,
    #[serde(default)]
    pub is_multiple_choice: bool,
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceDto {
    pub id: i64,
    pub choice_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl From<ChoiceDto> for Choice {
    fn from(dto: ChoiceDto) -> Self {
        Choice {
            id: dto.id,
            text: dto.choice_text,
            is_correct: dto.is_correct,
        }
    }
}

impl QuestionDto {
    /// Choices keep the order the server listed them in.
    pub fn into_question(self, choices: Vec<ChoiceDto>) -> Question {
        Question {
            id: self.id,
            text: self.question_text,
            choices: choices.into_iter().map(Choice::from).collect(),
            is_multiple_choice: self.is_multiple_choice,
            image_path: self.image_path,
        }
    }
}
