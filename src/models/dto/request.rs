use std::fmt;

use serde::Serialize;
use validator::{Validate, ValidationError};

use crate::auth::claims::Role;

pub const MAX_QUESTION_LENGTH: u64 = 255;
pub const MAX_CHOICE_LENGTH: u64 = 100;

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ExamDraft {
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: String,
}

/// Body of `POST /register`. The confirmation never leaves the client.
#[derive(Clone, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 1, max = 100))]
    pub surname: String,

    #[validate(custom(function = validate_self_service_role))]
    pub role: Role,

    #[validate(
        length(min = 6, message = "Password must be longer than 5 characters"),
        must_match(other = "password_confirmation", message = "Passwords do not match")
    )]
    pub password: String,

    #[serde(skip_serializing)]
    pub password_confirmation: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct ChoiceDraft {
    #[validate(length(max = MAX_CHOICE_LENGTH))]
    pub choice_text: String,
    pub is_correct: bool,
}

/// Body of the question create/update calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
#[validate(schema(function = validate_question_draft))]
pub struct QuestionDraft {
    #[validate(length(max = MAX_QUESTION_LENGTH))]
    pub question_text: String,

    #[validate(nested)]
    pub choices: Vec<ChoiceDraft>,

    pub is_multiple_choice: bool,
}

impl ChoiceDraft {
    pub fn new(choice_text: &str, is_correct: bool) -> Self {
        Self {
            choice_text: choice_text.to_string(),
            is_correct,
        }
    }
}

impl QuestionDraft {
    /// Marks `position` correct. Single-choice drafts keep at most one correct choice.
    pub fn set_correct(&mut self, position: usize, is_correct: bool) {
        if !self.is_multiple_choice && is_correct {
            for choice in &mut self.choices {
                choice.is_correct = false;
            }
        }
        if let Some(choice) = self.choices.get_mut(position) {
            choice.is_correct = is_correct;
        }
    }

    /// Switching to single choice resets every correct flag.
    pub fn set_multiple_choice(&mut self, is_multiple_choice: bool) {
        self.is_multiple_choice = is_multiple_choice;
        if !is_multiple_choice {
            for choice in &mut self.choices {
                choice.is_correct = false;
            }
        }
    }
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_self_service_role(role: &Role) -> Result<(), ValidationError> {
    match role {
        Role::Student | Role::Teacher => Ok(()),
        Role::Admin => Err(rule("role_not_allowed", "Only students and teachers can register")),
    }
}

fn validate_question_draft(draft: &QuestionDraft) -> Result<(), ValidationError> {
    if draft.question_text.trim().is_empty() {
        return Err(rule("question_text_empty", "Question text cannot be empty"));
    }
    if draft.choices.is_empty() {
        return Err(rule("choices_empty", "At least one choice is required"));
    }
    if draft.choices.iter().all(|c| c.choice_text.trim().is_empty()) {
        return Err(rule("choices_blank", "All choices cannot be empty"));
    }

    let correct = draft.choices.iter().filter(|c| c.is_correct).count();
    if correct == 0 {
        return Err(rule(
            "no_correct_choice",
            "At least one choice must be marked as correct",
        ));
    }
    if !draft.is_multiple_choice && correct > 1 {
        return Err(rule(
            "single_choice_multiple_correct",
            "A single-choice question can only have one correct choice",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(is_multiple_choice: bool, choices: &[(&str, bool)]) -> QuestionDraft {
        QuestionDraft {
            question_text: "Which of these are fruits?".to_string(),
            choices: choices
                .iter()
                .map(|(text, correct)| ChoiceDraft::new(text, *correct))
                .collect(),
            is_multiple_choice,
        }
    }

    #[test]
    fn test_valid_drafts() {
        assert!(draft(true, &[("apple", true), ("pear", true), ("rock", false)])
            .validate()
            .is_ok());
        assert!(draft(false, &[("apple", true), ("rock", false)])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rejects_draft_without_correct_choice() {
        let result = draft(true, &[("apple", false), ("rock", false)]).validate();
        let err = result.expect_err("draft should be rejected");
        assert!(err.errors().contains_key("__all__"));
    }

    #[test]
    fn test_rejects_blank_question_and_choices() {
        let mut blank_text = draft(true, &[("apple", true)]);
        blank_text.question_text = "   ".to_string();
        assert!(blank_text.validate().is_err());

        assert!(draft(true, &[]).validate().is_err());
        assert!(draft(true, &[(" ", true), ("", false)]).validate().is_err());
    }

    #[test]
    fn test_rejects_over_long_text() {
        let mut long_question = draft(true, &[("apple", true)]);
        long_question.question_text = "q".repeat(MAX_QUESTION_LENGTH as usize + 1);
        assert!(long_question.validate().is_err());

        let long_choice = "c".repeat(MAX_CHOICE_LENGTH as usize + 1);
        assert!(draft(true, &[(long_choice.as_str(), true)]).validate().is_err());
    }

    #[test]
    fn test_accepts_text_at_length_limit() {
        let mut question = draft(true, &[("apple", true)]);
        question.question_text = "q".repeat(MAX_QUESTION_LENGTH as usize);
        question.choices[0].choice_text = "c".repeat(MAX_CHOICE_LENGTH as usize);
        assert!(question.validate().is_ok());
    }

    #[test]
    fn test_single_choice_allows_one_correct() {
        assert!(draft(false, &[("a", true), ("b", true)]).validate().is_err());

        let mut single = draft(false, &[("a", true), ("b", false)]);
        single.set_correct(1, true);
        assert_eq!(
            single.choices.iter().map(|c| c.is_correct).collect::<Vec<_>>(),
            vec![false, true]
        );
        assert!(single.validate().is_ok());
    }

    #[test]
    fn test_switching_to_single_choice_resets_correct_flags() {
        let mut question = draft(true, &[("a", true), ("b", true)]);
        question.set_multiple_choice(false);

        assert!(question.choices.iter().all(|c| !c.is_correct));
        assert!(question.validate().is_err());
    }

    fn registration() -> RegisterRequest {
        RegisterRequest {
            username: "janedoe".to_string(),
            email: "jane@example.com".to_string(),
            name: "Jane".to_string(),
            surname: "Doe".to_string(),
            role: Role::Student,
            password: "secret1".to_string(),
            password_confirmation: "secret1".to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(registration().validate().is_ok());

        let mut teacher = registration();
        teacher.role = Role::Teacher;
        assert!(teacher.validate().is_ok());
    }

    #[test]
    fn test_registration_password_rules() {
        let mut short = registration();
        short.password = "12345".to_string();
        short.password_confirmation = "12345".to_string();
        let err = short.validate().unwrap_err();
        assert!(err.field_errors().contains_key("password"));

        let mut mismatched = registration();
        mismatched.password_confirmation = "secret2".to_string();
        let err = mismatched.validate().unwrap_err();
        assert_eq!(err.field_errors()["password"][0].code, "must_match");
    }

    #[test]
    fn test_registration_rejects_bad_fields() {
        let mut bad_email = registration();
        bad_email.email = "not-an-email".to_string();
        assert!(bad_email.validate().is_err());

        let mut admin = registration();
        admin.role = Role::Admin;
        let err = admin.validate().unwrap_err();
        assert!(err.field_errors().contains_key("role"));

        let mut anonymous = registration();
        anonymous.username = String::new();
        assert!(anonymous.validate().is_err());
    }

    #[test]
    fn test_registration_hides_password() {
        let request = registration();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["role"], "student");
        assert_eq!(body["password"], "secret1");
        assert!(body.get("password_confirmation").is_none());

        assert!(!format!("{:?}", request).contains("secret1"));
    }

    #[test]
    fn test_exam_draft_requires_title() {
        let exam = ExamDraft {
            title: String::new(),
            description: "Midterm".to_string(),
        };
        assert!(exam.validate().is_err());
    }
}
