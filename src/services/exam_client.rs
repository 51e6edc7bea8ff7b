use std::sync::Arc;

use log::{debug, info};
use reqwest::RequestBuilder;
use secrecy::ExposeSecret;
use validator::Validate;

use crate::{
    auth::{
        claims::Identity,
        utils::{require_author, require_owner_or_admin},
    },
    config::Config,
    errors::{AppError, AppResult},
    models::{
        domain::{attempt::ExamAttempt, exam::Exam, question::Question},
        dto::{
            request::{ExamDraft, QuestionDraft},
            response::{ChoiceDto, QuestionDto},
        },
    },
    services::http_helpers::{empty_or_error, json_or_error},
    session::SessionManager,
};

/// Exam, question and choice endpoints, authorized with the session's credential.
pub struct ExamClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ExamClient {
    pub fn new(config: &Config, session: Arc<SessionManager>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn identity(&self) -> AppResult<Identity> {
        self.session
            .current_identity()
            .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))
    }

    fn authorized(&self, request: RequestBuilder) -> AppResult<RequestBuilder> {
        let credential = self
            .session
            .credential()
            .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;
        Ok(request.bearer_auth(credential.expose_secret()))
    }

    pub async fn list_exams(&self) -> AppResult<Vec<Exam>> {
        let response = self
            .authorized(self.http.get(self.url("/exams/")))?
            .send()
            .await?;
        json_or_error(response).await
    }

    pub async fn get_exam(&self, exam_id: i64) -> AppResult<Exam> {
        let response = self
            .authorized(self.http.get(self.url(&format!("/exam/{}", exam_id))))?
            .send()
            .await?;
        json_or_error(response).await
    }

    pub async fn create_exam(&self, draft: &ExamDraft) -> AppResult<Exam> {
        require_author(&self.identity()?)?;
        draft.validate()?;

        let response = self
            .authorized(self.http.post(self.url("/exam/")))?
            .json(draft)
            .send()
            .await?;
        let exam: Exam = json_or_error(response).await?;

        info!("Created exam {} ({})", exam.id, exam.title);
        Ok(exam)
    }

    pub async fn update_exam(&self, exam_id: i64, draft: &ExamDraft) -> AppResult<Exam> {
        let identity = self.identity()?;
        draft.validate()?;
        let existing = self.get_exam(exam_id).await?;
        require_owner_or_admin(&identity, existing.owner_id)?;

        let response = self
            .authorized(self.http.put(self.url(&format!("/exam/{}", exam_id))))?
            .json(draft)
            .send()
            .await?;
        json_or_error(response).await
    }

    pub async fn delete_exam(&self, exam_id: i64) -> AppResult<()> {
        let identity = self.identity()?;
        let existing = self.get_exam(exam_id).await?;
        require_owner_or_admin(&identity, existing.owner_id)?;

        let response = self
            .authorized(self.http.delete(self.url(&format!("/exam/{}", exam_id))))?
            .send()
            .await?;
        empty_or_error(response).await?;

        info!("Deleted exam {}", exam_id);
        Ok(())
    }

    pub async fn list_questions(&self, exam_id: i64) -> AppResult<Vec<QuestionDto>> {
        let response = self
            .authorized(
                self.http
                    .get(self.url(&format!("/exams/{}/questions", exam_id))),
            )?
            .send()
            .await?;
        json_or_error(response).await
    }

    pub async fn list_choices(&self, exam_id: i64, question_id: i64) -> AppResult<Vec<ChoiceDto>> {
        let response = self
            .authorized(self.http.get(self.url(&format!(
                "/exam/{}/question/{}/choices",
                exam_id, question_id
            ))))?
            .send()
            .await?;
        json_or_error(response).await
    }

    /// Questions with their choices in server order, ready for grading.
    pub async fn load_questions(&self, exam_id: i64) -> AppResult<Vec<Question>> {
        let dtos = self.list_questions(exam_id).await?;
        let mut questions = Vec::with_capacity(dtos.len());

        for dto in dtos {
            let choices = self.list_choices(exam_id, dto.id).await?;
            questions.push(dto.into_question(choices));
        }

        debug!("Loaded {} questions for exam {}", questions.len(), exam_id);
        Ok(questions)
    }

    pub async fn start_attempt(&self, exam_id: i64) -> AppResult<ExamAttempt> {
        let questions = self.load_questions(exam_id).await?;
        Ok(ExamAttempt::new(exam_id, questions))
    }

    /// Creates the question when `question_id` is `None`, replaces it otherwise.
    pub async fn save_question(
        &self,
        exam_id: i64,
        question_id: Option<i64>,
        draft: &QuestionDraft,
    ) -> AppResult<QuestionDto> {
        self.identity()?;
        draft.validate()?;

        let request = match question_id {
            Some(id) => self
                .http
                .put(self.url(&format!("/exam/{}/question/{}", exam_id, id))),
            None => self
                .http
                .post(self.url(&format!("/exam/{}/question/", exam_id))),
        };

        let response = self.authorized(request)?.json(draft).send().await?;
        let saved: QuestionDto = json_or_error(response).await?;

        info!("Saved question {} on exam {}", saved.id, exam_id);
        Ok(saved)
    }

    pub async fn delete_question(&self, exam_id: i64, question_id: i64) -> AppResult<()> {
        let response = self
            .authorized(self.http.delete(self.url(&format!(
                "/exam/{}/question/{}",
                exam_id, question_id
            ))))?
            .send()
            .await?;
        empty_or_error(response).await
    }
}
