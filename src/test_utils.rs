#[cfg(test)]
pub mod fixtures {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use secrecy::SecretString;
    use serde_json::Value;
    use tokio::{sync::Notify, time::Instant};

    use crate::{
        auth::claims::{Claims, Role},
        errors::{AppError, AppResult, RefreshError},
        models::{
            domain::question::{Choice, Question},
            dto::{request::RegisterRequest, response::TokenResponse},
        },
        services::auth_client::AuthApi,
        session::clock::Clock,
    };

    pub const TEST_SECRET: &str = "test_jwt_secret_key";

    /// 2024-01-01T00:00:00Z
    pub const NOW: i64 = 1_704_067_200;

    /// Signs claims with `TEST_SECRET`, as the server would.
    pub fn mint_token(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }

    /// Builds an unsigned token around an arbitrary payload.
    pub fn encode_payload(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, body)
    }

    fn choices(question_id: i64, count: usize, correct: &[usize]) -> Vec<Choice> {
        (0..count)
            .map(|pos| {
                Choice::new(
                    question_id * 100 + pos as i64,
                    &format!("Choice {}", pos + 1),
                    correct.contains(&pos),
                )
            })
            .collect()
    }

    pub fn single_question(id: i64, choice_count: usize, correct_pos: usize) -> Question {
        Question {
            id,
            text: format!("Question {}", id),
            choices: choices(id, choice_count, &[correct_pos]),
            is_multiple_choice: false,
            image_path: None,
        }
    }

    pub fn multi_question(id: i64, choice_count: usize, correct: &[usize]) -> Question {
        Question {
            id,
            text: format!("Question {}", id),
            choices: choices(id, choice_count, correct),
            is_multiple_choice: true,
            image_path: None,
        }
    }

    /// Wall clock that follows Tokio's (possibly paused) time.
    pub struct PausedClock {
        base: i64,
        start: Instant,
    }

    impl PausedClock {
        pub fn new(base: i64) -> Self {
            Self {
                base,
                start: Instant::now(),
            }
        }
    }

    impl Clock for PausedClock {
        fn now(&self) -> i64 {
            self.base + self.start.elapsed().as_secs() as i64
        }
    }

    enum RefreshOutcome {
        Renew { clock: Arc<dyn Clock>, lifetime_secs: i64 },
        Fail(RefreshError),
    }

    /// Refresh endpoint stand-in that counts exchanges and can hold them open.
    pub struct ScriptedAuthApi {
        outcome: RefreshOutcome,
        gate: Option<Notify>,
        calls: AtomicUsize,
    }

    impl ScriptedAuthApi {
        /// Issues credentials valid for `lifetime_secs` from the clock's now.
        pub fn renewing(clock: Arc<dyn Clock>, lifetime_secs: i64) -> Self {
            Self {
                outcome: RefreshOutcome::Renew {
                    clock,
                    lifetime_secs,
                },
                gate: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(error: RefreshError) -> Self {
            Self {
                outcome: RefreshOutcome::Fail(error),
                gate: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Exchanges block until `open_gate` is called.
        pub fn gated(mut self) -> Self {
            self.gate = Some(Notify::new());
            self
        }

        pub fn open_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.notify_one();
            }
        }

        pub fn refresh_calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthApi for ScriptedAuthApi {
        async fn register(&self, _request: &RegisterRequest) -> AppResult<()> {
            Err(AppError::InternalError("register not scripted".to_string()))
        }

        async fn login(&self, _username: &str, _password: &SecretString) -> AppResult<TokenResponse> {
            Err(AppError::InternalError("login not scripted".to_string()))
        }

        async fn refresh(&self, _credential: &str) -> Result<String, RefreshError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            match &self.outcome {
                RefreshOutcome::Renew {
                    clock,
                    lifetime_secs,
                } => Ok(mint_token(&Claims::new(
                    7,
                    "johndoe",
                    Role::Student,
                    clock.now() + lifetime_secs,
                ))),
                RefreshOutcome::Fail(error) => Err(error.clone()),
            }
        }

        async fn verify(&self, _credential: &str) -> AppResult<String> {
            Err(AppError::InternalError("verify not scripted".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    use crate::models::domain::question::QuestionType;

    #[test]
    fn test_single_question_fixture() {
        let question = single_question(3, 4, 2);
        assert_eq!(question.choices.len(), 4);
        assert_eq!(question.question_type(), QuestionType::Single);
        assert_eq!(question.correct_positions().into_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_multi_question_fixture() {
        let question = multi_question(5, 5, &[0, 3]);
        assert_eq!(question.question_type(), QuestionType::Multi);
        assert_eq!(
            question.correct_positions().into_iter().collect::<Vec<_>>(),
            vec![0, 3]
        );
    }

    #[test]
    fn test_encode_payload_has_three_segments() {
        let token = encode_payload(&serde_json::json!({ "id": 1 }));
        assert_eq!(token.split('.').count(), 3);
    }
}
