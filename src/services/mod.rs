pub mod auth_client;
pub mod exam_client;
pub mod grading_service;
pub mod http_helpers;

pub use auth_client::{AuthApi, HttpAuthClient};
pub use exam_client::ExamClient;
pub use grading_service::GradingService;
