use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    errors::{AppError, AppResult},
    models::dto::response::ApiErrorBody,
};

/// Maps a status code and server message onto an application error
pub fn error_for_status(status: StatusCode, detail: String) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(detail),
        StatusCode::FORBIDDEN => AppError::Forbidden(detail),
        StatusCode::NOT_FOUND => AppError::NotFound(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            AppError::ValidationError(detail)
        }
        _ => AppError::InternalError(format!("Server responded {}: {}", status, detail)),
    }
}

/// Consumes a non-success response into an error, preferring the server's `detail`
pub async fn error_from_response(response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.detail)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });
    error_for_status(status, detail)
}

/// Deserializes a success body, or turns the response into an error
pub async fn json_or_error<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    Ok(response.json::<T>().await?)
}

/// Discards a success body, or turns the response into an error
pub async fn empty_or_error(response: Response) -> AppResult<()> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    Ok(())
}
