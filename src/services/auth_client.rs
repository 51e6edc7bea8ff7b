use async_trait::async_trait;
use log::{debug, info};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    config::Config,
    errors::{AppResult, RefreshError},
    models::dto::{
        request::RegisterRequest,
        response::{TokenResponse, VerifyTokenResponse},
    },
    services::http_helpers::{empty_or_error, json_or_error},
};

/// Credential exchanges the session needs from the server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Creates an account. Does not sign in.
    async fn register(&self, request: &RegisterRequest) -> AppResult<()>;

    /// Password grant. Returns the issued tokens.
    async fn login(&self, username: &str, password: &SecretString) -> AppResult<TokenResponse>;

    /// Swaps the current credential for a fresh one.
    async fn refresh(&self, credential: &str) -> Result<String, RefreshError>;

    /// Asks the server to vouch for the credential. Returns the credential the
    /// server confirmed, to be decoded by the caller.
    async fn verify(&self, credential: &str) -> AppResult<String>;
}

pub struct HttpAuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AuthApi for HttpAuthClient {
    async fn register(&self, request: &RegisterRequest) -> AppResult<()> {
        let response = self
            .http
            .post(self.url("/register"))
            .json(request)
            .send()
            .await?;

        empty_or_error(response).await?;
        info!("Registered {} as {}", request.username, request.role);
        Ok(())
    }

    async fn login(&self, username: &str, password: &SecretString) -> AppResult<TokenResponse> {
        let response = self
            .http
            .post(self.url("/token"))
            .form(&[
                ("username", username),
                ("password", password.expose_secret()),
            ])
            .send()
            .await?;

        let tokens = json_or_error::<TokenResponse>(response).await?;
        info!("Logged in as {}", username);
        Ok(tokens)
    }

    async fn refresh(&self, credential: &str) -> Result<String, RefreshError> {
        let response = self
            .http
            .post(self.url("/refresh-token"))
            .bearer_auth(credential)
            .send()
            .await?
            .error_for_status()?;

        let tokens = response.json::<TokenResponse>().await?;
        if tokens.access_token.is_empty() {
            return Err(RefreshError::InvalidResponse(
                "empty access token".to_string(),
            ));
        }
        debug!("Refresh exchange returned a new credential");
        Ok(tokens.access_token)
    }

    async fn verify(&self, credential: &str) -> AppResult<String> {
        let response = self
            .http
            .get(self.url(&format!("/verify-token/{}", credential)))
            .bearer_auth(credential)
            .send()
            .await?;

        let verified = json_or_error::<VerifyTokenResponse>(response).await?;
        debug!("Server verified credential: {}", verified.message);
        Ok(verified.access_token)
    }
}
