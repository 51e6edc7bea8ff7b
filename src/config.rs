use std::{env, path::PathBuf, time::Duration};

use log::warn;
use secrecy::SecretString;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub credential_store_path: PathBuf,
    pub refresh_check_interval_secs: u64,
    pub refresh_margin_secs: i64,
    pub http_timeout_secs: u64,
    /// Shared HS256 secret. When set, credential signatures are verified locally.
    pub jwt_secret: Option<SecretString>,
}

/// Timing knobs handed to the session manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    pub check_interval: Duration,
    pub refresh_margin_secs: i64,
}

impl SessionSettings {
    /// Keeps the check interval strictly below a positive margin.
    pub fn new(check_interval: Duration, refresh_margin_secs: i64) -> Self {
        let mut check_interval = if check_interval.is_zero() {
            Duration::from_secs(1)
        } else {
            check_interval
        };

        let margin = Duration::from_secs(refresh_margin_secs.max(0) as u64);
        if !margin.is_zero() && check_interval >= margin {
            let clamped = margin / 2;
            warn!(
                "Check interval {:?} does not fit in the {}s refresh margin, using {:?}",
                check_interval, refresh_margin_secs, clamped
            );
            check_interval = clamped;
        }

        Self {
            check_interval,
            refresh_margin_secs,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 60)
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            api_base_url: env::var("EXAM_API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            credential_store_path: env::var("CREDENTIAL_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".exam-guru/token")),
            refresh_check_interval_secs: env::var("REFRESH_CHECK_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(30),
            refresh_margin_secs: env::var("REFRESH_MARGIN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            jwt_secret: env::var("JWT_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .map(SecretString::from),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::new(
            Duration::from_secs(self.refresh_check_interval_secs),
            self.refresh_margin_secs,
        )
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            credential_store_path: PathBuf::from("target/test-token"),
            refresh_check_interval_secs: 30,
            refresh_margin_secs: 60,
            http_timeout_secs: 5,
            jwt_secret: Some(SecretString::from("test_jwt_secret_key".to_string())),
        }
    }
}
