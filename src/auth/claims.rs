use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload claims carried by the bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub exp: i64, // Expiration time (Unix seconds)
}

impl Claims {
    pub fn new(id: i64, username: &str, role: Role, exp: i64) -> Self {
        Self {
            id,
            username: username.to_string(),
            role,
            exp,
        }
    }
}

/// Read-only projection of the current credential's claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: i64,
    pub user_name: String,
    pub role: Role,
    pub expires_at: i64,
}

impl Identity {
    /// Seconds left before expiry, negative once expired.
    pub fn remaining_secs(&self, now: i64) -> i64 {
        self.expires_at - now
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.id,
            user_name: claims.username,
            role: claims.role,
            expires_at: claims.exp,
        }
    }
}
