//! Bearer-token resolution.
//!
//! The marketplace auth service owns registration and login; this service
//! only needs to turn a token into the caller's identity. Tokens are HS256
//! JWTs whose `sub` points at an entry of the shared users document.

use crate::error::AppError;
use crate::storage::JsonDocument;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Same lifetime the auth service gives its access tokens
const TOKEN_TTL_DAYS: i64 = 7;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Chat identity (the account email)
    pub identity: String,
    pub display_name: String,
    /// "farmer" or "consumer"
    pub role: String,
}

/// Maps a bearer token to a user, or `None` if the token is not acceptable.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<AuthUser>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub role: String,
    pub exp: i64,
}

/// Entry of the users document. Extra profile fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

/// Verifies HS256 tokens and looks the subject up in the users document.
pub struct JwtUserDirectory {
    users: JsonDocument<Vec<UserRecord>>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtUserDirectory {
    pub fn new(users_file: impl Into<PathBuf>, secret: &str) -> Self {
        Self {
            users: JsonDocument::new(users_file),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Mint an access token for a user of the directory.
    pub fn issue_token(&self, user_id: &str, email: &str, role: &str) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "failed to sign token");
            AppError::Internal
        })
    }

    fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                None
            }
        }
    }
}

#[async_trait]
impl TokenResolver for JwtUserDirectory {
    async fn resolve(&self, token: &str) -> Option<AuthUser> {
        let claims = self.verify(token)?;

        let users = match self.users.load().await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = %e, "failed to load users document");
                return None;
            }
        };

        let user = users.into_iter().find(|u| u.id == claims.sub)?;
        Some(AuthUser {
            identity: user.email,
            display_name: user.name,
            role: user.role,
        })
    }
}
