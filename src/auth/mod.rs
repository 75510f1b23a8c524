//! Authentication
//!
//! Bearer tokens are verified by an external identity provider before a
//! request reaches staging or the metadata store.

mod provider;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub use provider::{IdentityProvider, StaticIdentityProvider, TokenInfoProvider, GOOGLE_TOKENINFO_URL};

/// A verified caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Subject id, used as the user id
    #[serde(rename = "sub")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Identity errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Token rejected by identity provider (status {0})")]
    Rejected(u16),

    #[error("Identity provider unreachable: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Malformed identity: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Extract the token from an `Authorization` header.
///
/// Both `Bearer <token>` and a bare token are accepted.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();

    (!token.is_empty()).then_some(token)
}

/// Extractor for the authenticated caller
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(IdentityError::MissingToken)?;
        let identity = state.identity().verify(token).await?;
        Ok(Self(identity))
    }
}

impl Authenticated {
    /// Fail unless the caller is `user_id`
    pub fn ensure_user(&self, user_id: &str) -> Result<(), AppError> {
        if self.0.id == user_id {
            Ok(())
        } else {
            tracing::warn!(caller = %self.0.id, user_id = %user_id, "Caller acting for another user");
            Err(AppError::Forbidden(format!("not allowed to act for user {}", user_id)))
        }
    }
}
