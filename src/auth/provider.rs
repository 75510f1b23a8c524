//! Identity Providers
//!
//! Defines the provider trait and implementations for verifying bearer tokens.

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{Identity, IdentityError};

/// Default Google token introspection endpoint
pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Identity provider trait
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the identity it was issued for
    async fn verify(&self, token: &str) -> Result<Identity, IdentityError>;
}

/// Verifies ID tokens against a tokeninfo endpoint
pub struct TokenInfoProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl TokenInfoProvider {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for TokenInfoProvider {
    async fn verify(&self, token: &str) -> Result<Identity, IdentityError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", token)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Identity provider rejected token");
            return Err(IdentityError::Rejected(status.as_u16()));
        }

        let body = response.bytes().await?;
        let identity: Identity = serde_json::from_slice(&body)?;

        tracing::debug!(user_id = %identity.id, email = %identity.email, "Token verified");
        Ok(identity)
    }
}

/// Trusts the token itself as the subject id.
///
/// Only for development setups where authentication is disabled, and tests.
#[derive(Default)]
pub struct StaticIdentityProvider;

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Identity, IdentityError> {
        if token.is_empty() {
            return Err(IdentityError::MissingToken);
        }

        Ok(Identity {
            id: token.to_string(),
            email: format!("{}@localhost", token),
            name: Some(token.to_string()),
            picture: None,
        })
    }
}
