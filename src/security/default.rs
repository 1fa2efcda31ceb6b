use super::{mac, Authenticator};
use crate::error::ApiError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::debug;

/// A user record held by a [`SharedSecretSource`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub username: String,
    /// Basic-auth password and MAC key.
    pub password: String,
    #[serde(default)]
    pub canonical_username: Option<String>,
}

impl UserDetails {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            canonical_username: None,
        }
    }

    #[must_use]
    pub fn canonical(mut self, canonical: impl Into<String>) -> Self {
        self.canonical_username = Some(canonical.into());
        self
    }

    /// Identity reported to handlers.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.canonical_username.as_deref().unwrap_or(&self.username)
    }
}

/// Lookup of user records by username or key id.
#[async_trait]
pub trait SharedSecretSource: Send + Sync {
    /// # Errors
    ///
    /// `AuthenticationFailed` when the user is unknown.
    async fn user_details(&self, username: &str) -> Result<UserDetails, ApiError>;
}

/// Fixed list of users, for tests and small deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemorySharedSecretSource {
    users: Vec<UserDetails>,
}

impl InMemorySharedSecretSource {
    pub fn new(users: Vec<UserDetails>) -> Self {
        Self { users }
    }

    /// Load records from a JSON array of
    /// `{"username", "password", "canonicalUsername"?}` objects.
    ///
    /// # Errors
    ///
    /// The value is not such an array.
    pub fn from_json(users: serde_json::Value) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_value(users)?))
    }
}

#[async_trait]
impl SharedSecretSource for InMemorySharedSecretSource {
    async fn user_details(&self, username: &str) -> Result<UserDetails, ApiError> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| ApiError::authentication_failed("Authentication failed."))
    }
}

/// Verifies credentials against a [`SharedSecretSource`].
#[derive(Clone, Default)]
pub struct DefaultAuthenticator {
    source: Option<Arc<dyn SharedSecretSource>>,
}

impl DefaultAuthenticator {
    pub fn new(source: Arc<dyn SharedSecretSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// An authenticator with nothing behind it; every attempt fails.
    #[must_use]
    pub fn without_source() -> Self {
        Self::default()
    }

    async fn details(&self, username: &str) -> Result<UserDetails, ApiError> {
        match &self.source {
            Some(source) => source.user_details(username).await,
            None => Err(ApiError::authentication_failed("No Authentication Backend")),
        }
    }
}

#[async_trait]
impl Authenticator for DefaultAuthenticator {
    async fn auth_username_and_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, ApiError> {
        let user = self.details(username).await?;
        let password_ok: bool = user.password.as_bytes().ct_eq(password.as_bytes()).into();
        if user.username == username && password_ok {
            debug!(username = %username, "Password authentication succeeded");
            Ok(user.identity().to_string())
        } else {
            Err(ApiError::authentication_failed("Authentication failed."))
        }
    }

    async fn auth_hmac(
        &self,
        key_id: &str,
        algorithm: &str,
        message: &[u8],
        digest: &[u8],
    ) -> Result<String, ApiError> {
        let user = self.details(key_id).await?;
        mac::verify(algorithm, user.password.as_bytes(), message, digest)?;
        debug!(key_id = %key_id, algorithm = %algorithm, "HMAC authentication succeeded");
        Ok(user.identity().to_string())
    }
}
