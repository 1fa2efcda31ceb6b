//! # Security Module
//!
//! Authentication for endpoints declared with `requiresAuthentication`.
//!
//! ## Overview
//!
//! The service object may carry an [`Authenticator`]. When a route requires
//! authentication the dispatcher calls [`authenticate`], which reads the
//! `Authorization` header, decodes it into [`Credentials`] and delegates the
//! actual check to the authenticator. A successful check yields the canonical
//! identity string that is injected into the handler parameters.
//!
//! ## Schemes
//!
//! | header                                        | check                                  |
//! |-----------------------------------------------|----------------------------------------|
//! | `Basic base64(user:pass)`                     | `auth_username_and_password`           |
//! | `HMAC-SHA256 base64(keyId:hexdigest)`         | `auth_hmac` over the raw request body  |
//! | `Signature keyId=..,algorithm=..,headers=..`  | `auth_hmac` over the signing string    |
//!
//! Scheme names are case-insensitive. MAC algorithms must appear in the
//! definition's `allowedHmacTypes` (default `sha256`, `sha512`).
//!
//! ## Failures
//!
//! - no header: `AuthenticationRequired("Authentication required.")` (401)
//! - anything else: `AuthenticationFailed(..)` (403)
//!
//! ```rust
//! use saratoga::security::{DefaultAuthenticator, InMemorySharedSecretSource, UserDetails};
//! use std::sync::Arc;
//!
//! let users = InMemorySharedSecretSource::new(vec![
//!     UserDetails::new("bob", "pass").canonical("bob@bob.com"),
//! ]);
//! let auth = DefaultAuthenticator::new(Arc::new(users));
//! ```

mod credentials;
mod default;
pub mod mac;

pub use credentials::{signing_string, Credentials};
pub use default::{DefaultAuthenticator, InMemorySharedSecretSource, SharedSecretSource, UserDetails};

use crate::error::ApiError;
use crate::server::ApiRequest;
use async_trait::async_trait;
use tracing::debug;

/// Verifies credentials and returns the caller's canonical identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// # Errors
    ///
    /// `AuthenticationFailed` when the pair is not valid.
    async fn auth_username_and_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, ApiError>;

    /// Check `digest` = HMAC-`algorithm`(secret of `key_id`, `message`).
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` on mismatch. The default rejects every MAC.
    async fn auth_hmac(
        &self,
        key_id: &str,
        algorithm: &str,
        message: &[u8],
        digest: &[u8],
    ) -> Result<String, ApiError> {
        let _ = (key_id, algorithm, message, digest);
        Err(ApiError::authentication_failed(
            "HMAC authentication is not supported.",
        ))
    }
}

/// Authenticate `request` with `auth`.
///
/// # Errors
///
/// `AuthenticationRequired` without an `Authorization` header, otherwise
/// whatever the credential parser or the authenticator reports.
pub async fn authenticate(
    auth: &dyn Authenticator,
    request: &ApiRequest,
    allowed_hmac: &[String],
) -> Result<String, ApiError> {
    let header = request
        .header(http::header::AUTHORIZATION.as_str())
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| ApiError::authentication_required("Authentication required."))?;

    match Credentials::parse(header, allowed_hmac)? {
        Credentials::Basic { username, password } => {
            debug!(scheme = "basic", username = %username, "Authenticating request");
            auth.auth_username_and_password(&username, &password).await
        }
        Credentials::Hmac {
            key_id,
            algorithm,
            digest,
        } => {
            debug!(scheme = "hmac", key_id = %key_id, algorithm = %algorithm, "Authenticating request");
            auth.auth_hmac(&key_id, &algorithm, &request.body, &digest)
                .await
        }
        Credentials::Signature {
            key_id,
            algorithm,
            headers,
            signature,
        } => {
            debug!(scheme = "signature", key_id = %key_id, headers = ?headers, "Authenticating request");
            let message = signing_string(request, &headers)?;
            auth.auth_hmac(&key_id, &algorithm, message.as_bytes(), &signature)
                .await
        }
    }
}
