//! # Error Module
//!
//! Two error families live here:
//!
//! - [`ApiError`] is the per-request error. Every pipeline stage returns
//!   `Result<_, ApiError>` and the dispatcher converts the first failure into
//!   exactly one response.
//! - [`DefinitionError`] is raised while the routing table is being built and
//!   means the API cannot start.
//!
//! ## Status taxonomy
//!
//! | kind                       | code | envelope | logged |
//! |----------------------------|------|----------|--------|
//! | `Api`                      | 500  | error    | yes    |
//! | `NotFound`                 | 404  | error    | yes    |
//! | `BadRequestParams`         | 400  | fail     | no     |
//! | `BadResponseParams`        | 500  | error    | yes    |
//! | `AuthenticationRequired`   | 401  | fail     | no     |
//! | `AuthenticationFailed`     | 403  | fail     | no     |
//!
//! A 500 never leaks its message to the client; the body carries
//! [`INTERNAL_ERROR_MESSAGE`] and the original text goes to the log.

use std::fmt;
use thiserror::Error;

/// Body text used for every 500 response.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

/// Classification of a request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Generic server-side failure, including handler domain errors.
    Api,
    /// No route matched the request.
    NotFound,
    /// The client sent parameters the endpoint does not accept.
    BadRequestParams,
    /// The handler produced a result that breaks its declared contract.
    BadResponseParams,
    /// The endpoint needs credentials and none were supplied.
    AuthenticationRequired,
    /// Credentials were supplied but rejected.
    AuthenticationFailed,
}

impl ErrorKind {
    /// Default HTTP status for this kind.
    #[must_use]
    pub fn default_code(self) -> u16 {
        match self {
            ErrorKind::Api | ErrorKind::BadResponseParams => 500,
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequestParams => 400,
            ErrorKind::AuthenticationRequired => 401,
            ErrorKind::AuthenticationFailed => 403,
        }
    }

    /// Client-parameter errors are expected noise and are kept out of the log.
    #[must_use]
    pub fn is_client_params(self) -> bool {
        matches!(
            self,
            ErrorKind::BadRequestParams
                | ErrorKind::AuthenticationRequired
                | ErrorKind::AuthenticationFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Api => "APIError",
            ErrorKind::NotFound => "DoesNotExist",
            ErrorKind::BadRequestParams => "BadRequestParams",
            ErrorKind::BadResponseParams => "BadResponseParams",
            ErrorKind::AuthenticationRequired => "AuthenticationRequired",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
        };
        f.write_str(s)
    }
}

/// JSend envelope status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStatus {
    Success,
    Fail,
    Error,
}

impl EnvelopeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeStatus::Success => "success",
            EnvelopeStatus::Fail => "fail",
            EnvelopeStatus::Error => "error",
        }
    }
}

impl fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged request error: a kind, the HTTP status it maps to, and a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    code: u16,
    message: String,
}

impl ApiError {
    /// Create an error with the kind's default status.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.default_code(),
            message: message.into(),
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Api, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequestParams, message)
    }

    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadResponseParams, message)
    }

    pub fn authentication_required(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthenticationRequired, message)
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthenticationFailed, message)
    }

    /// Override the HTTP status, e.g. a handler answering 409 with a
    /// `BadRequestParams` error.
    #[must_use]
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Envelope status derived from the effective status code.
    #[must_use]
    pub fn envelope_status(&self) -> EnvelopeStatus {
        match self.code {
            404 => EnvelopeStatus::Error,
            400..=499 => EnvelopeStatus::Fail,
            _ => EnvelopeStatus::Error,
        }
    }

    /// Message that may be shown to the client. 5xx errors are replaced by
    /// [`INTERNAL_ERROR_MESSAGE`].
    #[must_use]
    pub fn public_message(&self) -> &str {
        if self.code >= 500 {
            INTERNAL_ERROR_MESSAGE
        } else {
            &self.message
        }
    }

    /// Whether the dispatcher must write this failure to the server log.
    #[must_use]
    pub fn should_log(&self) -> bool {
        !self.kind.is_client_params()
    }
}

/// Failures raised while turning an API definition into a routing table.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Definition requires a metadata section.")]
    MissingMetadata,

    #[error("Implementation is missing version {0}")]
    MissingVersion(String),

    #[error("Version mismatch - {version} in {endpoint} is not a declared version")]
    VersionMismatch { version: String, endpoint: String },

    #[error("Implementation is missing the {verb} processor in the v{version} {endpoint} endpoint")]
    MissingProcessor {
        verb: String,
        version: String,
        endpoint: String,
    },

    #[error("Invalid endpoint pattern '{endpoint}': {reason}")]
    InvalidPattern { endpoint: String, reason: String },

    #[error("Schema path '{path}' must be relative and stay inside the schema root")]
    SchemaPathRejected { path: String },

    #[error("Unable to load schema '{path}': {reason}")]
    SchemaLoad { path: String, reason: String },

    #[error("Schema for {endpoint} does not compile: {reason}")]
    SchemaCompile { endpoint: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_codes_follow_kind() {
        assert_eq!(ApiError::api("x").code(), 500);
        assert_eq!(ApiError::not_found("x").code(), 404);
        assert_eq!(ApiError::bad_request("x").code(), 400);
        assert_eq!(ApiError::bad_response("x").code(), 500);
        assert_eq!(ApiError::authentication_required("x").code(), 401);
        assert_eq!(ApiError::authentication_failed("x").code(), 403);
    }

    #[test]
    fn internal_errors_hide_their_message() {
        let err = ApiError::bad_response("Missing response parameters: 'cake'");
        assert_eq!(err.envelope_status(), EnvelopeStatus::Error);
        assert_eq!(err.public_message(), INTERNAL_ERROR_MESSAGE);
        assert!(err.should_log());
    }

    #[test]
    fn not_found_is_an_error_with_its_message() {
        let err = ApiError::not_found("Endpoint does not exist.");
        assert_eq!(err.envelope_status(), EnvelopeStatus::Error);
        assert_eq!(err.public_message(), "Endpoint does not exist.");
        assert!(err.should_log());
    }

    #[test]
    fn client_errors_fail_quietly() {
        for err in [
            ApiError::bad_request("nope"),
            ApiError::authentication_required("Authentication required."),
            ApiError::authentication_failed("Authentication failed."),
        ] {
            assert_eq!(err.envelope_status(), EnvelopeStatus::Fail);
            assert_eq!(err.public_message(), err.message());
            assert!(!err.should_log());
        }
    }

    #[test]
    fn code_override_moves_envelope_status() {
        let err = ApiError::api("teapot").with_code(418);
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.envelope_status(), EnvelopeStatus::Fail);
        assert_eq!(err.public_message(), "teapot");
    }

    #[test]
    fn definition_error_messages() {
        let err = DefinitionError::VersionMismatch {
            version: "2".into(),
            endpoint: "example".into(),
        };
        assert_eq!(
            err.to_string(),
            "Version mismatch - 2 in example is not a declared version"
        );
        let err = DefinitionError::MissingProcessor {
            verb: "GET".into(),
            version: "2".into(),
            endpoint: "example".into(),
        };
        assert_eq!(
            err.to_string(),
            "Implementation is missing the GET processor in the v2 example endpoint"
        );
    }
}
