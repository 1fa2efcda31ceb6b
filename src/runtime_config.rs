//! # Runtime Configuration Module
//!
//! Environment-driven settings for the dispatch engine.
//!
//! ## Environment Variables
//!
//! ### `SARATOGA_AUTH_INJECTION`
//!
//! How the authenticated identity reaches handlers:
//! - `structured` (default): `params["auth"] = {"username": identity}`
//! - `legacy`: `params["saratoga_user"] = identity`. In this mode a client
//!   sending a `saratoga_user` parameter is rejected with "Forbidden keyword."
//!   on every endpoint.
//!
//! ### `SARATOGA_SCHEMA_ROOT`
//!
//! Directory that relative `requestSchema` / `responseSchema` paths are read
//! from. Default: the process working directory.
//!
//! ### `SARATOGA_VALIDATE_RESPONSES`
//!
//! `false` skips response-side checks (lists, format and `responseSchema`).
//! Default: `true`.
//!
//! ## Usage
//!
//! ```rust
//! use saratoga::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Schemas under {}", config.schema_root.display());
//! ```

use std::env;
use std::path::PathBuf;

/// Where the authenticated identity is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthInjection {
    #[default]
    Structured,
    Legacy,
}

impl AuthInjection {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "legacy" => AuthInjection::Legacy,
            _ => AuthInjection::Structured,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub auth_injection: AuthInjection,
    pub schema_root: PathBuf,
    pub validate_responses: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            auth_injection: AuthInjection::Structured,
            schema_root: PathBuf::from("."),
            validate_responses: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            auth_injection: lookup("SARATOGA_AUTH_INJECTION")
                .map_or(defaults.auth_injection, |v| AuthInjection::parse(&v)),
            schema_root: lookup("SARATOGA_SCHEMA_ROOT")
                .filter(|v| !v.trim().is_empty())
                .map_or(defaults.schema_root, PathBuf::from),
            validate_responses: lookup("SARATOGA_VALIDATE_RESPONSES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.validate_responses),
        }
    }

    #[must_use]
    pub fn legacy(mut self) -> Self {
        self.auth_injection = AuthInjection::Legacy;
        self
    }

    #[must_use]
    pub fn schema_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.schema_root = root.into();
        self
    }
}
