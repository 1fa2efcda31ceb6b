//! # Output Module
//!
//! Content negotiation and response rendering.
//!
//! An [`OutputRegistry`] is an ordered list of `(media type, renderer)` pairs
//! plus an optional default. For each request the dispatcher asks it to
//! [`negotiate`](OutputRegistry::negotiate) the client's `Accept` header and
//! then [`render`](OutputRegistry::render)s the JSend envelope with the
//! chosen renderer.
//!
//! | header                      | result                                   |
//! |-----------------------------|------------------------------------------|
//! | absent                      | default (first registered if none)       |
//! | matches a registered type   | best by q, explicit match, default, order|
//! | matches nothing             | default; `None` (406) without a default  |

mod formats;
mod negotiate;

pub use formats::{debuggable_jsend_json, jsend_json, jsend_yaml, DEBUG_JSON, JSON, YAML};
pub use negotiate::{parse_accept, quality, select, MediaRange};

use crate::error::EnvelopeStatus;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Serialise a JSend envelope `{status, data}`.
pub type Renderer = Arc<dyn Fn(EnvelopeStatus, &Value) -> anyhow::Result<Vec<u8>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct OutputRegistry {
    order: Vec<String>,
    renderers: HashMap<String, Renderer>,
    default: Option<String>,
}

impl fmt::Debug for OutputRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputRegistry")
            .field("formats", &self.order)
            .field("default", &self.default)
            .finish()
    }
}

impl OutputRegistry {
    /// An empty registry with no default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compact JSON (default), debuggable JSON and YAML.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .register(JSON, jsend_json)
            .register(DEBUG_JSON, debuggable_jsend_json)
            .register(YAML, jsend_yaml)
            .set_default(JSON)
    }

    /// Add (or replace) a renderer. Registration order breaks negotiation ties.
    #[must_use]
    pub fn register<F>(mut self, media_type: impl Into<String>, renderer: F) -> Self
    where
        F: Fn(EnvelopeStatus, &Value) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static,
    {
        let media_type = media_type.into().to_ascii_lowercase();
        if !self.renderers.contains_key(&media_type) {
            self.order.push(media_type.clone());
        }
        self.renderers.insert(media_type, Arc::new(renderer));
        self
    }

    /// Set the default format. It should also be registered.
    #[must_use]
    pub fn set_default(mut self, media_type: impl Into<String>) -> Self {
        self.default = Some(media_type.into().to_ascii_lowercase());
        self
    }

    #[must_use]
    pub fn default_format(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Registered media types in registration order.
    #[must_use]
    pub fn formats(&self) -> &[String] {
        &self.order
    }

    /// Choose a media type for an `Accept` header.
    ///
    /// `None` means nothing acceptable is registered and there is no default
    /// to fall back to; the caller answers 406.
    #[must_use]
    pub fn negotiate(&self, accept: Option<&str>) -> Option<String> {
        let accept = accept.map(str::trim).filter(|a| !a.is_empty());
        let chosen = match accept {
            None => self
                .default
                .clone()
                .or_else(|| self.order.first().cloned()),
            Some(header) => select(header, &self.order, self.default.as_deref())
                .map(str::to_string)
                .or_else(|| self.default.clone()),
        };
        debug!(accept = ?accept, chosen = ?chosen, "Output format negotiated");
        chosen.filter(|media| self.renderers.contains_key(media))
    }

    /// Render an envelope with the renderer registered for `media_type`.
    ///
    /// # Errors
    ///
    /// Unknown media type or a renderer failure.
    pub fn render(
        &self,
        media_type: &str,
        status: EnvelopeStatus,
        data: &Value,
    ) -> anyhow::Result<Vec<u8>> {
        let renderer = self
            .renderers
            .get(media_type)
            .ok_or_else(|| anyhow::anyhow!("no renderer registered for {media_type}"))?;
        renderer(status, data)
    }

    /// Plain-text body for a 406 response.
    #[must_use]
    pub fn not_acceptable_body(&self) -> String {
        format!(
            "Not Acceptable. Available formats: {}",
            self.order.join(", ")
        )
    }
}
