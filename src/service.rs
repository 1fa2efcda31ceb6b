//! Shared service object handed to version factories and handlers.
//!
//! The engine only ever reads the `auth` capability. Everything else an
//! application needs at request time (database pools, clients, counters)
//! lives in the typed extensions map and is fetched with [`ServiceContext::get`].

use crate::security::Authenticator;
use std::fmt;
use std::sync::Arc;

#[derive(Default)]
pub struct ServiceContext {
    auth: Option<Arc<dyn Authenticator>>,
    extensions: http::Extensions,
}

impl ServiceContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the authenticator used for endpoints requiring authentication.
    #[must_use]
    pub fn with_auth(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Store application state; one value per type.
    #[must_use]
    pub fn with<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    #[must_use]
    pub fn auth(&self) -> Option<&Arc<dyn Authenticator>> {
        self.auth.as_ref()
    }

    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}

impl fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("auth", &self.auth.is_some())
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
