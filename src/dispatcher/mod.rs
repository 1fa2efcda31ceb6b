//! # Dispatcher Module
//!
//! The dispatcher turns one [`ApiRequest`](crate::server::ApiRequest) into
//! exactly one [`ApiResponse`](crate::server::ApiResponse).
//!
//! ## Overview
//!
//! - [`Implementation`] maps each declared version to a factory producing a
//!   [`VersionHandler`]. Factories that take the shared
//!   [`ServiceContext`](crate::service::ServiceContext) are preferred over
//!   zero-argument ones.
//! - [`Api`] owns the routing table, output registry and service object and
//!   runs the request pipeline in [`Api::handle`].
//!
//! ## Handler Registration
//!
//! ```rust
//! use saratoga::dispatcher::{Api, Implementation, VersionImpl};
//! use saratoga::spec::definition_from_value;
//! use serde_json::json;
//!
//! let implementation = Implementation::new().version("1", || {
//!     VersionImpl::new().on_sync("example_GET", |_call| Ok(json!({})))
//! });
//! let definition = definition_from_value(json!({
//!     "metadata": {"versions": [1]},
//!     "endpoints": [{"endpoint": "example", "getProcessors": [{"versions": [1]}]}]
//! }))
//! .unwrap();
//! let api = Api::new(implementation, definition).unwrap();
//! ```
//!
//! ## Error Handling
//!
//! Every stage returns `Result<_, ApiError>`. The first failure is rendered
//! as a JSend envelope with the error's status code. Handler panics are
//! caught and answered with a 500.

mod core;
mod handler;

/// Parameter carrying the identity in legacy injection mode.
pub const LEGACY_USER_KEY: &str = "saratoga_user";

pub use core::{Api, ApiBuilder, SERVER_HEADER};
pub use handler::{
    HandlerCall, HandlerResult, Implementation, Operation, VersionHandler, VersionImpl,
};
