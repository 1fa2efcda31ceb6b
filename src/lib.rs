//! # Saratoga
//!
//! **Saratoga** is an HTTP API dispatch engine driven by a declarative API
//! definition (JSON or YAML). It builds a routing table once, then turns each
//! request into exactly one JSend-enveloped response.
//!
//! ## Architecture
//!
//! - **[`spec`]** - definition types, loading, and the routing table builder
//! - **[`router`]** - literal and pattern route resolution
//! - **[`dispatcher`]** - handler registry and the request pipeline
//! - **[`params`]** - legacy parameter and response-shape checks
//! - **[`validator`]** - JSON Schema validation of requests and results
//! - **[`security`]** - Basic, HMAC and Signature authentication
//! - **[`output`]** - JSend rendering and content negotiation
//! - **[`server`]** - in-memory request and response types
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Api as Api::handle
//!     participant Out as OutputRegistry
//!     participant Router
//!     participant Checks as params + validator
//!     participant Auth as Authenticator
//!     participant Handler
//!
//!     Client->>Api: ApiRequest
//!     Api->>Out: negotiate(Accept)
//!     alt no acceptable format
//!         Api-->>Client: 406 text/plain
//!     end
//!     Api->>Router: route(method, path)
//!     Api->>Checks: request lists + requestSchema
//!     opt requiresAuthentication
//!         Api->>Auth: Authorization header
//!     end
//!     Api->>Handler: HandlerCall
//!     Handler-->>Api: Result<Value, ApiError>
//!     Api->>Checks: response lists + format + responseSchema
//!     Api->>Out: render envelope
//!     Api-->>Client: ApiResponse
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use saratoga::{Api, Implementation, RuntimeConfig, TestRequest, VersionImpl};
//! use saratoga::spec::definition_from_json;
//! use serde_json::json;
//!
//! let definition = definition_from_json(r#"{
//!     "metadata": {"versions": [1]},
//!     "endpoints": [{"endpoint": "example", "getProcessors": [{"versions": [1]}]}]
//! }"#).unwrap();
//!
//! let implementation = Implementation::new().version("1", || {
//!     VersionImpl::new().on_sync("example_GET", |_call| Ok(json!({})))
//! });
//!
//! let api = Api::builder(implementation, definition)
//!     .config(RuntimeConfig::default())
//!     .build()
//!     .unwrap();
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let response = api.test(TestRequest::new("/v1/example")).await;
//! assert_eq!(response.status, 200);
//! assert_eq!(response.text(), r#"{"status":"success","data":{}}"#);
//! # });
//! ```
//!
//! ## Logging
//!
//! The engine emits `tracing` events inside a per-request span carrying the
//! request id. Call [`logging::init_logging`] to install the stock subscriber.

pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod output;
pub mod params;
pub mod router;
pub mod runtime_config;
pub mod security;
pub mod server;
pub mod service;
pub mod spec;
pub mod validator;

pub use dispatcher::{Api, ApiBuilder, HandlerCall, HandlerResult, Implementation, VersionImpl};
pub use error::{ApiError, DefinitionError, ErrorKind};
pub use output::OutputRegistry;
pub use runtime_config::RuntimeConfig;
pub use server::{ApiRequest, ApiResponse, TestRequest};
pub use service::ServiceContext;
