//! # Router Module
//!
//! Resolves an inbound `(method, path)` pair to the [`RouteMeta`](crate::spec::RouteMeta)
//! bound at startup.
//!
//! ## Architecture
//!
//! 1. **Compilation**: [`build_routes`](crate::spec::build_routes) turns every
//!    `(version, verb, endpoint)` into either a literal key (`/v1/example`) or a
//!    compiled pattern (`^v1/user/(\d+)$`).
//! 2. **Matching**: literal keys are looked up first. On a miss, the patterns
//!    registered for the verb are tried against the path without its leading
//!    `/`, in declaration order. Capture groups become positional captures.
//!
//! The table is immutable once built and is shared between requests through
//! an `Arc` without locking.
//!
//! ```rust,ignore
//! let router = Router::new(routes);
//! if let Some(m) = router.route(&Method::GET, "/v1/user/42") {
//!     assert_eq!(m.captures[0], "42");
//! }
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{CaptureVec, RouteMatch, Router, MAX_INLINE_CAPTURES};
