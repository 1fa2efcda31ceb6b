//! Request and response values exchanged with a listener.
//!
//! Binding a socket is left to the embedding application: it converts its
//! request into an [`ApiRequest`] (directly or via `http::Request<Vec<u8>>`),
//! awaits [`Api::handle`](crate::dispatcher::Api::handle) and writes the
//! returned [`ApiResponse`] once.

pub mod request;
pub mod response;

pub use request::{form_pairs_to_params, ApiRequest, TestRequest};
pub use response::ApiResponse;
