//! # API Definition Module
//!
//! Parses the declarative API definition (JSON or YAML) and turns it into
//! the route metadata consumed by the [`Router`](crate::router::Router).
//!
//! - `types`: serde model of the definition (`metadata`, endpoints, processors)
//! - `load`: file loading and schema-file resolution under a schema root
//! - `build`: [`build_routes`], which validates the definition against an
//!   [`Implementation`](crate::dispatcher::Implementation) and binds operations
//!
//! ```rust,ignore
//! let definition = saratoga::spec::load_definition("api.yaml")?;
//! let routes = saratoga::spec::build_routes(&implementation, &definition, &service, root)?;
//! ```

mod build;
mod load;
mod types;

pub use build::*;
pub use load::*;
pub use types::*;
