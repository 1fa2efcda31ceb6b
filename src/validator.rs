//! # Schema Validator
//!
//! Request and response bodies are checked against JSON Schema documents
//! declared on a processor. Schemas are compiled once while the routing
//! table is built and shared by every request through an `Arc`, so the hot
//! path never compiles anything.
//!
//! Validation produces an ordered list of [`ValidationIssue`]s, sorted by the
//! instance path of the offending value. The dispatcher joins their messages
//! with `", "` to form the error text.

use jsonschema::Validator;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON pointer into the validated value (`""` for the root).
    pub location: String,
    /// Schema keyword that failed, e.g. `required` or `type`.
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Join issue messages in their (already sorted) order.
#[must_use]
pub fn join_messages(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A compiled schema, cheap to clone.
#[derive(Clone)]
pub struct SchemaValidator {
    schema: Arc<Value>,
    compiled: Arc<Validator>,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compile a schema document.
    ///
    /// # Errors
    ///
    /// Returns the compiler's message when the document is not a valid schema.
    pub fn compile(schema: &Value) -> Result<Self, String> {
        let compiled = jsonschema::options()
            .build(schema)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            schema: Arc::new(schema.clone()),
            compiled: Arc::new(compiled),
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validate `instance`, returning every violation sorted by location.
    #[must_use]
    pub fn validate(&self, instance: &Value) -> Vec<ValidationIssue> {
        let mut issues: Vec<ValidationIssue> = self
            .compiled
            .iter_errors(instance)
            .map(|err| {
                let schema_path = err.schema_path.to_string();
                let keyword = schema_path
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                ValidationIssue::new(err.instance_path.to_string(), keyword, err.to_string())
            })
            .collect();
        // Stable: issues on the same location keep the validator's order.
        issues.sort_by(|a, b| a.location.cmp(&b.location));
        issues
    }

    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.compiled.is_valid(instance)
    }
}
