use super::types::{ApiDefinition, SchemaSource};
use crate::error::DefinitionError;
use anyhow::Context;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Load an API definition from a `.json`, `.yaml` or `.yml` file.
pub fn load_definition(file_path: impl AsRef<Path>) -> anyhow::Result<ApiDefinition> {
    let file_path = file_path.as_ref();
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("reading API definition {}", file_path.display()))?;
    let is_yaml = matches!(
        file_path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let definition = if is_yaml {
        definition_from_yaml(&content)?
    } else {
        definition_from_json(&content)?
    };
    debug!(
        path = %file_path.display(),
        endpoints = definition.endpoints.len(),
        "API definition loaded"
    );
    Ok(definition)
}

pub fn definition_from_json(content: &str) -> anyhow::Result<ApiDefinition> {
    serde_json::from_str(content).context("parsing JSON API definition")
}

pub fn definition_from_yaml(content: &str) -> anyhow::Result<ApiDefinition> {
    serde_yaml::from_str(content).context("parsing YAML API definition")
}

/// Build a definition from an in-memory JSON value.
pub fn definition_from_value(value: Value) -> anyhow::Result<ApiDefinition> {
    serde_json::from_value(value).context("decoding API definition")
}

/// Join `relative` onto `root`, refusing anything that could leave `root`.
fn confine(root: &Path, relative: &str) -> Result<PathBuf, DefinitionError> {
    let candidate = Path::new(relative);
    let escapes = candidate.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if relative.is_empty() || escapes {
        return Err(DefinitionError::SchemaPathRejected {
            path: relative.to_string(),
        });
    }
    Ok(root.join(candidate))
}

/// Turn a schema declaration into a schema document.
///
/// Inline schemas are returned as-is; paths are read relative to `root`.
pub fn resolve_schema(root: &Path, source: &SchemaSource) -> Result<Value, DefinitionError> {
    match source {
        SchemaSource::Inline(value) => Ok(value.clone()),
        SchemaSource::Path(relative) => {
            let full = confine(root, relative)?;
            let bytes = std::fs::read(&full).map_err(|e| DefinitionError::SchemaLoad {
                path: relative.clone(),
                reason: e.to_string(),
            })?;
            let value = serde_json::from_slice(&bytes).map_err(|e| DefinitionError::SchemaLoad {
                path: relative.clone(),
                reason: e.to_string(),
            })?;
            debug!(schema_path = %full.display(), "Schema file loaded");
            Ok(value)
        }
    }
}
