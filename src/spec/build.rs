use super::load::resolve_schema;
use super::types::{ApiDefinition, EndpointSpec, Processor, SchemaSource, VersionId};
use crate::dispatcher::{Implementation, Operation, VersionHandler};
use crate::error::DefinitionError;
use crate::service::ServiceContext;
use crate::validator::SchemaValidator;
use http::Method;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// How a route is addressed.
#[derive(Debug, Clone)]
pub enum RouteKey {
    /// Exact request path, e.g. `/v1/example`.
    Literal(String),
    /// `^v1/{pattern}$`, matched against the path without its leading `/`.
    Pattern(Regex),
}

/// Everything the dispatcher needs for one (version, verb, endpoint).
#[derive(Clone)]
pub struct RouteMeta {
    pub method: Method,
    pub key: RouteKey,
    pub version: VersionId,
    pub endpoint: Arc<str>,
    pub requires_auth: bool,
    pub processor: Arc<Processor>,
    /// `{func}_{VERB}`
    pub operation_name: Arc<str>,
    pub operation: Operation,
    pub request_validator: Option<SchemaValidator>,
    pub response_validator: Option<SchemaValidator>,
}

impl fmt::Debug for RouteMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMeta")
            .field("method", &self.method)
            .field("key", &self.key)
            .field("version", &self.version)
            .field("endpoint", &self.endpoint)
            .field("requires_auth", &self.requires_auth)
            .field("operation_name", &self.operation_name)
            .field("request_validator", &self.request_validator.is_some())
            .field("response_validator", &self.response_validator.is_some())
            .finish_non_exhaustive()
    }
}

fn compile_schema(
    root: &Path,
    endpoint: &EndpointSpec,
    source: Option<&SchemaSource>,
) -> Result<Option<SchemaValidator>, DefinitionError> {
    let Some(source) = source else {
        return Ok(None);
    };
    let document = resolve_schema(root, source)?;
    SchemaValidator::compile(&document)
        .map(Some)
        .map_err(|reason| DefinitionError::SchemaCompile {
            endpoint: endpoint.endpoint.clone(),
            reason,
        })
}

fn route_key(version: &VersionId, endpoint: &EndpointSpec) -> Result<RouteKey, DefinitionError> {
    if !endpoint.is_dynamic() {
        return Ok(RouteKey::Literal(format!(
            "/{}/{}",
            version.prefix(),
            endpoint.endpoint
        )));
    }
    let pattern = format!("^{}/{}$", version.prefix(), endpoint.endpoint);
    Regex::new(&pattern)
        .map(RouteKey::Pattern)
        .map_err(|e| DefinitionError::InvalidPattern {
            endpoint: endpoint.endpoint.clone(),
            reason: e.to_string(),
        })
}

/// Walk the definition and bind every (version, verb, endpoint) to its operation.
///
/// Routes come back in declaration order; pattern routes rely on it.
///
/// # Errors
///
/// Any [`DefinitionError`]: missing metadata, an undeclared or unimplemented
/// version, a missing operation, a bad pattern, or a schema that cannot be
/// loaded or compiled.
pub fn build_routes(
    implementation: &Implementation,
    definition: &ApiDefinition,
    service: &Arc<ServiceContext>,
    schema_root: &Path,
) -> Result<Vec<RouteMeta>, DefinitionError> {
    let metadata = definition
        .metadata
        .as_ref()
        .ok_or(DefinitionError::MissingMetadata)?;

    let mut handlers: HashMap<&VersionId, Arc<dyn VersionHandler>> = HashMap::new();
    for version in &metadata.versions {
        let handler = implementation
            .instantiate(version, service)
            .ok_or_else(|| DefinitionError::MissingVersion(version.to_string()))?;
        handlers.insert(version, handler);
    }

    let mut routes = Vec::new();
    for endpoint in &definition.endpoints {
        let endpoint_name: Arc<str> = Arc::from(endpoint.endpoint.as_str());
        for (method, processors) in endpoint.processors() {
            let operation_name: Arc<str> = Arc::from(endpoint.operation_name(&method).as_str());
            for processor in processors {
                let request_validator =
                    compile_schema(schema_root, endpoint, processor.request_schema.as_ref())?;
                let response_validator =
                    compile_schema(schema_root, endpoint, processor.response_schema.as_ref())?;
                let shared = Arc::new(processor.clone());

                for version in &processor.versions {
                    let handler =
                        handlers
                            .get(version)
                            .ok_or_else(|| DefinitionError::VersionMismatch {
                                version: version.to_string(),
                                endpoint: endpoint.endpoint.clone(),
                            })?;
                    let operation = handler.operation(&operation_name).ok_or_else(|| {
                        DefinitionError::MissingProcessor {
                            verb: method.to_string(),
                            version: version.to_string(),
                            endpoint: endpoint.endpoint.clone(),
                        }
                    })?;

                    let key = route_key(version, endpoint)?;
                    debug!(
                        method = %method,
                        version = %version,
                        endpoint = %endpoint.endpoint,
                        operation = %operation_name,
                        "Route bound"
                    );
                    routes.push(RouteMeta {
                        method: method.clone(),
                        key,
                        version: version.clone(),
                        endpoint: Arc::clone(&endpoint_name),
                        requires_auth: endpoint.requires_authentication,
                        processor: Arc::clone(&shared),
                        operation_name: Arc::clone(&operation_name),
                        operation,
                        request_validator: request_validator.clone(),
                        response_validator: response_validator.clone(),
                    });
                }
            }
        }
    }

    info!(
        versions = metadata.versions.len(),
        endpoints = definition.endpoints.len(),
        routes_count = routes.len(),
        "Endpoint table built"
    );
    Ok(routes)
}
