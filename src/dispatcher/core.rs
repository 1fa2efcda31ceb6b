//! Dispatcher core module - the per-request pipeline.
//!
//! Stages run in a fixed order and the first failure short-circuits to the
//! error renderer:
//!
//! 1. negotiate the output format (the only exit without an envelope: 406)
//! 2. resolve the route
//! 3. extract parameters
//! 4. check request parameter lists and the request schema
//! 5. authenticate, when the endpoint requires it
//! 6. invoke the operation
//! 7. check the response lists, format and schema
//! 8. render the success envelope

use super::handler::{HandlerCall, Implementation};
use super::LEGACY_USER_KEY;
use crate::error::{ApiError, DefinitionError, EnvelopeStatus, INTERNAL_ERROR_MESSAGE};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::output::OutputRegistry;
use crate::params::{check_request_params, check_response};
use crate::router::{RouteMatch, Router};
use crate::runtime_config::{AuthInjection, RuntimeConfig};
use crate::security;
use crate::security::mac::SUPPORTED_ALGORITHMS;
use crate::server::{ApiRequest, ApiResponse, TestRequest};
use crate::service::ServiceContext;
use crate::spec::{build_routes, ApiDefinition, DEFAULT_HMAC_TYPES};
use crate::validator::join_messages;
use futures::FutureExt;
use http::header::{HeaderName, HeaderValue, ACCEPT, SERVER};
use serde_json::{json, Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// `Server` header value: crate name and version.
pub const SERVER_HEADER: &str = concat!("saratoga/", env!("CARGO_PKG_VERSION"));

const NO_AUTHENTICATOR: &str = "Authentication required, but there is not an available authenticator.";

/// Builder for [`Api`].
pub struct ApiBuilder {
    implementation: Implementation,
    definition: ApiDefinition,
    service: Option<Arc<ServiceContext>>,
    outputs: Option<OutputRegistry>,
    config: Option<RuntimeConfig>,
}

impl ApiBuilder {
    /// Shared service object; defaults to an empty [`ServiceContext`].
    #[must_use]
    pub fn service(mut self, service: impl Into<Arc<ServiceContext>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Output formats; defaults to [`OutputRegistry::with_defaults`].
    #[must_use]
    pub fn outputs(mut self, outputs: OutputRegistry) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Runtime settings; defaults to [`RuntimeConfig::from_env`].
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate the definition against the implementation and build the table.
    ///
    /// # Errors
    ///
    /// See [`build_routes`].
    pub fn build(self) -> Result<Api, DefinitionError> {
        let service = self
            .service
            .unwrap_or_else(|| Arc::new(ServiceContext::new()));
        let config = self.config.unwrap_or_else(RuntimeConfig::from_env);
        let routes = build_routes(
            &self.implementation,
            &self.definition,
            &service,
            &config.schema_root,
        )?;

        let hmac_types: Vec<String> = self
            .definition
            .metadata
            .as_ref()
            .map(|m| m.hmac_types())
            .unwrap_or_else(|| DEFAULT_HMAC_TYPES.iter().map(|t| t.to_string()).collect());
        for hmac_type in &hmac_types {
            if !SUPPORTED_ALGORITHMS.contains(&hmac_type.as_str()) {
                warn!(hmac_type = %hmac_type, "allowedHmacTypes entry cannot be computed");
            }
        }
        let name = self.definition.metadata.as_ref().and_then(|m| m.name.clone());

        let api = Api {
            router: Arc::new(Router::new(routes)),
            outputs: Arc::new(self.outputs.unwrap_or_else(OutputRegistry::with_defaults)),
            service,
            config,
            hmac_types: hmac_types.into(),
        };
        info!(
            api = name.as_deref().unwrap_or("unnamed"),
            routes = api.router.len(),
            formats = ?api.outputs.formats(),
            auth_injection = ?api.config.auth_injection,
            "API ready"
        );
        Ok(api)
    }
}

/// The dispatch engine. Cheap to clone; every part is shared.
#[derive(Clone, Debug)]
pub struct Api {
    router: Arc<Router>,
    outputs: Arc<OutputRegistry>,
    service: Arc<ServiceContext>,
    config: RuntimeConfig,
    hmac_types: Arc<[String]>,
}

impl Api {
    pub fn builder(implementation: Implementation, definition: ApiDefinition) -> ApiBuilder {
        ApiBuilder {
            implementation,
            definition,
            service: None,
            outputs: None,
            config: None,
        }
    }

    /// Build with every default.
    ///
    /// # Errors
    ///
    /// See [`build_routes`].
    pub fn new(implementation: Implementation, definition: ApiDefinition) -> Result<Self, DefinitionError> {
        Self::builder(implementation, definition).build()
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn outputs(&self) -> &OutputRegistry {
        &self.outputs
    }

    #[must_use]
    pub fn service(&self) -> &Arc<ServiceContext> {
        &self.service
    }

    /// Drive one request through the pipeline. Always yields exactly one response.
    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let request_id = RequestId::from_header_or_new(request.header(REQUEST_ID_HEADER));
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %request.method,
            path = %request.path
        );
        self.dispatch(request, request_id).instrument(span).await
    }

    /// Run an in-memory request, e.g. from a test.
    pub async fn test(&self, request: TestRequest) -> ApiResponse {
        self.handle(request.into_request()).await
    }

    async fn dispatch(&self, request: ApiRequest, request_id: RequestId) -> ApiResponse {
        let started = Instant::now();

        let Some(format) = self.outputs.negotiate(request.header(ACCEPT.as_str())) else {
            warn!(
                accept = ?request.header(ACCEPT.as_str()),
                "No acceptable output format"
            );
            let response = ApiResponse::new(
                406,
                "text/plain; charset=utf-8",
                self.outputs.not_acceptable_body().into_bytes(),
            );
            return self.finish(response, request_id, started);
        };

        let response = match self.run(request).await {
            Ok(data) => self.render(&format, 200, EnvelopeStatus::Success, &data),
            Err(err) => self.render_error(&format, &err),
        };
        self.finish(response, request_id, started)
    }

    /// Stages 2 to 7.
    async fn run(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let RouteMatch { route, captures } = self
            .router
            .route(&request.method, &request.path)
            .ok_or_else(|| ApiError::not_found("Endpoint does not exist."))?;
        let processor = &route.processor;

        let mut params = request.params(processor.params_type);
        let legacy = self.config.auth_injection == AuthInjection::Legacy;
        if legacy && params.contains_key(LEGACY_USER_KEY) {
            return Err(ApiError::bad_request("Forbidden keyword."));
        }
        if !legacy && params.remove("auth").is_some() {
            debug!("Discarded client-supplied auth parameter");
        }

        check_request_params(&params, processor)?;
        if let Some(validator) = &route.request_validator {
            let issues = validator.validate(&Value::Object(params.clone()));
            if !issues.is_empty() {
                return Err(ApiError::bad_request(join_messages(&issues)));
            }
        }

        let identity = if route.requires_auth {
            let identity = self.authenticate(&request).await?;
            inject_identity(&mut params, &identity, self.config.auth_injection);
            Some(identity)
        } else {
            None
        };

        debug!(
            operation = %route.operation_name,
            version = %route.version,
            params = params.len(),
            "Invoking operation"
        );
        let call = HandlerCall {
            service: Arc::clone(&self.service),
            request: Arc::new(request),
            params,
            captures: captures.into_vec(),
            identity,
        };
        let operation = Arc::clone(&route.operation);
        // The operation is called inside the future so a panic while building
        // it is caught as well.
        let outcome = AssertUnwindSafe(async move { operation(call).await })
            .catch_unwind()
            .await;
        let data = match outcome {
            Ok(result) => result?,
            Err(panic) => {
                // H3: Handler panic caught
                let panic_message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                return Err(ApiError::api(format!(
                    "Handler {} panicked: {panic_message}",
                    route.operation_name
                )));
            }
        };

        if self.config.validate_responses {
            check_response(&data, processor)?;
            if let Some(validator) = &route.response_validator {
                let empty = json!({});
                let target = if data.is_null() { &empty } else { &data };
                let issues = validator.validate(target);
                if !issues.is_empty() {
                    return Err(ApiError::bad_response(join_messages(&issues)));
                }
            }
        }
        Ok(data)
    }

    async fn authenticate(&self, request: &ApiRequest) -> Result<String, ApiError> {
        let auth = self
            .service
            .auth()
            .ok_or_else(|| ApiError::api(NO_AUTHENTICATOR))?;
        let identity = security::authenticate(auth.as_ref(), request, &self.hmac_types).await?;
        debug!(identity = %identity, "Request authenticated");
        Ok(identity)
    }

    fn render(&self, format: &str, status: u16, envelope: EnvelopeStatus, data: &Value) -> ApiResponse {
        match self.outputs.render(format, envelope, data) {
            Ok(body) => ApiResponse::new(status, format, body),
            Err(e) => {
                error!(format = %format, error = %e, "Rendering failed");
                self.internal_error(format)
            }
        }
    }

    fn render_error(&self, format: &str, err: &ApiError) -> ApiResponse {
        if err.should_log() {
            if err.code() >= 500 {
                error!(kind = %err.kind(), status = err.code(), message = %err.message(), "Request failed");
            } else {
                warn!(kind = %err.kind(), status = err.code(), message = %err.message(), "Request failed");
            }
        } else {
            debug!(kind = %err.kind(), status = err.code(), message = %err.message(), "Request rejected");
        }
        let data = Value::String(err.public_message().to_string());
        self.render(format, err.code(), err.envelope_status(), &data)
    }

    /// Last resort when even the error envelope cannot be rendered.
    fn internal_error(&self, format: &str) -> ApiResponse {
        let data = Value::String(INTERNAL_ERROR_MESSAGE.to_string());
        match self.outputs.render(format, EnvelopeStatus::Error, &data) {
            Ok(body) => ApiResponse::new(500, format, body),
            Err(_) => ApiResponse::new(
                500,
                "text/plain; charset=utf-8",
                INTERNAL_ERROR_MESSAGE.as_bytes().to_vec(),
            ),
        }
    }

    fn finish(&self, mut response: ApiResponse, request_id: RequestId, started: Instant) -> ApiResponse {
        response
            .headers
            .insert(SERVER, HeaderValue::from_static(SERVER_HEADER));
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response
                .headers
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        info!(
            status = response.status,
            duration_us = started.elapsed().as_micros(),
            "Request completed"
        );
        response
    }
}

fn inject_identity(params: &mut Map<String, Value>, identity: &str, mode: AuthInjection) {
    match mode {
        AuthInjection::Structured => {
            params.insert("auth".to_string(), json!({ "username": identity }));
        }
        AuthInjection::Legacy => {
            params.insert(LEGACY_USER_KEY.to_string(), Value::String(identity.to_string()));
        }
    }
}
