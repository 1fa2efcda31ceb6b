//! Handler registry: version factories and named operations.
//!
//! An [`Implementation`] maps each declared version to a factory producing a
//! [`VersionHandler`]. A version handler exposes operations by name
//! (`{endpoint}_{VERB}`); the table builder resolves every operation once, so
//! the request path never looks anything up by string.

use crate::error::ApiError;
use crate::server::ApiRequest;
use crate::service::ServiceContext;
use crate::spec::VersionId;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Everything a handler receives for one request.
#[derive(Debug, Clone)]
pub struct HandlerCall {
    pub service: Arc<ServiceContext>,
    pub request: Arc<ApiRequest>,
    /// Decoded and validated parameters, plus the injected identity.
    pub params: Map<String, Value>,
    /// Positional captures of a pattern route, empty for literal routes.
    pub captures: Vec<String>,
    /// Set only once the authenticator accepted the request.
    pub identity: Option<String>,
}

impl HandlerCall {
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    #[must_use]
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }

    /// Identity established by the authenticator. Never read from params,
    /// so it is `None` on routes without `requiresAuthentication`.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

pub type HandlerResult = Result<Value, ApiError>;

/// A resolved operation. Sync and async handlers share this shape.
pub type Operation = Arc<dyn Fn(HandlerCall) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// One instance per declared version.
pub trait VersionHandler: Send + Sync {
    /// Look up an operation such as `example_GET`.
    fn operation(&self, name: &str) -> Option<Operation>;
}

/// Table-backed [`VersionHandler`] built from closures.
#[derive(Default, Clone)]
pub struct VersionImpl {
    operations: HashMap<String, Operation>,
}

impl VersionImpl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async operation.
    #[must_use]
    pub fn on<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(HandlerCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let op: Operation = Arc::new(move |call| handler(call).boxed());
        self.operations.insert(name.into(), op);
        self
    }

    /// Register a synchronous operation.
    #[must_use]
    pub fn on_sync<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(HandlerCall) -> HandlerResult + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let op: Operation = Arc::new(move |call| {
            let handler = Arc::clone(&handler);
            async move { handler(call) }.boxed()
        });
        self.operations.insert(name.into(), op);
        self
    }
}

impl VersionHandler for VersionImpl {
    fn operation(&self, name: &str) -> Option<Operation> {
        self.operations.get(name).cloned()
    }
}

type PlainFactory = Box<dyn Fn() -> Arc<dyn VersionHandler> + Send + Sync>;
type ServiceFactory = Box<dyn Fn(&Arc<ServiceContext>) -> Arc<dyn VersionHandler> + Send + Sync>;

/// Version id → handler factory.
#[derive(Default)]
pub struct Implementation {
    plain: HashMap<VersionId, PlainFactory>,
    with_service: HashMap<VersionId, ServiceFactory>,
}

impl Implementation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory that takes no arguments.
    #[must_use]
    pub fn version<H, F>(mut self, version: impl Into<VersionId>, factory: F) -> Self
    where
        H: VersionHandler + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.plain.insert(
            version.into(),
            Box::new(move || Arc::new(factory()) as Arc<dyn VersionHandler>),
        );
        self
    }

    /// Register a factory that receives the shared service object.
    #[must_use]
    pub fn version_with_service<H, F>(mut self, version: impl Into<VersionId>, factory: F) -> Self
    where
        H: VersionHandler + 'static,
        F: Fn(&Arc<ServiceContext>) -> H + Send + Sync + 'static,
    {
        self.with_service.insert(
            version.into(),
            Box::new(move |svc| Arc::new(factory(svc)) as Arc<dyn VersionHandler>),
        );
        self
    }

    /// Instantiate the handler for `version`, preferring the service-aware factory.
    #[must_use]
    pub fn instantiate(
        &self,
        version: &VersionId,
        service: &Arc<ServiceContext>,
    ) -> Option<Arc<dyn VersionHandler>> {
        if let Some(factory) = self.with_service.get(version) {
            return Some(factory(service));
        }
        self.plain.get(version).map(|factory| factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call() -> HandlerCall {
        HandlerCall {
            service: Arc::new(ServiceContext::new()),
            request: Arc::new(ApiRequest::default()),
            params: Map::new(),
            captures: vec!["42".into()],
            identity: None,
        }
    }

    #[tokio::test]
    async fn sync_and_async_operations_share_a_shape() {
        let v = VersionImpl::new()
            .on_sync("a_GET", |_| Ok(json!({"sync": true})))
            .on("b_GET", |c: HandlerCall| async move {
                Ok(json!({"capture": c.capture(0)}))
            });
        let a = v.operation("a_GET").unwrap();
        let b = v.operation("b_GET").unwrap();
        assert_eq!(a(call()).await.unwrap(), json!({"sync": true}));
        assert_eq!(b(call()).await.unwrap(), json!({"capture": "42"}));
        assert!(v.operation("c_GET").is_none());
    }

    #[test]
    fn service_factory_wins() {
        let imp = Implementation::new()
            .version("1", || VersionImpl::new().on_sync("plain_GET", |_| Ok(Value::Null)))
            .version_with_service("1", |_svc| {
                VersionImpl::new().on_sync("svc_GET", |_| Ok(Value::Null))
            });
        let svc = Arc::new(ServiceContext::new());
        let handler = imp.instantiate(&"1".into(), &svc).unwrap();
        assert!(handler.operation("svc_GET").is_some());
        assert!(handler.operation("plain_GET").is_none());
        assert!(imp.instantiate(&"2".into(), &svc).is_none());
    }

    #[test]
    fn username_ignores_params() {
        let mut c = call();
        c.params.insert("auth".into(), json!({"username": "bob"}));
        c.params
            .insert(crate::dispatcher::LEGACY_USER_KEY.into(), json!("alice"));
        assert_eq!(c.username(), None);

        c.identity = Some("carol".into());
        assert_eq!(c.username(), Some("carol"));
    }
}
