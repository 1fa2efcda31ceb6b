//! Shared fixtures for the integration tests: an example API definition, an
//! implementation covering every endpoint in it, and an authenticating
//! service object.

#![allow(dead_code)]

use saratoga::security::{DefaultAuthenticator, InMemorySharedSecretSource, UserDetails};
use saratoga::spec::{definition_from_value, ApiDefinition};
use saratoga::{
    Api, ApiError, HandlerCall, HandlerResult, Implementation, RuntimeConfig, ServiceContext,
    VersionImpl,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Application state reached through the service object.
#[derive(Debug, Clone)]
pub struct Greeting(pub String);

pub fn definition_json() -> Value {
    json!({
        "metadata": {"versions": [1, 2], "name": "example-api"},
        "endpoints": [
            {"endpoint": "example", "getProcessors": [{"versions": [1, 2]}]},
            {
                "endpoint": "echo",
                "getProcessors": [{"versions": [1], "paramsType": "url"}],
                "postProcessors": [{"versions": [1]}]
            },
            {
                "endpoint": "greet",
                "getProcessors": [{
                    "versions": [1],
                    "paramsType": "url",
                    "requiredParams": ["hello"],
                    "optionalParams": [
                        {"param": "flavour", "paramOptions": ["vanilla", {"data": "chocolate"}]}
                    ]
                }]
            },
            {
                "endpoint": "typed",
                "postProcessors": [{
                    "versions": [1],
                    "requestSchema": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "age": {"type": "integer"}
                        },
                        "required": ["name"]
                    },
                    "responseSchema": {
                        "type": "object",
                        "properties": {"greeting": {"type": "string"}},
                        "required": ["greeting"]
                    }
                }]
            },
            {
                "endpoint": "shape",
                "getProcessors": [{
                    "versions": [1],
                    "paramsType": "url",
                    "responseFormat": "dict",
                    "requiredResponseParams": ["cake"],
                    "optionalResponseParams": ["pie"]
                }]
            },
            {
                "endpoint": "listy",
                "getProcessors": [{"versions": [1], "paramsType": "url", "responseFormat": "list"}]
            },
            {
                "endpoint": "dicts",
                "getProcessors": [{
                    "versions": [1],
                    "paramsType": "url",
                    "responseFormat": "listofdict",
                    "requiredResponseParams": ["id"]
                }]
            },
            {
                "endpoint": "user/(\\d+)",
                "func": "user",
                "getProcessors": [{"versions": [1]}]
            },
            {
                "endpoint": "user/(\\w+)",
                "func": "user_by_name",
                "getProcessors": [{"versions": [1]}]
            },
            {
                "endpoint": "fail",
                "getProcessors": [{"versions": [1], "paramsType": "url"}]
            },
            {"endpoint": "later", "getProcessors": [{"versions": [1]}]},
            {
                "endpoint": "secure",
                "requiresAuthentication": true,
                "getProcessors": [{"versions": [1]}],
                "postProcessors": [{"versions": [1]}]
            }
        ]
    })
}

pub fn definition() -> ApiDefinition {
    definition_from_value(definition_json()).unwrap()
}

fn echo(call: HandlerCall) -> HandlerResult {
    Ok(Value::Object(call.params))
}

fn typed(call: HandlerCall) -> HandlerResult {
    let name = call.param("name").and_then(Value::as_str).unwrap_or_default();
    if name == "broken" {
        return Ok(json!({"greeting": 5}));
    }
    Ok(json!({"greeting": format!("Hello, {name}!")}))
}

fn listy(call: HandlerCall) -> HandlerResult {
    match call.param("mode").and_then(Value::as_str) {
        Some("dict") => Ok(json!({})),
        Some("string") => Ok(json!("[1, 2, 3]")),
        Some("junk") => Ok(json!("not a list")),
        _ => Ok(json!([1, 2, 3])),
    }
}

fn dicts(call: HandlerCall) -> HandlerResult {
    match call.param("mode").and_then(Value::as_str) {
        Some("scalar") => Ok(json!([{"id": 1}, 2])),
        Some("missing") => Ok(json!([{"id": 1}, {"name": "no id"}])),
        _ => Ok(json!([{"id": 1}, {"id": 2}])),
    }
}

fn fail(call: HandlerCall) -> HandlerResult {
    match call.param("mode").and_then(Value::as_str) {
        Some("conflict") => Err(ApiError::bad_request("Already exists.").with_code(409)),
        Some("missing") => Err(ApiError::not_found("No such widget.")),
        Some("panic") => panic!("handler blew up"),
        _ => Err(ApiError::api("database exploded")),
    }
}

async fn later(_call: HandlerCall) -> HandlerResult {
    tokio::task::yield_now().await;
    Ok(json!({"async": true}))
}

fn whoami(call: HandlerCall) -> HandlerResult {
    Ok(json!({"user": call.username()}))
}

fn version_one() -> VersionImpl {
    VersionImpl::new()
        .on_sync("example_GET", |_| Ok(json!({})))
        .on_sync("echo_GET", echo)
        .on_sync("echo_POST", echo)
        .on_sync("greet_GET", echo)
        .on_sync("typed_POST", typed)
        .on_sync("shape_GET", echo)
        .on_sync("listy_GET", listy)
        .on_sync("dicts_GET", dicts)
        .on_sync("user_GET", |call| Ok(json!({"id": call.capture(0)})))
        .on_sync("user_by_name_GET", |call| Ok(json!({"name": call.capture(0)})))
        .on_sync("fail_GET", fail)
        .on("later_GET", later)
        .on_sync("secure_GET", whoami)
        .on_sync("secure_POST", whoami)
}

fn version_two(service: &Arc<ServiceContext>) -> VersionImpl {
    let greeting = service
        .get::<Greeting>()
        .map_or_else(|| "hello".to_string(), |g| g.0.clone());
    VersionImpl::new().on_sync("example_GET", move |_| {
        Ok(json!({"version": 2, "greeting": greeting}))
    })
}

pub fn implementation() -> Implementation {
    Implementation::new()
        .version("1", version_one)
        .version_with_service("2", version_two)
}

pub fn auth_service() -> ServiceContext {
    let source = InMemorySharedSecretSource::new(vec![
        UserDetails::new("bob", "pass").canonical("bob@bob.com"),
        UserDetails::new("alice", "word"),
    ]);
    ServiceContext::new()
        .with_auth(Arc::new(DefaultAuthenticator::new(Arc::new(source))))
        .with(Greeting("howdy".to_string()))
}

/// The example API with the authenticating service and default settings.
pub fn api() -> Api {
    api_with(RuntimeConfig::default())
}

pub fn api_with(config: RuntimeConfig) -> Api {
    Api::builder(implementation(), definition())
        .service(auth_service())
        .config(config)
        .build()
        .unwrap()
}
