use super::Router;
use crate::dispatcher::{Implementation, VersionImpl};
use crate::service::ServiceContext;
use crate::spec::{build_routes, definition_from_value};
use http::Method;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

fn router_for(endpoints: Value) -> Router {
    let def = definition_from_value(json!({
        "metadata": {"versions": [1, 2]},
        "endpoints": endpoints
    }))
    .unwrap();
    let ops = || {
        VersionImpl::new()
            .on_sync("example_GET", |_| Ok(json!("literal")))
            .on_sync("example_POST", |_| Ok(json!("post")))
            .on_sync("user_GET", |_| Ok(json!("user")))
            .on_sync("user_any_GET", |_| Ok(json!("any")))
            .on_sync("range_GET", |_| Ok(json!("range")))
    };
    let imp = Implementation::new().version("1", ops).version("2", ops);
    let routes = build_routes(
        &imp,
        &def,
        &Arc::new(ServiceContext::new()),
        Path::new("."),
    )
    .unwrap();
    Router::new(routes)
}

#[test]
fn test_literal_route() {
    let router = router_for(json!([
        {"endpoint": "example", "getProcessors": [{"versions": [1]}]}
    ]));
    let m = router.route(&Method::GET, "/v1/example").unwrap();
    assert_eq!(&*m.route.operation_name, "example_GET");
    assert!(m.captures.is_empty());
    assert!(router.route(&Method::GET, "/v2/example").is_none());
    assert!(router.route(&Method::POST, "/v1/example").is_none());
    assert!(router.route(&Method::GET, "/v1/example/").is_none());
}

#[test]
fn test_versions_get_their_own_keys() {
    let router = router_for(json!([
        {"endpoint": "example", "getProcessors": [{"versions": [1, 2]}]}
    ]));
    assert_eq!(router.len(), 2);
    let m = router.route(&Method::GET, "/v2/example").unwrap();
    assert_eq!(m.route.version.as_str(), "2");
}

#[test]
fn test_pattern_captures() {
    let router = router_for(json!([
        {"endpoint": "user/(\\d+)/(\\w+)", "func": "user", "getProcessors": [{"versions": [1]}]}
    ]));
    let m = router.route(&Method::GET, "/v1/user/42/posts").unwrap();
    assert_eq!(m.captures.as_slice(), ["42", "posts"]);
    assert!(router.route(&Method::GET, "/v1/user/abc/posts").is_none());
}

#[test]
fn test_literal_wins_over_pattern() {
    let router = router_for(json!([
        {"endpoint": "(.*)", "func": "user_any", "getProcessors": [{"versions": [1]}]},
        {"endpoint": "example", "getProcessors": [{"versions": [1]}]}
    ]));
    let m = router.route(&Method::GET, "/v1/example").unwrap();
    assert_eq!(&*m.route.operation_name, "example_GET");
    let m = router.route(&Method::GET, "/v1/other").unwrap();
    assert_eq!(&*m.route.operation_name, "user_any_GET");
}

#[test]
fn test_patterns_try_in_declaration_order() {
    let router = router_for(json!([
        {"endpoint": "user/(\\d+)", "func": "user", "getProcessors": [{"versions": [1]}]},
        {"endpoint": "user/(.*)", "func": "user_any", "getProcessors": [{"versions": [1]}]}
    ]));
    let m = router.route(&Method::GET, "/v1/user/5").unwrap();
    assert_eq!(&*m.route.operation_name, "user_GET");
    let m = router.route(&Method::GET, "/v1/user/bob").unwrap();
    assert_eq!(&*m.route.operation_name, "user_any_GET");
}

#[test]
fn test_unmatched_optional_group_is_empty() {
    let router = router_for(json!([
        {"endpoint": "range/(\\d+)(?:-(\\d+))?", "func": "range", "getProcessors": [{"versions": [1]}]}
    ]));
    let m = router.route(&Method::GET, "/v1/range/3").unwrap();
    assert_eq!(m.captures.as_slice(), ["3", ""]);
}
