//! # Parameter Normalizer
//!
//! Declarative parameter lists predate schema support and are still honoured:
//! a processor may name `requiredParams` / `optionalParams` (and the response
//! counterparts), optionally restricting a parameter to an enumerated set of
//! values. Once any list is declared, the parameter set is closed: missing
//! required keys and undeclared keys are both rejected.
//!
//! Request-side failures are client errors (`BadRequestParams`); response-side
//! failures are contract violations of the handler (`BadResponseParams`).

use crate::error::ApiError;
use crate::spec::{ParamSpec, Processor, ResponseFormat};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A parameter declaration with its options flattened to plain values.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalisedParam {
    pub name: String,
    pub options: Vec<Value>,
}

/// Flatten declarations; returns the params and their names.
#[must_use]
pub fn normalise(specs: &[ParamSpec]) -> (Vec<NormalisedParam>, BTreeSet<String>) {
    let params: Vec<NormalisedParam> = specs
        .iter()
        .map(|spec| match spec {
            ParamSpec::Name(name) => NormalisedParam {
                name: name.clone(),
                options: Vec::new(),
            },
            ParamSpec::WithOptions {
                param,
                param_options,
            } => NormalisedParam {
                name: param.clone(),
                options: param_options.iter().map(|o| o.value().clone()).collect(),
            },
        })
        .collect();
    let keys = params.iter().map(|p| p.name.clone()).collect();
    (params, keys)
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Request,
    Response,
}

impl Side {
    fn label(self) -> &'static str {
        match self {
            Side::Request => "request",
            Side::Response => "response",
        }
    }

    fn error(self, message: String) -> ApiError {
        match self {
            Side::Request => ApiError::bad_request(message),
            Side::Response => ApiError::bad_response(message),
        }
    }
}

/// Strings print bare, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `["a", "b"]`, with a space after each comma.
fn display_options(options: &[Value]) -> String {
    let inner: Vec<String> = options.iter().map(Value::to_string).collect();
    format!("[{}]", inner.join(", "))
}

fn quoted_list(keys: &BTreeSet<String>) -> String {
    let joined: Vec<&str> = keys.iter().map(String::as_str).collect();
    format!("'{}'", joined.join("', '"))
}

fn check_closed_set(
    values: &Map<String, Value>,
    required: &[ParamSpec],
    optional: &[ParamSpec],
    side: Side,
) -> Result<(), ApiError> {
    if required.is_empty() && optional.is_empty() {
        return Ok(());
    }

    let (required, required_keys) = normalise(required);
    let (optional, optional_keys) = normalise(optional);

    let mut accounted_for = BTreeSet::new();
    for (key, data) in values {
        for declared in required.iter().chain(optional.iter()) {
            if &declared.name != key {
                continue;
            }
            if !declared.options.is_empty() && !declared.options.contains(data) {
                return Err(side.error(format!(
                    "'{}' isn't part of {} in {}",
                    display_value(data),
                    display_options(&declared.options),
                    declared.name
                )));
            }
            accounted_for.insert(declared.name.clone());
        }
    }

    let missing: BTreeSet<String> = required_keys.difference(&accounted_for).cloned().collect();
    if !missing.is_empty() {
        return Err(side.error(format!(
            "Missing {} parameters: {}",
            side.label(),
            quoted_list(&missing)
        )));
    }

    let extra: BTreeSet<String> = values
        .keys()
        .filter(|k| !required_keys.contains(*k) && !optional_keys.contains(*k))
        .cloned()
        .collect();
    if !extra.is_empty() {
        return Err(side.error(format!(
            "Unexpected {} parameters: {}",
            side.label(),
            quoted_list(&extra)
        )));
    }

    Ok(())
}

/// Check request parameters against the processor's declared lists.
///
/// # Errors
///
/// `BadRequestParams` for a disallowed value, a missing required key or an
/// undeclared key.
pub fn check_request_params(
    params: &Map<String, Value>,
    processor: &Processor,
) -> Result<(), ApiError> {
    check_closed_set(
        params,
        &processor.required_params,
        &processor.optional_params,
        Side::Request,
    )
}

fn has_response_lists(processor: &Processor) -> bool {
    !processor.required_response_params.is_empty() || !processor.optional_response_params.is_empty()
}

fn check_response_dict(item: &Value, processor: &Processor) -> Result<(), ApiError> {
    let empty = Map::new();
    let map = match item {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => return Err(ApiError::bad_response("Result is not a dict.")),
    };
    check_closed_set(
        map,
        &processor.required_response_params,
        &processor.optional_response_params,
        Side::Response,
    )
}

fn as_list(result: &Value) -> Result<Vec<Value>, ApiError> {
    let parsed;
    let value = match result {
        // A handler may hand back an already-serialised list.
        Value::String(s) => {
            parsed = serde_json::from_str::<Value>(s)
                .map_err(|_| ApiError::bad_response("Result is not a list."))?;
            &parsed
        }
        other => other,
    };
    match value {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(ApiError::bad_response("Result is not a list.")),
    }
}

/// Check a handler result against the declared response shape and lists.
///
/// Nothing is checked unless a `responseFormat` or a response list is declared.
///
/// # Errors
///
/// `BadResponseParams` describing the first violation.
pub fn check_response(result: &Value, processor: &Processor) -> Result<(), ApiError> {
    match processor.response_format {
        Some(ResponseFormat::Dict) => match result {
            Value::Object(_) => check_response_dict(result, processor),
            _ => Err(ApiError::bad_response("Result is not a dict.")),
        },
        Some(ResponseFormat::List) => {
            let items = as_list(result)?;
            if has_response_lists(processor) {
                for item in &items {
                    if !item.is_object() {
                        return Err(ApiError::bad_response("Result is not a list of dicts."));
                    }
                    check_response_dict(item, processor)?;
                }
            }
            Ok(())
        }
        Some(ResponseFormat::ListOfDict) => {
            for item in &as_list(result)? {
                if !item.is_object() {
                    return Err(ApiError::bad_response("Result is not a list of dicts."));
                }
                check_response_dict(item, processor)?;
            }
            Ok(())
        }
        None if has_response_lists(processor) => check_response_dict(result, processor),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn processor(v: Value) -> Processor {
        serde_json::from_value(v).unwrap()
    }

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn undeclared_lists_accept_anything() {
        let p = processor(json!({"versions": [1]}));
        assert!(check_request_params(&map(json!({"x": 1})), &p).is_ok());
        assert!(check_response(&json!("anything"), &p).is_ok());
    }

    #[test]
    fn missing_required_params_are_listed_sorted() {
        let p = processor(json!({
            "versions": [1],
            "requiredParams": ["hello", "goodbye"],
            "optionalParams": ["the"]
        }));
        let err = check_request_params(&Map::new(), &p).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequestParams);
        assert_eq!(err.message(), "Missing request parameters: 'goodbye', 'hello'");
    }

    #[test]
    fn extra_params_are_rejected() {
        let p = processor(json!({
            "versions": [1],
            "requiredParams": ["hello", "goodbye"],
            "optionalParams": ["the"]
        }));
        let err = check_request_params(
            &map(json!({"hello": "yes", "goodbye": "no", "unspecified": "yes"})),
            &p,
        )
        .unwrap_err();
        assert_eq!(err.message(), "Unexpected request parameters: 'unspecified'");
        assert!(check_request_params(
            &map(json!({"hello": "yes", "goodbye": "no", "the": "beatles"})),
            &p
        )
        .is_ok());
    }

    #[test]
    fn param_options_restrict_values() {
        let p = processor(json!({
            "versions": [1],
            "requiredParams": [{"param": "foo", "paramOptions": ["bar", {"data": "baz"}]}]
        }));
        assert!(check_request_params(&map(json!({"foo": "bar"})), &p).is_ok());
        assert!(check_request_params(&map(json!({"foo": "baz"})), &p).is_ok());
        let err = check_request_params(&map(json!({"foo": "cake"})), &p).unwrap_err();
        assert_eq!(err.message(), r#"'cake' isn't part of ["bar", "baz"] in foo"#);
    }

    #[test]
    fn response_lists_are_server_errors() {
        let p = processor(json!({
            "versions": [1],
            "requiredResponseParams": ["cake", "muffin"],
            "optionalResponseParams": ["pizza"]
        }));
        assert!(check_response(&json!({"cake": "yes", "muffin": "yes", "pizza": "slice"}), &p).is_ok());

        let err = check_response(&json!({"cake": "yes", "muffin": "yes", "foo": "bar"}), &p)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadResponseParams);
        assert_eq!(err.message(), "Unexpected response parameters: 'foo'");

        let err = check_response(&Value::Null, &p).unwrap_err();
        assert_eq!(err.message(), "Missing response parameters: 'cake', 'muffin'");
    }

    #[test]
    fn response_formats() {
        let dict = processor(json!({"versions": [1], "responseFormat": "dict"}));
        assert!(check_response(&json!({"hi": "there"}), &dict).is_ok());
        assert_eq!(
            check_response(&json!(["hi"]), &dict).unwrap_err().message(),
            "Result is not a dict."
        );

        let list = processor(json!({"versions": [1], "responseFormat": "list"}));
        assert!(check_response(&json!(["hi", "there"]), &list).is_ok());
        assert!(check_response(&json!("[1, 2]"), &list).is_ok());
        assert_eq!(
            check_response(&json!({"hi": "there"}), &list).unwrap_err().message(),
            "Result is not a list."
        );

        let lod = processor(json!({"versions": [1], "responseFormat": "listofdict"}));
        assert!(check_response(&json!([{"hi": "there"}]), &lod).is_ok());
        assert_eq!(
            check_response(&json!(["hi"]), &lod).unwrap_err().message(),
            "Result is not a list of dicts."
        );
    }

    #[test]
    fn list_of_dicts_checks_each_item() {
        let p = processor(json!({
            "versions": [1],
            "responseFormat": "listofdict",
            "requiredResponseParams": ["id"]
        }));
        assert!(check_response(&json!([{"id": 1}, {"id": 2}]), &p).is_ok());
        let err = check_response(&json!([{"id": 1}, {"name": "x"}]), &p).unwrap_err();
        assert_eq!(err.message(), "Missing response parameters: 'id'");
    }
}
