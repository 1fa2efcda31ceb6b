use http::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// HMAC algorithms accepted when the definition does not list its own.
pub const DEFAULT_HMAC_TYPES: [&str; 2] = ["sha256", "sha512"];

/// A version identifier as declared in `metadata.versions`.
///
/// Definitions written by hand tend to use bare numbers (`"versions": [1, 2]`)
/// while generated ones use strings; both deserialize to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path prefix for this version, e.g. `v1`.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("v{}", self.0)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u32> for VersionId {
    fn from(n: u32) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(VersionId(n.to_string())),
            Raw::Text(s) if !s.is_empty() => Ok(VersionId(s)),
            Raw::Text(_) => Err(serde::de::Error::custom("version id must not be empty")),
        }
    }
}

/// Top-level API description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiDefinition {
    /// Required; its absence is reported by the builder, not the parser.
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub endpoints: Vec<EndpointSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub versions: Vec<VersionId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "allowedHmacTypes", alias = "AllowedHMACTypes", default)]
    pub allowed_hmac_types: Option<Vec<String>>,
}

impl Metadata {
    /// Lower-cased HMAC allow-list.
    #[must_use]
    pub fn hmac_types(&self) -> Vec<String> {
        match &self.allowed_hmac_types {
            Some(types) => types.iter().map(|t| t.to_ascii_lowercase()).collect(),
            None => DEFAULT_HMAC_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// One declared endpoint with its per-verb processors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSpec {
    /// Literal name (`example`) or a pattern with capture groups (`user/(\d+)`).
    pub endpoint: String,
    /// Overrides the operation name prefix; required in practice for patterns.
    #[serde(default)]
    pub func: Option<String>,
    #[serde(default)]
    pub requires_authentication: bool,
    #[serde(default)]
    pub get_processors: Vec<Processor>,
    #[serde(default)]
    pub post_processors: Vec<Processor>,
    #[serde(default)]
    pub put_processors: Vec<Processor>,
    #[serde(default)]
    pub patch_processors: Vec<Processor>,
    #[serde(default)]
    pub delete_processors: Vec<Processor>,
}

impl EndpointSpec {
    /// Prefix used for operation names: `func` when given, else the endpoint.
    #[must_use]
    pub fn func_name(&self) -> &str {
        self.func.as_deref().unwrap_or(&self.endpoint)
    }

    /// Operation name for a verb, e.g. `example_GET`.
    #[must_use]
    pub fn operation_name(&self, method: &Method) -> String {
        format!("{}_{}", self.func_name(), method.as_str())
    }

    /// Processors grouped by verb, in a fixed verb order.
    pub fn processors(&self) -> impl Iterator<Item = (Method, &[Processor])> {
        [
            (Method::GET, self.get_processors.as_slice()),
            (Method::POST, self.post_processors.as_slice()),
            (Method::PUT, self.put_processors.as_slice()),
            (Method::PATCH, self.patch_processors.as_slice()),
            (Method::DELETE, self.delete_processors.as_slice()),
        ]
        .into_iter()
        .filter(|(_, p)| !p.is_empty())
    }

    /// Endpoints carrying a regex group are matched as patterns.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.endpoint.contains('(')
    }
}

/// Where request parameters come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamsType {
    Url,
    #[default]
    JsonBody,
}

/// Expected top-level shape of a handler result (legacy checks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Dict,
    List,
    ListOfDict,
}

/// Either an inline schema document or a path to one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SchemaSource {
    Path(String),
    Inline(Value),
}

/// A legacy parameter declaration: a bare name or a name with allowed values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    Name(String),
    WithOptions {
        param: String,
        #[serde(rename = "paramOptions", default)]
        param_options: Vec<ParamOption>,
    },
}

/// Allowed value for a parameter, either plain or wrapped as `{"data": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamOption {
    Wrapped { data: Value },
    Plain(Value),
}

impl ParamOption {
    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            ParamOption::Wrapped { data } => data,
            ParamOption::Plain(v) => v,
        }
    }
}

/// Per-(endpoint, verb) configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Processor {
    pub versions: Vec<VersionId>,
    #[serde(default)]
    pub request_schema: Option<SchemaSource>,
    #[serde(default)]
    pub response_schema: Option<SchemaSource>,
    #[serde(default)]
    pub params_type: ParamsType,
    #[serde(default)]
    pub required_params: Vec<ParamSpec>,
    #[serde(default)]
    pub optional_params: Vec<ParamSpec>,
    #[serde(default)]
    pub required_response_params: Vec<ParamSpec>,
    #[serde(default)]
    pub optional_response_params: Vec<ParamSpec>,
    #[serde(default)]
    pub response_format: Option<ResponseFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_ids_accept_numbers_and_strings() {
        let v: Vec<VersionId> = serde_json::from_value(json!([1, "2", "beta"])).unwrap();
        assert_eq!(v, vec!["1".into(), "2".into(), VersionId::from("beta")]);
        assert_eq!(v[0].prefix(), "v1");
    }

    #[test]
    fn processor_defaults() {
        let p: Processor = serde_json::from_value(json!({"versions": [1]})).unwrap();
        assert_eq!(p.params_type, ParamsType::JsonBody);
        assert!(p.request_schema.is_none());
        assert!(p.required_params.is_empty());
        assert!(p.response_format.is_none());
    }

    #[test]
    fn schema_source_distinguishes_paths() {
        let p: Processor = serde_json::from_value(json!({
            "versions": [1],
            "requestSchema": "schemas/req.json",
            "responseSchema": {"type": "object"},
            "paramsType": "url",
            "responseFormat": "listofdict"
        }))
        .unwrap();
        assert_eq!(
            p.request_schema,
            Some(SchemaSource::Path("schemas/req.json".into()))
        );
        assert!(matches!(p.response_schema, Some(SchemaSource::Inline(_))));
        assert_eq!(p.params_type, ParamsType::Url);
        assert_eq!(p.response_format, Some(ResponseFormat::ListOfDict));
    }

    #[test]
    fn param_specs_parse_both_forms() {
        let specs: Vec<ParamSpec> = serde_json::from_value(json!([
            "hello",
            {"param": "foo", "paramOptions": ["bar", {"data": "baz"}]}
        ]))
        .unwrap();
        assert_eq!(specs[0], ParamSpec::Name("hello".into()));
        match &specs[1] {
            ParamSpec::WithOptions { param, param_options } => {
                assert_eq!(param, "foo");
                let values: Vec<&Value> = param_options.iter().map(|o| o.value()).collect();
                assert_eq!(values, vec![&json!("bar"), &json!("baz")]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn endpoint_operation_names() {
        let e: EndpointSpec = serde_json::from_value(json!({
            "endpoint": "user/(\\d+)",
            "func": "user",
            "getProcessors": [{"versions": [1]}],
            "postProcessors": [{"versions": [1]}]
        }))
        .unwrap();
        assert!(e.is_dynamic());
        assert_eq!(e.operation_name(&Method::POST), "user_POST");
        let verbs: Vec<Method> = e.processors().map(|(m, _)| m).collect();
        assert_eq!(verbs, vec![Method::GET, Method::POST]);
    }

    #[test]
    fn hmac_allow_list_defaults() {
        let m = Metadata::default();
        assert_eq!(m.hmac_types(), vec!["sha256", "sha512"]);
        let m: Metadata = serde_json::from_value(json!({
            "versions": [1],
            "AllowedHMACTypes": ["SHA512"]
        }))
        .unwrap();
        assert_eq!(m.hmac_types(), vec!["sha512"]);
    }
}
