use crate::spec::ParamsType;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// An inbound request as the dispatcher sees it.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub method: Method,
    /// Path without the query string, e.g. `/v1/example`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiRequest {
    /// Build from a method and a target such as `/v1/example?x=1`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self {
            method,
            path: path.to_string(),
            query: query.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Convert from an `http` request, as handed over by a listener.
    pub fn from_http(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or_default().to_string(),
            headers: parts.headers,
            body,
        }
    }

    /// First value of a header, if it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `<method> <path>[?query]`, lower-cased method, as used by signed requests.
    #[must_use]
    pub fn request_target(&self) -> String {
        let method = self.method.as_str().to_ascii_lowercase();
        if self.query.is_empty() {
            format!("{method} {}", self.path)
        } else {
            format!("{method} {}?{}", self.path, self.query)
        }
    }

    fn is_form(&self) -> bool {
        self.header(CONTENT_TYPE.as_str())
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
    }

    /// Decode request parameters for a processor.
    ///
    /// `url` reads the query string. `jsonbody` decodes the body as a JSON
    /// object, falling back to a form-encoded body and then to the query
    /// string.
    #[must_use]
    pub fn params(&self, params_type: ParamsType) -> Map<String, Value> {
        match params_type {
            ParamsType::Url => form_pairs_to_params(self.query.as_bytes()),
            ParamsType::JsonBody => {
                if !self.body.is_empty() {
                    match serde_json::from_slice::<Value>(&self.body) {
                        Ok(Value::Object(map)) => return map,
                        Ok(_) => debug!("JSON body is not an object; falling back"),
                        Err(e) => debug!(error = %e, "Body is not JSON; falling back"),
                    }
                    if self.is_form() {
                        return form_pairs_to_params(&self.body);
                    }
                }
                form_pairs_to_params(self.query.as_bytes())
            }
        }
    }
}

/// Decode `a=1&b=2&b=3`: a single value stays a string, repeated keys become an array.
#[must_use]
pub fn form_pairs_to_params(encoded: &[u8]) -> Map<String, Value> {
    let mut params = Map::new();
    for (key, value) in url::form_urlencoded::parse(encoded) {
        let value = Value::String(value.into_owned());
        match params.get_mut(key.as_ref()) {
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                params.insert(key.into_owned(), value);
            }
        }
    }
    params
}

/// In-memory request builder for driving [`Api::test`](crate::dispatcher::Api::test).
#[derive(Debug, Clone)]
pub struct TestRequest {
    path: String,
    method: Method,
    params: Option<Value>,
    headers: Vec<(String, String)>,
    use_body: bool,
    raw_body: Option<Vec<u8>>,
}

impl TestRequest {
    /// A `GET` for `path`; parameters go in a JSON body unless [`use_body`](Self::use_body)
    /// is switched off.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            params: None,
            headers: Vec::new(),
            use_body: true,
            raw_body: None,
        }
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// `false` sends parameters as query arguments instead of a JSON body.
    #[must_use]
    pub fn use_body(mut self, use_body: bool) -> Self {
        self.use_body = use_body;
        self
    }

    /// Send these exact bytes as the body; parameters then go to the query.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    fn query_from_params(params: &Value) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Value::Object(map) = params {
            for (key, value) in map {
                let values: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for v in values {
                    match v {
                        Value::String(s) => query.append_pair(key, s),
                        other => query.append_pair(key, &other.to_string()),
                    };
                }
            }
        }
        query.finish()
    }

    #[must_use]
    pub fn into_request(self) -> ApiRequest {
        let mut request = ApiRequest::new(self.method, &self.path);

        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    request.headers.append(name, value);
                }
                _ => warn!(header = %name, "Skipping invalid test header"),
            }
        }

        let body_params = self.use_body && self.raw_body.is_none();
        match (&self.params, body_params) {
            (Some(params), true) => {
                request.body = params.to_string().into_bytes();
                if !request.headers.contains_key(CONTENT_TYPE) {
                    request
                        .headers
                        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
            }
            (Some(params), false) => {
                let extra = Self::query_from_params(params);
                if !extra.is_empty() {
                    if !request.query.is_empty() {
                        request.query.push('&');
                    }
                    request.query.push_str(&extra);
                }
            }
            (None, _) => {}
        }
        if let Some(raw) = self.raw_body {
            request.body = raw;
        }
        request
    }
}

impl From<TestRequest> for ApiRequest {
    fn from(req: TestRequest) -> Self {
        req.into_request()
    }
}
