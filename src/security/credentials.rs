use super::mac::from_hex;
use crate::error::ApiError;
use crate::server::ApiRequest;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// `name="value"` pairs of a `Signature` header.
static SIGNATURE_PARAM: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r#"([A-Za-z]+)\s*=\s*"([^"]*)""#));

/// Headers signed when a `Signature` credential does not list any.
const DEFAULT_SIGNED_HEADERS: &str = "date";

fn malformed() -> ApiError {
    ApiError::authentication_failed("Malformed Authorization header.")
}

fn unsupported_scheme(scheme: &str) -> ApiError {
    ApiError::authentication_failed(format!(
        "Unsupported Authorization type '{}'",
        scheme.to_ascii_uppercase()
    ))
}

fn unsupported_hmac(algorithm: &str) -> ApiError {
    ApiError::authentication_failed(format!(
        "Unsupported HMAC type '{}'",
        algorithm.to_ascii_uppercase()
    ))
}

/// Decoded contents of an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Basic base64(username:password)`
    Basic { username: String, password: String },
    /// `HMAC-<ALG> base64(keyId:hexdigest)`, MAC over the raw body.
    Hmac {
        key_id: String,
        algorithm: String,
        digest: Vec<u8>,
    },
    /// `Signature keyId="..",algorithm="hmac-<alg>",headers="..",signature="<b64>"`
    Signature {
        key_id: String,
        algorithm: String,
        headers: Vec<String>,
        signature: Vec<u8>,
    },
}

impl Credentials {
    /// Parse an `Authorization` header value.
    ///
    /// `allowed_hmac` is the lower-case algorithm allow-list for both MAC schemes.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` for an unknown scheme, a disallowed algorithm, or
    /// a payload that does not decode.
    pub fn parse(header: &str, allowed_hmac: &[String]) -> Result<Self, ApiError> {
        let header = header.trim();
        let (scheme, payload) = header
            .split_once(char::is_whitespace)
            .map(|(s, p)| (s, p.trim()))
            .unwrap_or((header, ""));
        let scheme_lower = scheme.to_ascii_lowercase();

        if scheme_lower == "basic" {
            return Self::parse_basic(payload);
        }
        if let Some(algorithm) = scheme_lower.strip_prefix("hmac-") {
            if !allowed_hmac.iter().any(|a| a == algorithm) {
                return Err(unsupported_hmac(algorithm));
            }
            return Self::parse_hmac(algorithm, payload);
        }
        if scheme_lower == "signature" {
            return Self::parse_signature(payload, allowed_hmac);
        }
        Err(unsupported_scheme(scheme))
    }

    fn split_pair(payload: &str) -> Result<(String, String), ApiError> {
        let decoded = STANDARD.decode(payload).map_err(|_| malformed())?;
        let text = String::from_utf8(decoded).map_err(|_| malformed())?;
        let fields: Vec<&str> = text.split(':').collect();
        match fields.as_slice() {
            [left, right] => Ok(((*left).to_string(), (*right).to_string())),
            _ => Err(malformed()),
        }
    }

    fn parse_basic(payload: &str) -> Result<Self, ApiError> {
        let (username, password) = Self::split_pair(payload)?;
        Ok(Credentials::Basic { username, password })
    }

    fn parse_hmac(algorithm: &str, payload: &str) -> Result<Self, ApiError> {
        let (key_id, hex_digest) = Self::split_pair(payload)?;
        let digest = from_hex(hex_digest.trim()).ok_or_else(malformed)?;
        Ok(Credentials::Hmac {
            key_id,
            algorithm: algorithm.to_string(),
            digest,
        })
    }

    fn parse_signature(payload: &str, allowed_hmac: &[String]) -> Result<Self, ApiError> {
        let re = SIGNATURE_PARAM.as_ref().map_err(|_| malformed())?;
        let params: HashMap<String, String> = re
            .captures_iter(payload)
            .map(|c| (c[1].to_ascii_lowercase(), c[2].to_string()))
            .collect();

        let key_id = params.get("keyid").cloned().ok_or_else(malformed)?;
        let signature = params
            .get("signature")
            .and_then(|s| STANDARD.decode(s).ok())
            .ok_or_else(malformed)?;
        let declared = params
            .get("algorithm")
            .map(|a| a.to_ascii_lowercase())
            .unwrap_or_else(|| "hmac-sha256".to_string());
        let algorithm = declared
            .strip_prefix("hmac-")
            .ok_or_else(|| unsupported_hmac(&declared))?;
        if !allowed_hmac.iter().any(|a| a == algorithm) {
            return Err(unsupported_hmac(algorithm));
        }
        let headers = params
            .get("headers")
            .map(String::as_str)
            .unwrap_or(DEFAULT_SIGNED_HEADERS)
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();

        Ok(Credentials::Signature {
            key_id,
            algorithm: algorithm.to_string(),
            headers,
            signature,
        })
    }
}

/// Build the signing string for a `Signature` credential: one
/// `name: value` line per listed header, joined by `\n`.
///
/// # Errors
///
/// `AuthenticationFailed` when a listed header is absent from the request.
pub fn signing_string(request: &ApiRequest, headers: &[String]) -> Result<String, ApiError> {
    let lines = headers
        .iter()
        .map(|name| {
            if name == "(request-target)" {
                return Ok(format!("(request-target): {}", request.request_target()));
            }
            request
                .header(name)
                .map(|value| format!("{name}: {}", value.trim()))
                .ok_or_else(|| {
                    ApiError::authentication_failed(format!("Missing signed header '{name}'."))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}
