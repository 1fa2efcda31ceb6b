use crate::error::ApiError;
use hmac::{Hmac, Mac};
use sha2::{Sha224, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

/// Digest algorithms this crate can compute, lower-case.
pub const SUPPORTED_ALGORITHMS: [&str; 4] = ["sha224", "sha256", "sha384", "sha512"];

fn unsupported(algorithm: &str) -> ApiError {
    ApiError::authentication_failed(format!(
        "Unsupported HMAC type '{}'",
        algorithm.to_ascii_uppercase()
    ))
}

fn mac_with<M: Mac + hmac::digest::KeyInit>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, ApiError> {
    let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(key)
        .map_err(|_| ApiError::authentication_failed("Authentication failed."))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Compute `HMAC-<algorithm>(key, message)`.
///
/// # Errors
///
/// `AuthenticationFailed` naming the algorithm when it is not supported.
pub fn compute(algorithm: &str, key: &[u8], message: &[u8]) -> Result<Vec<u8>, ApiError> {
    match algorithm.to_ascii_lowercase().as_str() {
        "sha224" => mac_with::<Hmac<Sha224>>(key, message),
        "sha256" => mac_with::<Hmac<Sha256>>(key, message),
        "sha384" => mac_with::<Hmac<Sha384>>(key, message),
        "sha512" => mac_with::<Hmac<Sha512>>(key, message),
        _ => Err(unsupported(algorithm)),
    }
}

/// Recompute the MAC and compare it with `expected` in constant time.
///
/// # Errors
///
/// `AuthenticationFailed` on mismatch or an unsupported algorithm.
pub fn verify(algorithm: &str, key: &[u8], message: &[u8], expected: &[u8]) -> Result<(), ApiError> {
    let actual = compute(algorithm, key, message)?;
    if bool::from(actual.as_slice().ct_eq(expected)) {
        Ok(())
    } else {
        Err(ApiError::authentication_failed("Authentication failed."))
    }
}

/// Lower-case hex, the encoding carried by `HMAC-*` credentials.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode hex; `None` on odd length or a non-hex digit.
#[must_use]
pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| text.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}
