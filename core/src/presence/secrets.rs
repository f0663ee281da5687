//! Join secret encoding.
//!
//! The secret is base64 of `"<network layer>|<join code>"`. It only has to
//! be opaque to Discord, not confidential.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::SecretError;

/// Where a join secret points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTarget {
    pub layer: String,
    pub code: String,
}

pub fn encode_join_secret(layer: &str, code: &str) -> String {
    STANDARD.encode(format!("{layer}|{code}"))
}

/// Decode a secret received from a join request. A layer or code that
/// itself contains `|` makes the secret ambiguous and is rejected.
pub fn decode_join_secret(secret: &str) -> Result<JoinTarget, SecretError> {
    let secret = secret.trim();
    if secret.is_empty() {
        return Err(SecretError::Empty);
    }
    let bytes = STANDARD
        .decode(secret)
        .map_err(|e| SecretError::Encoding(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| SecretError::Utf8)?;

    let mut parts = text.split('|');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(layer), Some(code), None) if !layer.is_empty() && !code.is_empty() => Ok(JoinTarget {
            layer: layer.to_string(),
            code: code.to_string(),
        }),
        _ => Err(SecretError::MissingParts),
    }
}
