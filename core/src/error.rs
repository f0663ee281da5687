//! Error types shared across the engine.

use std::time::Duration;

use thiserror::Error;

/// Error type placeholder and hook providers may return.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Setup-time registration failures. These are programmer errors and are
/// returned straight to the registering caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("'{0}' is already registered")]
    DuplicateName(String),

    #[error("invalid registration: {0}")]
    InvalidArgument(String),
}

/// Reasons a single publish attempt did not reach the transport.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PublishError {
    #[error("{field} is {len} bytes, over the {max} byte limit")]
    FieldLengthExceeded {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("presence transport is not ready")]
    TransportNotReady,

    #[error("rate limited, next slot in {retry_in:?}")]
    RateLimited { retry_in: Duration },

    #[error("transport error: {0}")]
    Transport(String),
}

/// A placeholder provider failed while rendering. Logged at the template
/// boundary and replaced with an empty string; never returned to callers.
#[derive(Debug, Error)]
#[error("placeholder '{placeholder}' failed: {message}")]
pub struct ResolutionError {
    pub placeholder: String,
    pub message: String,
}

/// Join secret could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("join secret is empty")]
    Empty,

    #[error("join secret is not valid base64: {0}")]
    Encoding(String),

    #[error("join secret is not valid UTF-8")]
    Utf8,

    #[error("join secret does not contain a network layer and a code")]
    MissingParts,
}
