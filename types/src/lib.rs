//! Shared configuration and text types for LabPresence.
//!
//! Everything in this crate is plain data: the persisted configuration
//! tables and the pure string helpers used before a presence is handed to
//! the transport. No I/O lives here.

pub mod config;
pub mod text;

pub use config::{
    DEFAULT_REFRESH_DELAY, MIN_REFRESH_DELAY, MultiplayerConfig, PresenceConfig, RpcConfig,
    RpcLogLevel, TimeMode,
};
pub use text::{FieldTooLong, MAX_FIELD_BYTES, fit_field, strip_level_number, strip_rich_text};
