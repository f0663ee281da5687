//! Placeholder templating and presence throttling for LabPresence.
//!
//! Templates like `"Playing %levelName% at %fps% FPS"` are rendered against
//! a [`PlaceholderRegistry`] and published through a rate limited
//! [`PresencePublisher`] at an interval no shorter than the slowest
//! placeholder on screen allows.

pub mod config;
pub mod error;
pub mod events;
pub mod gamemodes;
pub mod manager;
pub mod placeholders;
pub mod plugins;
pub mod presence;
pub mod session;

// Re-exports for convenience
pub use config::{AppConfig, ConfigError, load_app_config, load_file, load_or_create, save_file};
pub use error::{ProviderError, PublishError, RegistryError, ResolutionError, SecretError};
pub use events::{EventHooks, GameEvent, HookContext, LevelInfo, LevelStatus, OverwriteChain, StreamStatus};
pub use gamemodes::{ActiveGamemode, Gamemode, GamemodeRegistry, KnownGamemodeKeys};
pub use manager::RichPresenceManager;
pub use placeholders::{DelayResolver, FrameCounter, Placeholder, PlaceholderRegistry, TemplateEngine};
pub use plugins::{Plugin, PluginContext, PluginManager};
pub use presence::{
    LogPublisher, Presence, PresencePublisher, PresenceRequest, PresenceScheduler, RateLimitedPublisher, TickOutcome,
};
pub use session::{LobbyInfo, LobbyPrivacy, SessionState, SharedSession};

pub use labpresence_types::{MultiplayerConfig, PresenceConfig, RpcConfig, RpcLogLevel, TimeMode};
