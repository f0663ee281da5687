//! Persisted configuration tables.
//!
//! Key names match the TOML files written by the mod (`RefreshDelay`,
//! `LevelLoaded`, ...), so existing user files keep loading.

use serde::{Deserialize, Serialize};

/// Refresh delay used when the file does not specify one (seconds).
pub const DEFAULT_REFRESH_DELAY: f32 = 0.75;

/// Lowest refresh delay the engine will ever schedule (seconds).
pub const MIN_REFRESH_DELAY: f32 = 0.1;

fn default_true() -> bool {
    true
}

/// A details/state template pair plus its `Use` gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// When false the profile is a no-op and publishing is skipped
    #[serde(rename = "Use", default = "default_true")]
    pub enabled: bool,

    /// What the player is currently doing
    #[serde(rename = "Details", default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Party status, or free text for a custom status
    #[serde(rename = "State", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            details: None,
            state: None,
        }
    }
}

impl RpcConfig {
    /// Enabled profile with only a details line
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::default()
        }
    }

    /// Enabled profile with both lines
    pub fn with_state(details: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            enabled: true,
            details: Some(details.into()),
            state: Some(state.into()),
        }
    }

    /// Profile that never publishes
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// The raw template strings that are present, details first.
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.details.as_deref().into_iter().chain(self.state.as_deref())
    }
}

/// What the presence shows as elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeMode {
    /// Since the current level finished loading
    Level,
    /// The wall clock, e.g. 15:53:50
    CurrentTime,
    /// Since the game was launched
    #[default]
    GameSession,
}

/// Verbosity for the presence transport's own log target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RpcLogLevel {
    #[serde(rename = "None")]
    Off,
    Trace,
    Info,
    Warning,
    #[default]
    Error,
}

impl RpcLogLevel {
    /// Level name understood by `tracing_subscriber::EnvFilter`.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Trace => "trace",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

/// Settings for the core mod (single player profiles and timing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Base delay between presence refreshes in seconds. Placeholders with a
    /// higher minimum delay raise it while they are on screen.
    #[serde(rename = "RefreshDelay")]
    pub refresh_delay: f32,

    #[serde(rename = "RPCLogLevel")]
    pub rpc_log_level: RpcLogLevel,

    #[serde(rename = "TimeMode")]
    pub time_mode: TimeMode,

    /// Turns "15 - Void G114" into "Void G114" in `%levelName%`
    #[serde(rename = "RemoveLevelNumbers")]
    pub remove_level_numbers: bool,

    #[serde(rename = "PreGameStarted")]
    pub pre_game_started: RpcConfig,

    #[serde(rename = "AssetWarehouseLoaded")]
    pub asset_warehouse_loaded: RpcConfig,

    #[serde(rename = "LevelLoaded")]
    pub level_loaded: RpcConfig,

    #[serde(rename = "LevelLoading")]
    pub level_loading: RpcConfig,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            refresh_delay: DEFAULT_REFRESH_DELAY,
            rpc_log_level: RpcLogLevel::default(),
            time_mode: TimeMode::default(),
            remove_level_numbers: true,
            pre_game_started: RpcConfig::with_state("Game loading...", "%codeModsCount% melons"),
            asset_warehouse_loaded: RpcConfig::with_state("Asset Warehouse loaded", "%modsCount% mods"),
            level_loaded: RpcConfig::with_state("Level: %levelName%", "Avatar: %avatarName%"),
            level_loading: RpcConfig::new("Loading %levelName%"),
        }
    }
}

impl PresenceConfig {
    /// Named profiles in a stable order, keyed by their TOML table name.
    pub fn profiles(&self) -> [(&'static str, &RpcConfig); 4] {
        [
            ("PreGameStarted", &self.pre_game_started),
            ("AssetWarehouseLoaded", &self.asset_warehouse_loaded),
            ("LevelLoaded", &self.level_loaded),
            ("LevelLoading", &self.level_loading),
        ]
    }

    /// Human readable problems that do not stop the config from loading.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.refresh_delay <= MIN_REFRESH_DELAY {
            warnings.push(format!(
                "RefreshDelay {} is at or below {}s; it will be raised to at least {}s",
                self.refresh_delay, MIN_REFRESH_DELAY, MIN_REFRESH_DELAY
            ));
        }
        warnings.extend(empty_profile_warnings(&self.profiles()));
        warnings
    }
}

/// Settings used while connected to a multiplayer lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplayerConfig {
    /// In `Level` time mode, show time spent in the lobby instead
    #[serde(rename = "OverrideTimeToLobby")]
    pub override_time_to_lobby: bool,

    #[serde(rename = "ShowJoinRequestPopUp")]
    pub show_join_request_popup: bool,

    /// Let players of private lobbies hand out Discord invites
    #[serde(rename = "AllowPlayersToInvite")]
    pub allow_players_to_invite: bool,

    /// Show gamemode provided text on the small image instead of its name
    #[serde(rename = "ShowCustomGamemodeToolTips")]
    pub show_custom_gamemode_tooltips: bool,

    #[serde(rename = "LevelLoaded")]
    pub level_loaded: RpcConfig,

    #[serde(rename = "LevelLoading")]
    pub level_loading: RpcConfig,
}

impl Default for MultiplayerConfig {
    fn default() -> Self {
        Self {
            override_time_to_lobby: true,
            show_join_request_popup: true,
            allow_players_to_invite: true,
            show_custom_gamemode_tooltips: true,
            level_loaded: RpcConfig::with_state("%levelName%", "%fusion_lobbyName%"),
            level_loading: RpcConfig::with_state("Loading %levelName%", "%fusion_lobbyName%"),
        }
    }
}

impl MultiplayerConfig {
    pub fn profiles(&self) -> [(&'static str, &RpcConfig); 2] {
        [
            ("LevelLoaded", &self.level_loaded),
            ("LevelLoading", &self.level_loading),
        ]
    }

    pub fn warnings(&self) -> Vec<String> {
        empty_profile_warnings(&self.profiles())
    }
}

fn empty_profile_warnings(profiles: &[(&'static str, &RpcConfig)]) -> Vec<String> {
    profiles
        .iter()
        .filter(|(_, cfg)| cfg.enabled && cfg.templates().all(|t| t.trim().is_empty()))
        .map(|(name, _)| format!("{name} is enabled but has neither Details nor State"))
        .collect()
}
