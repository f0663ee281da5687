//! Live game/lobby snapshot shared between the manager and the builtin
//! placeholder providers.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::events::LevelInfo;

/// Lobby privacy as reported by the multiplayer mod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LobbyPrivacy {
    #[default]
    Unknown,
    Public,
    Private,
    FriendsOnly,
    Locked,
}

impl fmt::Display for LobbyPrivacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LobbyPrivacy::Unknown => "Unknown",
            LobbyPrivacy::Public => "Public",
            LobbyPrivacy::Private => "Private",
            LobbyPrivacy::FriendsOnly => "Friends Only",
            LobbyPrivacy::Locked => "Locked",
        })
    }
}

/// Connected multiplayer lobby.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LobbyInfo {
    pub id: u64,
    pub name: Option<String>,
    pub host: Option<String>,
    pub current_players: u32,
    pub max_players: u32,
    pub privacy: LobbyPrivacy,
    /// Title of the network layer the lobby runs on (e.g. "Steam")
    pub network_layer: Option<String>,
    /// Join code, when the lobby has one
    pub code: Option<String>,
    /// Whether the local player may invite others
    pub allow_invites: bool,
}

impl LobbyInfo {
    /// Lobby name, falling back to "<host>'s server" when unnamed.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}'s server", self.host_name()),
        }
    }

    pub fn host_name(&self) -> &str {
        match self.host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => host,
            _ => "N/A",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Level currently streamed in (or streaming)
    pub level: Option<LevelInfo>,
    /// Set while connected to a multiplayer lobby
    pub lobby: Option<LobbyInfo>,
    /// Title of the avatar the player is wearing
    pub avatar: Option<String>,
    /// Loaded code mods
    pub code_mods_count: u32,
    /// Content mods, known once the asset warehouse is ready
    pub mods_count: Option<u32>,
}

/// Cloneable handle to the session snapshot.
///
/// Providers only read; the manager writes between ticks. A poisoned lock
/// still yields the last written state.
#[derive(Debug, Clone, Default)]
pub struct SharedSession(Arc<RwLock<SessionState>>);

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self) -> bool {
        self.read().lobby.is_some()
    }
}
