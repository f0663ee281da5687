//! Values carried by a presence update besides the two text lines.

use serde::Serialize;

use super::secrets::encode_join_secret;
use super::timestamp::Timestamp;
use crate::session::{LobbyInfo, LobbyPrivacy};

pub const DEFAULT_LARGE_IMAGE_KEY: &str = "icon";
pub const DEFAULT_LARGE_IMAGE_TOOLTIP: &str = "BONELAB";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ActivityType {
    #[default]
    Playing,
    Listening,
    Watching,
    Competing,
}

/// An image shown on the presence card. The key names an uploaded art asset
/// or is an image URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub key: String,
    /// Hover text; may contain placeholders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl Asset {
    pub fn new(key: impl Into<String>, tooltip: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tooltip: Some(tooltip.into()),
        }
    }

    pub fn without_tooltip(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tooltip: None,
        }
    }
}

impl Default for Asset {
    /// The game logo
    fn default() -> Self {
        Self::new(DEFAULT_LARGE_IMAGE_KEY, DEFAULT_LARGE_IMAGE_TOOLTIP)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PartyPrivacy {
    Private,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Party {
    pub id: String,
    pub size: u32,
    pub max: u32,
    pub privacy: PartyPrivacy,
}

impl Party {
    /// Party for a connected lobby. Discord wants ids of at least two
    /// characters, so lobby id 0 and single digit ids yield `None`.
    pub fn from_lobby(lobby: &LobbyInfo) -> Option<Self> {
        let id = lobby.id.to_string();
        if lobby.id == 0 || id.len() < 2 {
            return None;
        }
        Some(Self {
            id,
            size: lobby.current_players,
            max: lobby.max_players,
            privacy: if lobby.privacy == LobbyPrivacy::Public {
                PartyPrivacy::Public
            } else {
                PartyPrivacy::Private
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Secrets {
    /// Opaque secret handed back to us when someone presses "Join"
    pub join: String,
}

impl Secrets {
    /// Join secret for a lobby others may join: not locked, invites
    /// allowed, and both a network layer and a join code known.
    pub fn from_lobby(lobby: &LobbyInfo) -> Option<Self> {
        if lobby.privacy == LobbyPrivacy::Locked || !lobby.allow_invites {
            return None;
        }
        let layer = lobby.network_layer.as_deref().filter(|l| !l.trim().is_empty())?;
        let code = lobby.code.as_deref().filter(|c| !c.trim().is_empty())?;
        Some(Self {
            join: encode_join_secret(layer, code),
        })
    }
}

/// A fully rendered presence, ready for the transport.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Presence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamp>,
    pub activity_type: ActivityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<Asset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<Asset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party: Option<Party>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Secrets>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::decode_join_secret;

    fn lobby() -> LobbyInfo {
        LobbyInfo {
            id: 76561198000000000,
            current_players: 2,
            max_players: 10,
            privacy: LobbyPrivacy::Public,
            network_layer: Some("Steam".to_string()),
            code: Some("ABC123".to_string()),
            allow_invites: true,
            ..LobbyInfo::default()
        }
    }

    #[test]
    fn test_party_requires_two_character_id() {
        let mut lobby = lobby();
        let party = Party::from_lobby(&lobby).unwrap();
        assert_eq!(party.id, "76561198000000000");
        assert_eq!((party.size, party.max), (2, 10));
        assert_eq!(party.privacy, PartyPrivacy::Public);

        lobby.id = 7;
        assert!(Party::from_lobby(&lobby).is_none());
        lobby.id = 0;
        assert!(Party::from_lobby(&lobby).is_none());
        lobby.id = 10;
        assert!(Party::from_lobby(&lobby).is_some());
    }

    #[test]
    fn test_party_privacy_collapses_to_private() {
        let mut lobby = lobby();
        lobby.privacy = LobbyPrivacy::FriendsOnly;
        assert_eq!(Party::from_lobby(&lobby).unwrap().privacy, PartyPrivacy::Private);
    }

    #[test]
    fn test_secrets_from_lobby() {
        let secrets = Secrets::from_lobby(&lobby()).unwrap();
        let target = decode_join_secret(&secrets.join).unwrap();
        assert_eq!(target.layer, "Steam");
        assert_eq!(target.code, "ABC123");
    }

    #[test]
    fn test_no_secrets_for_unjoinable_lobbies() {
        let mut locked = lobby();
        locked.privacy = LobbyPrivacy::Locked;
        assert!(Secrets::from_lobby(&locked).is_none());

        let mut no_invites = lobby();
        no_invites.allow_invites = false;
        assert!(Secrets::from_lobby(&no_invites).is_none());

        let mut no_code = lobby();
        no_code.code = Some(" ".to_string());
        assert!(Secrets::from_lobby(&no_code).is_none());

        let mut no_layer = lobby();
        no_layer.network_layer = None;
        assert!(Secrets::from_lobby(&no_layer).is_none());
    }

    #[test]
    fn test_default_large_image() {
        let asset = Asset::default();
        assert_eq!(asset.key, "icon");
        assert_eq!(asset.tooltip.as_deref(), Some("BONELAB"));
    }
}
