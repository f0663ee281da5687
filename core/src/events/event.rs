//! Game lifecycle events that drive profile selection.

use std::fmt;

/// A level crate as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LevelInfo {
    pub barcode: String,
    pub title: String,
}

impl LevelInfo {
    pub fn new(barcode: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            title: title.into(),
        }
    }
}

/// Scene streamer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Idle,
    Loading,
    Done,
}

/// One polled snapshot of the scene streamer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStatus {
    pub level: LevelInfo,
    pub status: StreamStatus,
}

impl LevelStatus {
    pub fn new(level: LevelInfo, status: StreamStatus) -> Self {
        Self { level, status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Mod initialised, game still booting
    PreGame,
    MarrowGameStarted,
    AssetWarehouseLoaded,
    LevelLoading(LevelInfo),
    LevelLoaded(LevelInfo),
    LevelUnloaded(LevelInfo),
}

impl GameEvent {
    pub fn level(&self) -> Option<&LevelInfo> {
        match self {
            GameEvent::LevelLoading(level) | GameEvent::LevelLoaded(level) | GameEvent::LevelUnloaded(level) => {
                Some(level)
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::PreGame => "PreGame",
            GameEvent::MarrowGameStarted => "MarrowGameStarted",
            GameEvent::AssetWarehouseLoaded => "AssetWarehouseLoaded",
            GameEvent::LevelLoading(_) => "LevelLoading",
            GameEvent::LevelLoaded(_) => "LevelLoaded",
            GameEvent::LevelUnloaded(_) => "LevelUnloaded",
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level() {
            Some(level) => write!(f, "{} ({})", self.name(), level.title),
            None => f.write_str(self.name()),
        }
    }
}
