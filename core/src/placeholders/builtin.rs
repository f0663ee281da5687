//! Placeholders every installation provides.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use labpresence_types::strip_level_number;

use super::registry::{Placeholder, PlaceholderRegistry};
use crate::error::RegistryError;
use crate::session::{LobbyInfo, SharedSession};

/// Rendered when the value has no source right now (no level, no lobby).
pub const NOT_AVAILABLE: &str = "N/A";

/// Refresh floor while `%fps%` is shown. One update per 4 s keeps a
/// constantly changing figure within 5 updates per 20 s.
pub const FPS_MINIMUM_DELAY: f32 = 4.0;

/// Counts frames and publishes a frames-per-second figure once per second
/// of accumulated frame time.
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    fps: Arc<AtomicU32>,
    frames: u32,
    elapsed: f32,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call once per rendered frame with that frame's delta time.
    pub fn on_frame(&mut self, dt: f32) {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed >= 1.0 {
            self.fps.store(self.frames, Ordering::Relaxed);
            self.frames = 0;
            self.elapsed = 0.0;
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps.load(Ordering::Relaxed)
    }

    /// `%fps%`, reading the latest figure from this counter.
    pub fn placeholder(&self) -> Placeholder {
        let fps = Arc::clone(&self.fps);
        Placeholder::new("fps", move |_| Ok(fps.load(Ordering::Relaxed).to_string()))
            .with_minimum_delay(FPS_MINIMUM_DELAY)
    }
}

/// Register `%fps%`, the level/avatar/mod count placeholders and the
/// `%fusion_*%` lobby placeholders.
pub fn register_builtins(
    registry: &mut PlaceholderRegistry,
    frames: &FrameCounter,
    session: &SharedSession,
    remove_level_numbers: bool,
) -> Result<(), RegistryError> {
    registry.register(frames.placeholder())?;

    let s = session.clone();
    registry.register_fn("levelName", move |_| {
        let state = s.read();
        Ok(match &state.level {
            Some(level) if remove_level_numbers => strip_level_number(&level.title).to_string(),
            Some(level) => level.title.clone(),
            None => NOT_AVAILABLE.to_string(),
        })
    })?;

    let s = session.clone();
    registry.register_fn("avatarName", move |_| {
        Ok(s.read().avatar.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()))
    })?;
    let s = session.clone();
    registry.register_fn("codeModsCount", move |_| Ok(s.read().code_mods_count.to_string()))?;
    let s = session.clone();
    registry.register_fn("modsCount", move |_| Ok(s.read().mods_count.unwrap_or(0).to_string()))?;

    registry.register(lobby_placeholder(session, "fusion_lobbyName", LobbyInfo::display_name))?;
    registry.register(lobby_placeholder(session, "fusion_host", |l| l.host_name().to_string()))?;
    registry.register(lobby_placeholder(session, "fusion_currentPlayers", |l| {
        l.current_players.to_string()
    }))?;
    registry.register(lobby_placeholder(session, "fusion_maxPlayers", |l| l.max_players.to_string()))?;
    registry.register(lobby_placeholder(session, "fusion_privacy", |l| l.privacy.to_string()))?;
    Ok(())
}

fn lobby_placeholder<F>(session: &SharedSession, name: &str, value: F) -> Placeholder
where
    F: Fn(&LobbyInfo) -> String + Send + Sync + 'static,
{
    let session = session.clone();
    Placeholder::new(name, move |_| {
        Ok(session
            .read()
            .lobby
            .as_ref()
            .map_or_else(|| NOT_AVAILABLE.to_string(), &value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LevelInfo;
    use crate::placeholders::TemplateEngine;
    use crate::session::LobbyPrivacy;

    #[test]
    fn test_frame_counter_reports_once_per_second() {
        let mut counter = FrameCounter::new();
        for _ in 0..59 {
            counter.on_frame(1.0 / 60.0);
        }
        assert_eq!(counter.fps(), 0);

        // 0.25 s pushes the window past one second
        counter.on_frame(0.25);
        assert_eq!(counter.fps(), 60);

        let placeholder = counter.placeholder();
        assert_eq!(placeholder.resolve(&[]).unwrap(), "60");
        assert_eq!(placeholder.minimum_delay(), Some(FPS_MINIMUM_DELAY));
    }

    #[test]
    fn test_builtins_follow_session() {
        let session = SharedSession::new();
        let mut registry = PlaceholderRegistry::new();
        register_builtins(&mut registry, &FrameCounter::new(), &session, true).unwrap();
        let engine = TemplateEngine::new(&registry);

        assert_eq!(engine.apply("%levelName% | %fusion_lobbyName%"), "N/A | N/A");

        {
            let mut state = session.write();
            state.level = Some(LevelInfo::new("c2534c5a.Level.VoidG114", "15 - Void G114"));
            state.lobby = Some(LobbyInfo {
                id: 42,
                host: Some("Ford".to_string()),
                current_players: 3,
                max_players: 8,
                privacy: LobbyPrivacy::FriendsOnly,
                ..LobbyInfo::default()
            });
        }

        assert_eq!(
            engine.apply("%levelName% | %fusion_lobbyName% (%fusion_currentPlayers%/%fusion_maxPlayers%)"),
            "Void G114 | Ford's server (3/8)"
        );
        assert_eq!(engine.apply("%fusion_privacy% by %fusion_host%"), "Friends Only by Ford");
    }

    #[test]
    fn test_mod_counts_and_avatar() {
        let session = SharedSession::new();
        let mut registry = PlaceholderRegistry::new();
        register_builtins(&mut registry, &FrameCounter::new(), &session, true).unwrap();
        let engine = TemplateEngine::new(&registry);

        assert_eq!(engine.apply("%codeModsCount% melons, %modsCount% mods, %avatarName%"), "0 melons, 0 mods, N/A");

        {
            let mut state = session.write();
            state.code_mods_count = 12;
            state.mods_count = Some(85);
            state.avatar = Some("Strong".to_string());
        }
        assert_eq!(engine.apply("%codeModsCount% melons, %modsCount% mods, %avatarName%"), "12 melons, 85 mods, Strong");
    }

    #[test]
    fn test_level_numbers_kept_when_disabled() {
        let session = SharedSession::new();
        session.write().level = Some(LevelInfo::new("x", "01 - Descent"));
        let mut registry = PlaceholderRegistry::new();
        register_builtins(&mut registry, &FrameCounter::new(), &session, false).unwrap();

        assert_eq!(TemplateEngine::new(&registry).apply("%levelName%"), "01 - Descent");
    }
}
