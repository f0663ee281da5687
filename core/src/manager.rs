//! Ties the registries, hooks and scheduler to the game's lifecycle.
//!
//! The host drives a [`RichPresenceManager`] from its main loop: game
//! events go to [`handle_event`](RichPresenceManager::handle_event) (or
//! [`observe_level`](RichPresenceManager::observe_level) for polled scene
//! state), lobby and gamemode changes to their setters, and every frame to
//! [`update`](RichPresenceManager::update).

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use labpresence_types::{MultiplayerConfig, PresenceConfig, RpcConfig, TimeMode};

use crate::error::{PublishError, RegistryError, SecretError};
use crate::events::{EventHooks, GameEvent, HookContext, LevelStatus, LevelWatcher};
use crate::gamemodes::{self, ActiveGamemode, Gamemode, GamemodeRegistry, KnownGamemodeKeys};
use crate::placeholders::{FrameCounter, PlaceholderRegistry, register_builtins};
use crate::plugins::{Plugin, PluginContext, PluginManager};
use crate::presence::{
    Asset, DayRolloverClock, Party, PresencePublisher, PresenceRequest, PresenceScheduler, Secrets, TickOutcome,
    Timestamp, TimestampOverride, decode_join_secret,
};
use crate::session::{LobbyInfo, LobbyPrivacy, SharedSession};

/// Origin of the "time in lobby" timestamp override.
pub const LOBBY_TIMESTAMP_ORIGIN: &str = "lobby";

/// Profiles from the config files. Each is shared so the scheduler can tell
/// a profile switch from a refresh of the same profile.
#[derive(Debug)]
struct Profiles {
    pre_game_started: Arc<RpcConfig>,
    asset_warehouse_loaded: Arc<RpcConfig>,
    level_loaded: Arc<RpcConfig>,
    level_loading: Arc<RpcConfig>,
    lobby_level_loaded: Arc<RpcConfig>,
    lobby_level_loading: Arc<RpcConfig>,
}

impl Profiles {
    fn new(presence: &PresenceConfig, multiplayer: &MultiplayerConfig) -> Self {
        Self {
            pre_game_started: Arc::new(presence.pre_game_started.clone()),
            asset_warehouse_loaded: Arc::new(presence.asset_warehouse_loaded.clone()),
            level_loaded: Arc::new(presence.level_loaded.clone()),
            level_loading: Arc::new(presence.level_loading.clone()),
            lobby_level_loaded: Arc::new(multiplayer.level_loaded.clone()),
            lobby_level_loading: Arc::new(multiplayer.level_loading.clone()),
        }
    }
}

pub struct RichPresenceManager<P: PresencePublisher> {
    presence_config: PresenceConfig,
    multiplayer_config: MultiplayerConfig,
    profiles: Profiles,

    registry: PlaceholderRegistry,
    gamemodes: GamemodeRegistry,
    known_gamemode_keys: KnownGamemodeKeys,
    hooks: EventHooks,
    plugins: PluginManager,

    scheduler: PresenceScheduler,
    publisher: P,

    frames: FrameCounter,
    session: SharedSession,
    level_watcher: LevelWatcher,
    day_clock: DayRolloverClock,
    today: Box<dyn Fn() -> NaiveDate + Send>,

    /// The request last installed, before lobby extras were added
    base_request: Option<PresenceRequest>,
    gamemode: Option<ActiveGamemode>,
    gamemode_image: Option<Asset>,
    lobby_since: Option<Timestamp>,
    loading: bool,
}

impl<P: PresencePublisher> RichPresenceManager<P> {
    /// Set up a manager with the builtin placeholders registered. Plugins
    /// may be added until [`start`](Self::start).
    pub fn new(
        presence_config: PresenceConfig,
        multiplayer_config: MultiplayerConfig,
        publisher: P,
    ) -> Result<Self, RegistryError> {
        let frames = FrameCounter::new();
        let session = SharedSession::new();
        let mut registry = PlaceholderRegistry::new();
        register_builtins(&mut registry, &frames, &session, presence_config.remove_level_numbers)?;

        Ok(Self {
            profiles: Profiles::new(&presence_config, &multiplayer_config),
            scheduler: PresenceScheduler::new(presence_config.refresh_delay),
            presence_config,
            multiplayer_config,
            registry,
            gamemodes: GamemodeRegistry::new(),
            known_gamemode_keys: KnownGamemodeKeys::default(),
            hooks: EventHooks::new(),
            plugins: PluginManager::new(),
            publisher,
            frames,
            session,
            level_watcher: LevelWatcher::new(),
            day_clock: DayRolloverClock::new(),
            today: Box::new(|| Local::now().date_naive()),
            base_request: None,
            gamemode: None,
            gamemode_image: None,
            lobby_since: None,
            loading: false,
        })
    }

    // ─── Setup ──────────────────────────────────────────────────────────────

    pub fn register_plugin(&mut self, plugin: Box<dyn Plugin>) -> Result<(), RegistryError> {
        let mut ctx = PluginContext {
            placeholders: &mut self.registry,
            gamemodes: &mut self.gamemodes,
            hooks: &mut self.hooks,
        };
        self.plugins.register(plugin, &mut ctx)
    }

    pub fn placeholders(&self) -> &PlaceholderRegistry {
        &self.registry
    }

    pub fn placeholders_mut(&mut self) -> &mut PlaceholderRegistry {
        &mut self.registry
    }

    pub fn gamemodes_mut(&mut self) -> &mut GamemodeRegistry {
        &mut self.gamemodes
    }

    pub fn hooks_mut(&mut self) -> &mut EventHooks {
        &mut self.hooks
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    /// Replace the local calendar used by the `CurrentTime` clock, e.g.
    /// with an in-game date.
    pub fn set_date_source<F>(&mut self, today: F)
    where
        F: Fn() -> NaiveDate + Send + 'static,
    {
        self.today = Box::new(today);
    }

    pub fn set_known_gamemode_keys(&mut self, keys: KnownGamemodeKeys) {
        self.known_gamemode_keys = keys;
    }

    /// Handle for writing avatar and mod counts read by the builtin
    /// placeholders.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn frame_counter(&self) -> &FrameCounter {
        &self.frames
    }

    pub fn scheduler(&self) -> &PresenceScheduler {
        &self.scheduler
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    pub fn presence_config(&self) -> &PresenceConfig {
        &self.presence_config
    }

    pub fn multiplayer_config(&self) -> &MultiplayerConfig {
        &self.multiplayer_config
    }

    /// Whether incoming join requests should be shown to the player.
    pub fn shows_join_requests(&self) -> bool {
        self.multiplayer_config.show_join_request_popup
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Seal the registry, set the initial timestamp and show the pre-game
    /// profile. Calling it twice does nothing.
    pub fn start(&mut self) -> Option<TickOutcome> {
        if self.registry.is_sealed() {
            tracing::warn!("Rich presence already started");
            return None;
        }
        self.registry.seal();

        let base = match self.presence_config.time_mode {
            TimeMode::GameSession => Some(Timestamp::now()),
            TimeMode::CurrentTime => Some(self.local_midnight()),
            TimeMode::Level => None,
        };
        self.scheduler.timestamps_mut().set_base(base);

        tracing::info!(
            placeholders = self.registry.len(),
            gamemodes = self.gamemodes.len(),
            plugins = self.plugins.len(),
            time_mode = ?self.presence_config.time_mode,
            "Rich presence started"
        );
        self.handle_event(GameEvent::PreGame)
    }

    /// Clear the presence. The manager stays usable; the next event
    /// installs a profile again.
    pub fn shutdown(&mut self) -> Result<(), PublishError> {
        tracing::info!("Clearing rich presence");
        self.base_request = None;
        self.scheduler.clear(&mut self.publisher)
    }

    /// Call once per frame.
    pub fn update(&mut self, dt: f32) -> TickOutcome {
        self.frames.on_frame(dt);

        if self.presence_config.time_mode == TimeMode::CurrentTime && self.day_clock.poll(dt, &self.today) {
            tracing::debug!("Day changed, resetting clock timestamp");
            let midnight = self.local_midnight();
            self.scheduler.timestamps_mut().set_base(Some(midnight));
            self.scheduler.request_refresh();
        }

        if self.scheduler.is_due(dt, &self.registry) {
            self.refresh_extras();
        }
        self.scheduler.tick(dt, &self.registry, &mut self.publisher)
    }

    // ─── Game events ────────────────────────────────────────────────────────

    /// Record `event` and show the profile for it. `None` when nothing new
    /// was installed (no profile for the event, or a hook kept the current
    /// one).
    pub fn handle_event(&mut self, event: GameEvent) -> Option<TickOutcome> {
        tracing::debug!(event = %event, "Game event");
        match &event {
            GameEvent::LevelLoading(level) => {
                self.session.write().level = Some(level.clone());
                self.loading = true;
            }
            GameEvent::LevelLoaded(level) => {
                self.session.write().level = Some(level.clone());
                self.loading = false;
                if self.presence_config.time_mode == TimeMode::Level {
                    self.scheduler.timestamps_mut().set_base(Some(Timestamp::now()));
                }
            }
            GameEvent::LevelUnloaded(_) => {
                self.session.write().level = None;
                self.loading = false;
            }
            GameEvent::PreGame | GameEvent::MarrowGameStarted | GameEvent::AssetWarehouseLoaded => {}
        }
        self.activate_for_event(event)
    }

    /// Feed a polled scene streamer snapshot. Returns the events it caused.
    pub fn observe_level(&mut self, status: Option<LevelStatus>) -> Vec<GameEvent> {
        let events = self.level_watcher.observe(status);
        for event in &events {
            self.handle_event(event.clone());
        }
        events
    }

    fn activate_for_event(&mut self, event: GameEvent) -> Option<TickOutcome> {
        let mut ctx = HookContext::new(event, self.session.is_connected());
        let request = if self.hooks.run(&mut ctx) {
            ctx.request?
        } else {
            PresenceRequest::new(self.default_profile(&ctx.event)?)
        };
        Some(self.activate(request))
    }

    fn default_profile(&self, event: &GameEvent) -> Option<Arc<RpcConfig>> {
        let connected = self.session.is_connected();
        let profile = match event {
            GameEvent::PreGame => &self.profiles.pre_game_started,
            GameEvent::AssetWarehouseLoaded => &self.profiles.asset_warehouse_loaded,
            GameEvent::LevelLoading(_) if connected => &self.profiles.lobby_level_loading,
            GameEvent::LevelLoading(_) => &self.profiles.level_loading,
            GameEvent::LevelLoaded(_) if connected => &self.profiles.lobby_level_loaded,
            GameEvent::LevelLoaded(_) => &self.profiles.level_loaded,
            GameEvent::MarrowGameStarted | GameEvent::LevelUnloaded(_) => return None,
        };
        Some(Arc::clone(profile))
    }

    fn activate(&mut self, request: PresenceRequest) -> TickOutcome {
        let decorated = self.decorate(request.clone());
        let outcome = self.scheduler.set_active(decorated, &self.registry, &mut self.publisher);
        if outcome != TickOutcome::Disabled {
            self.base_request = Some(request);
        }
        outcome
    }

    /// Fill in what the request leaves unset from the lobby and gamemode.
    fn decorate(&self, mut request: PresenceRequest) -> PresenceRequest {
        let session = self.session.read();
        if let Some(lobby) = &session.lobby {
            if request.party.is_none() {
                request.party = Party::from_lobby(lobby);
            }
            if request.secrets.is_none() {
                request.secrets = self.lobby_secrets(lobby);
            }
            if request.small_image.is_none() {
                request.small_image = self.gamemode_image.clone();
            }
        }
        request
    }

    fn lobby_secrets(&self, lobby: &LobbyInfo) -> Option<Secrets> {
        if self.loading {
            return None;
        }
        if !self.multiplayer_config.allow_players_to_invite && lobby.privacy != LobbyPrivacy::Public {
            return None;
        }
        Secrets::from_lobby(lobby)
    }

    /// Recompute lobby and gamemode extras for the active profile. They go
    /// out with the next refresh.
    fn refresh_extras(&mut self) {
        self.update_gamemode();
        if let Some(base) = self.base_request.clone() {
            let decorated = self.decorate(base);
            self.scheduler.set_active(decorated, &self.registry, &mut self.publisher);
        }
    }

    // ─── Multiplayer ────────────────────────────────────────────────────────

    /// Update the connected lobby. Call whenever its info changes.
    ///
    /// Connecting or disconnecting switches between the single player and
    /// lobby profiles for the current level.
    pub fn set_lobby(&mut self, lobby: Option<LobbyInfo>) -> Option<TickOutcome> {
        let was_connected = self.session.is_connected();
        let connected = lobby.is_some();
        self.session.write().lobby = lobby;

        if connected == was_connected {
            self.refresh_extras();
            return None;
        }

        if connected {
            tracing::info!("Connected to lobby");
            self.lobby_since = Some(Timestamp::now());
            self.apply_lobby_timestamp();
        } else {
            tracing::info!("Disconnected from lobby");
            self.lobby_since = None;
            self.scheduler.timestamps_mut().reset_override(LOBBY_TIMESTAMP_ORIGIN);
            self.set_gamemode(None);
        }

        self.refresh_extras();
        let event = self.current_level_event()?;
        self.activate_for_event(event)
    }

    /// Set or clear the gamemode running in the lobby.
    pub fn set_gamemode(&mut self, gamemode: Option<ActiveGamemode>) {
        if self.gamemode == gamemode {
            return;
        }
        if let Some(previous) = self.gamemode.take() {
            tracing::debug!(gamemode = %previous.barcode, "Gamemode ended");
            let origin = gamemodes::override_origin(&previous.barcode);
            if self.scheduler.timestamps_mut().reset_override(&origin) {
                self.apply_lobby_timestamp();
            }
        }
        if let Some(next) = &gamemode {
            tracing::debug!(gamemode = %next.barcode, title = %next.title, "Gamemode started");
        }
        self.gamemode = gamemode;
        self.refresh_extras();
    }

    /// Act on a join secret from Discord. Returns whether a join hook took
    /// it; `false` when already in that lobby or nothing handles joins.
    pub fn handle_join_secret(&mut self, secret: &str) -> Result<bool, SecretError> {
        let mut target = decode_join_secret(secret)?;

        let in_lobby = self
            .session
            .read()
            .lobby
            .as_ref()
            .and_then(|lobby| lobby.code.as_deref())
            .is_some_and(|code| code == target.code);
        if in_lobby {
            tracing::warn!(code = %target.code, "Already in the lobby, ignoring join");
            return Ok(false);
        }

        tracing::info!(layer = %target.layer, "Joining lobby");
        Ok(self.hooks.join.run(&mut target))
    }

    fn local_midnight(&self) -> Timestamp {
        Timestamp::midnight_of((self.today)(), &Local).unwrap_or_else(Timestamp::now)
    }

    fn current_level_event(&self) -> Option<GameEvent> {
        let level = self.session.read().level.clone()?;
        Some(if self.loading {
            GameEvent::LevelLoading(level)
        } else {
            GameEvent::LevelLoaded(level)
        })
    }

    fn apply_lobby_timestamp(&mut self) {
        if self.presence_config.time_mode != TimeMode::Level || !self.multiplayer_config.override_time_to_lobby {
            return;
        }
        if let Some(since) = self.lobby_since
            && self.scheduler.timestamps().override_origin().is_none()
        {
            self.scheduler
                .timestamps_mut()
                .set_override(TimestampOverride::new(since, LOBBY_TIMESTAMP_ORIGIN));
        }
    }

    /// Poll the active gamemode's providers and apply its small image,
    /// minimum delay and timestamp override.
    fn update_gamemode(&mut self) {
        let Some(active) = &self.gamemode else {
            self.gamemode_image = None;
            self.scheduler.set_extra_minimum_delay(None);
            return;
        };
        let registered = self.gamemodes.get(&active.barcode);

        let tooltip = match registered {
            Some(gamemode) if self.multiplayer_config.show_custom_gamemode_tooltips => gamemode.tooltip(),
            _ => String::new(),
        };
        let minimum_delay = registered
            .filter(|_| !tooltip.is_empty())
            .and_then(Gamemode::minimum_delay);
        self.scheduler.set_extra_minimum_delay(minimum_delay);

        let mut restore_lobby = false;
        if let Some(gamemode) = registered {
            let origin = gamemode.override_origin();
            match gamemode.override_time() {
                Some(timestamp) => self
                    .scheduler
                    .timestamps_mut()
                    .set_override(TimestampOverride::new(timestamp, origin)),
                None => restore_lobby = self.scheduler.timestamps_mut().reset_override(&origin),
            }
        }

        let key = self.known_gamemode_keys.key_for(&active.barcode);
        let text = if tooltip.is_empty() {
            active.title.clone()
        } else {
            tooltip
        };
        self.gamemode_image = Some(Asset::new(key, text));

        if restore_lobby {
            self.apply_lobby_timestamp();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    use super::*;
    use crate::events::{LevelInfo, StreamStatus};
    use crate::presence::{Presence, PublishOutcome, encode_join_secret};

    #[derive(Default)]
    struct Recorder {
        sent: Vec<Presence>,
        cleared: usize,
        failing: bool,
    }

    impl Recorder {
        fn last(&self) -> &Presence {
            self.sent.last().unwrap()
        }
    }

    impl PresencePublisher for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn is_ready(&self) -> bool {
            true
        }

        fn publish(&mut self, presence: &Presence) -> Result<PublishOutcome, PublishError> {
            if self.failing {
                return Err(PublishError::Transport("pipe closed".to_string()));
            }
            self.sent.push(presence.clone());
            Ok(PublishOutcome::Sent)
        }

        fn clear(&mut self) -> Result<(), PublishError> {
            self.cleared += 1;
            Ok(())
        }
    }

    fn manager() -> RichPresenceManager<Recorder> {
        manager_with(PresenceConfig::default())
    }

    fn manager_with(config: PresenceConfig) -> RichPresenceManager<Recorder> {
        RichPresenceManager::new(config, MultiplayerConfig::default(), Recorder::default()).unwrap()
    }

    fn void() -> LevelInfo {
        LevelInfo::new("c2534c5a-4a2b-4a38-9a52-4d2ea2c6f3a1", "15 - Void G114")
    }

    fn lobby() -> LobbyInfo {
        LobbyInfo {
            id: 76561198000000000,
            name: Some("Gun range".to_string()),
            host: Some("HAHOOS".to_string()),
            current_players: 3,
            max_players: 8,
            privacy: LobbyPrivacy::Public,
            network_layer: Some("Steam".to_string()),
            code: Some("ABC123".to_string()),
            allow_invites: true,
        }
    }

    #[test]
    fn test_start_shows_pre_game_profile() {
        let mut manager = manager();
        manager.session().write().code_mods_count = 12;

        let outcome = manager.start();
        assert_eq!(outcome, Some(TickOutcome::Published(PublishOutcome::Sent)));
        let presence = manager.publisher().last();
        assert_eq!(presence.details.as_deref(), Some("Game loading..."));
        assert_eq!(presence.state.as_deref(), Some("12 melons"));
        assert!(presence.timestamps.is_some());
        assert!(manager.placeholders().is_sealed());

        assert_eq!(manager.start(), None);
        assert_eq!(manager.publisher().sent.len(), 1);
    }

    #[test]
    fn test_level_events_pick_profiles() {
        let mut manager = manager();
        manager.start();
        manager.session().write().avatar = Some("Strong".to_string());

        manager.handle_event(GameEvent::LevelLoading(void()));
        assert_eq!(manager.publisher().last().details.as_deref(), Some("Loading Void G114"));

        manager.handle_event(GameEvent::LevelLoaded(void()));
        let presence = manager.publisher().last();
        assert_eq!(presence.details.as_deref(), Some("Level: Void G114"));
        assert_eq!(presence.state.as_deref(), Some("Avatar: Strong"));

        assert_eq!(manager.handle_event(GameEvent::MarrowGameStarted), None);
        assert_eq!(manager.handle_event(GameEvent::LevelUnloaded(void())), None);
    }

    #[test]
    fn test_level_numbers_kept_when_configured() {
        let config = PresenceConfig {
            remove_level_numbers: false,
            ..PresenceConfig::default()
        };
        let mut manager = manager_with(config);
        manager.start();
        manager.handle_event(GameEvent::LevelLoading(void()));
        assert_eq!(manager.publisher().last().details.as_deref(), Some("Loading 15 - Void G114"));
    }

    #[test]
    fn test_disabled_profile_keeps_current() {
        let config = PresenceConfig {
            level_loading: RpcConfig::disabled(),
            ..PresenceConfig::default()
        };
        let mut manager = manager_with(config);
        manager.start();

        assert_eq!(manager.handle_event(GameEvent::LevelLoading(void())), Some(TickOutcome::Disabled));
        assert_eq!(manager.publisher().sent.len(), 1);
        assert_eq!(manager.publisher().last().details.as_deref(), Some("Game loading..."));
    }

    #[test]
    fn test_hook_overrides_profile() {
        let mut manager = manager();
        let custom = Arc::new(RpcConfig::new("Speedrunning %levelName%"));
        manager.hooks_mut().level_loaded.register(0, move |ctx: &mut HookContext| {
            ctx.request = Some(PresenceRequest::new(Arc::clone(&custom)));
            Ok(true)
        });
        manager.hooks_mut().level_loading.register(0, |_: &mut HookContext| Ok(true));
        manager.start();

        assert_eq!(manager.handle_event(GameEvent::LevelLoading(void())), None);
        manager.handle_event(GameEvent::LevelLoaded(void()));
        assert_eq!(manager.publisher().last().details.as_deref(), Some("Speedrunning Void G114"));
    }

    #[test]
    fn test_lobby_switches_profile_and_adds_party() {
        let mut manager = manager();
        manager.start();
        manager.handle_event(GameEvent::LevelLoaded(void()));

        manager.set_lobby(Some(lobby()));
        let presence = manager.publisher().last();
        assert_eq!(presence.details.as_deref(), Some("Void G114"));
        assert_eq!(presence.state.as_deref(), Some("Gun range"));
        let party = presence.party.as_ref().unwrap();
        assert_eq!((party.size, party.max), (3, 8));
        let join = &presence.secrets.as_ref().unwrap().join;
        assert_eq!(join, &encode_join_secret("Steam", "ABC123"));

        manager.set_lobby(None);
        let presence = manager.publisher().last();
        assert_eq!(presence.details.as_deref(), Some("Level: Void G114"));
        assert_eq!(presence.party, None);
        assert_eq!(presence.secrets, None);
    }

    #[test]
    fn test_no_secrets_while_loading_or_private() {
        let mut manager = manager();
        manager.start();
        manager.set_lobby(Some(lobby()));
        manager.handle_event(GameEvent::LevelLoading(void()));
        let presence = manager.publisher().last();
        assert_eq!(presence.details.as_deref(), Some("Loading Void G114"));
        assert!(presence.party.is_some());
        assert_eq!(presence.secrets, None);

        let config = MultiplayerConfig {
            allow_players_to_invite: false,
            ..MultiplayerConfig::default()
        };
        let mut manager = RichPresenceManager::new(PresenceConfig::default(), config, Recorder::default()).unwrap();
        manager.start();
        let private = LobbyInfo {
            privacy: LobbyPrivacy::FriendsOnly,
            ..lobby()
        };
        manager.set_lobby(Some(private));
        manager.handle_event(GameEvent::LevelLoaded(void()));
        assert_eq!(manager.publisher().last().secrets, None);
    }

    #[test]
    fn test_gamemode_small_image_and_delay() {
        let mut manager = manager();
        manager
            .gamemodes_mut()
            .register(
                Gamemode::new("Lakatrazz.Deathmatch")
                    .with_tooltip(|| Ok("3 kills".to_string()))
                    .with_minimum_delay(5.0),
            )
            .unwrap();
        let mut keys = KnownGamemodeKeys::default();
        keys.insert("Lakatrazz.Deathmatch", "deathmatch");
        manager.set_known_gamemode_keys(keys);
        manager.start();
        manager.set_lobby(Some(lobby()));
        manager.handle_event(GameEvent::LevelLoaded(void()));

        manager.set_gamemode(Some(ActiveGamemode::new("Lakatrazz.Deathmatch", "Deathmatch")));
        assert_eq!(manager.scheduler().effective_delay(manager.placeholders()), 5.0);
        let small = manager.scheduler().active().unwrap().small_image.clone();
        assert_eq!(small, Some(Asset::new("deathmatch", "3 kills")));

        manager.set_gamemode(Some(ActiveGamemode::new("Someone.Tag", "Tag")));
        let small = manager.scheduler().active().unwrap().small_image.clone();
        assert_eq!(small, Some(Asset::new("unknown_gamemode", "Tag")));
        assert_eq!(manager.scheduler().effective_delay(manager.placeholders()), 0.75);

        manager.set_gamemode(None);
        assert_eq!(manager.scheduler().active().unwrap().small_image, None);
    }

    #[test]
    fn test_panicking_gamemode_keeps_presence() {
        let mut manager = manager();
        manager
            .gamemodes_mut()
            .register(
                Gamemode::new("Lakatrazz.Smash Bones")
                    .with_tooltip(|| panic!("tooltip bug"))
                    .with_override_time(|| panic!("timer bug")),
            )
            .unwrap();
        manager.start();
        manager.set_lobby(Some(lobby()));
        manager.handle_event(GameEvent::LevelLoaded(void()));

        manager.set_gamemode(Some(ActiveGamemode::new("Lakatrazz.Smash Bones", "Smash Bones")));
        let small = manager.scheduler().active().unwrap().small_image.clone();
        assert_eq!(small, Some(Asset::new("unknown_gamemode", "Smash Bones")));
        assert_eq!(manager.scheduler().timestamps().override_origin(), None);
        assert!(matches!(manager.update(10.0), TickOutcome::Published(_)));
    }

    #[test]
    fn test_lobby_and_gamemode_timestamps() {
        let config = PresenceConfig {
            time_mode: TimeMode::Level,
            ..PresenceConfig::default()
        };
        let mut manager = manager_with(config);
        let round = Timestamp::new(Some(1_000), Some(61_000));
        manager
            .gamemodes_mut()
            .register(Gamemode::new("Lakatrazz.Hide And Seek").with_override_time(move || Ok(Some(round))))
            .unwrap();
        manager.start();
        assert_eq!(manager.scheduler().timestamps().effective(), None);

        manager.handle_event(GameEvent::LevelLoaded(void()));
        assert!(manager.scheduler().timestamps().base().is_some());

        manager.set_lobby(Some(lobby()));
        assert_eq!(manager.scheduler().timestamps().override_origin(), Some(LOBBY_TIMESTAMP_ORIGIN));

        manager.set_gamemode(Some(ActiveGamemode::new("Lakatrazz.Hide And Seek", "Hide And Seek")));
        assert_eq!(
            manager.scheduler().timestamps().override_origin(),
            Some("gamemode:Lakatrazz.Hide And Seek")
        );
        assert_eq!(manager.scheduler().timestamps().effective(), Some(round));

        manager.set_gamemode(None);
        assert_eq!(manager.scheduler().timestamps().override_origin(), Some(LOBBY_TIMESTAMP_ORIGIN));

        manager.set_lobby(None);
        assert_eq!(manager.scheduler().timestamps().override_origin(), None);
    }

    #[test]
    fn test_join_secret() {
        let mut manager = manager();
        let joins = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&joins);
        manager.hooks_mut().join.register(0, move |target| {
            assert_eq!(target.layer, "Steam");
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(true)
        });

        assert!(manager.handle_join_secret(&encode_join_secret("Steam", "XYZ")).unwrap());
        manager.set_lobby(Some(lobby()));
        assert!(!manager.handle_join_secret(&encode_join_secret("Steam", "ABC123")).unwrap());
        assert_eq!(joins.load(Ordering::Relaxed), 1);

        assert_eq!(manager.handle_join_secret("").unwrap_err(), SecretError::Empty);
    }

    #[test]
    fn test_update_refreshes_on_delay() {
        let config = PresenceConfig {
            refresh_delay: 2.0,
            ..PresenceConfig::default()
        };
        let mut manager = manager_with(config);
        manager.start();

        for _ in 0..3 {
            assert_eq!(manager.update(0.5), TickOutcome::Waiting);
        }
        assert_eq!(manager.update(0.5), TickOutcome::Published(PublishOutcome::Sent));
        assert_eq!(manager.publisher().sent.len(), 2);
        assert_eq!(manager.frame_counter().fps(), 2);
    }

    #[test]
    fn test_day_rollover_resets_clock() {
        let config = PresenceConfig {
            time_mode: TimeMode::CurrentTime,
            refresh_delay: 60.0,
            ..PresenceConfig::default()
        };
        let mut manager = manager_with(config);
        let day = Arc::new(AtomicU32::new(1));
        let source = Arc::clone(&day);
        manager.set_date_source(move || NaiveDate::from_ymd_opt(2024, 3, source.load(Ordering::Relaxed)).unwrap());
        manager.start();
        let first = manager.scheduler().timestamps().base().unwrap();
        assert_eq!(manager.publisher().last().timestamps, Some(first));

        // first clock check only records the day
        assert_eq!(manager.update(5.0), TickOutcome::Waiting);
        day.store(2, Ordering::Relaxed);
        assert_eq!(manager.update(4.0), TickOutcome::Waiting);
        assert_eq!(manager.update(1.0), TickOutcome::Published(PublishOutcome::Sent));

        let second = manager.scheduler().timestamps().base().unwrap();
        assert_ne!(second, first);
        assert_eq!(manager.publisher().sent.len(), 2);
        assert_eq!(manager.publisher().last().timestamps, Some(second));
    }

    #[test]
    fn test_day_rollover_frame_counts_toward_interval() {
        let config = PresenceConfig {
            time_mode: TimeMode::CurrentTime,
            refresh_delay: 60.0,
            ..PresenceConfig::default()
        };
        let mut manager = manager_with(config);
        let day = Arc::new(AtomicU32::new(1));
        let source = Arc::clone(&day);
        manager.set_date_source(move || NaiveDate::from_ymd_opt(2024, 3, source.load(Ordering::Relaxed)).unwrap());
        manager.start();

        manager.update(5.0);
        day.store(2, Ordering::Relaxed);
        manager.publisher_mut().failing = true;
        assert!(matches!(
            manager.update(5.0),
            TickOutcome::Failed(PublishError::Transport(_))
        ));
        assert_eq!(manager.scheduler().elapsed(), 10.0);
    }

    #[test]
    fn test_observe_level_drives_events() {
        let mut manager = manager();
        manager.start();

        let events = manager.observe_level(Some(LevelStatus::new(void(), StreamStatus::Loading)));
        assert_eq!(events, vec![GameEvent::LevelLoading(void())]);
        manager.observe_level(Some(LevelStatus::new(void(), StreamStatus::Done)));
        assert_eq!(manager.publisher().last().details.as_deref(), Some("Level: Void G114"));
    }

    #[test]
    fn test_shutdown_clears() {
        let mut manager = manager();
        manager.start();
        manager.shutdown().unwrap();
        assert_eq!(manager.publisher().cleared, 1);
        assert_eq!(manager.update(10.0), TickOutcome::Idle);
    }
}
