//! Per-event overwrite chains.

use super::event::GameEvent;
use super::overwrites::OverwriteChain;
use crate::presence::{JoinTarget, PresenceRequest};

/// What a hook sees and may change.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub event: GameEvent,
    /// Whether a multiplayer lobby is connected
    pub connected: bool,
    /// Presence to install once the chain is done. A handler that returns
    /// `Ok(true)` without setting this keeps the current presence.
    pub request: Option<PresenceRequest>,
}

impl HookContext {
    pub fn new(event: GameEvent, connected: bool) -> Self {
        Self {
            event,
            connected,
            request: None,
        }
    }
}

/// One chain per game event, plus the join chain.
#[derive(Debug)]
pub struct EventHooks {
    pub pre_game: OverwriteChain<HookContext>,
    pub marrow_game_started: OverwriteChain<HookContext>,
    pub asset_warehouse_loaded: OverwriteChain<HookContext>,
    pub level_loading: OverwriteChain<HookContext>,
    pub level_loaded: OverwriteChain<HookContext>,
    pub level_unloaded: OverwriteChain<HookContext>,
    /// Runs when the user accepted an invite or pressed "Join"
    pub join: OverwriteChain<JoinTarget>,
}

impl Default for EventHooks {
    fn default() -> Self {
        Self {
            pre_game: OverwriteChain::new("PreGame"),
            marrow_game_started: OverwriteChain::new("MarrowGameStarted"),
            asset_warehouse_loaded: OverwriteChain::new("AssetWarehouseLoaded"),
            level_loading: OverwriteChain::new("LevelLoading"),
            level_loaded: OverwriteChain::new("LevelLoaded"),
            level_unloaded: OverwriteChain::new("LevelUnloaded"),
            join: OverwriteChain::new("Join"),
        }
    }
}

impl EventHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain_mut(&mut self, event: &GameEvent) -> &mut OverwriteChain<HookContext> {
        match event {
            GameEvent::PreGame => &mut self.pre_game,
            GameEvent::MarrowGameStarted => &mut self.marrow_game_started,
            GameEvent::AssetWarehouseLoaded => &mut self.asset_warehouse_loaded,
            GameEvent::LevelLoading(_) => &mut self.level_loading,
            GameEvent::LevelLoaded(_) => &mut self.level_loaded,
            GameEvent::LevelUnloaded(_) => &mut self.level_unloaded,
        }
    }

    /// Run the chain for `ctx.event`. Returns whether a hook handled it.
    pub fn run(&mut self, ctx: &mut HookContext) -> bool {
        let event = ctx.event.clone();
        self.chain_mut(&event).run(ctx)
    }
}
