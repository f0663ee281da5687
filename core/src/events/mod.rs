//! Game events, level polling and the hook chains plugins use to
//! override default reactions.

mod event;
mod hooks;
mod level_watcher;
mod overwrites;

pub use event::{GameEvent, LevelInfo, LevelStatus, StreamStatus};
pub use hooks::{EventHooks, HookContext};
pub use level_watcher::LevelWatcher;
pub use overwrites::{HookId, HookResult, OverwriteChain};
