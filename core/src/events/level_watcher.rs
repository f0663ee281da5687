//! Turns polled scene streamer snapshots into level events.

use super::event::{GameEvent, LevelStatus, StreamStatus};

/// Remembers the last snapshot and reports what changed since.
#[derive(Debug, Default)]
pub struct LevelWatcher {
    last: Option<LevelStatus>,
}

impl LevelWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current snapshot. `None` means the streamer has no level
    /// yet and is ignored.
    ///
    /// Leaving a finished level reports `LevelUnloaded` for it before the
    /// event for the new snapshot.
    pub fn observe(&mut self, current: Option<LevelStatus>) -> Vec<GameEvent> {
        let Some(current) = current else {
            return Vec::new();
        };
        if self.last.as_ref() == Some(&current) {
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(last) = &self.last
            && last.status == StreamStatus::Done
            && current.status != StreamStatus::Done
        {
            events.push(GameEvent::LevelUnloaded(last.level.clone()));
        }
        match current.status {
            StreamStatus::Done => events.push(GameEvent::LevelLoaded(current.level.clone())),
            StreamStatus::Loading => events.push(GameEvent::LevelLoading(current.level.clone())),
            StreamStatus::Idle => {}
        }

        self.last = Some(current);
        events
    }

    pub fn current(&self) -> Option<&LevelStatus> {
        self.last.as_ref()
    }
}
