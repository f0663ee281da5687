//! Priority-ordered handler chains that let plugins take over an event.
//!
//! Handlers are tried from highest to lowest priority until one reports
//! that it handled the event. When none does, the caller falls back to
//! its own behaviour.

use std::panic::{self, AssertUnwindSafe};

use crate::error::ProviderError;

/// `Ok(true)` stops the chain. `Ok(false)` and errors pass to the next
/// handler.
pub type HookResult = Result<bool, ProviderError>;

type Handler<T> = Box<dyn FnMut(&mut T) -> HookResult + Send>;

/// Identifies a registered handler for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

struct Entry<T> {
    id: HookId,
    priority: i32,
    handler: Handler<T>,
}

pub struct OverwriteChain<T> {
    name: &'static str,
    entries: Vec<Entry<T>>,
    next_id: u64,
}

impl<T> std::fmt::Debug for OverwriteChain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverwriteChain")
            .field("name", &self.name)
            .field("handlers", &self.entries.len())
            .finish()
    }
}

impl<T> OverwriteChain<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Add a handler. Among equal priorities, earlier registrations run
    /// first.
    pub fn register<F>(&mut self, priority: i32, handler: F) -> HookId
    where
        F: FnMut(&mut T) -> HookResult + Send + 'static,
    {
        let id = HookId(self.next_id);
        self.next_id += 1;

        let index = self
            .entries
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            index,
            Entry {
                id,
                priority,
                handler: Box::new(handler),
            },
        );
        id
    }

    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn is_registered(&self, id: HookId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the chain. Returns whether a registered handler took the event.
    pub fn run(&mut self, arg: &mut T) -> bool {
        for entry in &mut self.entries {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (entry.handler)(arg)));
            match outcome {
                Ok(Ok(true)) => {
                    tracing::debug!(chain = self.name, priority = entry.priority, "Event handled by overwrite");
                    return true;
                }
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    tracing::error!(chain = self.name, error = %e, "Overwrite handler failed");
                }
                Err(_) => {
                    tracing::error!(chain = self.name, "Overwrite handler panicked");
                }
            }
        }
        false
    }
}
