use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::event::StreamEvent;

pub type Listener = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Kind label to listener mapping.
///
/// Connection code only ever calls [`ListenerRegistry::dispatch`], so adding
/// a kind is a matter of registering another entry.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: DashMap<String, Listener>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind`, replacing any previous one.
    pub fn register(&self, kind: impl Into<String>, listener: Listener) {
        self.listeners.insert(kind.into(), listener);
    }

    pub fn deregister(&self, kind: &str) -> bool {
        self.listeners.remove(kind).is_some()
    }

    /// Deregister every listener. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let count = self.listeners.len();
        self.listeners.clear();
        count
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.listeners.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invoke the listener for `event.kind`. Returns false when nobody
    /// listens for that kind.
    pub fn dispatch(&self, event: StreamEvent) -> bool {
        // Clone the handle out so the shard lock is not held while the
        // listener runs.
        let listener = match self.listeners.get(&event.kind) {
            Some(entry) => entry.value().clone(),
            None => {
                debug!("no listener for kind '{}', dropping", event.kind);
                return false;
            }
        };
        listener(event);
        true
    }
}
