use std::collections::VecDeque;

use chrono::Utc;
use serde::Serialize;

use super::interpret::Interpretation;
use crate::stream::{KIND_LANCE_VALIDO, KIND_LINK_PAGAMENTO};

/// Entries kept in the rolling feed.
pub const MAX_NOTIFICATIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Millisecond timestamp, strictly increasing within a feed.
    pub id: i64,
    pub title: String,
    pub message: String,
    pub kind: String,
}

/// Visual emphasis of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Info,
    Warning,
}

impl Notification {
    pub fn tone(&self) -> Tone {
        match self.kind.as_str() {
            KIND_LINK_PAGAMENTO => Tone::Success,
            KIND_LANCE_VALIDO => Tone::Info,
            _ => Tone::Warning,
        }
    }
}

/// Newest-first notification list capped at [`MAX_NOTIFICATIONS`].
#[derive(Debug)]
pub struct NotificationFeed {
    items: VecDeque<Notification>,
    capacity: usize,
    last_id: i64,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::with_capacity(MAX_NOTIFICATIONS)
    }
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            last_id: 0,
        }
    }

    /// Insert at the front, evicting the oldest entry past capacity.
    pub fn push(&mut self, interpretation: Interpretation) -> Notification {
        let notification = Notification {
            id: self.next_id(),
            title: interpretation.title,
            message: interpretation.message,
            kind: interpretation.kind,
        };
        self.items.push_front(notification.clone());
        self.items.truncate(self.capacity);
        notification
    }

    /// Remove one notification by id.
    pub fn dismiss(&mut self, id: i64) -> Option<Notification> {
        let index = self.items.iter().position(|n| n.id == id)?;
        self.items.remove(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn newest(&self) -> Option<&Notification> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.items.iter().cloned().collect()
    }

    fn next_id(&mut self) -> i64 {
        let id = Utc::now().timestamp_millis().max(self.last_id + 1);
        self.last_id = id;
        id
    }
}
