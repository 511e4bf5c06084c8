//! Turning stream events into user-facing notifications.
//!
//! The stream client hands out raw `{kind, payload}` events; this module
//! decodes payloads, maps each kind to a title/message pair and keeps the
//! bounded newest-first feed shown to the user.

mod feed;
mod interpret;
mod payload;
mod pump;

pub use feed::{Notification, NotificationFeed, Tone, MAX_NOTIFICATIONS};
pub use interpret::{
    interpret, Interpretation, NotificationKind, WinAlert, DEFAULT_REJECTION_REASON,
    FALLBACK_TITLE,
};
pub use payload::decode_payload;
pub use pump::{NotificationPump, NotificationSink, SharedFeed};
