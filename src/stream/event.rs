use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decoder::{SseFrame, DEFAULT_KIND};

// ---------------------------------------------------------------------------
// Kind labels
// ---------------------------------------------------------------------------

pub const KIND_MESSAGE: &str = DEFAULT_KIND;
pub const KIND_LANCE_VALIDO: &str = "lance_v";
pub const KIND_LANCE_INVALIDO: &str = "lance_inv";
pub const KIND_LEILAO_VENCEDOR: &str = "leilao_v";
pub const KIND_LINK_PAGAMENTO: &str = "link_p";
pub const KIND_STATUS_PAGAMENTO: &str = "status_p";

/// Kinds the client listens for unless configured otherwise.
pub const DEFAULT_STREAM_KINDS: &[&str] = &[
    KIND_MESSAGE,
    KIND_LANCE_VALIDO,
    KIND_LANCE_INVALIDO,
    KIND_LEILAO_VENCEDOR,
    KIND_LINK_PAGAMENTO,
    KIND_STATUS_PAGAMENTO,
];

// ---------------------------------------------------------------------------
// Normalized event
// ---------------------------------------------------------------------------

/// One event received from the stream, normalized to `{kind, payload}`.
///
/// `payload` is the raw `data` text; the stream client never interprets it.
/// `seq` gives every received event its own identity, so two events with the
/// same kind and payload are still distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub seq: u64,
    pub kind: String,
    pub payload: String,
    pub last_event_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl StreamEvent {
    pub fn from_frame(seq: u64, frame: SseFrame) -> Self {
        Self {
            seq,
            kind: frame.kind,
            payload: frame.data,
            last_event_id: frame.last_event_id,
            received_at: Utc::now(),
        }
    }

    /// Build an event directly, used by consumers and tests.
    pub fn new(seq: u64, kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            seq,
            kind: kind.into(),
            payload: payload.into(),
            last_event_id: None,
            received_at: Utc::now(),
        }
    }
}
