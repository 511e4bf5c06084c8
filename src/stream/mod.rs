//! Real-time notification channel.
//!
//! - `decoder`: incremental Server-Sent Events parsing
//! - `transport`: injectable stream transport and reconnect policy
//! - `listeners`: kind label to listener mapping
//! - `client`: connection lifecycle and the "latest event" slot
//!
//! # Flow
//!
//! Transport chunks → `SseDecoder` → `ListenerRegistry::dispatch` → publisher
//! listener → latest slot (`watch`) + ordered feed (`broadcast`).

mod client;
mod decoder;
mod event;
mod listeners;
mod transport;

pub use client::{ConnectionState, EventStreamClient, StreamConfig};
pub use decoder::{SseDecoder, SseFrame, DEFAULT_KIND};
pub use event::{
    StreamEvent, DEFAULT_STREAM_KINDS, KIND_LANCE_INVALIDO, KIND_LANCE_VALIDO,
    KIND_LEILAO_VENCEDOR, KIND_LINK_PAGAMENTO, KIND_MESSAGE, KIND_STATUS_PAGAMENTO,
};
pub use listeners::{Listener, ListenerRegistry};
pub use transport::{
    Backoff, ChunkStream, HttpStreamTransport, ReconnectPolicy, StreamTransport, TransportError,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_RETRY_DELAY, DEFAULT_RETRY_DELAY,
};
