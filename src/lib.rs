//! Real-time auction client library.
//!
//! Connects to the auction gateway's Server-Sent Events stream and turns its
//! events into user-facing notifications. It handles:
//! - Stream connection lifecycle, reconnects and listener registration
//! - Payload interpretation and the bounded notification feed
//! - Per-session client identity
//! - REST calls for auctions, bids and follow interest
//!
//! # Architecture
//!
//! - `stream`: SSE decoding, transport and the event stream client
//! - `notifications`: interpretation, feed and the pump task
//! - `session`: client identity and its storage
//! - `api`: gateway REST client
//! - `config`: environment configuration
//! - `render`: terminal output

pub mod api;
pub mod config;
pub mod notifications;
pub mod render;
pub mod session;
pub mod stream;

use std::sync::Arc;

use api::ApiError;
use config::{ClientConfig, ConfigError};
use session::{
    FileSessionStore, MemorySessionStore, SessionContext, SessionError, SessionStore,
};
use stream::TransportError;

pub const DEFAULT_LOG_FILTER: &str = "leilao=info,warn";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0}")]
    Usage(String),
}

/// Install the fmt subscriber. `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`].
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Session store selected by the config: a JSON file when configured,
/// process memory otherwise.
pub fn session_store(config: &ClientConfig) -> Arc<dyn SessionStore> {
    match &config.session_file {
        Some(path) => Arc::new(FileSessionStore::new(path.clone())),
        None => Arc::new(MemorySessionStore::new()),
    }
}

pub fn open_session(config: &ClientConfig) -> Result<SessionContext, AppError> {
    let store = session_store(config);
    let session = SessionContext::load_or_create(store.as_ref())?;
    Ok(session)
}
