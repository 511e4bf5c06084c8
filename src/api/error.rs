use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),
    /// Non-2xx response. `message` is the server's `erro` or a status-derived
    /// fallback.
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timeout: {0}")]
    Timeout(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("config error: {0}")]
    Config(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return Self::Timeout(value.to_string());
        }
        if value.is_decode() {
            return Self::InvalidResponse(value.to_string());
        }
        Self::Request(value.to_string())
    }
}

/// Error body returned by the gateway.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub erro: Option<String>,
}

/// Message for a failed response: the body's `erro` when present, otherwise
/// `fallback(status)`.
pub(crate) fn error_message(body: &str, status: u16, fallback: impl FnOnce(u16) -> String) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.erro)
        .map(|erro| erro.trim().to_string())
        .filter(|erro| !erro.is_empty())
        .unwrap_or_else(|| fallback(status))
}
