//! Errors raised by hub client adapters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid hub url: {0}")]
    InvalidUrl(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("hub rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("not connected to the hub")]
    NotConnected,
}

impl ClientError {
    pub(crate) fn invalid_url(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidUrl(format!("{} ({})", url, reason))
    }
}
