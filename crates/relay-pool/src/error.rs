use thiserror::Error;

/// Failures handing a frame to the socket layer. Surfaced once, never
/// retried here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport channel closed")]
    ChannelClosed,
    #[error("unknown relay: {0}")]
    UnknownRelay(String),
    #[error("relay rejected frame: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("protocol error: {0}")]
    Protocol(#[from] nostr_protocol::Error),
    #[error("shape error: {0}")]
    Shape(#[from] nostr_protocol::ShapeError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("serde json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing env var: {0}")]
    MissingEnv(&'static str),
    #[error("invalid relay url '{url}': {reason}")]
    InvalidRelayUrl { url: String, reason: String },
    #[error("mutex poisoned")]
    MutexPoisoned,
    #[error("event sink error: {0}")]
    Sink(String),
}

impl Error {
    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRelayUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
