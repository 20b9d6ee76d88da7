use thiserror::Error;

use crate::cipher::CryptoError;
use crate::nip19::CodecError;

/// Structural problems found before any cryptography runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("event is not a JSON object")]
    NotAnObject,
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("invalid tag at index {index}: {reason}")]
    InvalidTag { index: usize, reason: String },
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

impl ShapeError {
    pub(crate) fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("identifier error: {0}")]
    Codec(#[from] CodecError),
    #[error("serde json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event pubkey {event} does not belong to signing key {signer}")]
    KeyMismatch { event: String, signer: String },
    #[error("private list content could not be decrypted: {0}")]
    UnreadablePrivateList(String),
    #[error("direct message has no recipient p tag")]
    MissingRecipient,
}
