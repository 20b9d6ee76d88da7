//! Protocol core for a relay-based social client.
//!
//! Everything here is pure: no sockets, no storage, no clocks beyond the
//! creation timestamp of new events. Relay plumbing lives in `relay-pool`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        NOSTR-PROTOCOL                             │
//! │                                                                   │
//! │  UnsignedEvent ──sign──▶ Event ──verify──▶ bool                   │
//! │        ▲                   │                                      │
//! │        │                   ├── canonicalize / hash                │
//! │   CipherBox                └── validate_shape (wire boundary)     │
//! │   (encrypted content)                                             │
//! │                                                                   │
//! │  Tag (typed)    Filter    ClientMessage / RelayMessage            │
//! │                                                                   │
//! │  nip19: npub / nsec / note / nprofile / nevent                    │
//! │  PrivateList, direct messages                                     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nostr_protocol::{Keys, UnsignedEvent, KIND_TEXT_NOTE};
//!
//! let keys = Keys::generate();
//! let event = UnsignedEvent::new(keys.public_key(), KIND_TEXT_NOTE, vec![], "hello")
//!     .sign(&keys)?;
//! assert!(event.verify());
//! ```
//!
//! # Errors
//!
//! - [`ShapeError`] - structural problems in wire data, tags or filters
//! - [`CryptoError`] - key, IV, padding and UTF-8 failures in [`CipherBox`]
//! - [`CodecError`] - identifier decoding failures
//! - [`Error`] - the crate-wide enum wrapping the above

pub mod cipher;
pub mod dm;
mod error;
pub mod event;
pub mod filter;
mod keys;
pub mod lists;
pub mod message;
pub mod nip19;
pub mod tags;

pub use cipher::{CipherBox, CryptoError};
pub use dm::{direct_message, open_direct_message};
pub use error::{Error, ShapeError};
pub use event::{
    is_channel_kind, is_parameterized_replaceable, is_replaceable, unix_timestamp, validate_shape,
    Event, UnsignedEvent, KIND_BOOKMARK_LIST, KIND_CHANNEL_CREATE, KIND_CHANNEL_HIDE_MESSAGE,
    KIND_CHANNEL_MESSAGE, KIND_CHANNEL_METADATA, KIND_CHANNEL_MUTE_USER, KIND_CONTACTS,
    KIND_DELETION, KIND_ENCRYPTED_DM, KIND_METADATA, KIND_MUTE_LIST, KIND_PARAMETERIZED_LIST,
    KIND_PIN_LIST, KIND_REACTION, KIND_RELAY_LIST, KIND_REPOST, KIND_TEXT_NOTE, KIND_ZAP_RECEIPT,
    KIND_ZAP_REQUEST,
};
pub use filter::Filter;
pub use keys::Keys;
pub use lists::PrivateList;
pub use message::{ClientMessage, RelayMessage};
pub use nip19::{CodecError, KeyPointer};
pub use tags::{RelayUsage, Tag};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
