//! Client-side relay plumbing on top of `nostr-protocol`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          RELAY-POOL                               │
//! │                                                                   │
//! │  ┌───────────────────────┐        ┌───────────────────────┐       │
//! │  │  RelayPool            │        │  InboundHandler       │       │
//! │  │  (write path)         │        │  (read path)          │       │
//! │  │                       │        │                       │       │
//! │  │ - relay records       │        │ - parse frames        │       │
//! │  │ - SubscriptionRegistry│        │ - verify + dedupe     │       │
//! │  │ - publish / auth      │        │ - EventSink::persist  │       │
//! │  └──────────┬────────────┘        └──────────▲────────────┘       │
//! │             │ Transport                       │ raw frames        │
//! │             ▼                                 │                   │
//! │        socket layer ──────────────────────────┘                   │
//! │                                                                   │
//! │  allocate_resilient_relays: relay lists -> extra relays           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example: Subscribing
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nostr_protocol::Filter;
//! use relay_pool::{ChannelTransport, PoolConfig, RelayPool};
//!
//! let (transport, commands) = ChannelTransport::new();
//! let mut pool = RelayPool::from_config(&PoolConfig::from_env()?, Arc::new(transport))?;
//! pool.connect()?;
//! pool.registry_mut().subscribe("home", &[Filter::new().kind(1).limit(50)])?;
//! ```
//!
//! # Example: Resilient relays
//!
//! ```rust,ignore
//! use relay_pool::{allocate_resilient_relays, latest_declarations};
//!
//! let declarations = latest_declarations(&relay_list_events);
//! let allocation = allocate_resilient_relays(&user_relays, &declarations);
//! pool.adopt_resilient(&allocation)?;
//! ```

mod allocator;
mod config;
mod error;
mod inbound;
mod pool;
mod registry;
pub mod relay_url;
mod transport;

pub use allocator::{allocate_resilient_relays, latest_declarations, Allocation, RelayDeclaration};
pub use config::{parse_relays, PoolConfig, RelayRecord, DEFAULT_RELAYS};
pub use error::{Error, TransportError};
pub use inbound::{DropReason, EventSink, Inbound, InboundHandler};
pub use pool::RelayPool;
pub use registry::{fingerprint, RelayScope, SubscribeOutcome, SubscriptionRegistry};
pub use transport::{ChannelTransport, Transport, TransportCommand};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
