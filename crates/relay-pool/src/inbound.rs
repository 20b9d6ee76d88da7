//! Inbound boundary: raw relay frames in, verified events out to the local
//! store.
//!
//! Most relay traffic is hostile or malformed by default, so rejected
//! events are dropped quietly with a `debug` log and never surface as
//! errors. Only a failing [`EventSink`] is an error.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nostr_protocol::{Event, RelayMessage};
use tracing::{debug, info, warn};

use crate::Error;

const DEFAULT_SEEN_CAPACITY: usize = 10_000;

/// The local store. Persists accepted events; never called with an event
/// that failed verification.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn persist(&self, relay: &str, sub_id: &str, event: &Event) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Malformed,
    Forged,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Stored { sub_id: String, event_id: String },
    Dropped(DropReason),
    EndOfStoredEvents(String),
    Notice(String),
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
    AuthChallenge(String),
    Closed { sub_id: String, message: String },
}

/// Bounded set of recently stored ids. Oldest ids are evicted first.
struct SeenIds {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenIds {
    fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, id: &str) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        true
    }

    fn forget(&mut self, id: &str) {
        if self.ids.remove(id) {
            self.order.retain(|seen| seen != id);
        }
    }
}

pub struct InboundHandler {
    sink: Arc<dyn EventSink>,
    seen: Mutex<SeenIds>,
}

impl InboundHandler {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_capacity(sink, DEFAULT_SEEN_CAPACITY)
    }

    pub fn with_capacity(sink: Arc<dyn EventSink>, capacity: usize) -> Self {
        Self {
            sink,
            seen: Mutex::new(SeenIds::new(capacity)),
        }
    }

    pub async fn handle(&self, relay: &str, frame: &str) -> Result<Inbound, Error> {
        let message = match RelayMessage::from_json(frame) {
            Ok(message) => message,
            Err(err) => {
                debug!(relay = %relay, error = %err, "Dropping malformed relay frame");
                return Ok(Inbound::Dropped(DropReason::Malformed));
            }
        };

        match message {
            RelayMessage::Event { sub_id, event } => self.handle_event(relay, sub_id, &event).await,
            RelayMessage::EndOfStoredEvents(sub_id) => {
                debug!(relay = %relay, sub_id = %sub_id, "End of stored events");
                Ok(Inbound::EndOfStoredEvents(sub_id))
            }
            RelayMessage::Notice(message) => {
                info!(relay = %relay, notice = %message, "Relay notice");
                Ok(Inbound::Notice(message))
            }
            RelayMessage::Ok {
                event_id,
                accepted,
                message,
            } => {
                if !accepted {
                    warn!(relay = %relay, event_id = %event_id, reason = %message, "Relay rejected event");
                }
                Ok(Inbound::Ok {
                    event_id,
                    accepted,
                    message,
                })
            }
            RelayMessage::Auth { challenge } => Ok(Inbound::AuthChallenge(challenge)),
            RelayMessage::Closed { sub_id, message } => {
                info!(relay = %relay, sub_id = %sub_id, reason = %message, "Relay closed subscription");
                Ok(Inbound::Closed { sub_id, message })
            }
        }
    }

    async fn handle_event(&self, relay: &str, sub_id: String, event: &Event) -> Result<Inbound, Error> {
        if !event.verify() {
            debug!(relay = %relay, event_id = %event.id, "Dropping event that failed verification");
            return Ok(Inbound::Dropped(DropReason::Forged));
        }

        let fresh = {
            let mut seen = self.seen.lock().map_err(|_| Error::MutexPoisoned)?;
            seen.insert(&event.id)
        };
        if !fresh {
            debug!(relay = %relay, event_id = %event.id, "Dropping duplicate event");
            return Ok(Inbound::Dropped(DropReason::Duplicate));
        }

        if let Err(err) = self.sink.persist(relay, &sub_id, event).await {
            // Let a copy from another relay try again.
            let mut seen = self.seen.lock().map_err(|_| Error::MutexPoisoned)?;
            seen.forget(&event.id);
            return Err(err);
        }

        debug!(relay = %relay, sub_id = %sub_id, event_id = %event.id, kind = event.kind, "Stored event");
        Ok(Inbound::Stored {
            sub_id,
            event_id: event.id.clone(),
        })
    }
}
