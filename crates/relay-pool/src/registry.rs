//! Deduplicated subscription registry and outbound dispatch.
//!
//! A subscription is a logical name mapped, per relay scope, to the
//! fingerprints of every filter list registered under it. Re-registering a
//! fingerprint is a no-op, so repeated identical `subscribe` calls never
//! multiply wire traffic. Mutation is synchronous: the check and the insert
//! happen without a suspension point in between.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use nostr_protocol::{ClientMessage, Event, Filter, Keys, UnsignedEvent};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::relay_url;
use crate::transport::Transport;
use crate::Error;

/// Which relays a subscription's frames go to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelayScope {
    /// Every active relay.
    All,
    /// Only relays opted into global feed traffic.
    GlobalFeed,
    Relay(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Sent,
    AlreadyActive,
}

pub struct SubscriptionRegistry {
    transport: Arc<dyn Transport>,
    subscriptions: BTreeMap<String, BTreeMap<RelayScope, Vec<String>>>,
}

impl SubscriptionRegistry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            subscriptions: BTreeMap::new(),
        }
    }

    pub fn subscribe(&mut self, sub_id: &str, filters: &[Filter]) -> Result<SubscribeOutcome, Error> {
        self.subscribe_scoped(sub_id, filters, RelayScope::All)
    }

    pub fn subscribe_global(
        &mut self,
        sub_id: &str,
        filters: &[Filter],
    ) -> Result<SubscribeOutcome, Error> {
        self.subscribe_scoped(sub_id, filters, RelayScope::GlobalFeed)
    }

    pub fn subscribe_relay(
        &mut self,
        sub_id: &str,
        filters: &[Filter],
        url: &str,
    ) -> Result<SubscribeOutcome, Error> {
        let url = relay_url::normalize(url)?;
        self.subscribe_scoped(sub_id, filters, RelayScope::Relay(url))
    }

    fn subscribe_scoped(
        &mut self,
        sub_id: &str,
        filters: &[Filter],
        scope: RelayScope,
    ) -> Result<SubscribeOutcome, Error> {
        for filter in filters {
            filter.validate()?;
        }

        let fingerprint = fingerprint(sub_id, filters)?;
        let registered = self
            .subscriptions
            .get(sub_id)
            .and_then(|scopes| scopes.get(&scope))
            .is_some_and(|fingerprints| fingerprints.contains(&fingerprint));
        if registered {
            debug!(sub_id = %sub_id, scope = %scope, "Subscription already active");
            return Ok(SubscribeOutcome::AlreadyActive);
        }

        let frame = ClientMessage::req(sub_id, filters.to_vec()).to_frame()?;
        self.dispatch(&scope, &frame)?;

        self.subscriptions
            .entry(sub_id.to_string())
            .or_default()
            .entry(scope.clone())
            .or_default()
            .push(fingerprint);
        info!(sub_id = %sub_id, scope = %scope, filters = filters.len(), "Subscribed");
        Ok(SubscribeOutcome::Sent)
    }

    /// Sends one CLOSE per scope each name is registered under and purges
    /// it. Unknown names send nothing. Teardown continues past transport
    /// failures; the first one is returned once every name is purged.
    pub fn unsubscribe<I, S>(&mut self, sub_ids: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut first_error = None;
        for sub_id in sub_ids {
            let sub_id = sub_id.as_ref();
            let Some(scopes) = self.subscriptions.remove(sub_id) else {
                continue;
            };
            let frame = ClientMessage::close(sub_id).to_frame()?;
            for scope in scopes.keys() {
                if let Err(err) = self.dispatch(scope, &frame) {
                    warn!(sub_id = %sub_id, scope = %scope, error = %err, "Failed to send close");
                    first_error.get_or_insert(err);
                }
            }
            info!(sub_id = %sub_id, scopes = scopes.len(), "Unsubscribed");
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn unsubscribe_all(&mut self) -> Result<(), Error> {
        let sub_ids: Vec<String> = self.subscriptions.keys().cloned().collect();
        self.unsubscribe(sub_ids)
    }

    pub fn is_active(&self, sub_id: &str) -> bool {
        self.subscriptions.contains_key(sub_id)
    }

    pub fn active_ids(&self) -> Vec<&str> {
        self.subscriptions.keys().map(String::as_str).collect()
    }

    /// Number of distinct filter lists registered under a name, across
    /// scopes.
    pub fn registrations(&self, sub_id: &str) -> usize {
        self.subscriptions
            .get(sub_id)
            .map(|scopes| scopes.values().map(Vec::len).sum())
            .unwrap_or_default()
    }

    /// Validates and forwards a signed event to one relay, or to every
    /// active relay. Acknowledgement arrives later as an inbound `OK`.
    pub fn send_event(&self, event: Event, relay: Option<&str>) -> Result<Event, Error> {
        event.validate_shape()?;
        let frame = ClientMessage::Event(event.clone()).to_frame()?;
        match relay {
            Some(url) => {
                let url = relay_url::normalize(url)?;
                self.transport.send_relay(&frame, &url)?;
            }
            None => self.transport.send_all(&frame, false)?,
        }
        debug!(event_id = %event.id, kind = event.kind, "Event dispatched");
        Ok(event)
    }

    /// Authentication is relay-specific and never broadcast.
    pub fn send_auth(&self, event: Event, relay: &str) -> Result<Event, Error> {
        event.validate_shape()?;
        let url = relay_url::normalize(relay)?;
        let frame = ClientMessage::Auth(event.clone()).to_frame()?;
        self.transport.send_relay(&frame, &url)?;
        debug!(event_id = %event.id, relay = %url, "Auth dispatched");
        Ok(event)
    }

    pub fn publish(
        &self,
        unsigned: UnsignedEvent,
        keys: &Keys,
        relay: Option<&str>,
    ) -> Result<Event, Error> {
        let event = unsigned.sign(keys)?;
        self.send_event(event, relay)
    }

    fn dispatch(&self, scope: &RelayScope, frame: &str) -> Result<(), Error> {
        match scope {
            RelayScope::All => self.transport.send_all(frame, false)?,
            RelayScope::GlobalFeed => self.transport.send_all(frame, true)?,
            RelayScope::Relay(url) => self.transport.send_relay(frame, url)?,
        }
        Ok(())
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for RelayScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::GlobalFeed => f.write_str("global-feed"),
            Self::Relay(url) => f.write_str(url),
        }
    }
}

/// Order-sensitive identity of a subscription request.
pub fn fingerprint(sub_id: &str, filters: &[Filter]) -> Result<String, Error> {
    let mut hasher = Sha256::new();
    hasher.update(sub_id.as_bytes());
    hasher.update(serde_json::to_vec(filters)?);
    Ok(hex::encode(hasher.finalize()))
}
