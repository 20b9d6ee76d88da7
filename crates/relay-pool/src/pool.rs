use std::sync::Arc;

use nostr_protocol::{Event, Keys, UnsignedEvent};
use tracing::info;

use crate::allocator::Allocation;
use crate::config::{PoolConfig, RelayRecord};
use crate::error::TransportError;
use crate::registry::SubscriptionRegistry;
use crate::relay_url;
use crate::transport::Transport;
use crate::Error;

/// Relay records plus the subscription registry, with every change
/// mirrored to the transport.
pub struct RelayPool {
    transport: Arc<dyn Transport>,
    records: Vec<RelayRecord>,
    registry: SubscriptionRegistry,
    keys: Option<Keys>,
}

impl RelayPool {
    pub fn new(transport: Arc<dyn Transport>, keys: Option<Keys>) -> Self {
        Self {
            registry: SubscriptionRegistry::new(transport.clone()),
            transport,
            records: Vec::new(),
            keys,
        }
    }

    /// Builds a pool from config and announces every relay to the
    /// transport. Keys are loaded when a secret is configured.
    pub fn from_config(config: &PoolConfig, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        let keys = match config.secret_key {
            Some(_) => Some(config.keys()?),
            None => None,
        };
        let mut pool = Self::new(transport, keys);
        for record in config.records() {
            pool.insert(record)?;
        }
        Ok(pool)
    }

    /// Opens the transport for the configured identity.
    pub fn connect(&self) -> Result<(), Error> {
        let keys = self.keys()?;
        self.transport.connect(&keys.public_key())?;
        info!(pubkey = %keys.public_key(), relays = self.records.len(), "Relay pool connected");
        Ok(())
    }

    pub fn keys(&self) -> Result<&Keys, Error> {
        self.keys
            .as_ref()
            .ok_or(Error::MissingEnv("NOSTR_SECRET_KEY"))
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SubscriptionRegistry {
        &mut self.registry
    }

    pub fn records(&self) -> &[RelayRecord] {
        &self.records
    }

    pub fn record(&self, url: &str) -> Option<&RelayRecord> {
        let url = relay_url::normalize(url).ok()?;
        self.records.iter().find(|record| record.url == url)
    }

    pub fn active_relays(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|record| record.active)
            .map(|record| record.url.as_str())
            .collect()
    }

    /// Adds an active relay. Returns false if it was already present.
    pub fn add_relay(&mut self, url: &str) -> Result<bool, Error> {
        self.insert(RelayRecord::new(url)?)
    }

    pub fn remove_relay(&mut self, url: &str) -> Result<bool, Error> {
        let url = relay_url::normalize(url)?;
        let Some(index) = self.records.iter().position(|record| record.url == url) else {
            return Ok(false);
        };
        self.transport.remove(&url)?;
        self.records.remove(index);
        info!(relay = %url, "Removed relay");
        Ok(true)
    }

    pub fn set_active(&mut self, url: &str, active: bool) -> Result<(), Error> {
        self.update(url, |record| record.active = active)
    }

    pub fn set_global_feed(&mut self, url: &str, global_feed: bool) -> Result<(), Error> {
        self.update(url, |record| record.global_feed = global_feed)
    }

    /// Adds allocator output as resilient relays. Relays already present are
    /// only flagged. Returns how many were new.
    pub fn adopt_resilient(&mut self, allocation: &Allocation) -> Result<usize, Error> {
        let mut added = 0;
        for url in &allocation.relays {
            let record = RelayRecord::new(url)?.resilient(true);
            if self.records.iter().any(|existing| existing.url == record.url) {
                self.update(url, |existing| existing.resilient = true)?;
            } else {
                self.insert(record)?;
                added += 1;
            }
        }
        info!(
            added,
            covered = allocation.covered,
            uncovered = allocation.uncovered,
            "Adopted resilient relays"
        );
        Ok(added)
    }

    /// Signs with the pool identity and fans out, or targets one relay.
    pub fn publish(&self, unsigned: UnsignedEvent, relay: Option<&str>) -> Result<Event, Error> {
        self.registry.publish(unsigned, self.keys()?, relay)
    }

    fn insert(&mut self, record: RelayRecord) -> Result<bool, Error> {
        if self.records.iter().any(|existing| existing.url == record.url) {
            return Ok(false);
        }
        self.transport.add(&record)?;
        info!(relay = %record.url, global_feed = record.global_feed, resilient = record.resilient, "Added relay");
        self.records.push(record);
        Ok(true)
    }

    fn update(&mut self, url: &str, change: impl FnOnce(&mut RelayRecord)) -> Result<(), Error> {
        let url = relay_url::normalize(url)?;
        let record = self
            .records
            .iter_mut()
            .find(|record| record.url == url)
            .ok_or_else(|| TransportError::UnknownRelay(url.clone()))?;
        let mut changed = record.clone();
        change(&mut changed);
        if changed != *record {
            self.transport.update(&changed)?;
            *record = changed;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nostr_protocol::{Filter, KIND_TEXT_NOTE};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::transport::{ChannelTransport, TransportCommand};

    fn pool(keys: Option<Keys>) -> (RelayPool, UnboundedReceiver<TransportCommand>) {
        let (transport, rx) = ChannelTransport::new();
        (RelayPool::new(Arc::new(transport), keys), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<TransportCommand>) -> Vec<TransportCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    #[test]
    fn add_and_remove_are_mirrored() {
        let (mut pool, mut rx) = pool(None);
        assert!(pool.add_relay("wss://Nos.lol/").unwrap());
        assert!(!pool.add_relay("wss://nos.lol").unwrap());
        assert_eq!(pool.active_relays(), vec!["wss://nos.lol"]);

        assert!(pool.remove_relay("wss://nos.lol").unwrap());
        assert!(!pool.remove_relay("wss://nos.lol").unwrap());

        let commands = drain(&mut rx);
        assert_eq!(commands.len(), 2);
        assert!(matches!(&commands[0], TransportCommand::Add(record) if record.url == "wss://nos.lol"));
        assert_eq!(commands[1], TransportCommand::Remove("wss://nos.lol".to_string()));
    }

    #[test]
    fn flag_changes_send_updates_only_when_changed() {
        let (mut pool, mut rx) = pool(None);
        pool.add_relay("wss://a.com").unwrap();
        pool.set_active("wss://a.com", true).unwrap();
        pool.set_global_feed("wss://a.com", true).unwrap();
        pool.set_active("wss://a.com", false).unwrap();

        let commands = drain(&mut rx);
        assert_eq!(commands.len(), 3);
        assert!(pool.active_relays().is_empty());
        assert!(pool.record("wss://a.com").unwrap().global_feed);

        assert!(matches!(
            pool.set_active("wss://missing.com", true),
            Err(Error::Transport(TransportError::UnknownRelay(_)))
        ));
    }

    #[test]
    fn adopts_allocation() {
        let (mut pool, mut rx) = pool(None);
        pool.add_relay("wss://b.com").unwrap();
        drain(&mut rx);

        let allocation = Allocation {
            relays: vec!["wss://a.com".to_string(), "wss://b.com".to_string()],
            covered: 3,
            uncovered: 0,
        };
        assert_eq!(pool.adopt_resilient(&allocation).unwrap(), 1);
        assert!(pool.records().iter().all(|record| record.resilient));
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[test]
    fn from_config_announces_relays_and_loads_keys() {
        let (transport, mut rx) = ChannelTransport::new();
        let config = PoolConfig {
            relays: vec!["wss://a.com".to_string()],
            global_feed_relays: vec!["wss://feed.com".to_string()],
            secret_key: Some(
                "2bd806c97f0e00af1a1fc3328fa763a9269723c8db8fac4f93af71db186d6e90".to_string(),
            ),
        };
        let pool = RelayPool::from_config(&config, Arc::new(transport)).unwrap();
        pool.connect().unwrap();

        let commands = drain(&mut rx);
        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[2],
            TransportCommand::Connect {
                pubkey: "9997a497d964fc1a62885b05a51166a65a90df00492c8d7cf61d6accf54803be"
                    .to_string()
            }
        );
    }

    #[test]
    fn publish_needs_keys() {
        let (pool_without, _rx) = pool(None);
        let unsigned = UnsignedEvent::new("00".repeat(32), KIND_TEXT_NOTE, vec![], "x");
        assert!(matches!(
            pool_without.publish(unsigned, None),
            Err(Error::MissingEnv(_))
        ));
        assert!(pool_without.connect().is_err());

        let keys = Keys::generate();
        let (pool_with, mut rx) = pool(Some(keys.clone()));
        let unsigned = UnsignedEvent::new(keys.public_key(), KIND_TEXT_NOTE, vec![], "x");
        let event = pool_with.publish(unsigned, Some("wss://a.com")).unwrap();
        assert!(event.verify());
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [TransportCommand::SendRelay { url, .. }] if url == "wss://a.com"
        ));
    }

    #[test]
    fn registry_is_reachable_through_the_pool() {
        let (mut pool, mut rx) = pool(None);
        pool.registry_mut()
            .subscribe("home", &[Filter::new().kind(1)])
            .unwrap();
        assert!(pool.registry().is_active("home"));
        assert_eq!(drain(&mut rx).len(), 1);
    }
}
