//! Seam to the native socket layer.
//!
//! This crate never owns sockets. Every call is a non-blocking hand-off;
//! delivery results come back later as inbound frames.

use tokio::sync::mpsc;

use crate::config::RelayRecord;
use crate::error::TransportError;

pub trait Transport: Send + Sync {
    fn connect(&self, pubkey: &str) -> Result<(), TransportError>;
    fn add(&self, record: &RelayRecord) -> Result<(), TransportError>;
    /// Mirrors a change of the `active` or `global_feed` flags.
    fn update(&self, record: &RelayRecord) -> Result<(), TransportError>;
    fn remove(&self, url: &str) -> Result<(), TransportError>;
    /// Sends to every active relay, or only to global-feed relays.
    fn send_all(&self, frame: &str, global_feed: bool) -> Result<(), TransportError>;
    fn send_relay(&self, frame: &str, url: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    Connect { pubkey: String },
    Add(RelayRecord),
    Update(RelayRecord),
    Remove(String),
    SendAll { frame: String, global_feed: bool },
    SendRelay { frame: String, url: String },
}

/// Enqueues commands for a socket task on an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<TransportCommand>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn enqueue(&self, command: TransportCommand) -> Result<(), TransportError> {
        self.tx
            .send(command)
            .map_err(|_| TransportError::ChannelClosed)
    }
}

impl Transport for ChannelTransport {
    fn connect(&self, pubkey: &str) -> Result<(), TransportError> {
        self.enqueue(TransportCommand::Connect {
            pubkey: pubkey.to_string(),
        })
    }

    fn add(&self, record: &RelayRecord) -> Result<(), TransportError> {
        self.enqueue(TransportCommand::Add(record.clone()))
    }

    fn update(&self, record: &RelayRecord) -> Result<(), TransportError> {
        self.enqueue(TransportCommand::Update(record.clone()))
    }

    fn remove(&self, url: &str) -> Result<(), TransportError> {
        self.enqueue(TransportCommand::Remove(url.to_string()))
    }

    fn send_all(&self, frame: &str, global_feed: bool) -> Result<(), TransportError> {
        self.enqueue(TransportCommand::SendAll {
            frame: frame.to_string(),
            global_feed,
        })
    }

    fn send_relay(&self, frame: &str, url: &str) -> Result<(), TransportError> {
        self.enqueue(TransportCommand::SendRelay {
            frame: frame.to_string(),
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_arrive_in_order() {
        let (transport, mut rx) = ChannelTransport::new();
        transport.connect("pk").unwrap();
        transport.send_all("[\"CLOSE\",\"a\"]", true).unwrap();
        transport.remove("wss://a.com").unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            TransportCommand::Connect {
                pubkey: "pk".to_string()
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            TransportCommand::SendAll {
                frame: "[\"CLOSE\",\"a\"]".to_string(),
                global_feed: true,
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            TransportCommand::Remove("wss://a.com".to_string())
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_receiver_is_reported() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);
        assert_eq!(
            transport.send_relay("[]", "wss://a.com"),
            Err(TransportError::ChannelClosed)
        );
    }
}
