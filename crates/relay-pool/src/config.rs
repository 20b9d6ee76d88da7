use std::env;

use nostr_protocol::Keys;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::relay_url;
use crate::Error;

pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://nostr-pub.wellorder.net",
    "wss://nostr.oxtr.dev",
    "wss://relay.nostr.band",
];

/// Local intent for one relay. Not protocol state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub url: String,
    pub active: bool,
    pub global_feed: bool,
    pub resilient: bool,
}

impl RelayRecord {
    /// An active relay with its URL normalized.
    pub fn new(url: &str) -> Result<Self, Error> {
        Ok(Self {
            url: relay_url::normalize(url)?,
            active: true,
            global_feed: false,
            resilient: false,
        })
    }

    pub fn global_feed(mut self, global_feed: bool) -> Self {
        self.global_feed = global_feed;
        self
    }

    pub fn resilient(mut self, resilient: bool) -> Self {
        self.resilient = resilient;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub relays: Vec<String>,
    pub global_feed_relays: Vec<String>,
    pub secret_key: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            relays: DEFAULT_RELAYS.iter().map(|url| url.to_string()).collect(),
            global_feed_relays: Vec::new(),
            secret_key: None,
        }
    }
}

impl PoolConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `NOSTR_RELAYS` (comma or whitespace separated; default: built-in list)
    /// - `NOSTR_GLOBAL_FEED_RELAYS` (relays that also serve the global feed)
    /// - `NOSTR_SECRET_KEY` (hex or nsec)
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();
        if let Ok(value) = env::var("NOSTR_RELAYS") {
            let relays = parse_relays(&value);
            if !relays.is_empty() {
                config.relays = relays;
            }
        }
        if let Ok(value) = env::var("NOSTR_GLOBAL_FEED_RELAYS") {
            config.global_feed_relays = parse_relays(&value);
        }
        config.secret_key = env::var("NOSTR_SECRET_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());
        Ok(config)
    }

    pub fn keys(&self) -> Result<Keys, Error> {
        let secret_key = self
            .secret_key
            .as_deref()
            .ok_or(Error::MissingEnv("NOSTR_SECRET_KEY"))?;
        Ok(Keys::parse(secret_key)?)
    }

    /// Relay records for every configured URL. Global-feed relays not in
    /// the main list are added as active global-feed records. Invalid URLs
    /// are skipped with a warning.
    pub fn records(&self) -> Vec<RelayRecord> {
        let global: Vec<String> = self
            .global_feed_relays
            .iter()
            .filter_map(|url| relay_url::normalize(url).ok())
            .collect();

        let mut records: Vec<RelayRecord> = Vec::new();
        for url in self.relays.iter().chain(&self.global_feed_relays) {
            match RelayRecord::new(url) {
                Ok(record) => {
                    if records.iter().any(|existing| existing.url == record.url) {
                        continue;
                    }
                    let in_global = global.contains(&record.url);
                    records.push(record.global_feed(in_global));
                }
                Err(err) => warn!(relay = %url, error = %err, "Skipping invalid relay url"),
            }
        }
        records
    }
}

pub fn parse_relays(value: &str) -> Vec<String> {
    value
        .split(',')
        .flat_map(|chunk| chunk.split_whitespace())
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_and_whitespace_lists() {
        assert_eq!(
            parse_relays("wss://a.com, wss://b.com\nwss://c.com,,"),
            vec!["wss://a.com", "wss://b.com", "wss://c.com"]
        );
        assert!(parse_relays("  ").is_empty());
    }

    #[test]
    fn records_merge_global_feed_relays() {
        let config = PoolConfig {
            relays: vec!["wss://A.com/".to_string(), "wss://b.com".to_string()],
            global_feed_relays: vec!["wss://a.com".to_string(), "wss://feed.com".to_string()],
            secret_key: None,
        };
        let records = config.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].url, "wss://a.com");
        assert!(records[0].global_feed);
        assert!(!records[1].global_feed);
        assert_eq!(records[2].url, "wss://feed.com");
        assert!(records[2].global_feed && records[2].active);
    }

    #[test]
    fn invalid_urls_are_skipped() {
        let config = PoolConfig {
            relays: vec!["https://nope.com".to_string(), "wss://ok.com".to_string()],
            global_feed_relays: Vec::new(),
            secret_key: None,
        };
        let records = config.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "wss://ok.com");
    }

    #[test]
    fn keys_require_secret() {
        let config = PoolConfig::default();
        assert!(matches!(config.keys(), Err(Error::MissingEnv("NOSTR_SECRET_KEY"))));

        let config = PoolConfig {
            secret_key: Some(
                "nsec190vqdjtlpcq27xslcveglfmr4ynfwg7gmw86cnun4acakxrdd6gqlhwtrg".to_string(),
            ),
            ..PoolConfig::default()
        };
        assert_eq!(
            config.keys().unwrap().public_key(),
            "9997a497d964fc1a62885b05a51166a65a90df00492c8d7cf61d6accf54803be"
        );
    }

    #[test]
    fn default_uses_builtin_relays() {
        let config = PoolConfig::default();
        assert_eq!(config.relays.len(), DEFAULT_RELAYS.len());
        assert!(config.records().iter().all(|record| record.active));
    }
}
