//! Resilient relay allocation.
//!
//! Given the relays the user already reads from and each contact's declared
//! write relays, pick a small set of extra relays so that as many contacts
//! as possible are reachable through at least one of them. Greedy set cover:
//!
//! 1. map relay -> contacts declaring it (non-dialable relays dropped)
//! 2. median contact count over all observed relays
//! 3. rank by distance from the median, then by URL
//! 4. contacts reachable through the user's relays start covered
//! 5. walk the ranking, keeping relays that cover someone new

use std::collections::{BTreeMap, BTreeSet};

use nostr_protocol::{Event, RelayUsage, Tag, KIND_RELAY_LIST};
use serde::Serialize;
use tracing::info;

use crate::relay_url;

/// A contact's self-declared relay list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayDeclaration {
    pub pubkey: String,
    pub relays: Vec<String>,
}

impl RelayDeclaration {
    pub fn new(pubkey: impl Into<String>, relays: Vec<String>) -> Self {
        Self {
            pubkey: pubkey.into(),
            relays,
        }
    }

    /// Reads a relay-list event. Relays marked `read` are skipped: the
    /// contact does not publish there.
    pub fn from_event(event: &Event) -> Option<Self> {
        if event.kind != KIND_RELAY_LIST {
            return None;
        }
        let relays = event
            .tags
            .iter()
            .filter_map(|tag| match tag {
                Tag::Relay { url, usage } if *usage != Some(RelayUsage::Read) => Some(url.clone()),
                _ => None,
            })
            .collect();
        Some(Self::new(event.pubkey.clone(), relays))
    }
}

/// Keeps only the newest relay-list event per author.
pub fn latest_declarations(events: &[Event]) -> Vec<RelayDeclaration> {
    let mut newest: BTreeMap<&str, &Event> = BTreeMap::new();
    for event in events.iter().filter(|event| event.kind == KIND_RELAY_LIST) {
        let entry = newest.entry(event.pubkey.as_str()).or_insert(event);
        if event.created_at > entry.created_at {
            *entry = event;
        }
    }
    newest
        .into_values()
        .filter_map(RelayDeclaration::from_event)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Allocation {
    /// Relays to add, in the order they were chosen.
    pub relays: Vec<String>,
    /// Contacts reachable after adding `relays`.
    pub covered: usize,
    /// Contacts no dialable relay reaches.
    pub uncovered: usize,
}

pub fn allocate_resilient_relays(
    user_relays: &[String],
    declarations: &[RelayDeclaration],
) -> Allocation {
    let user: BTreeSet<String> = user_relays
        .iter()
        .filter_map(|url| relay_url::normalize(url).ok())
        .collect();

    let mut contacts: BTreeSet<&str> = BTreeSet::new();
    let mut relay_contacts: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for declaration in declarations {
        contacts.insert(&declaration.pubkey);
        for url in &declaration.relays {
            if let Some(url) = relay_url::dialable(url) {
                relay_contacts
                    .entry(url)
                    .or_default()
                    .insert(&declaration.pubkey);
            }
        }
    }

    let counts: Vec<usize> = relay_contacts.values().map(BTreeSet::len).collect();
    let median_twice = median_twice(&counts);

    let mut allocated: BTreeSet<&str> = relay_contacts
        .iter()
        .filter(|(url, _)| user.contains(*url))
        .flat_map(|(_, members)| members.iter().copied())
        .collect();

    let mut ranked: Vec<(usize, &String, &BTreeSet<&str>)> = relay_contacts
        .iter()
        .filter(|(url, _)| !user.contains(*url))
        .map(|(url, members)| ((members.len() * 2).abs_diff(median_twice), url, members))
        .collect();
    ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    let mut relays = Vec::new();
    for (_, url, members) in ranked {
        let mut contributed = false;
        for member in members {
            contributed |= allocated.insert(*member);
        }
        if contributed {
            relays.push(url.clone());
        }
    }

    let allocation = Allocation {
        relays,
        covered: allocated.len(),
        uncovered: contacts.len() - allocated.len(),
    };
    info!(
        relays = allocation.relays.len(),
        covered = allocation.covered,
        uncovered = allocation.uncovered,
        "Computed resilient relay set"
    );
    allocation
}

/// Twice the median, so even-length midpoints stay integral.
fn median_twice(counts: &[usize]) -> usize {
    if counts.is_empty() {
        return 0;
    }
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        sorted[mid - 1] + sorted[mid]
    } else {
        sorted[mid] * 2
    }
}
