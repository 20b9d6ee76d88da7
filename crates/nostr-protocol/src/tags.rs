//! Typed event tags.
//!
//! Tags arrive as positional string lists. They are decoded once, at the
//! boundary, into [`Tag`] so call sites never index `tag[1]`/`tag[2]`.
//! Decoding is lossless: [`Tag::to_vec`] reproduces the exact list that was
//! parsed, which keeps event hashing stable.

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// Relay usage marker carried by `r` tags in relay-list events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayUsage {
    Read,
    Write,
}

impl RelayUsage {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum Tag {
    /// `["e", <event id>, <relay hint>?, <marker>?]`
    Event {
        id: String,
        relay_hint: Option<String>,
        marker: Option<String>,
    },
    /// `["p", <pubkey>, <relay hint>?, <petname>?]`
    Pubkey {
        pubkey: String,
        relay_hint: Option<String>,
        petname: Option<String>,
    },
    /// `["t", <hashtag>]`
    Hashtag(String),
    /// `["d", <identifier>]`
    Identifier(String),
    /// `["r", <relay url>, "read" | "write"?]`
    Relay {
        url: String,
        usage: Option<RelayUsage>,
    },
    Unknown(Vec<String>),
}

impl Tag {
    pub fn event(id: impl Into<String>) -> Self {
        Self::Event {
            id: id.into(),
            relay_hint: None,
            marker: None,
        }
    }

    pub fn pubkey(pubkey: impl Into<String>) -> Self {
        Self::Pubkey {
            pubkey: pubkey.into(),
            relay_hint: None,
            petname: None,
        }
    }

    pub fn hashtag(value: impl Into<String>) -> Self {
        Self::Hashtag(value.into())
    }

    pub fn identifier(value: impl Into<String>) -> Self {
        Self::Identifier(value.into())
    }

    pub fn relay(url: impl Into<String>, usage: Option<RelayUsage>) -> Self {
        Self::Relay {
            url: url.into(),
            usage,
        }
    }

    /// Decodes a positional tag. Known names with an arity or marker the
    /// typed variants cannot represent fall back to [`Tag::Unknown`].
    pub fn parse(parts: Vec<String>) -> Result<Self, ShapeError> {
        let Some(name) = parts.first() else {
            return Err(ShapeError::InvalidTag {
                index: 0,
                reason: "tag is empty".to_string(),
            });
        };

        let tag = match (name.as_str(), parts.len()) {
            ("e", 2..=4) => Self::Event {
                id: parts[1].clone(),
                relay_hint: parts.get(2).cloned(),
                marker: parts.get(3).cloned(),
            },
            ("p", 2..=4) => Self::Pubkey {
                pubkey: parts[1].clone(),
                relay_hint: parts.get(2).cloned(),
                petname: parts.get(3).cloned(),
            },
            ("t", 2) => Self::Hashtag(parts[1].clone()),
            ("d", 2) => Self::Identifier(parts[1].clone()),
            ("r", 2) => Self::Relay {
                url: parts[1].clone(),
                usage: None,
            },
            ("r", 3) => match RelayUsage::parse(&parts[2]) {
                Some(usage) => Self::Relay {
                    url: parts[1].clone(),
                    usage: Some(usage),
                },
                None => Self::Unknown(parts),
            },
            _ => Self::Unknown(parts),
        };
        Ok(tag)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Event { .. } => "e",
            Self::Pubkey { .. } => "p",
            Self::Hashtag(_) => "t",
            Self::Identifier(_) => "d",
            Self::Relay { .. } => "r",
            Self::Unknown(parts) => parts.first().map(String::as_str).unwrap_or_default(),
        }
    }

    /// First value after the tag name.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Event { id, .. } => Some(id),
            Self::Pubkey { pubkey, .. } => Some(pubkey),
            Self::Hashtag(value) | Self::Identifier(value) => Some(value),
            Self::Relay { url, .. } => Some(url),
            Self::Unknown(parts) => parts.get(1).map(String::as_str),
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Event {
                id,
                relay_hint,
                marker,
            } => positional("e", id, relay_hint, marker),
            Self::Pubkey {
                pubkey,
                relay_hint,
                petname,
            } => positional("p", pubkey, relay_hint, petname),
            Self::Hashtag(value) => vec!["t".to_string(), value.clone()],
            Self::Identifier(value) => vec!["d".to_string(), value.clone()],
            Self::Relay { url, usage } => {
                let mut parts = vec!["r".to_string(), url.clone()];
                if let Some(usage) = usage {
                    parts.push(usage.as_str().to_string());
                }
                parts
            }
            Self::Unknown(parts) => parts.clone(),
        }
    }
}

fn positional(
    name: &str,
    value: &str,
    second: &Option<String>,
    third: &Option<String>,
) -> Vec<String> {
    let mut parts = vec![name.to_string(), value.to_string()];
    if second.is_some() || third.is_some() {
        parts.push(second.clone().unwrap_or_default());
    }
    if let Some(third) = third {
        parts.push(third.clone());
    }
    parts
}

impl TryFrom<Vec<String>> for Tag {
    type Error = ShapeError;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(parts)
    }
}

impl From<Tag> for Vec<String> {
    fn from(tag: Tag) -> Self {
        tag.to_vec()
    }
}

pub fn tag_value<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|tag| tag.name() == name)
        .and_then(Tag::value)
}

/// Ids referenced by `e` tags, in tag order.
pub fn event_ids(tags: &[Tag]) -> Vec<&str> {
    tags.iter()
        .filter_map(|tag| match tag {
            Tag::Event { id, .. } => Some(id.as_str()),
            _ => None,
        })
        .collect()
}

/// Pubkeys referenced by `p` tags, in tag order.
pub fn pubkeys(tags: &[Tag]) -> Vec<&str> {
    tags.iter()
        .filter_map(|tag| match tag {
            Tag::Pubkey { pubkey, .. } => Some(pubkey.as_str()),
            _ => None,
        })
        .collect()
}

/// The event a note replies to: the `e` tag marked `reply`, otherwise the
/// last `e` tag.
pub fn reply_event_id(tags: &[Tag]) -> Option<&str> {
    let mut last = None;
    for tag in tags {
        if let Tag::Event { id, marker, .. } = tag {
            if marker.as_deref() == Some("reply") {
                return Some(id);
            }
            last = Some(id.as_str());
        }
    }
    last
}
