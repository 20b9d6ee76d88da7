//! Human-readable identifiers (NIP-19).
//!
//! Bare keys and ids are bech32 over the raw 32 bytes. Pointers (`nprofile`,
//! `nevent`) carry a TLV stream so relay hints travel with the identifier:
//!
//! ```text
//! type 0  32-byte pubkey or event id     (exactly once)
//! type 1  relay url, utf-8               (repeatable, order kept)
//! type 2  32-byte author pubkey          (nevent only)
//! type 3  kind, big-endian u32           (nevent only)
//! ```

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Checksum, Hrp};
use thiserror::Error;

const HRP_PUBLIC_KEY: Hrp = Hrp::parse_unchecked("npub");
const HRP_PRIVATE_KEY: Hrp = Hrp::parse_unchecked("nsec");
const HRP_EVENT_ID: Hrp = Hrp::parse_unchecked("note");
const HRP_PROFILE: Hrp = Hrp::parse_unchecked("nprofile");
const HRP_EVENT: Hrp = Hrp::parse_unchecked("nevent");

const URI_SCHEME: &str = "nostr:";

const TLV_SPECIAL: u8 = 0;
const TLV_RELAY: u8 = 1;
const TLV_AUTHOR: u8 = 2;
const TLV_KIND: u8 = 3;

const KEY_LEN: usize = 32;

/// Bech32 with the code length raised to 5000 characters, so pointers with
/// many relay hints still encode and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nip19 {}

impl Checksum for Nip19 {
    type MidstateRepr = u32;
    const CODE_LENGTH: usize = 5000;
    const CHECKSUM_LENGTH: usize = 6;
    const GENERATOR_SH: [u32; 5] = [
        0x3b6a_57b2,
        0x2650_8e6d,
        0x1ea1_19fa,
        0x3d42_33dd,
        0x2a14_62b3,
    ];
    const TARGET_RESIDUE: u32 = 1;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("bech32 error: {0}")]
    Bech32(String),
    #[error("unknown identifier prefix '{0}'")]
    UnknownPrefix(String),
    #[error("invalid length for {what}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("missing required tlv entry {0}")]
    MissingTlv(u8),
    #[error("malformed tlv: {0}")]
    MalformedTlv(String),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Decoded form of any supported identifier. Keys and ids are lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPointer {
    PublicKey(String),
    PrivateKey(String),
    EventId(String),
    Profile {
        pubkey: String,
        relays: Vec<String>,
    },
    Event {
        id: String,
        relays: Vec<String>,
        author: Option<String>,
        kind: Option<u32>,
    },
}

pub fn encode_public_key(pubkey: &str) -> Result<String, CodecError> {
    encode_bytes(HRP_PUBLIC_KEY, &key_bytes("pubkey", pubkey)?)
}

pub fn encode_private_key(secret_key: &str) -> Result<String, CodecError> {
    encode_bytes(HRP_PRIVATE_KEY, &key_bytes("secret key", secret_key)?)
}

pub fn encode_event_id(id: &str) -> Result<String, CodecError> {
    encode_bytes(HRP_EVENT_ID, &key_bytes("event id", id)?)
}

pub fn encode_profile_pointer(pubkey: &str, relays: &[String]) -> Result<String, CodecError> {
    let mut tlv = Vec::new();
    push_tlv(&mut tlv, TLV_SPECIAL, &key_bytes("pubkey", pubkey)?)?;
    for relay in relays {
        push_tlv(&mut tlv, TLV_RELAY, relay.as_bytes())?;
    }
    encode_bytes(HRP_PROFILE, &tlv)
}

pub fn encode_event_pointer(
    id: &str,
    relays: &[String],
    author: Option<&str>,
    kind: Option<u32>,
) -> Result<String, CodecError> {
    let mut tlv = Vec::new();
    push_tlv(&mut tlv, TLV_SPECIAL, &key_bytes("event id", id)?)?;
    for relay in relays {
        push_tlv(&mut tlv, TLV_RELAY, relay.as_bytes())?;
    }
    if let Some(author) = author {
        push_tlv(&mut tlv, TLV_AUTHOR, &key_bytes("author", author)?)?;
    }
    if let Some(kind) = kind {
        push_tlv(&mut tlv, TLV_KIND, &kind.to_be_bytes())?;
    }
    encode_bytes(HRP_EVENT, &tlv)
}

pub fn encode(pointer: &KeyPointer) -> Result<String, CodecError> {
    match pointer {
        KeyPointer::PublicKey(pubkey) => encode_public_key(pubkey),
        KeyPointer::PrivateKey(secret_key) => encode_private_key(secret_key),
        KeyPointer::EventId(id) => encode_event_id(id),
        KeyPointer::Profile { pubkey, relays } => encode_profile_pointer(pubkey, relays),
        KeyPointer::Event {
            id,
            relays,
            author,
            kind,
        } => encode_event_pointer(id, relays, author.as_deref(), *kind),
    }
}

/// Decodes any supported identifier, with or without a `nostr:` prefix.
pub fn decode(input: &str) -> Result<KeyPointer, CodecError> {
    let trimmed = input.trim();
    let bare = match trimmed.get(..URI_SCHEME.len()) {
        Some(scheme) if scheme.eq_ignore_ascii_case(URI_SCHEME) => &trimmed[URI_SCHEME.len()..],
        _ => trimmed,
    };

    let checked = CheckedHrpstring::new::<Nip19>(bare)
        .map_err(|err| CodecError::Bech32(err.to_string()))?;
    let hrp = checked.hrp();
    let data: Vec<u8> = checked.byte_iter().collect();

    match hrp.to_lowercase().as_str() {
        "npub" => Ok(KeyPointer::PublicKey(fixed_hex("pubkey", &data)?)),
        "nsec" => Ok(KeyPointer::PrivateKey(fixed_hex("secret key", &data)?)),
        "note" => Ok(KeyPointer::EventId(fixed_hex("event id", &data)?)),
        "nprofile" => {
            let entries = parse_tlv(&data)?;
            Ok(KeyPointer::Profile {
                pubkey: entries.special("pubkey")?,
                relays: entries.relays,
            })
        }
        "nevent" => {
            let entries = parse_tlv(&data)?;
            Ok(KeyPointer::Event {
                id: entries.special("event id")?,
                relays: entries.relays,
                author: entries.author,
                kind: entries.kind,
            })
        }
        other => Err(CodecError::UnknownPrefix(other.to_string())),
    }
}

fn encode_bytes(hrp: Hrp, data: &[u8]) -> Result<String, CodecError> {
    bech32::encode::<Nip19>(hrp, data).map_err(|err| CodecError::Bech32(err.to_string()))
}

fn key_bytes(what: &'static str, value: &str) -> Result<Vec<u8>, CodecError> {
    let bytes = hex::decode(value).map_err(|err| CodecError::InvalidHex(err.to_string()))?;
    check_len(what, &bytes)?;
    Ok(bytes)
}

fn fixed_hex(what: &'static str, bytes: &[u8]) -> Result<String, CodecError> {
    check_len(what, bytes)?;
    Ok(hex::encode(bytes))
}

fn check_len(what: &'static str, bytes: &[u8]) -> Result<(), CodecError> {
    if bytes.len() == KEY_LEN {
        Ok(())
    } else {
        Err(CodecError::InvalidLength {
            what,
            expected: KEY_LEN,
            actual: bytes.len(),
        })
    }
}

fn push_tlv(out: &mut Vec<u8>, kind: u8, value: &[u8]) -> Result<(), CodecError> {
    let len = u8::try_from(value.len()).map_err(|_| {
        CodecError::MalformedTlv(format!(
            "entry {kind} is {} bytes, limit is 255",
            value.len()
        ))
    })?;
    out.push(kind);
    out.push(len);
    out.extend_from_slice(value);
    Ok(())
}

#[derive(Default)]
struct TlvEntries {
    special: Option<Vec<u8>>,
    relays: Vec<String>,
    author: Option<String>,
    kind: Option<u32>,
}

impl TlvEntries {
    fn special(&self, what: &'static str) -> Result<String, CodecError> {
        let bytes = self
            .special
            .as_deref()
            .ok_or(CodecError::MissingTlv(TLV_SPECIAL))?;
        fixed_hex(what, bytes)
    }
}

fn parse_tlv(mut data: &[u8]) -> Result<TlvEntries, CodecError> {
    let mut entries = TlvEntries::default();

    while !data.is_empty() {
        let [kind, len, rest @ ..] = data else {
            return Err(CodecError::MalformedTlv("truncated header".to_string()));
        };
        let len = usize::from(*len);
        if rest.len() < len {
            return Err(CodecError::MalformedTlv(format!(
                "entry {kind} declares {len} bytes, {} remain",
                rest.len()
            )));
        }
        let (value, tail) = rest.split_at(len);

        match *kind {
            // First occurrence wins.
            TLV_SPECIAL => {
                if entries.special.is_none() {
                    entries.special = Some(value.to_vec());
                }
            }
            TLV_RELAY => {
                let relay = std::str::from_utf8(value)
                    .map_err(|_| CodecError::MalformedTlv("relay is not utf-8".to_string()))?;
                entries.relays.push(relay.to_string());
            }
            TLV_AUTHOR => entries.author = Some(fixed_hex("author", value)?),
            TLV_KIND => {
                let bytes: [u8; 4] = value.try_into().map_err(|_| CodecError::InvalidLength {
                    what: "kind",
                    expected: 4,
                    actual: value.len(),
                })?;
                entries.kind = Some(u32::from_be_bytes(bytes));
            }
            _ => {}
        }

        data = tail;
    }

    Ok(entries)
}
