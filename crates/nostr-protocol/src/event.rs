//! Event codec: canonical serialization, id hashing, signing and
//! verification.
//!
//! The id of an event is the SHA-256 of the compact JSON array
//! `[0, pubkey, created_at, kind, tags, content]`. Field order and the
//! absence of whitespace are part of the cross-network contract.

use std::time::{SystemTime, UNIX_EPOCH};

use rand_core::{OsRng, RngCore};
use secp256k1::schnorr::Signature;
use secp256k1::{Message, XOnlyPublicKey, SECP256K1};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::ShapeError;
use crate::keys::Keys;
use crate::tags::Tag;
use crate::Error;

pub const KIND_METADATA: u16 = 0;
pub const KIND_TEXT_NOTE: u16 = 1;
pub const KIND_CONTACTS: u16 = 3;
pub const KIND_ENCRYPTED_DM: u16 = 4;
pub const KIND_DELETION: u16 = 5;
pub const KIND_REPOST: u16 = 6;
pub const KIND_REACTION: u16 = 7;
pub const KIND_CHANNEL_CREATE: u16 = 40;
pub const KIND_CHANNEL_METADATA: u16 = 41;
pub const KIND_CHANNEL_MESSAGE: u16 = 42;
pub const KIND_CHANNEL_HIDE_MESSAGE: u16 = 43;
pub const KIND_CHANNEL_MUTE_USER: u16 = 44;
pub const KIND_ZAP_REQUEST: u16 = 9734;
pub const KIND_ZAP_RECEIPT: u16 = 9735;
pub const KIND_MUTE_LIST: u16 = 10000;
pub const KIND_PIN_LIST: u16 = 10001;
pub const KIND_RELAY_LIST: u16 = 10002;
pub const KIND_BOOKMARK_LIST: u16 = 10003;
pub const KIND_PARAMETERIZED_LIST: u16 = 30001;

/// Relays keep only the latest event per author for these kinds.
pub fn is_replaceable(kind: u16) -> bool {
    kind == KIND_METADATA || kind == KIND_CONTACTS || (10_000..20_000).contains(&kind)
}

/// Replaceable per author and `d` tag.
pub fn is_parameterized_replaceable(kind: u16) -> bool {
    (30_000..40_000).contains(&kind)
}

pub fn is_channel_kind(kind: u16) -> bool {
    (KIND_CHANNEL_CREATE..=KIND_CHANNEL_MUTE_USER).contains(&kind)
}

/// An event under composition. Signing consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl UnsignedEvent {
    pub fn new(
        pubkey: impl Into<String>,
        kind: u16,
        tags: Vec<Tag>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            pubkey: pubkey.into(),
            created_at: unix_timestamp(),
            kind,
            tags,
            content: content.into(),
        }
    }

    pub fn created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn canonicalize(&self) -> String {
        canonical_json(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    pub fn hash(&self) -> String {
        hex::encode(digest(&self.canonicalize()))
    }

    /// Signs with fresh auxiliary randomness.
    pub fn sign(self, keys: &Keys) -> Result<Event, Error> {
        let mut aux = [0u8; 32];
        OsRng.fill_bytes(&mut aux);
        self.sign_with_aux_rand(keys, &aux)
    }

    /// Deterministic signing for a caller-chosen auxiliary input.
    pub fn sign_with_aux_rand(self, keys: &Keys, aux: &[u8; 32]) -> Result<Event, Error> {
        let signer = keys.public_key();
        if self.pubkey != signer {
            return Err(Error::KeyMismatch {
                event: self.pubkey,
                signer,
            });
        }

        let id = digest(&self.canonicalize());
        let message = Message::from_digest(id);
        let sig = SECP256K1.sign_schnorr_with_aux_rand(&message, keys.keypair(), aux);

        Ok(Event {
            id: hex::encode(id),
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig: hex::encode(sig.serialize()),
        })
    }
}

/// A signed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: String,
}

impl Event {
    /// Parses untrusted wire data. Shape is checked before the typed decode,
    /// so a non-string tag element is rejected rather than coerced.
    pub fn from_value(value: Value) -> Result<Self, ShapeError> {
        validate_shape(&value)?;
        serde_json::from_value(value).map_err(|err| ShapeError::field("event", err.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, ShapeError> {
        let value: Value =
            serde_json::from_str(json).map_err(|err| ShapeError::field("event", err.to_string()))?;
        Self::from_value(value)
    }

    pub fn as_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn canonicalize(&self) -> String {
        canonical_json(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    pub fn hash(&self) -> String {
        hex::encode(digest(&self.canonicalize()))
    }

    /// Checks the fixed-width hex fields. Run before transmission.
    pub fn validate_shape(&self) -> Result<(), ShapeError> {
        check_hex("id", &self.id, 32)?;
        check_hex("pubkey", &self.pubkey, 32)?;
        check_hex("sig", &self.sig, 64)?;
        Ok(())
    }

    /// Recomputes the id and checks the signature. Never panics: any
    /// malformed field yields `false`.
    pub fn verify(&self) -> bool {
        let computed = self.hash();
        if computed != self.id {
            debug!(event_id = %self.id, computed = %computed, "Event id mismatch");
            return false;
        }

        let mut id = [0u8; 32];
        if hex::decode_to_slice(&self.id, &mut id).is_err() {
            return false;
        }

        let pubkey = match hex::decode(&self.pubkey)
            .ok()
            .and_then(|bytes| XOnlyPublicKey::from_slice(&bytes).ok())
        {
            Some(pubkey) => pubkey,
            None => {
                debug!(event_id = %self.id, "Event pubkey is not a valid x-only key");
                return false;
            }
        };

        let sig = match hex::decode(&self.sig)
            .ok()
            .and_then(|bytes| Signature::from_slice(&bytes).ok())
        {
            Some(sig) => sig,
            None => {
                debug!(event_id = %self.id, "Event signature is malformed");
                return false;
            }
        };

        let message = Message::from_digest(id);
        match SECP256K1.verify_schnorr(&sig, &message, &pubkey) {
            Ok(()) => true,
            Err(err) => {
                debug!(event_id = %self.id, error = %err, "Event signature verification failed");
                false
            }
        }
    }

    pub fn tag_value(&self, name: &str) -> Option<&str> {
        crate::tags::tag_value(&self.tags, name)
    }
}

/// Structural pre-filter for raw wire data. Cheap; always run before
/// [`Event::verify`].
pub fn validate_shape(value: &Value) -> Result<(), ShapeError> {
    let object = value.as_object().ok_or(ShapeError::NotAnObject)?;

    match object.get("content") {
        Some(Value::String(_)) => {}
        _ => return Err(ShapeError::field("content", "must be a string")),
    }

    if !object.get("created_at").is_some_and(Value::is_u64) {
        return Err(ShapeError::field("created_at", "must be a non-negative integer"));
    }

    match object.get("kind").and_then(Value::as_u64) {
        Some(kind) if kind <= u64::from(u16::MAX) => {}
        _ => return Err(ShapeError::field("kind", "must be an integer in 0..=65535")),
    }

    for field in ["id", "pubkey", "sig"] {
        if !object.get(field).is_some_and(Value::is_string) {
            return Err(ShapeError::field(field, "must be a string"));
        }
    }

    let tags = object
        .get("tags")
        .and_then(Value::as_array)
        .ok_or_else(|| ShapeError::field("tags", "must be a list"))?;

    for (index, tag) in tags.iter().enumerate() {
        let parts = tag.as_array().ok_or_else(|| ShapeError::InvalidTag {
            index,
            reason: "tag must be a list".to_string(),
        })?;
        if parts.is_empty() {
            return Err(ShapeError::InvalidTag {
                index,
                reason: "tag is empty".to_string(),
            });
        }
        if !parts.iter().all(Value::is_string) {
            return Err(ShapeError::InvalidTag {
                index,
                reason: "tag elements must be strings".to_string(),
            });
        }
    }

    Ok(())
}

fn check_hex(field: &'static str, value: &str, bytes: usize) -> Result<(), ShapeError> {
    let valid = value.len() == bytes * 2
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    if valid {
        Ok(())
    } else {
        Err(ShapeError::field(
            field,
            format!("must be {} lowercase hex characters", bytes * 2),
        ))
    }
}

fn canonical_json(pubkey: &str, created_at: u64, kind: u16, tags: &[Tag], content: &str) -> String {
    // Serializing a tuple of plain values cannot fail.
    serde_json::to_string(&(0u8, pubkey, created_at, kind, tags, content)).unwrap_or_default()
}

fn digest(canonical: &str) -> [u8; 32] {
    Sha256::digest(canonical.as_bytes()).into()
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const ALICE_SECRET: &str = "2bd806c97f0e00af1a1fc3328fa763a9269723c8db8fac4f93af71db186d6e90";
    const ALICE_PUBKEY: &str = "9997a497d964fc1a62885b05a51166a65a90df00492c8d7cf61d6accf54803be";
    const HELLO_ID: &str = "8e853911c20632039392b8600ceb22467748e64e3a5b423c1c353074b038e9e3";
    const HELLO_SIG: &str = "ba5aab62c2aaedc5e15a12c668ce4fa138bb18b37d0f7f4745eebd4ef5df904d005105a60a7732fee9e7d02a47e1d3ff0ffdea51994acf20be9107ce15a0661e";

    fn alice() -> Keys {
        Keys::parse(ALICE_SECRET).unwrap()
    }

    fn hello() -> UnsignedEvent {
        UnsignedEvent::new(ALICE_PUBKEY, KIND_TEXT_NOTE, vec![], "hello").created_at(1_700_000_000)
    }

    #[test]
    fn canonical_form_is_compact_and_ordered() {
        assert_eq!(
            hello().canonicalize(),
            format!(r#"[0,"{ALICE_PUBKEY}",1700000000,1,[],"hello"]"#)
        );
    }

    #[test]
    fn golden_vector() {
        let event = hello().sign_with_aux_rand(&alice(), &[0u8; 32]).unwrap();
        assert_eq!(event.id, HELLO_ID);
        assert_eq!(event.sig, HELLO_SIG);
        assert!(event.verify());
    }

    #[test]
    fn canonical_form_escapes_like_json_stringify() {
        let tags = vec![
            Tag::parse(vec![
                "e".to_string(),
                "5c83da77af1dec6d7289834998ad7aafbd9e2191396d75ec3cc27f5a77226f36".to_string(),
                "wss://relay.example.com".to_string(),
            ])
            .unwrap(),
            Tag::hashtag("nostr"),
        ];
        let event = UnsignedEvent::new(
            ALICE_PUBKEY,
            KIND_TEXT_NOTE,
            tags,
            "line\nbreak \"quoted\" café",
        )
        .created_at(1_700_000_000);
        assert_eq!(
            event.hash(),
            "60ec9d88bea4bcf45a64cfd040a6d37c8ac534fd5fd9de1666ecaaf4714a8eac"
        );
    }

    #[test]
    fn hash_is_stable() {
        let event = hello();
        assert_eq!(event.hash(), event.hash());
        assert_eq!(event.hash(), HELLO_ID);
    }

    #[test]
    fn random_aux_signatures_verify() {
        let first = hello().sign(&alice()).unwrap();
        let second = hello().sign(&alice()).unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.verify());
        assert!(second.verify());
    }

    #[test]
    fn sign_rejects_foreign_pubkey() {
        let other = Keys::generate();
        let err = hello().sign(&other).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch { .. }));
    }

    #[test]
    fn tampering_breaks_verification() {
        let signed = hello().sign(&alice()).unwrap();

        let mut content = signed.clone();
        content.content = "hello!".to_string();
        assert!(!content.verify());

        let mut created_at = signed.clone();
        created_at.created_at += 1;
        assert!(!created_at.verify());

        let mut kind = signed.clone();
        kind.kind = KIND_REACTION;
        assert!(!kind.verify());

        let mut tags = signed.clone();
        tags.tags.push(Tag::hashtag("spam"));
        assert!(!tags.verify());

        let mut pubkey = signed.clone();
        pubkey.pubkey = Keys::generate().public_key();
        assert!(!pubkey.verify());

        // Re-hashing after a change does not help without the key.
        let mut rehashed = signed.clone();
        rehashed.content = "forged".to_string();
        rehashed.id = rehashed.hash();
        assert!(!rehashed.verify());
    }

    #[test]
    fn malformed_fields_verify_false() {
        let signed = hello().sign(&alice()).unwrap();

        let mut bad_sig = signed.clone();
        bad_sig.sig = "zz".to_string();
        assert!(!bad_sig.verify());

        let mut bad_pubkey = signed.clone();
        bad_pubkey.pubkey = "not-hex".to_string();
        assert!(!bad_pubkey.verify());

        let mut bad_id = signed;
        bad_id.id = String::new();
        assert!(!bad_id.verify());
    }

    #[test]
    fn shape_rejects_bad_wire_data() {
        let good = json!({
            "id": HELLO_ID,
            "pubkey": ALICE_PUBKEY,
            "created_at": 1700000000,
            "kind": 1,
            "tags": [["t", "nostr"]],
            "content": "hello",
            "sig": HELLO_SIG,
        });
        assert!(validate_shape(&good).is_ok());

        let mut numeric_content = good.clone();
        numeric_content["content"] = json!(5);
        assert!(matches!(
            validate_shape(&numeric_content),
            Err(ShapeError::InvalidField { field: "content", .. })
        ));

        let mut float_time = good.clone();
        float_time["created_at"] = json!(1.5);
        assert!(validate_shape(&float_time).is_err());

        let mut nested = good.clone();
        nested["tags"] = json!([["e", {"id": "x"}]]);
        assert!(matches!(
            validate_shape(&nested),
            Err(ShapeError::InvalidTag { index: 0, .. })
        ));

        let mut flat = good.clone();
        flat["tags"] = json!(["e", "x"]);
        assert!(validate_shape(&flat).is_err());

        let mut big_kind = good;
        big_kind["kind"] = json!(70000);
        assert!(validate_shape(&big_kind).is_err());

        assert_eq!(validate_shape(&json!([1, 2])), Err(ShapeError::NotAnObject));
    }

    #[test]
    fn parse_boundary_produces_verifiable_event() {
        let signed = hello().sign(&alice()).unwrap();
        let parsed = Event::from_json(&signed.as_json().unwrap()).unwrap();
        assert_eq!(parsed, signed);
        assert!(parsed.verify());
    }

    #[test]
    fn wire_json_is_the_plain_object() {
        let signed = hello().sign_with_aux_rand(&alice(), &[0u8; 32]).unwrap();
        let value: Value = serde_json::from_str(&signed.as_json().unwrap()).unwrap();
        assert_eq!(value["id"], HELLO_ID);
        assert_eq!(value["sig"], HELLO_SIG);
        assert_eq!(value["tags"], json!([]));
        assert_eq!(Event::from_value(value).unwrap(), signed);
    }

    #[test]
    fn typed_shape_checks_hex_widths() {
        let signed = hello().sign(&alice()).unwrap();
        assert!(signed.validate_shape().is_ok());

        let mut upper = signed.clone();
        upper.id = upper.id.to_uppercase();
        assert!(upper.validate_shape().is_err());

        let mut short_sig = signed;
        short_sig.sig.truncate(10);
        assert!(matches!(
            short_sig.validate_shape(),
            Err(ShapeError::InvalidField { field: "sig", .. })
        ));
    }

    #[test]
    fn kind_classes() {
        assert!(is_replaceable(KIND_METADATA));
        assert!(is_replaceable(KIND_RELAY_LIST));
        assert!(!is_replaceable(KIND_TEXT_NOTE));
        assert!(is_parameterized_replaceable(KIND_PARAMETERIZED_LIST));
        assert!(is_channel_kind(KIND_CHANNEL_MESSAGE));
        assert!(!is_channel_kind(KIND_ZAP_RECEIPT));
    }
}
