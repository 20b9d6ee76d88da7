use std::fmt;

use rand_core::{OsRng, RngCore};
use secp256k1::{Keypair, SecretKey, SECP256K1};

use crate::cipher::CryptoError;
use crate::nip19::{self, KeyPointer};
use crate::Error;

/// A secp256k1 keypair with its x-only public key cached as hex.
#[derive(Clone)]
pub struct Keys {
    secret_key: SecretKey,
    keypair: Keypair,
    public_key: String,
}

impl Keys {
    pub fn new(secret_key: SecretKey) -> Self {
        let keypair = Keypair::from_secret_key(SECP256K1, &secret_key);
        let (xonly, _parity) = keypair.x_only_public_key();
        Self {
            secret_key,
            keypair,
            public_key: hex::encode(xonly.serialize()),
        }
    }

    /// Draws 32 bytes from the OS RNG until they form a valid scalar.
    pub fn generate() -> Self {
        loop {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            if let Ok(secret_key) = SecretKey::from_slice(&bytes) {
                return Self::new(secret_key);
            }
        }
    }

    /// Accepts a 64-character hex secret or an `nsec` identifier.
    pub fn parse(value: &str) -> Result<Self, Error> {
        let trimmed = value.trim();
        let bytes = if trimmed.len() == 64 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            hex::decode(trimmed).map_err(|_| CryptoError::InvalidSecretKey)?
        } else {
            match nip19::decode(trimmed)? {
                KeyPointer::PrivateKey(hex_key) => {
                    hex::decode(hex_key).map_err(|_| CryptoError::InvalidSecretKey)?
                }
                _ => return Err(CryptoError::InvalidSecretKey.into()),
            }
        };
        let secret_key = SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Self::new(secret_key))
    }

    pub fn public_key(&self) -> String {
        self.public_key.clone()
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    pub(crate) fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE_SECRET: &str = "2bd806c97f0e00af1a1fc3328fa763a9269723c8db8fac4f93af71db186d6e90";
    const ALICE_PUBKEY: &str = "9997a497d964fc1a62885b05a51166a65a90df00492c8d7cf61d6accf54803be";
    const ALICE_NSEC: &str = "nsec190vqdjtlpcq27xslcveglfmr4ynfwg7gmw86cnun4acakxrdd6gqlhwtrg";

    #[test]
    fn derives_xonly_public_key() {
        let keys = Keys::parse(ALICE_SECRET).unwrap();
        assert_eq!(keys.public_key(), ALICE_PUBKEY);
        assert_eq!(keys.secret_key_hex(), ALICE_SECRET);
    }

    #[test]
    fn parses_nsec() {
        let keys = Keys::parse(ALICE_NSEC).unwrap();
        assert_eq!(keys.public_key(), ALICE_PUBKEY);
    }

    #[test]
    fn rejects_public_identifiers_and_garbage() {
        assert!(Keys::parse("npub1nxt6f97evn7p5c5gtvz62ytx5edfphcqfykg6l8kr44vea2gqwlqfehw73").is_err());
        assert!(Keys::parse("not a key").is_err());
        assert!(Keys::parse(&"0".repeat(64)).is_err());
    }

    #[test]
    fn generated_keys_differ() {
        let a = Keys::generate();
        let b = Keys::generate();
        assert_ne!(a.public_key(), b.public_key());
        assert_eq!(a.public_key().len(), 64);
    }

    #[test]
    fn debug_redacts_secret() {
        let keys = Keys::parse(ALICE_SECRET).unwrap();
        let debug = format!("{keys:?}");
        assert!(!debug.contains(ALICE_SECRET));
        assert!(debug.contains("redacted"));
    }
}
