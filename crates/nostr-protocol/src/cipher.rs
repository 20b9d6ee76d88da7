//! Private content encryption (NIP-04 style).
//!
//! The symmetric key is the x coordinate of the ECDH point between our
//! secret scalar and the counterpart's x-only public key lifted with even
//! parity. Payloads are AES-256-CBC with a fresh 16-byte IV per message,
//! encoded as `base64(ciphertext)?iv=base64(iv)`.

use std::fmt;

use aes::Aes256;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand_core::{OsRng, RngCore};
use secp256k1::{ecdh, PublicKey, SecretKey};
use thiserror::Error;

use crate::keys::Keys;

const IV_MARKER: &str = "?iv=";
const IV_LEN: usize = 16;
const KEY_LEN: usize = 32;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("payload has no iv segment")]
    MissingIv,
    #[error("invalid iv: {0}")]
    InvalidIv(String),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decryption failed")]
    Decrypt,
    #[error("decrypted payload is not utf-8")]
    InvalidUtf8,
}

/// ECDH shared key with a counterpart given as 32-byte x-only hex.
pub fn derive_shared_key(
    secret_key: &SecretKey,
    counterpart: &str,
) -> Result<[u8; KEY_LEN], CryptoError> {
    let xonly = hex::decode(counterpart)
        .map_err(|err| CryptoError::InvalidPublicKey(err.to_string()))?;
    if xonly.len() != KEY_LEN {
        return Err(CryptoError::InvalidPublicKey(format!(
            "expected {KEY_LEN} bytes, got {}",
            xonly.len()
        )));
    }

    let mut compressed = [0u8; KEY_LEN + 1];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(&xonly);
    let point = PublicKey::from_slice(&compressed)
        .map_err(|err| CryptoError::InvalidPublicKey(err.to_string()))?;

    let shared = ecdh::shared_secret_point(&point, secret_key);
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&shared[..KEY_LEN]);
    Ok(key)
}

/// Symmetric box bound to one counterpart.
#[derive(Clone)]
pub struct CipherBox {
    key: [u8; KEY_LEN],
}

impl CipherBox {
    pub fn new(keys: &Keys, counterpart: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            key: derive_shared_key(keys.secret_key(), counterpart)?,
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    fn encrypt_with_iv(&self, plaintext: &str, iv: &[u8; IV_LEN]) -> String {
        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &(*iv).into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        let engine = base64::engine::general_purpose::STANDARD;
        format!(
            "{}{IV_MARKER}{}",
            engine.encode(ciphertext),
            engine.encode(iv)
        )
    }

    pub fn decrypt(&self, payload: &str) -> Result<String, CryptoError> {
        let (ciphertext, iv) = payload
            .split_once(IV_MARKER)
            .ok_or(CryptoError::MissingIv)?;

        let engine = base64::engine::general_purpose::STANDARD;
        let iv = engine
            .decode(iv)
            .map_err(|err| CryptoError::InvalidIv(err.to_string()))?;
        if iv.len() != IV_LEN {
            return Err(CryptoError::InvalidIv(format!(
                "expected {IV_LEN} bytes, got {}",
                iv.len()
            )));
        }
        let ciphertext = engine.decode(ciphertext)?;

        let plaintext = Aes256CbcDec::new_from_slices(&self.key, &iv)
            .map_err(|err| CryptoError::InvalidIv(err.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }
}

impl fmt::Debug for CipherBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherBox").field("key", &"<redacted>").finish()
    }
}

pub fn encrypt(keys: &Keys, counterpart: &str, plaintext: &str) -> Result<String, CryptoError> {
    Ok(CipherBox::new(keys, counterpart)?.encrypt(plaintext))
}

pub fn decrypt(keys: &Keys, counterpart: &str, payload: &str) -> Result<String, CryptoError> {
    CipherBox::new(keys, counterpart)?.decrypt(payload)
}
