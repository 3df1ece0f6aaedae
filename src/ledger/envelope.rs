//! Authenticated-encrypted signal envelopes
//!
//! AES-256-GCM with a fresh random 12-byte nonce per envelope. The SHA-256
//! digest of the plaintext travels alongside; the ledger uses it both as the
//! storage key and as the event id. Write-only: only the ledger's consumer
//! decrypts.
//!
//! Every envelope of one deployment is sealed with the same static key
//! (either configured or derived from the operator's signing key) until the
//! operator rotates it.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::common::errors::{RelayError, Result};
use crate::common::types::Signal;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const HASH_LEN: usize = 32;

/// 256-bit symmetric envelope key
#[derive(Clone, PartialEq, Eq)]
pub struct EnvelopeKey([u8; KEY_LEN]);

impl EnvelopeKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Explicit key if configured, else SHA-256 of the signing-key material
    pub fn resolve(explicit_hex: Option<&str>, signing_key_material: &str) -> Result<Self> {
        match explicit_hex.map(str::trim).filter(|k| !k.is_empty()) {
            Some(hex_key) => {
                let bytes = hex::decode(hex_key.trim_start_matches("0x")).map_err(|e| {
                    RelayError::Configuration(format!("Envelope key is not hex: {}", e))
                })?;
                let key: [u8; KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
                    RelayError::Configuration(format!(
                        "Envelope key must be {} bytes, got {}",
                        KEY_LEN,
                        b.len()
                    ))
                })?;
                Ok(Self(key))
            }
            None => Ok(Self::derive(signing_key_material)),
        }
    }

    /// One-way derivation from signing-key material
    pub fn derive(signing_key_material: &str) -> Self {
        Self(Sha256::digest(signing_key_material.trim().as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnvelopeKey(..)")
    }
}

/// Sealed signal; a new one (new nonce) is built for every submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub iv: [u8; IV_LEN],
    pub aad: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
    /// SHA-256 of the plaintext
    pub content_hash: [u8; HASH_LEN],
}

impl EncryptedEnvelope {
    pub fn content_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.content_hash))
    }
}

/// Builds envelopes under one key
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    key: EnvelopeKey,
}

impl EnvelopeCodec {
    pub fn new(key: EnvelopeKey) -> Self {
        Self { key }
    }

    /// Seal `plaintext`, binding `aad` into the tag
    pub fn encode(&self, plaintext: &[u8], aad: &[u8]) -> Result<EncryptedEnvelope> {
        let cipher = Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|e| RelayError::Encryption(e.to_string()))?;

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let mut sealed = cipher
            .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad })
            .map_err(|e| RelayError::Encryption(e.to_string()))?;

        // aes-gcm appends the tag to the ciphertext
        if sealed.len() < TAG_LEN {
            return Err(RelayError::Encryption("Sealed output shorter than tag".to_string()));
        }
        let tag_bytes = sealed.split_off(sealed.len() - TAG_LEN);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&tag_bytes);

        Ok(EncryptedEnvelope {
            iv,
            aad: aad.to_vec(),
            ciphertext: sealed,
            tag,
            content_hash: Sha256::digest(plaintext).into(),
        })
    }

    /// Seal a signal: JSON plaintext, signal key as AAD
    pub fn encode_signal(&self, signal: &Signal) -> Result<EncryptedEnvelope> {
        let plaintext = serde_json::to_vec(signal)?;
        self.encode(&plaintext, signal.key().as_bytes())
    }
}
