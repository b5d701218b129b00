//! AES-256-GCM encryption for the local vault file.
//!
//! Ciphertext is stored as `ivHex:cipherHex`, where the IV is a fresh random
//! 96-bit nonce per encryption and the cipher part includes the GCM tag.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::VaultError;

/// Symmetric key length in bytes.
pub const KEY_LEN: usize = 32;

/// Initialization vector length in bytes.
pub const IV_LEN: usize = 12;

/// Where an encryption key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Randomly generated and kept in the platform credential store.
    Keychain,
    /// Derived from machine and user identifiers. Weaker: anyone who knows
    /// the home path, hostname and username can recompute it.
    MachineDerived,
}

impl fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOrigin::Keychain => write!(f, "random key in credential store"),
            KeyOrigin::MachineDerived => write!(f, "machine-derived key"),
        }
    }
}

/// Stable identifiers used for the degraded key derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineIdentity {
    pub home: String,
    pub hostname: String,
    pub username: String,
}

impl MachineIdentity {
    /// Identity of the current user on this machine.
    pub fn current() -> Self {
        let home = dirs::home_dir()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_default();
        let username = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default();

        Self {
            home,
            hostname,
            username,
        }
    }
}

/// A 256-bit encryption key together with its origin.
pub struct EncryptionKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
    origin: KeyOrigin,
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl EncryptionKey {
    /// Generate a fresh random key, destined for the credential store.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        Self {
            bytes,
            origin: KeyOrigin::Keychain,
        }
    }

    /// Decode a key previously stored with [`EncryptionKey::to_hex`].
    pub fn from_hex(encoded: &str) -> Result<Self, VaultError> {
        let decoded = Zeroizing::new(
            hex::decode(encoded.trim())
                .map_err(|e| VaultError::CorruptedData(format!("encryption key: {e}")))?,
        );
        if decoded.len() != KEY_LEN {
            return Err(VaultError::CorruptedData(format!(
                "encryption key must be {KEY_LEN} bytes, got {}",
                decoded.len()
            )));
        }

        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        bytes.copy_from_slice(&decoded);
        Ok(Self {
            bytes,
            origin: KeyOrigin::Keychain,
        })
    }

    /// Derive the degraded-mode key from machine identifiers.
    pub fn derive(identity: &MachineIdentity) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"gitpilot:");
        hasher.update(identity.home.as_bytes());
        hasher.update(b":");
        hasher.update(identity.hostname.as_bytes());
        hasher.update(b":");
        hasher.update(identity.username.as_bytes());

        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        bytes.copy_from_slice(&hasher.finalize());
        Self {
            bytes,
            origin: KeyOrigin::MachineDerived,
        }
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.bytes[..]))
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.bytes[..]))
    }
}

/// Encrypt `plaintext` into the `ivHex:cipherHex` format.
pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<String, VaultError> {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = key
        .cipher()
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| VaultError::EncryptionFailed)?;

    Ok(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
}

/// Decrypt a blob produced by [`encrypt`].
///
/// The format and IV length are validated first; a blob that fails those
/// checks is [`VaultError::CorruptedData`], while an authentication failure
/// is [`VaultError::WrongKey`].
pub fn decrypt(blob: &str, key: &EncryptionKey) -> Result<Zeroizing<String>, VaultError> {
    let parts: Vec<&str> = blob.trim().split(':').collect();
    if parts.len() != 2 {
        return Err(VaultError::CorruptedData(format!(
            "expected 2 colon-separated segments, found {}",
            parts.len()
        )));
    }

    let iv = hex::decode(parts[0])
        .map_err(|e| VaultError::CorruptedData(format!("initialization vector: {e}")))?;
    if iv.len() != IV_LEN {
        return Err(VaultError::CorruptedData(format!(
            "initialization vector must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }

    let ciphertext = hex::decode(parts[1])
        .map_err(|e| VaultError::CorruptedData(format!("ciphertext: {e}")))?;

    let plaintext = Zeroizing::new(
        key.cipher()
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| VaultError::WrongKey)?,
    );

    String::from_utf8(plaintext.to_vec())
        .map(Zeroizing::new)
        .map_err(|_| VaultError::CorruptedData("plaintext is not valid UTF-8".to_string()))
}
