//! Encrypted-at-rest storage and layered resolution of the AI API key.
//!
//! Resolution order:
//! 1. `GITPILOT_API_KEY` environment variable
//! 2. Platform credential store
//! 3. Encrypted vault file in the configuration directory

pub mod crypto;
pub mod file;
pub mod keychain;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::{API_KEY_ENV_VAR, AppConfig};
use crate::error::VaultError;

pub use crypto::{EncryptionKey, KeyOrigin, MachineIdentity};
pub use keychain::{SecretStore, SystemKeychain};

use keychain::{API_KEY_ACCOUNT, ENCRYPTION_KEY_ACCOUNT};

/// A secret string that is wiped from memory on drop.
pub type Secret = Zeroizing<String>;

/// The tier a credential was found in or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    Keychain,
    EncryptedFile,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Environment => "environment variable",
            KeySource::Keychain => "system credential store",
            KeySource::EncryptedFile => "encrypted config file",
        }
    }
}

/// A decrypted vault file entry.
#[derive(Debug)]
pub struct VaultEntry {
    pub key_material: Secret,
    /// Which encryption key unlocked the entry.
    pub key_origin: KeyOrigin,
}

/// Where `persist_key` ended up storing the secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOutcome {
    pub source: KeySource,
    /// Set when the secret went to the encrypted file.
    pub key_origin: Option<KeyOrigin>,
}

/// One tier of the resolution chain.
pub trait KeyResolver: Send + Sync {
    fn source(&self) -> KeySource;

    /// Return the secret if this tier has a non-empty one.
    fn resolve(&self) -> Option<Secret>;
}

/// Reads the key from an environment variable.
pub struct EnvResolver {
    var: String,
}

impl EnvResolver {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl KeyResolver for EnvResolver {
    fn source(&self) -> KeySource {
        KeySource::Environment
    }

    fn resolve(&self) -> Option<Secret> {
        std::env::var(&self.var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Zeroizing::new)
    }
}

/// Reads the key from the platform credential store.
pub struct KeychainResolver {
    store: Arc<dyn SecretStore>,
}

impl KeyResolver for KeychainResolver {
    fn source(&self) -> KeySource {
        KeySource::Keychain
    }

    fn resolve(&self) -> Option<Secret> {
        match self.store.get(API_KEY_ACCOUNT) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()).map(Zeroizing::new),
            Err(e) => {
                debug!("Credential store lookup failed: {e}");
                None
            }
        }
    }
}

/// Decrypts the key from the vault file.
pub struct EncryptedFileResolver {
    store: Arc<dyn SecretStore>,
    path: Option<PathBuf>,
    identity: MachineIdentity,
}

impl EncryptedFileResolver {
    fn read_entry(&self) -> Result<Option<VaultEntry>, VaultError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(None);
        };
        let Some(blob) = file::read_blob(path)? else {
            return Ok(None);
        };

        let key = load_encryption_key(self.store.as_ref(), &self.identity);
        let key_material = crypto::decrypt(&blob, &key)?;
        Ok(Some(VaultEntry {
            key_material,
            key_origin: key.origin(),
        }))
    }
}

impl KeyResolver for EncryptedFileResolver {
    fn source(&self) -> KeySource {
        KeySource::EncryptedFile
    }

    fn resolve(&self) -> Option<Secret> {
        match self.read_entry() {
            Ok(entry) => entry
                .map(|e| e.key_material)
                .filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!("Ignoring stored API key: {e}");
                None
            }
        }
    }
}

/// Owns the API key tiers and the write path.
pub struct CredentialVault {
    resolvers: Vec<Box<dyn KeyResolver>>,
    store: Arc<dyn SecretStore>,
    vault_file: Option<PathBuf>,
    identity: MachineIdentity,
}

impl CredentialVault {
    /// Vault backed by the system keychain and the configured directory.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(
            Arc::new(SystemKeychain::new()),
            config.vault_file(),
            MachineIdentity::current(),
        )
    }

    /// Vault with an explicit store, file location and identity.
    pub fn with_store(
        store: Arc<dyn SecretStore>,
        vault_file: Option<PathBuf>,
        identity: MachineIdentity,
    ) -> Self {
        let resolvers: Vec<Box<dyn KeyResolver>> = vec![
            Box::new(EnvResolver::new(API_KEY_ENV_VAR)),
            Box::new(KeychainResolver {
                store: Arc::clone(&store),
            }),
            Box::new(EncryptedFileResolver {
                store: Arc::clone(&store),
                path: vault_file.clone(),
                identity: identity.clone(),
            }),
        ];

        Self {
            resolvers,
            store,
            vault_file,
            identity,
        }
    }

    /// Resolve the API key from the first tier that has one.
    ///
    /// Never fails: every problem is logged and treated as "not found".
    pub fn resolve_key(&self) -> Option<Secret> {
        self.resolve_with_source().map(|(secret, _)| secret)
    }

    /// Which tier currently supplies the key, if any.
    pub fn status(&self) -> Option<KeySource> {
        self.resolve_with_source().map(|(_, source)| source)
    }

    fn resolve_with_source(&self) -> Option<(Secret, KeySource)> {
        self.resolvers.iter().find_map(|resolver| {
            let secret = resolver.resolve()?;
            debug!("API key resolved from {}", resolver.source().as_str());
            Some((secret, resolver.source()))
        })
    }

    /// Persist the API key.
    ///
    /// Tries the credential store first and falls back to the encrypted
    /// vault file on any store failure.
    pub fn persist_key(&self, secret: &str) -> Result<PersistOutcome, VaultError> {
        if secret.trim().is_empty() {
            return Err(VaultError::EmptySecret);
        }

        match self.store.set(API_KEY_ACCOUNT, secret) {
            Ok(()) => {
                return Ok(PersistOutcome {
                    source: KeySource::Keychain,
                    key_origin: None,
                });
            }
            Err(e) => warn!("Credential store unavailable ({e}); using encrypted config file"),
        }

        let path = self.vault_file.as_deref().ok_or(VaultError::NoConfigDir)?;
        let key = load_or_create_encryption_key(self.store.as_ref(), &self.identity);
        if key.origin() == KeyOrigin::MachineDerived {
            warn!("No credential store for the encryption key; using a machine-derived key");
        }

        let blob = crypto::encrypt(secret, &key)?;
        file::write_blob(path, &blob)?;

        Ok(PersistOutcome {
            source: KeySource::EncryptedFile,
            key_origin: Some(key.origin()),
        })
    }
}

/// Encryption key for reading: the stored random key, else the derived one.
fn load_encryption_key(store: &dyn SecretStore, identity: &MachineIdentity) -> EncryptionKey {
    match store.get(ENCRYPTION_KEY_ACCOUNT) {
        Ok(Some(encoded)) => match EncryptionKey::from_hex(&encoded) {
            Ok(key) => return key,
            Err(e) => warn!("Stored encryption key is invalid: {e}"),
        },
        Ok(None) => {}
        Err(e) => debug!("Encryption key lookup failed: {e}"),
    }
    EncryptionKey::derive(identity)
}

/// Encryption key for writing: reuse the stored key, or generate and store a
/// new one, or fall back to the derived key when the store rejects it.
fn load_or_create_encryption_key(
    store: &dyn SecretStore,
    identity: &MachineIdentity,
) -> EncryptionKey {
    match store.get(ENCRYPTION_KEY_ACCOUNT) {
        Ok(Some(encoded)) => {
            if let Ok(key) = EncryptionKey::from_hex(&encoded) {
                return key;
            }
        }
        Ok(None) => {
            let key = EncryptionKey::generate();
            match store.set(ENCRYPTION_KEY_ACCOUNT, &key.to_hex()) {
                Ok(()) => return key,
                Err(e) => debug!("Could not store encryption key: {e}"),
            }
        }
        Err(e) => debug!("Encryption key lookup failed: {e}"),
    }
    EncryptionKey::derive(identity)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serial_test::serial;

    use super::*;
    use keychain::MockSecretStore;

    fn identity() -> MachineIdentity {
        MachineIdentity {
            home: "/home/dev".to_string(),
            hostname: "box".to_string(),
            username: "dev".to_string(),
        }
    }

    fn unavailable_store() -> MockSecretStore {
        let mut store = MockSecretStore::new();
        store
            .expect_get()
            .returning(|_| Err(VaultError::StoreUnavailable("test".to_string())));
        store
            .expect_set()
            .returning(|_, _| Err(VaultError::StoreUnavailable("test".to_string())));
        store
    }

    /// Keeps the encryption key but refuses to hold the API key itself.
    #[derive(Default)]
    struct EncryptionKeyOnlyStore {
        entries: Mutex<HashMap<String, String>>,
    }

    impl SecretStore for EncryptionKeyOnlyStore {
        fn get(&self, account: &str) -> Result<Option<String>, VaultError> {
            Ok(self.entries.lock().unwrap().get(account).cloned())
        }

        fn set(&self, account: &str, secret: &str) -> Result<(), VaultError> {
            if account == API_KEY_ACCOUNT {
                return Err(VaultError::StoreFailed("locked".to_string()));
            }
            self.entries
                .lock()
                .unwrap()
                .insert(account.to_string(), secret.to_string());
            Ok(())
        }
    }

    #[test]
    #[serial]
    fn test_persist_rejects_blank_secret_before_any_write() {
        let mut store = MockSecretStore::new();
        store.expect_set().never();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let vault = CredentialVault::with_store(Arc::new(store), Some(path.clone()), identity());

        assert!(matches!(vault.persist_key("   "), Err(VaultError::EmptySecret)));
        assert!(matches!(vault.persist_key(""), Err(VaultError::EmptySecret)));
        assert!(!path.exists());
    }

    #[test]
    #[serial]
    fn test_persist_prefers_credential_store() {
        let mut store = MockSecretStore::new();
        store
            .expect_set()
            .withf(|account, secret| account == API_KEY_ACCOUNT && secret == "sk-1")
            .times(1)
            .returning(|_, _| Ok(()));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let vault = CredentialVault::with_store(Arc::new(store), Some(path.clone()), identity());

        let outcome = vault.persist_key("sk-1").unwrap();
        assert_eq!(outcome.source, KeySource::Keychain);
        assert!(!path.exists());
    }

    #[test]
    #[serial]
    fn test_file_fallback_round_trip_with_derived_key() {
        temp_env::with_var_unset(API_KEY_ENV_VAR, || {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("sub").join("config.json");
            let vault = CredentialVault::with_store(
                Arc::new(unavailable_store()),
                Some(path.clone()),
                identity(),
            );

            let outcome = vault.persist_key("sk-derived-42").unwrap();
            assert_eq!(outcome.source, KeySource::EncryptedFile);
            assert_eq!(outcome.key_origin, Some(KeyOrigin::MachineDerived));

            let resolved = vault.resolve_key().unwrap();
            assert_eq!(resolved.as_str(), "sk-derived-42");
            assert_eq!(vault.status(), Some(KeySource::EncryptedFile));
        });
    }

    #[test]
    #[serial]
    fn test_file_fallback_round_trip_with_random_key() {
        temp_env::with_var_unset(API_KEY_ENV_VAR, || {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config.json");
            let store = Arc::new(EncryptionKeyOnlyStore::default());
            let vault =
                CredentialVault::with_store(store.clone(), Some(path.clone()), identity());

            let outcome = vault.persist_key("sk-random-7").unwrap();
            assert_eq!(outcome.source, KeySource::EncryptedFile);
            assert_eq!(outcome.key_origin, Some(KeyOrigin::Keychain));
            assert_eq!(vault.resolve_key().unwrap().as_str(), "sk-random-7");

            // The derived key cannot open a blob sealed with the random key
            let blob = file::read_blob(&path).unwrap().unwrap();
            let derived = EncryptionKey::derive(&identity());
            assert!(matches!(
                crypto::decrypt(&blob, &derived),
                Err(VaultError::WrongKey)
            ));
        });
    }

    #[test]
    #[serial]
    fn test_env_var_takes_priority_over_stored_key() {
        let mut store = MockSecretStore::new();
        // Lower tiers must not be consulted once the env var hits
        store.expect_get().never();
        let vault = CredentialVault::with_store(Arc::new(store), None, identity());

        temp_env::with_var(API_KEY_ENV_VAR, Some("sk-env"), || {
            assert_eq!(vault.resolve_key().unwrap().as_str(), "sk-env");
            assert_eq!(vault.status(), Some(KeySource::Environment));
        });
    }

    #[test]
    #[serial]
    fn test_blank_env_var_falls_through_to_keychain() {
        let mut store = MockSecretStore::new();
        store
            .expect_get()
            .withf(|account| account == API_KEY_ACCOUNT)
            .returning(|_| Ok(Some("sk-keychain".to_string())));
        let vault = CredentialVault::with_store(Arc::new(store), None, identity());

        temp_env::with_var(API_KEY_ENV_VAR, Some("  "), || {
            assert_eq!(vault.resolve_key().unwrap().as_str(), "sk-keychain");
            assert_eq!(vault.status(), Some(KeySource::Keychain));
        });
    }

    #[test]
    #[serial]
    fn test_resolve_fails_open_on_corrupted_file() {
        temp_env::with_var_unset(API_KEY_ENV_VAR, || {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config.json");
            file::write_blob(&path, "not-a-valid-blob").unwrap();
            let vault = CredentialVault::with_store(
                Arc::new(unavailable_store()),
                Some(path),
                identity(),
            );

            assert!(vault.resolve_key().is_none());
            assert!(vault.status().is_none());
        });
    }

    #[test]
    #[serial]
    fn test_resolve_nothing_configured() {
        temp_env::with_var_unset(API_KEY_ENV_VAR, || {
            let vault =
                CredentialVault::with_store(Arc::new(unavailable_store()), None, identity());
            assert!(vault.resolve_key().is_none());
        });
    }

    #[test]
    #[serial]
    fn test_persist_without_config_dir_fails_after_store_failure() {
        let vault = CredentialVault::with_store(Arc::new(unavailable_store()), None, identity());
        assert!(matches!(
            vault.persist_key("sk"),
            Err(VaultError::NoConfigDir)
        ));
    }
}
