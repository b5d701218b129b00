//! The encrypted vault file in the per-user configuration directory.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VaultError;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// On-disk layout: a single field holding `ivHex:cipherHex`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encrypted_api_key: Option<String>,
}

/// Read the encrypted blob. A missing file or field is `Ok(None)`.
pub fn read_blob(path: &Path) -> Result<Option<String>, VaultError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|source| VaultError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let file: VaultFile =
        serde_json::from_str(&content).map_err(|source| VaultError::InvalidFile {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(file.encrypted_api_key.filter(|b| !b.trim().is_empty()))
}

/// Write the encrypted blob, creating the parent directory if absent.
///
/// Writes to a temporary file in the same directory and renames it into
/// place so a crash never leaves a half-written vault.
pub fn write_blob(path: &Path, blob: &str) -> Result<(), VaultError> {
    let write_err = |source| VaultError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().ok_or(VaultError::NoConfigDir)?;
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(write_err)?;
        #[cfg(unix)]
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).map_err(write_err)?;
    }

    let content = serde_json::to_string_pretty(&VaultFile {
        encrypted_api_key: Some(blob.to_string()),
    })
    .map_err(|source| VaultError::InvalidFile {
        path: path.to_path_buf(),
        source,
    })?;

    // NamedTempFile is created with mode 0600 on Unix
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}
