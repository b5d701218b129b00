//! Platform credential store access.
//!
//! Shells out to the system tool (`security` on macOS, `secret-tool` on
//! Linux) so the secret lives in the user's login keychain rather than in a
//! file we manage.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tracing::debug;
use zeroize::Zeroizing;

use super::Secret;
use crate::error::VaultError;

/// Service name used for every entry.
pub const SERVICE: &str = "gitpilot";

/// Account holding the API key itself.
pub const API_KEY_ACCOUNT: &str = "api-key";

/// Account holding the hex-encoded vault encryption key.
pub const ENCRYPTION_KEY_ACCOUNT: &str = "encryption-key";

/// Exit code of `security find-generic-password` when no item matches.
const MACOS_ITEM_NOT_FOUND: i32 = 44;

/// Trait for a secure credential store.
///
/// This abstraction allows replacing the platform keychain in tests.
#[cfg_attr(test, mockall::automock)]
pub trait SecretStore: Send + Sync {
    /// Look up a secret. `Ok(None)` means the store works but has no entry.
    fn get(&self, account: &str) -> Result<Option<String>, VaultError>;

    /// Create or replace a secret.
    fn set(&self, account: &str, secret: &str) -> Result<(), VaultError> {
        let backend = self.backend()?;
        let output = match backend {
            Backend::MacSecurity => {
                let command = security_add_command(account, secret)?;
                run_with_stdin(backend, &["-i"], command.as_bytes())?
            }
            Backend::SecretTool => {
                let label = format!("{SERVICE} {account}");
                let args = [
                    "store",
                    "--label",
                    label.as_str(),
                    "service",
                    SERVICE,
                    "account",
                    account,
                ];
                run_with_stdin(backend, &args, secret.as_bytes())?
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        // `security -i` reports failed commands on stderr only
        let failed = match backend {
            Backend::MacSecurity => !output.status.success() || !stderr.is_empty(),
            Backend::SecretTool => !output.status.success(),
        };
        if failed {
            return Err(VaultError::StoreFailed(stderr));
        }

        Ok(())
    }
}

/// Run the backend with `input` on stdin so it never appears in the process list.
fn run_with_stdin(backend: Backend, args: &[&str], input: &[u8]) -> Result<Output, VaultError> {
    let program = backend.program();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| VaultError::StoreFailed(format!("{program}: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input)
            .map_err(|e| VaultError::StoreFailed(format!("{program}: {e}")))?;
    }

    child
        .wait_with_output()
        .map_err(|e| VaultError::StoreFailed(format!("{program}: {e}")))
}

/// One `add-generic-password` line for `security -i`.
fn security_add_command(account: &str, secret: &str) -> Result<Secret, VaultError> {
    if secret.contains(['\n', '\r']) {
        return Err(VaultError::StoreFailed("secret contains a line break".to_string()));
    }

    let mut line = Zeroizing::new(String::with_capacity(64 + account.len() + 2 * secret.len()));
    line.push_str("add-generic-password -U -s ");
    push_quoted(&mut line, SERVICE);
    line.push_str(" -a ");
    push_quoted(&mut line, account);
    line.push_str(" -w ");
    push_quoted(&mut line, secret);
    line.push('\n');
    Ok(line)
}

fn push_quoted(line: &mut String, value: &str) {
    line.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            line.push('\\');
        }
        line.push(c);
    }
    line.push('"');
}
