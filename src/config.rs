//! Runtime configuration resolved from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Environment variable holding the API key. Takes priority over stored keys.
pub const API_KEY_ENV_VAR: &str = "GITPILOT_API_KEY";

/// Environment variable overriding the per-user configuration directory.
pub const CONFIG_DIR_ENV_VAR: &str = "GITPILOT_CONFIG_DIR";

/// Environment variable selecting the completion model.
pub const MODEL_ENV_VAR: &str = "GITPILOT_MODEL";

/// Environment variable overriding the completion API base URL.
pub const API_BASE_ENV_VAR: &str = "GITPILOT_API_BASE";

/// Environment variable overriding the completion request timeout (seconds).
pub const TIMEOUT_ENV_VAR: &str = "GITPILOT_AI_TIMEOUT";

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV_VAR: &str = "GITPILOT_LOG";

/// Name of the vault file inside the configuration directory.
pub const VAULT_FILE_NAME: &str = "config.json";

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings shared by the vault and the completion client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Per-user configuration directory, `None` when no home can be found.
    pub config_dir: Option<PathBuf>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            config_dir: config_dir(),
            model: non_empty_var(MODEL_ENV_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: non_empty_var(API_BASE_ENV_VAR)
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            timeout: get_timeout(),
        }
    }

    /// Path of the encrypted vault file.
    pub fn vault_file(&self) -> Option<PathBuf> {
        self.config_dir.as_ref().map(|dir| dir.join(VAULT_FILE_NAME))
    }
}

fn config_dir() -> Option<PathBuf> {
    non_empty_var(CONFIG_DIR_ENV_VAR)
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|dir| dir.join("gitpilot")))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Get the configured completion timeout.
///
/// Logs a warning if the environment variable is set but is not a
/// non-negative integer.
fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_timeout_default() {
        temp_env::with_var_unset(TIMEOUT_ENV_VAR, || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    fn test_get_timeout_from_env() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("5"), || {
            assert_eq!(get_timeout(), Duration::from_secs(5));
        });
    }

    #[test]
    fn test_get_timeout_invalid_env_uses_default() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("soon"), || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    fn test_config_dir_override() {
        temp_env::with_var(CONFIG_DIR_ENV_VAR, Some("/tmp/gitpilot-test"), || {
            let config = AppConfig::from_env();
            assert_eq!(
                config.vault_file(),
                Some(PathBuf::from("/tmp/gitpilot-test/config.json"))
            );
        });
    }

    #[test]
    fn test_model_and_base_defaults() {
        temp_env::with_vars_unset([MODEL_ENV_VAR, API_BASE_ENV_VAR], || {
            let config = AppConfig::from_env();
            assert_eq!(config.model, DEFAULT_MODEL);
            assert_eq!(config.api_base, DEFAULT_API_BASE);
        });
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        temp_env::with_var(API_BASE_ENV_VAR, Some("http://localhost:9000/"), || {
            assert_eq!(AppConfig::from_env().api_base, "http://localhost:9000");
        });
    }
}
