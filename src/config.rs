//! Runtime settings, read from the environment with defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Overrides the data directory (state, client secret, token cache).
const DATA_DIR_ENV: &str = "MAIL_HERALD_DATA_DIR";

/// Overrides the bootstrap window, in minutes.
const BOOTSTRAP_ENV: &str = "MAIL_HERALD_BOOTSTRAP_MINS";

/// Default bootstrap window: 15 minutes.
const DEFAULT_BOOTSTRAP_MINS: u64 = 15;

/// Process-wide settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where `state.json`, `client_secret.json`, and `token.json` live.
    pub data_dir: PathBuf,
    /// How far back a first run or a long-idle installation is allowed to
    /// reach. The watermark is never older than `now - bootstrap_window`.
    pub bootstrap_window: Duration,
}

impl Settings {
    /// Build settings from environment variables.
    ///
    /// The data dir defaults to `$HOME/.mail-herald`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let home = std::env::var("HOME").map_err(|_| {
                    ConfigError::DataDir(format!(
                        "HOME is not set and {DATA_DIR_ENV} was not provided"
                    ))
                })?;
                PathBuf::from(home).join(".mail-herald")
            }
        };

        let bootstrap_mins = match std::env::var(BOOTSTRAP_ENV) {
            Ok(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: BOOTSTRAP_ENV.to_string(),
                message: format!("expected minutes as an integer, got {raw:?}"),
            })?,
            Err(_) => DEFAULT_BOOTSTRAP_MINS,
        };

        Ok(Self {
            data_dir,
            bootstrap_window: Duration::from_secs(bootstrap_mins * 60),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".mail-herald"),
            bootstrap_window: Duration::from_secs(DEFAULT_BOOTSTRAP_MINS * 60),
        }
    }
}
