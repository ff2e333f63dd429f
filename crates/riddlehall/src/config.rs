//! Service configuration.
//!
//! The configuration is a JSON document. Its path comes from the
//! `RIDDLEHALL_CONFIG` environment variable and falls back to
//! `config/riddlehall.json`. A missing file is not an error: every field
//! has a default, so the hall runs with the built-in values. A file that
//! exists but cannot be parsed or fails validation is reported.
//!
//! ```json
//! {
//!   "log_filter": "riddlehall=debug,info",
//!   "room": {
//!     "first_room_id": 100,
//!     "last_room_id": 999,
//!     "rules": { "question_budget": 20 },
//!     "timing": { "host_response_secs": 45 }
//!   }
//! }
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use riddlehall_room::RoomConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config/riddlehall.json";
const CONFIG_PATH_ENV: &str = "RIDDLEHALL_CONFIG";
const DEFAULT_LOG_FILTER: &str = "info";

/// Errors raised while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration of a hall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HallConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub room: RoomConfig,
}

impl Default for HallConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            room: RoomConfig::default(),
        }
    }
}

impl HallConfig {
    /// Loads the configuration from `RIDDLEHALL_CONFIG` or the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&resolve_config_path())
    }

    /// Loads the configuration from `path`, using the defaults if the file
    /// does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(raw) => {
                let config = Self::from_json(&raw)?;
                info!(path = %path.display(), "loaded configuration");
                Ok(config)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found, using defaults"
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no room could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let room = &self.room;
        if room.room_ids().is_empty() {
            return Err(invalid(format!(
                "room id range {}..={} is empty",
                room.first_room_id, room.last_room_id
            )));
        }
        if room.channel_size == 0 {
            return Err(invalid("channel_size must be positive"));
        }

        let rules = &room.rules;
        if rules.question_budget == 0 || rules.guesses_per_player == 0 {
            return Err(invalid("question and guess budgets must be positive"));
        }
        if rules.questioner_strikes == 0 || rules.host_strikes == 0 {
            return Err(invalid("strike limits must be positive"));
        }

        let timing = &room.timing;
        if timing.start_warning_secs >= timing.start_timeout_secs {
            return Err(invalid(format!(
                "start warning ({}s) must come before the start timeout ({}s)",
                timing.start_warning_secs, timing.start_timeout_secs
            )));
        }
        if timing.host_response_secs == 0 || timing.host_grace_secs == 0 {
            return Err(invalid("host response delays must be positive"));
        }

        if self.log_filter.trim().is_empty() {
            warn!("empty log_filter, falling back to {DEFAULT_LOG_FILTER}");
        }
        Ok(())
    }

    /// The filter to hand to [`crate::telemetry::init`].
    pub fn log_filter(&self) -> &str {
        match self.log_filter.trim() {
            "" => DEFAULT_LOG_FILTER,
            filter => filter,
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
