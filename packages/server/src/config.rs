//! Server configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes. Command-line flags are applied on top by the binary.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    domain::{HistoryBackend, OverflowPolicy, RoomRetention},
    ui::SessionSettings,
};

/// Upper bound for `outbox_capacity`. Each outbox preallocates its slots.
pub const MAX_OUTBOX_CAPACITY: usize = 65_536;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Lines queued per member before the overflow policy applies
    pub outbox_capacity: usize,

    pub overflow_policy: OverflowPolicy,

    /// How long a `block` enqueue may wait for space
    pub enqueue_timeout_ms: u64,

    /// Idle limit per read; 0 disables it
    pub read_timeout_secs: u64,

    pub write_timeout_secs: u64,

    pub room_retention: RoomRetention,

    pub history: HistoryBackend,

    /// Directory for `history = "file"`
    pub history_dir: PathBuf,

    /// Maximum simultaneous connections (unlimited when absent)
    pub max_connections: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            outbox_capacity: 64,
            overflow_policy: OverflowPolicy::DropOldest,
            enqueue_timeout_ms: 1000,
            read_timeout_secs: 300,
            write_timeout_secs: 10,
            room_retention: RoomRetention::Retain,
            history: HistoryBackend::None,
            history_dir: PathBuf::from("history"),
            max_connections: None,
        }
    }
}

impl ServerConfig {
    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ServerConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbox_capacity == 0 || self.outbox_capacity > MAX_OUTBOX_CAPACITY {
            return Err(ConfigError::Invalid {
                field: "outbox_capacity",
                reason: format!(
                    "must be between 1 and {}, got {}",
                    MAX_OUTBOX_CAPACITY, self.outbox_capacity
                ),
            });
        }
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            read_timeout: (self.read_timeout_secs > 0)
                .then(|| Duration::from_secs(self.read_timeout_secs)),
            write_timeout: Duration::from_secs(self.write_timeout_secs),
            outbox_capacity: self.outbox_capacity,
            overflow_policy: self.overflow_policy,
            enqueue_timeout: Duration::from_millis(self.enqueue_timeout_ms),
        }
    }
}
