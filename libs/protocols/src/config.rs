//! # Tracker Configuration
//!
//! Limits applied by connection trackers. Loaded from an optional TOML file,
//! then overridden by `WIRETAP_*` environment variables
//! (e.g. `WIRETAP_IDLE_TIMEOUT_SECS=30`). Missing keys keep their defaults.

use crate::error::{ConfigError, ConfigResult};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Unparsed bytes kept per direction while waiting for the rest of a frame
    pub max_buffer_bytes: usize,
    /// Queued frames older than this (relative to the latest capture) are evicted
    pub frame_expiry_secs: u64,
    /// Connections with no traffic for this long are closed
    pub idle_timeout_secs: u64,
    /// Default filter for binaries that install a subscriber
    pub log_level: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_buffer_bytes: 1024 * 1024, // 1MB per direction
            frame_expiry_secs: 60,
            idle_timeout_secs: 300,
            log_level: "info".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Load from `path` (if given) with environment overrides
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!("Loading tracker config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix("WIRETAP").try_parsing(true));

        let config: TrackerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_buffer_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_buffer_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.idle_timeout_secs < self.frame_expiry_secs {
            return Err(ConfigError::Invalid {
                field: "idle_timeout_secs",
                reason: format!(
                    "{} is shorter than frame_expiry_secs {}",
                    self.idle_timeout_secs, self.frame_expiry_secs
                ),
            });
        }
        Ok(())
    }

    pub fn frame_expiry(&self) -> Duration {
        Duration::from_secs(self.frame_expiry_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
