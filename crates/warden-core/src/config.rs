//! Runtime configuration, loaded from TOML.
//!
//! Every section and field is optional; omitted values fall back to the
//! defaults documented on each field.
//!
//! ```toml
//! [resolver]
//! short_circuit_unknown_actors = true
//!
//! [heartbeat]
//! interval_ms = 1000
//!
//! [store]
//! root = "warden-data/players"
//! ```

use std::{path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use warden_contracts::error::{WardenError, WardenResult};

/// Top-level configuration for a warden deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub resolver: ResolverConfig,
    pub heartbeat: HeartbeatConfig,
    pub store: StoreConfig,
}

impl WardenConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `WardenError::ConfigError` if the TOML is malformed, does not
    /// match the schema, or sets a zero heartbeat interval.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        let config: WardenConfig = toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse warden config TOML: {}", e),
        })?;
        if config.heartbeat.interval_ms == 0 {
            return Err(WardenError::ConfigError {
                reason: "heartbeat.interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }
}

/// Knobs for permission resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// When true (the default), an actor with no user record is denied
    /// every node without consulting groups, `Default`, or legacy overrides.
    ///
    /// This mirrors long-standing behaviour that hosts may rely on. Set to
    /// false to let such actors fall through to `Default` and the legacy
    /// table.
    pub short_circuit_unknown_actors: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            short_circuit_unknown_actors: true,
        }
    }
}

/// Heartbeat tracker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Milliseconds between liveness writes. Defaults to 1000.
    pub interval_ms: u64,
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

/// Session store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one JSON session file per actor.
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("warden-data/players"),
        }
    }
}
