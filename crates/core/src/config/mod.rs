//! Agent configuration
//!
//! Settings the agent reads once at attach:
//! - Type-safe config struct via serde
//! - TOML file format
//! - Auto-generation of a default config
//! - Manual reload capability
//!
//! # Example
//!
//! ```toml
//! version = 1
//! debug = false
//! log_filter = "info"
//!
//! [hooks]
//! present_index = 42
//! reset_index = 16
//! window_messages = true
//! ```

mod loader;

use std::path::Path;

use serde::{Deserialize, Serialize};

use overlayhook_sdk::indices;

pub use loader::{agent_config_path, configs_dir, overlayhook_base_dir, HOME_ENV};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Could not determine config directory from the host location
    #[error("Config directory not available - could not resolve base path")]
    NoConfigDirectory,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Dispatch table slots to intercept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Slot of the per-frame entry point the overlay draws from
    pub present_index: usize,

    /// Slot of the device reset entry point
    pub reset_index: usize,

    /// Replace the captured window's procedure to intercept its messages
    pub window_messages: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            present_index: indices::END_SCENE,
            reset_index: indices::RESET,
            window_messages: true,
        }
    }
}

/// Agent configuration.
///
/// Loaded from `<base>/configs/agent.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// `tracing` filter directive, e.g. `info` or `overlayhook_core=trace`
    pub log_filter: String,

    pub hooks: HookConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            log_filter: "info".to_string(),
            hooks: HookConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load agent config from file, creating default if missing.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&agent_config_path()?)
    }

    /// Save agent config to file.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&agent_config_path()?)
    }

    /// Reload agent config from file.
    pub fn reload(&mut self) -> ConfigResult<()> {
        self.reload_from(&agent_config_path()?)
    }

    /// Load from an explicit path, creating a default file if missing.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded agent config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save_to(path)?;
            tracing::info!("Created default agent config at {:?}", path);
            Ok(default)
        }
    }

    /// Save to an explicit path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved agent config to {:?}", path);
        Ok(())
    }

    /// Reload from an explicit path.
    pub fn reload_from(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded agent config from {:?}", path);
        Ok(())
    }

    /// Filter directive for the log subscriber
    ///
    /// `debug = true` forces at least debug level.
    pub fn effective_log_filter(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_filter
        }
    }
}
