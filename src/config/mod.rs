//! Configuration loading and management.
//!
//! Split into logical submodules:
//! - [`types`]: top-level `Config` tree and server identity.
//! - [`listen`]: network listener configuration.
//! - [`security`]: ban/penalty/tag-validation/compat-TLS policy knobs.
//! - [`limits`]: per-frame and per-message byte/line caps.
//! - [`flood`]: per-kind flood thresholds and windows.
//! - [`redirects`]: close-reason to redirect-URL mapping.
//! - [`defaults`]: `#[serde(default = "...")]` functions shared by the above.

mod defaults;
mod flood;
mod hublist;
mod limits;
mod listen;
mod redirects;
mod scheduler;
mod security;
mod types;
mod wire;

pub use flood::{FloodConfig, FloodKindConfig, FloodPolicy};
pub use hublist::HublistConfig;
pub use limits::LimitsConfig;
pub use listen::ListenConfig;
pub use redirects::{CloseReason, RedirectsConfig};
pub use scheduler::SchedulerConfig;
pub use security::{Ctm2HubPolicy, SecurityConfig, TagValidationConfig};
pub use types::{Config, LogFormat, OperatorBlock, ServerConfig};
pub use wire::{MetricsConfig, WireConfig};

use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Load and parse a hub config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

/// Cross-field validation that serde's per-field defaults cannot express.
fn validate(config: &Config) -> Result<(), String> {
    if config.limits.min_nick_length == 0 {
        return Err("limits.min_nick_length must be at least 1".into());
    }
    if config.limits.min_nick_length > config.limits.max_nick_length {
        return Err("limits.min_nick_length must not exceed limits.max_nick_length".into());
    }
    if config.server.name.is_empty() {
        return Err("server.name must not be empty".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_nick_bounds() {
        let mut config = types::Config::default_for_test();
        config.limits.min_nick_length = 20;
        config.limits.max_nick_length = 5;
        assert!(validate(&config).is_err());
    }
}
