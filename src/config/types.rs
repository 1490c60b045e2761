//! Core config struct definitions.

use super::defaults;
use super::{
    FloodConfig, HublistConfig, LimitsConfig, ListenConfig, MetricsConfig, RedirectsConfig,
    SchedulerConfig, SecurityConfig, WireConfig,
};
use serde::Deserialize;

/// Hub server identity and process-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Hub name, sent in `$Lock ... Pk=<name><version>|` and `$HubName`.
    pub name: String,
    /// Hub topic, appended to `$HubName` as `<name> - <topic>`.
    #[serde(default)]
    pub topic: String,
    /// Command trigger prefix for the console dispatcher (`+` or `!`).
    #[serde(default = "defaults::command_prefix")]
    pub command_prefix: char,
    /// Path to the SQLite database file (or `:memory:`).
    #[serde(default = "defaults::database_path")]
    pub database_path: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Maximum connected users before new logins are redirected with `USERLIMIT`.
    #[serde(default = "defaults::max_users")]
    pub max_users: usize,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// An operator account seeded at startup, independent of the registration table.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorBlock {
    pub nick: String,
    pub class: i8,
}

/// The full hub configuration tree.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub listen: ListenConfig,
    #[serde(default)]
    pub operators: Vec<OperatorBlock>,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub flood: FloodConfig,
    #[serde(default)]
    pub redirects: RedirectsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub hublist: HublistConfig,
    #[serde(default)]
    pub wire: WireConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[cfg(test)]
impl Config {
    /// A minimal, valid config used only by unit tests in this crate.
    pub fn default_for_test() -> Config {
        Config {
            server: ServerConfig {
                name: "TestHub".into(),
                topic: String::new(),
                command_prefix: '+',
                database_path: ":memory:".into(),
                log_format: LogFormat::Pretty,
                max_users: 1000,
            },
            listen: ListenConfig { address: "127.0.0.1:4111".parse().unwrap() },
            operators: Vec::new(),
            security: SecurityConfig::default(),
            limits: LimitsConfig::default(),
            flood: FloodConfig::default(),
            redirects: RedirectsConfig::default(),
            scheduler: SchedulerConfig::default(),
            hublist: HublistConfig::default(),
            wire: WireConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
