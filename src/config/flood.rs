//! Flood/clone guard configuration (spec §4.6).

use super::defaults;
use serde::Deserialize;

/// Action taken once a per-kind threshold is exceeded.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FloodPolicy {
    Warn,
    Kick,
    Ban,
}

/// Thresholds for a single rate-limited message kind.
#[derive(Debug, Clone, Deserialize)]
pub struct FloodKindConfig {
    #[serde(default = "defaults::flood_threshold")]
    pub drop_threshold: u32,
    #[serde(default = "defaults::flood_window_secs")]
    pub window_secs: u64,
    #[serde(default = "defaults::flood_warn_at")]
    pub warn_at: u32,
    #[serde(default = "defaults::flood_ban_at")]
    pub ban_at: u32,
    #[serde(default = "defaults::flood_ban_secs")]
    pub ban_secs: i64,
}

impl Default for FloodKindConfig {
    fn default() -> Self {
        FloodKindConfig {
            drop_threshold: defaults::flood_threshold(),
            window_secs: defaults::flood_window_secs(),
            warn_at: defaults::flood_warn_at(),
            ban_at: defaults::flood_ban_at(),
            ban_secs: defaults::flood_ban_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloodConfig {
    #[serde(default)]
    pub chat: FloodKindConfig,
    #[serde(default)]
    pub pm: FloodKindConfig,
    #[serde(default)]
    pub search: FloodKindConfig,
    #[serde(default)]
    pub mcto: FloodKindConfig,
    #[serde(default)]
    pub ctm: FloodKindConfig,
    #[serde(default)]
    pub rctm: FloodKindConfig,
    #[serde(default)]
    pub any: FloodKindConfig,
    /// Clone-detection description fragment length (bytes).
    #[serde(default = "defaults::clone_fragment_len")]
    pub clone_fragment_len: usize,
}

impl Default for FloodConfig {
    fn default() -> Self {
        FloodConfig {
            chat: FloodKindConfig::default(),
            pm: FloodKindConfig::default(),
            search: FloodKindConfig::default(),
            mcto: FloodKindConfig::default(),
            ctm: FloodKindConfig::default(),
            rctm: FloodKindConfig::default(),
            any: FloodKindConfig::default(),
            clone_fragment_len: defaults::clone_fragment_len(),
        }
    }
}
