//! Per-frame and per-message byte/line caps (spec §6.1).

use super::defaults;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "defaults::max_frame_len")]
    pub max_frame_len: usize,
    #[serde(default = "defaults::min_nick_length")]
    pub min_nick_length: usize,
    #[serde(default = "defaults::max_nick_length")]
    pub max_nick_length: usize,
    #[serde(default = "defaults::max_chat_lines")]
    pub max_chat_lines: usize,
    #[serde(default = "defaults::max_chat_bytes")]
    pub max_chat_bytes: usize,
    #[serde(default = "defaults::max_pm_bytes")]
    pub max_pm_bytes: usize,
    #[serde(default = "defaults::accepted_timeout_secs")]
    pub accepted_timeout_secs: u64,
    #[serde(default = "defaults::locksent_timeout_secs")]
    pub locksent_timeout_secs: u64,
    #[serde(default = "defaults::nickvalidated_timeout_secs")]
    pub nickvalidated_timeout_secs: u64,
    #[serde(default = "defaults::myinfo_timeout_secs")]
    pub myinfo_timeout_secs: u64,
    /// Minimum declared share, in bytes, to pass `$MyINFO` (0 disables
    /// the check).
    #[serde(default)]
    pub min_share_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_frame_len: defaults::max_frame_len(),
            min_nick_length: defaults::min_nick_length(),
            max_nick_length: defaults::max_nick_length(),
            max_chat_lines: defaults::max_chat_lines(),
            max_chat_bytes: defaults::max_chat_bytes(),
            max_pm_bytes: defaults::max_pm_bytes(),
            accepted_timeout_secs: defaults::accepted_timeout_secs(),
            locksent_timeout_secs: defaults::locksent_timeout_secs(),
            nickvalidated_timeout_secs: defaults::nickvalidated_timeout_secs(),
            myinfo_timeout_secs: defaults::myinfo_timeout_secs(),
            min_share_bytes: 0,
        }
    }
}
