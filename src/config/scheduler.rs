//! Periodic timer configuration (spec §9B "ban/kick cleanup cadence").

use super::defaults;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Short-ban sweep / ban-list prune / penalty prune cadence.
    #[serde(default = "defaults::slow_timer_secs")]
    pub slow_timer_secs: u64,
    /// `SetupList` reload cadence. The listen address is excluded from
    /// hot-reload (spec §9).
    #[serde(default = "defaults::reload_timer_secs")]
    pub reload_timer_secs: u64,
    /// Hublist-registration job enqueue cadence.
    #[serde(default = "defaults::hublist_timer_secs")]
    pub hublist_timer_secs: u64,
    #[serde(default = "defaults::kick_history_rotate_days")]
    pub kick_history_rotate_days: i64,
    #[serde(default = "defaults::ban_cleanup_grace_days")]
    pub ban_cleanup_grace_days: i64,
    #[serde(default = "defaults::unban_history_retention_days")]
    pub unban_history_retention_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            slow_timer_secs: defaults::slow_timer_secs(),
            reload_timer_secs: defaults::reload_timer_secs(),
            hublist_timer_secs: defaults::hublist_timer_secs(),
            kick_history_rotate_days: defaults::kick_history_rotate_days(),
            ban_cleanup_grace_days: defaults::ban_cleanup_grace_days(),
            unban_history_retention_days: defaults::unban_history_retention_days(),
        }
    }
}
