//! Default-value functions for `#[serde(default = "...")]` fields.

pub fn command_prefix() -> char {
    '+'
}

pub fn database_path() -> String {
    "verlihub.db".to_string()
}

pub fn max_users() -> usize {
    10_000
}

pub fn max_frame_len() -> usize {
    65 * 1024
}

pub fn max_chat_lines() -> usize {
    1
}

pub fn max_chat_bytes() -> usize {
    1024
}

pub fn max_pm_bytes() -> usize {
    1024
}

pub fn min_nick_length() -> usize {
    1
}

pub fn max_nick_length() -> usize {
    32
}

pub fn accepted_timeout_secs() -> u64 {
    60
}

pub fn locksent_timeout_secs() -> u64 {
    30
}

pub fn nickvalidated_timeout_secs() -> u64 {
    30
}

pub fn myinfo_timeout_secs() -> u64 {
    30
}

pub fn max_hubs() -> u32 {
    3
}

pub fn min_limit_kbps() -> f64 {
    0.0
}

pub fn min_ls_ratio() -> f64 {
    0.0
}

pub fn flood_threshold() -> u32 {
    10
}

pub fn flood_window_secs() -> u64 {
    5
}

pub fn flood_warn_at() -> u32 {
    20
}

pub fn flood_ban_at() -> u32 {
    30
}

pub fn flood_ban_secs() -> i64 {
    600
}

pub fn clone_fragment_len() -> usize {
    32
}

pub fn zon_threshold_bytes() -> usize {
    512
}

pub fn hub_encoding() -> String {
    "windows-1252".to_string()
}

pub fn slow_timer_secs() -> u64 {
    10
}

pub fn reload_timer_secs() -> u64 {
    60
}

pub fn hublist_timer_secs() -> u64 {
    3600
}

pub fn kick_history_rotate_days() -> i64 {
    7
}

pub fn ban_cleanup_grace_days() -> i64 {
    0
}

pub fn unban_history_retention_days() -> i64 {
    30
}
