//! Wire-level encoding knobs: charset boundary and `$ZOn` compression
//! threshold (spec §6.1, §2 "Wire encoding").

use super::defaults;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WireConfig {
    /// `encoding_rs` label for the hub's non-UTF-8 default charset.
    /// NMDC predates UTF-8 clients; most hubs still default to CP1252.
    #[serde(default = "defaults::hub_encoding")]
    pub encoding: String,
    /// Minimum frame size, in bytes, before a `ZPipe`-capable client is
    /// sent a compressed `$ZOn` envelope instead of the plain frame.
    #[serde(default = "defaults::zon_threshold_bytes")]
    pub zon_threshold_bytes: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        WireConfig { encoding: defaults::hub_encoding(), zon_threshold_bytes: defaults::zon_threshold_bytes() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetricsConfig {
    /// Address the `/metrics` HTTP endpoint binds to. Absent disables it.
    pub bind: Option<std::net::SocketAddr>,
}
