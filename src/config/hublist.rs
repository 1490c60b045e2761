//! Hublist-registration worker configuration (spec §2 "Async helpers",
//! §9 "hublist registration on the worker"). The hub itself never hosts
//! a directory (Non-goals); this only controls whether *this* hub
//! announces itself to an external one.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HublistConfig {
    /// Whether the periodic announce job runs at all.
    #[serde(default)]
    pub enabled: bool,
    /// `host:port` of the external hublist's plaintext announce endpoint.
    pub target: Option<String>,
    /// Public address clients should use to connect, sent in the announce body.
    #[serde(default)]
    pub public_address: String,
}
