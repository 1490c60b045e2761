//! Tag validation and compat-TLS policy knobs (spec §4.7, §4.9).

use super::defaults;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TagValidationConfig {
    #[serde(default = "defaults::max_hubs")]
    pub max_hubs: u32,
    #[serde(default = "defaults::min_limit_kbps")]
    pub min_limit_kbps: f64,
    #[serde(default = "defaults::min_ls_ratio")]
    pub min_ls_ratio: f64,
}

impl Default for TagValidationConfig {
    fn default() -> Self {
        TagValidationConfig {
            max_hubs: defaults::max_hubs(),
            min_limit_kbps: defaults::min_limit_kbps(),
            min_ls_ratio: defaults::min_ls_ratio(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub tag_validation: TagValidationConfig,
    /// Require both CTM/RCTM peers to advertise the `TLS` feature.
    #[serde(default)]
    pub require_tls_for_ctm: bool,
    /// IP of the external TLS-terminating proxy allowed to send `$MyIP`.
    pub tls_proxy_addr: Option<std::net::IpAddr>,
    /// The hub's chosen policy for unsolicited CTM-to-hub referer
    /// traffic (spec §9 open question — resolved here as an explicit,
    /// configurable enum rather than left data-driven).
    #[serde(default)]
    pub ctm_to_hub_policy: Ctm2HubPolicy,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Ctm2HubPolicy {
    /// Silently drop the referer's request (safest default).
    #[default]
    Drop,
    /// Answer with `$ForceMove` to the hub's own redirect URL.
    ForceMove,
    /// Answer with a `$ConnectToMe` ping-back to the referer itself.
    PingBack,
}
