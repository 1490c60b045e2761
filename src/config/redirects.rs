//! Close-reason to redirect-URL mapping (spec §6.2, `custom_redirects`).

use serde::Deserialize;
use std::collections::HashMap;

/// The hub's fixed close-reason vocabulary (spec §6.2). Connections are
/// always closed with one of these tags, which double as the lookup key
/// into [`RedirectsConfig`] and as the label attached to the
/// `connection_closed` trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    Default,
    InvalidUser,
    Kicked,
    ForceMove,
    Quit,
    HubLoad,
    Timeout,
    ToAnyAction,
    UserLimit,
    ShareLimit,
    TagNone,
    TagInvalid,
    Password,
    LoginErr,
    Syntax,
    InvalidKey,
    Reconnect,
    Clone,
    SelfConnect,
    BadNick,
    NoRedir,
    Plugin,
}

impl CloseReason {
    /// The wire/config name used in `custom_redirects` keys and logs.
    pub fn wire_name(self) -> &'static str {
        match self {
            CloseReason::Default => "DEFAULT",
            CloseReason::InvalidUser => "INVALID_USER",
            CloseReason::Kicked => "KICKED",
            CloseReason::ForceMove => "FORCEMOVE",
            CloseReason::Quit => "QUIT",
            CloseReason::HubLoad => "HUB_LOAD",
            CloseReason::Timeout => "TIMEOUT",
            CloseReason::ToAnyAction => "TO_ANYACTION",
            CloseReason::UserLimit => "USERLIMIT",
            CloseReason::ShareLimit => "SHARE_LIMIT",
            CloseReason::TagNone => "TAG_NONE",
            CloseReason::TagInvalid => "TAG_INVALID",
            CloseReason::Password => "PASSWORD",
            CloseReason::LoginErr => "LOGIN_ERR",
            CloseReason::Syntax => "SYNTAX",
            CloseReason::InvalidKey => "INVALID_KEY",
            CloseReason::Reconnect => "RECONNECT",
            CloseReason::Clone => "CLONE",
            CloseReason::SelfConnect => "SELF",
            CloseReason::BadNick => "BADNICK",
            CloseReason::NoRedir => "NOREDIR",
            CloseReason::Plugin => "PLUGIN",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RedirectsConfig {
    /// Redirect URL used when no closer-specific entry matches.
    #[serde(default)]
    pub default_url: Option<String>,
    /// Per-close-reason redirect override, keyed by the reason's wire
    /// name (e.g. `"CLONE"`, `"USERLIMIT"`).
    #[serde(default)]
    pub by_reason: HashMap<String, String>,
}

impl RedirectsConfig {
    pub fn url_for(&self, reason: CloseReason) -> Option<&str> {
        self.by_reason
            .get(reason.wire_name())
            .or(self.default_url.as_ref())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_url() {
        let cfg = RedirectsConfig {
            default_url: Some("dchub://fallback.example".into()),
            by_reason: HashMap::new(),
        };
        assert_eq!(cfg.url_for(CloseReason::UserLimit), Some("dchub://fallback.example"));
    }

    #[test]
    fn per_reason_entry_wins_over_default() {
        let mut by_reason = HashMap::new();
        by_reason.insert("USERLIMIT".to_string(), "dchub://overflow.example".to_string());
        let cfg = RedirectsConfig {
            default_url: Some("dchub://fallback.example".into()),
            by_reason,
        };
        assert_eq!(cfg.url_for(CloseReason::UserLimit), Some("dchub://overflow.example"));
        assert_eq!(cfg.url_for(CloseReason::Clone), Some("dchub://fallback.example"));
    }

    #[test]
    fn no_entries_yields_none() {
        let cfg = RedirectsConfig::default();
        assert_eq!(cfg.url_for(CloseReason::Timeout), None);
    }
}
