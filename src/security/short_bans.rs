//! In-memory short bans keyed by lower-cased nick or 32-bit IP (spec
//! §4.5 "Short bans"). Expired entries are swept by the slow timer
//! ([`crate::scheduler`]), not eagerly on lookup.

use dashmap::DashMap;

/// Why a short ban was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortBanSubKind {
    Password,
    Reconnect,
    Flood,
    Clone,
}

#[derive(Debug, Clone)]
pub struct ShortBan {
    pub until: i64,
    pub reason: String,
    pub sub_kind: ShortBanSubKind,
}

/// Two independent maps: one keyed by lower-cased nick, one by the
/// connecting IP's 32-bit form. A hit on either denies the connection.
#[derive(Default)]
pub struct ShortBanStore {
    by_nick: DashMap<String, ShortBan>,
    by_ip: DashMap<u32, ShortBan>,
}

impl ShortBanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ban_nick(&self, nick: &str, until: i64, reason: impl Into<String>, sub_kind: ShortBanSubKind) {
        self.by_nick.insert(nick.to_lowercase(), ShortBan { until, reason: reason.into(), sub_kind });
    }

    pub fn ban_ip(&self, ip: u32, until: i64, reason: impl Into<String>, sub_kind: ShortBanSubKind) {
        self.by_ip.insert(ip, ShortBan { until, reason: reason.into(), sub_kind });
    }

    pub fn check_nick(&self, nick: &str, now: i64) -> Option<ShortBan> {
        let key = nick.to_lowercase();
        let entry = self.by_nick.get(&key)?;
        if entry.until > now {
            Some(entry.clone())
        } else {
            None
        }
    }

    pub fn check_ip(&self, ip: u32, now: i64) -> Option<ShortBan> {
        let entry = self.by_ip.get(&ip)?;
        if entry.until > now {
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Drop every entry whose `until` has passed. Returns the count removed.
    pub fn sweep_expired(&self, now: i64) -> usize {
        let before = self.by_nick.len() + self.by_ip.len();
        self.by_nick.retain(|_, ban| ban.until > now);
        self.by_ip.retain(|_, ban| ban.until > now);
        before - (self.by_nick.len() + self.by_ip.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nick_ban_expires() {
        let store = ShortBanStore::new();
        store.ban_nick("Mallory", 100, "flood", ShortBanSubKind::Flood);
        assert!(store.check_nick("mallory", 50).is_some());
        assert!(store.check_nick("mallory", 100).is_none());
    }

    #[test]
    fn sweep_removes_expired_entries_only() {
        let store = ShortBanStore::new();
        store.ban_nick("alice", 100, "x", ShortBanSubKind::Password);
        store.ban_nick("bob", 900, "x", ShortBanSubKind::Password);
        let removed = store.sweep_expired(500);
        assert_eq!(removed, 1);
        assert!(store.check_nick("bob", 500).is_some());
    }
}
