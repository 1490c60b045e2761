//! The User record (spec §3 "User").

use std::collections::HashSet;
use tokio::sync::mpsc;

/// Named class ranks. The integer value is the wire-level class used in
/// op-list membership and console command gating; gaps between named
/// ranks are intentional (the original hub leaves room for operator-
/// configured intermediate classes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Class(pub i8);

impl Class {
    pub const PINGER: Class = Class(-1);
    pub const NORMAL: Class = Class(0);
    pub const REG: Class = Class(1);
    pub const VIP: Class = Class(2);
    pub const OP: Class = Class(3);
    pub const CHEEF: Class = Class(4);
    pub const ADMIN: Class = Class(5);
    pub const MASTER: Class = Class(10);

    pub fn is_operator(self) -> bool {
        self >= Class::OP
    }
}

/// A single "right until time T" quota (spec §3 Penalty record).
///
/// `0` means no override (fall back to the class default), `Permanent`
/// means the override never expires, `Until(t)` means the override is
/// active while `now < t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RightDeadline {
    #[default]
    None,
    Permanent,
    Until(i64),
}

impl RightDeadline {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => RightDeadline::None,
            1 => RightDeadline::Permanent,
            t => RightDeadline::Until(t),
        }
    }

    /// Whether this is presently a *denial* override (spec's penalty
    /// deadlines gate the negative case: "stop-kick" etc. as much as
    /// positive ones like "start-chat").
    pub fn is_active(self, now: i64) -> bool {
        match self {
            RightDeadline::None => false,
            RightDeadline::Permanent => true,
            RightDeadline::Until(t) => now < t,
        }
    }
}

/// The ten (eleven, per spec enumeration) right-until-time-T quotas
/// loaded from `temp_rights` at login and consulted by `Rights::can`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rights {
    pub start_chat: RightDeadline,
    pub start_pm: RightDeadline,
    pub start_search: RightDeadline,
    pub start_ctm: RightDeadline,
    pub stop_kick: RightDeadline,
    pub stop_drop: RightDeadline,
    pub stop_ban_temp: RightDeadline,
    pub stop_ban_perm: RightDeadline,
    pub stop_share0: RightDeadline,
    pub stop_reg: RightDeadline,
    pub stop_opchat: RightDeadline,
}

/// Which of the eleven quotas a call site is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Right {
    Chat,
    Pm,
    Search,
    Ctm,
    Kick,
    Drop,
    BanTemp,
    BanPerm,
    HideShare,
    Reg,
    OpChat,
}

impl Rights {
    /// `start_*` quotas grant a right while active; `stop_*` quotas deny
    /// a right (normally available to the class) while active. Both are
    /// modeled uniformly: `can` answers "is this right usable right now".
    pub fn can(&self, right: Right, class: Class, now: i64) -> bool {
        match right {
            Right::Chat => class >= Class::NORMAL && !self.start_chat_blocks(now),
            Right::Pm => class >= Class::NORMAL && !self.start_pm_blocks(now),
            Right::Search => class >= Class::NORMAL && !self.start_search_blocks(now),
            Right::Ctm => class >= Class::NORMAL && !self.start_ctm_blocks(now),
            Right::Kick => class.is_operator() && !self.stop_kick.is_active(now),
            Right::Drop => class.is_operator() && !self.stop_drop.is_active(now),
            Right::BanTemp => class.is_operator() && !self.stop_ban_temp.is_active(now),
            Right::BanPerm => class >= Class::ADMIN && !self.stop_ban_perm.is_active(now),
            Right::HideShare => self.stop_share0.is_active(now),
            Right::Reg => class >= Class::NORMAL && !self.stop_reg.is_active(now),
            Right::OpChat => class.is_operator() && !self.stop_opchat.is_active(now),
        }
    }

    // `start_*` fields record a *gag* deadline (the field name mirrors the
    // hub's historical column names, which read as grants but are used as
    // timed revocations — e.g. `!mute` sets `start_chat` in the future).
    fn start_chat_blocks(&self, now: i64) -> bool {
        self.start_chat.is_active(now)
    }
    fn start_pm_blocks(&self, now: i64) -> bool {
        self.start_pm.is_active(now)
    }
    fn start_search_blocks(&self, now: i64) -> bool {
        self.start_search.is_active(now)
    }
    fn start_ctm_blocks(&self, now: i64) -> bool {
        self.start_ctm.is_active(now)
    }
}

/// NMDC client mode, derived from the MyINFO tag's `M:` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Active,
    Passive,
    Socks,
}

/// The polymorphic identity of a directory entry (spec §9 "Dynamic
/// dispatch (bots)"): humans own a Connection; robots are directory-
/// resident pseudo-users addressed only by nick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKind {
    Human,
    SecurityBot,
    OpChatBot,
    ChatRoomBot,
    PluginBot,
}

impl UserKind {
    pub fn is_robot(self) -> bool {
        !matches!(self, UserKind::Human)
    }
}

/// A single user directory entry.
#[derive(Debug)]
pub struct User {
    pub nick: String,
    pub kind: UserKind,
    pub class: Class,
    /// Canonical `$MyINFO` string as received.
    pub myinfo: String,
    /// Synthetic `$MyINFO` as presented to peers (may differ if
    /// `hide_share` or similar rights apply).
    pub fake_myinfo: String,
    pub share: u64,
    pub mode: Mode,
    /// Private-range source IP (RFC1918/loopback).
    pub is_lan: bool,
    pub rights: Rights,
    pub supports: SupportsBitmask,
    pub in_list: bool,
    pub ip: std::net::IpAddr,
    /// Channel to this user's connection-pump task, `None` for robots.
    pub outbox: Option<mpsc::Sender<Vec<u8>>>,
    /// Side channel the connection task watches to learn it has been
    /// kicked/banned/force-moved by another user or an operator command,
    /// `None` for robots. Carries the close reason only; the frame (if
    /// any, e.g. a kick message) goes out over `outbox` first.
    pub close_tx: Option<mpsc::UnboundedSender<crate::config::CloseReason>>,
    /// Side channel an operator command uses to live-apply a rights or
    /// class change to an already-connected user (spec §6.4 `!setright`,
    /// `!setclass`) instead of only affecting the victim's next login.
    /// `None` for robots.
    pub live_tx: Option<mpsc::UnboundedSender<LiveUpdate>>,
}

/// A live mutation pushed from the Hub actor to a connection task's own
/// [`ConnCtx`], which is the sole place gating checks (`Rights::can`,
/// class comparisons) actually read from.
#[derive(Debug, Clone)]
pub enum LiveUpdate {
    Rights(Rights),
    Class(Class),
}

impl User {
    pub fn can_send(&self) -> bool {
        self.outbox.is_some() || self.kind.is_robot()
    }

    pub fn is_sendable_human(&self) -> bool {
        self.in_list && self.outbox.is_some()
    }
}

/// Bitmask of `$Supports` feature tokens (spec §4.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportsBitmask(pub u32);

macro_rules! supports_bits {
    ($($name:ident => $bit:expr),+ $(,)?) => {
        impl SupportsBitmask {
            $(
                pub const $name: u32 = 1 << $bit;
            )+

            pub fn parse(tokens: &str) -> Self {
                let mut mask = 0u32;
                for tok in tokens.split_whitespace() {
                    match tok {
                        $(stringify!($name) => mask |= Self::$name,)+
                        _ => {}
                    }
                }
                SupportsBitmask(mask)
            }

            pub fn has(self, bit: u32) -> bool {
                self.0 & bit != 0
            }
        }
    };
}

supports_bits! {
    OpPlus => 0,
    NoHello => 1,
    NoGetINFO => 2,
    DHT0 => 3,
    QuickList => 4,
    BotINFO => 5,
    ZPipe => 6,
    ChatOnly => 7,
    MCTo => 8,
    UserCommand => 9,
    BotList => 10,
    HubTopic => 11,
    UserIP2 => 12,
    TTHSearch => 13,
    Feed => 14,
    TTHS => 15,
    IN => 16,
    BanMsg => 17,
    TLS => 18,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_ordering_matches_spec_ranks() {
        assert!(Class::MASTER > Class::ADMIN);
        assert!(Class::OP > Class::VIP);
        assert!(Class::NORMAL > Class::PINGER);
    }

    #[test]
    fn right_deadline_permanent_is_always_active() {
        assert!(RightDeadline::Permanent.is_active(0));
        assert!(RightDeadline::Permanent.is_active(i64::MAX));
    }

    #[test]
    fn right_deadline_until_expires() {
        let d = RightDeadline::from_raw(1_000);
        assert!(d.is_active(500));
        assert!(!d.is_active(1_000));
    }

    #[test]
    fn stop_kick_blocks_kick_right_for_operator() {
        let mut rights = Rights::default();
        rights.stop_kick = RightDeadline::Permanent;
        assert!(!rights.can(Right::Kick, Class::OP, 0));
        assert!(rights.can(Right::Chat, Class::OP, 0));
    }

    #[test]
    fn ban_perm_requires_admin_class() {
        let rights = Rights::default();
        assert!(!rights.can(Right::BanPerm, Class::OP, 0));
        assert!(rights.can(Right::BanPerm, Class::ADMIN, 0));
    }

    #[test]
    fn supports_bitmask_parses_known_tokens() {
        let mask = SupportsBitmask::parse("NoHello NoGetINFO UserIP2 TLS");
        assert!(mask.has(SupportsBitmask::NoHello));
        assert!(mask.has(SupportsBitmask::TLS));
        assert!(!mask.has(SupportsBitmask::ZPipe));
    }
}
