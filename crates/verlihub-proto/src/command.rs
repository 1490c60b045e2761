//! The fixed, order-sensitive command table.
//!
//! Table order matters: `$Search Hub:` must be tested before the bare
//! `$Search` prefix, since the former is a longer match sharing the
//! same lead bytes. [`Kind::identify`] walks the table once and returns
//! the first (and only) match.

/// One NMDC message kind. Chat has no literal prefix: any frame whose
/// first byte is not `$` is chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Chat,
    ConnectToMe,
    RevConnectToMe,
    MultiConnectToMe,
    SR,
    SearchHub,
    MultiSearch,
    Search,
    SA,
    SP,
    MyInfo,
    ExtJson,
    Key,
    Supports,
    ValidateNick,
    Version,
    GetNickList,
    MyHubUrl,
    MyPass,
    MCTo,
    To,
    BotInfo,
    GetInfo,
    UserIp,
    Kick,
    OpForceMove,
    Quit,
    Ban,
    TempBan,
    UnBan,
    GetBanList,
    WhoIp,
    GetTopic,
    SetTopic,
    MyIp,
    MyNick,
    Lock,
    In,
    /// A frame starting with `$` that matched no known prefix.
    Unknown,
}

/// `(literal prefix, kind)`. Order is significant; see module docs.
/// Prefixes that are proper prefixes of a longer, more specific command
/// (e.g. `$Search` vs `$Search Hub:`) are ordered so the longer one is
/// probed first.
const TABLE: &[(&str, Kind)] = &[
    ("$MultiConnectToMe", Kind::MultiConnectToMe),
    ("$ConnectToMe", Kind::ConnectToMe),
    ("$RevConnectToMe", Kind::RevConnectToMe),
    ("$SR", Kind::SR),
    ("$Search Hub:", Kind::SearchHub),
    ("$MultiSearch", Kind::MultiSearch),
    ("$Search", Kind::Search),
    ("$SA", Kind::SA),
    ("$SP", Kind::SP),
    ("$MyINFO", Kind::MyInfo),
    ("$ExtJSON", Kind::ExtJson),
    ("$Key", Kind::Key),
    ("$Supports", Kind::Supports),
    ("$ValidateNick", Kind::ValidateNick),
    ("$Version", Kind::Version),
    ("$GetNickList", Kind::GetNickList),
    ("$MyHubURL", Kind::MyHubUrl),
    ("$MyPass", Kind::MyPass),
    ("$MCTo:", Kind::MCTo),
    ("$To:", Kind::To),
    ("$BotINFO", Kind::BotInfo),
    ("$GetINFO", Kind::GetInfo),
    ("$UserIP", Kind::UserIp),
    ("$Kick", Kind::Kick),
    ("$OpForceMove", Kind::OpForceMove),
    ("$Quit", Kind::Quit),
    ("$Ban", Kind::Ban),
    ("$TempBan", Kind::TempBan),
    ("$UnBan", Kind::UnBan),
    ("$GetBanList", Kind::GetBanList),
    ("$WhoIP", Kind::WhoIp),
    ("$GetTopic", Kind::GetTopic),
    ("$SetTopic", Kind::SetTopic),
    ("$MyIP", Kind::MyIp),
    ("$MyNick", Kind::MyNick),
    ("$Lock", Kind::Lock),
    ("$IN", Kind::In),
];

impl Kind {
    /// Identify the kind of a single `|`-stripped frame.
    pub fn identify(frame: &str) -> Kind {
        if !frame.starts_with('$') {
            return Kind::Chat;
        }
        for (prefix, kind) in TABLE {
            if frame.starts_with(prefix) {
                return *kind;
            }
        }
        Kind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_has_no_dollar() {
        assert_eq!(Kind::identify("alice hello there"), Kind::Chat);
    }

    #[test]
    fn search_hub_beats_search() {
        assert_eq!(Kind::identify("$Search Hub:alice F?T?0?9?foo"), Kind::SearchHub);
        assert_eq!(Kind::identify("$Search 1.2.3.4:412 F?T?0?9?foo"), Kind::Search);
    }

    #[test]
    fn mcto_beats_to() {
        assert_eq!(Kind::identify("$MCTo: bob $alice hi"), Kind::MCTo);
        assert_eq!(Kind::identify("$To: bob From: alice $<alice> hi"), Kind::To);
    }

    #[test]
    fn unrecognised_dollar_is_unknown() {
        assert_eq!(Kind::identify("$FooBarBaz"), Kind::Unknown);
    }
}
