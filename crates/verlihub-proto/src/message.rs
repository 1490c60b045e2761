//! Typed messages parsed from a raw `|`-stripped frame.
//!
//! Each [`Message`] variant borrows named field chunks straight out of
//! the original frame — no allocation happens to parse a message, only
//! to unescape one if the caller asks for the unescaped text.

use crate::command::Kind;

/// A parsed NMDC frame. Lifetime `'a` ties every borrowed field back to
/// the frame byte string the caller is holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<'a> {
    /// `<nick> text` — chat.
    Chat { nick: &'a str, text: &'a str },
    ConnectToMe { nick: &'a str, ip: &'a str, port: &'a str },
    RevConnectToMe { from: &'a str, to: &'a str },
    MultiConnectToMe { nick: &'a str, ip: &'a str, port: &'a str },
    /// `$SR <from> <path>\x05<size> <free>/<total>\x05<hub> (<hubip>[:<port>])\x05<to>`
    SearchResult {
        from: &'a str,
        path: &'a str,
        size: &'a str,
        free_slots: &'a str,
        total_slots: &'a str,
        hub_name: &'a str,
        hub_addr: &'a str,
        to: &'a str,
    },
    /// `$Search Hub:<nick> <params>` (passive)
    SearchHub { nick: &'a str, params: &'a str },
    MultiSearch { addr: &'a str, params: &'a str },
    /// `$Search <ip>:<port> <params>` (active)
    Search { addr: &'a str, params: &'a str },
    /// `$SA <tth> <ip>:<port>`
    SA { tth: &'a str, addr: &'a str },
    /// `$SP <tth> <nick>`
    SP { tth: &'a str, nick: &'a str },
    /// `$MyINFO $ALL <nick> <desc><tag>$ $<speed>\x01$<mail>$<share>$`
    MyInfo {
        all: &'a str,
        dest: &'a str,
        nick: &'a str,
        info: &'a str,
        desc: &'a str,
        speed: &'a str,
        mail: &'a str,
        size: &'a str,
    },
    ExtJson(&'a str),
    Key(&'a str),
    Supports(&'a str),
    ValidateNick(&'a str),
    Version(&'a str),
    GetNickList,
    MyHubUrl(&'a str),
    MyPass(&'a str),
    MCTo { to: &'a str, from: &'a str, msg: &'a str },
    To { to: &'a str, from: &'a str, real_from: &'a str, msg: &'a str },
    BotInfo(&'a str),
    GetInfo { nick: &'a str, requester: &'a str },
    UserIp(&'a str),
    Kick(&'a str),
    OpForceMove { nick: &'a str, dest: &'a str, reason: &'a str },
    Quit(&'a str),
    Ban(&'a str),
    TempBan(&'a str),
    UnBan(&'a str),
    GetBanList,
    WhoIp(&'a str),
    GetTopic,
    SetTopic(&'a str),
    MyIp { ip: &'a str, tls_version: Option<&'a str> },
    MyNick(&'a str),
    Lock { lock: &'a str, pk: Option<&'a str> },
    In(&'a str),
    Unknown(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("frame is empty")]
    Empty,
    #[error("message kind {0:?} is missing a required field")]
    MissingField(Kind),
}

impl<'a> Message<'a> {
    /// Parse a single frame (with its `|` terminator already removed).
    /// Empty frames are a valid "ping" and are not parseable as any
    /// other kind; callers should count them toward the unknown-frame
    /// meter without raising [`ParseError`].
    pub fn parse(frame: &'a str) -> Result<Message<'a>, ParseError> {
        if frame.is_empty() {
            return Err(ParseError::Empty);
        }
        let kind = Kind::identify(frame);
        match kind {
            Kind::Chat => {
                let (nick, text) = frame.split_once(' ').unwrap_or((frame, ""));
                Ok(Message::Chat { nick, text })
            }
            Kind::ConnectToMe => parse_ctm(frame, kind, Message::ConnectToMe as fn(_, _, _) -> _, "$ConnectToMe "),
            Kind::MultiConnectToMe => {
                parse_ctm(frame, kind, Message::MultiConnectToMe as fn(_, _, _) -> _, "$MultiConnectToMe ")
            }
            Kind::RevConnectToMe => {
                let rest = strip(frame, "$RevConnectToMe ");
                let (from, to) = rest.split_once(' ').ok_or(ParseError::MissingField(kind))?;
                Ok(Message::RevConnectToMe { from, to })
            }
            Kind::SR => parse_sr(frame, kind),
            Kind::SearchHub => {
                let rest = strip(frame, "$Search Hub:");
                let (nick, params) = rest.split_once(' ').ok_or(ParseError::MissingField(kind))?;
                Ok(Message::SearchHub { nick, params })
            }
            Kind::MultiSearch => {
                let rest = strip(frame, "$MultiSearch ");
                let (addr, params) = rest.split_once(' ').ok_or(ParseError::MissingField(kind))?;
                Ok(Message::MultiSearch { addr, params })
            }
            Kind::Search => {
                let rest = strip(frame, "$Search ");
                let (addr, params) = rest.split_once(' ').ok_or(ParseError::MissingField(kind))?;
                Ok(Message::Search { addr, params })
            }
            Kind::SA => {
                let rest = strip(frame, "$SA ");
                let (tth, addr) = rest.split_once(' ').ok_or(ParseError::MissingField(kind))?;
                Ok(Message::SA { tth, addr })
            }
            Kind::SP => {
                let rest = strip(frame, "$SP ");
                let (tth, nick) = rest.split_once(' ').ok_or(ParseError::MissingField(kind))?;
                Ok(Message::SP { tth, nick })
            }
            Kind::MyInfo => parse_myinfo(frame, kind),
            Kind::ExtJson => Ok(Message::ExtJson(strip(frame, "$ExtJSON "))),
            Kind::Key => Ok(Message::Key(strip(frame, "$Key "))),
            Kind::Supports => Ok(Message::Supports(strip(frame, "$Supports "))),
            Kind::ValidateNick => Ok(Message::ValidateNick(strip(frame, "$ValidateNick "))),
            Kind::Version => Ok(Message::Version(strip(frame, "$Version "))),
            Kind::GetNickList => Ok(Message::GetNickList),
            Kind::MyHubUrl => Ok(Message::MyHubUrl(strip(frame, "$MyHubURL "))),
            Kind::MyPass => Ok(Message::MyPass(strip(frame, "$MyPass "))),
            Kind::MCTo => parse_mcto(frame, kind),
            Kind::To => parse_to(frame, kind),
            Kind::BotInfo => Ok(Message::BotInfo(strip(frame, "$BotINFO "))),
            Kind::GetInfo => {
                let rest = strip(frame, "$GetINFO ");
                let (nick, requester) = rest.split_once(' ').ok_or(ParseError::MissingField(kind))?;
                Ok(Message::GetInfo { nick, requester })
            }
            Kind::UserIp => Ok(Message::UserIp(strip(frame, "$UserIP "))),
            Kind::Kick => Ok(Message::Kick(strip(frame, "$Kick "))),
            Kind::OpForceMove => parse_opforcemove(frame, kind),
            Kind::Quit => Ok(Message::Quit(strip(frame, "$Quit "))),
            Kind::Ban => Ok(Message::Ban(strip(frame, "$Ban "))),
            Kind::TempBan => Ok(Message::TempBan(strip(frame, "$TempBan "))),
            Kind::UnBan => Ok(Message::UnBan(strip(frame, "$UnBan "))),
            Kind::GetBanList => Ok(Message::GetBanList),
            Kind::WhoIp => Ok(Message::WhoIp(strip(frame, "$WhoIP "))),
            Kind::GetTopic => Ok(Message::GetTopic),
            Kind::SetTopic => Ok(Message::SetTopic(strip(frame, "$SetTopic "))),
            Kind::MyIp => parse_myip(frame, kind),
            Kind::MyNick => Ok(Message::MyNick(strip(frame, "$MyNick "))),
            Kind::Lock => parse_lock(frame, kind),
            Kind::In => Ok(Message::In(strip(frame, "$IN "))),
            Kind::Unknown => Ok(Message::Unknown(frame)),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Message::Chat { .. } => Kind::Chat,
            Message::ConnectToMe { .. } => Kind::ConnectToMe,
            Message::RevConnectToMe { .. } => Kind::RevConnectToMe,
            Message::MultiConnectToMe { .. } => Kind::MultiConnectToMe,
            Message::SearchResult { .. } => Kind::SR,
            Message::SearchHub { .. } => Kind::SearchHub,
            Message::MultiSearch { .. } => Kind::MultiSearch,
            Message::Search { .. } => Kind::Search,
            Message::SA { .. } => Kind::SA,
            Message::SP { .. } => Kind::SP,
            Message::MyInfo { .. } => Kind::MyInfo,
            Message::ExtJson(_) => Kind::ExtJson,
            Message::Key(_) => Kind::Key,
            Message::Supports(_) => Kind::Supports,
            Message::ValidateNick(_) => Kind::ValidateNick,
            Message::Version(_) => Kind::Version,
            Message::GetNickList => Kind::GetNickList,
            Message::MyHubUrl(_) => Kind::MyHubUrl,
            Message::MyPass(_) => Kind::MyPass,
            Message::MCTo { .. } => Kind::MCTo,
            Message::To { .. } => Kind::To,
            Message::BotInfo(_) => Kind::BotInfo,
            Message::GetInfo { .. } => Kind::GetInfo,
            Message::UserIp(_) => Kind::UserIp,
            Message::Kick(_) => Kind::Kick,
            Message::OpForceMove { .. } => Kind::OpForceMove,
            Message::Quit(_) => Kind::Quit,
            Message::Ban(_) => Kind::Ban,
            Message::TempBan(_) => Kind::TempBan,
            Message::UnBan(_) => Kind::UnBan,
            Message::GetBanList => Kind::GetBanList,
            Message::WhoIp(_) => Kind::WhoIp,
            Message::GetTopic => Kind::GetTopic,
            Message::SetTopic(_) => Kind::SetTopic,
            Message::MyIp { .. } => Kind::MyIp,
            Message::MyNick(_) => Kind::MyNick,
            Message::Lock { .. } => Kind::Lock,
            Message::In(_) => Kind::In,
            Message::Unknown(_) => Kind::Unknown,
        }
    }
}

fn strip<'a>(frame: &'a str, prefix: &str) -> &'a str {
    frame.strip_prefix(prefix).unwrap_or(frame).trim_end()
}

fn parse_ctm<'a>(
    frame: &'a str,
    kind: Kind,
    build: fn(&'a str, &'a str, &'a str) -> Message<'a>,
    prefix: &str,
) -> Result<Message<'a>, ParseError> {
    let rest = strip(frame, prefix);
    let (nick, addr) = rest.rsplit_once(' ').ok_or(ParseError::MissingField(kind))?;
    let (ip, port) = addr.rsplit_once(':').ok_or(ParseError::MissingField(kind))?;
    Ok(build(nick, ip, port))
}

fn parse_sr(frame: &str, kind: Kind) -> Result<Message<'_>, ParseError> {
    let rest = strip(frame, "$SR ");
    let mut fivefields = rest.splitn(4, '\x05');
    let head = fivefields.next().ok_or(ParseError::MissingField(kind))?;
    let size_and_free = fivefields.next().ok_or(ParseError::MissingField(kind))?;
    let hub_name = fivefields.next().ok_or(ParseError::MissingField(kind))?;
    let hub_addr_and_to = fivefields.next().ok_or(ParseError::MissingField(kind))?;

    let (from, path) = head.split_once(' ').ok_or(ParseError::MissingField(kind))?;
    let (size, free_total) = size_and_free.split_once(' ').ok_or(ParseError::MissingField(kind))?;
    let (free_slots, total_slots) = free_total.split_once('/').ok_or(ParseError::MissingField(kind))?;
    let (hub_addr, to) = hub_addr_and_to.rsplit_once('\x05').unwrap_or((hub_addr_and_to, ""));

    Ok(Message::SearchResult {
        from,
        path,
        size,
        free_slots,
        total_slots,
        hub_name,
        hub_addr,
        to,
    })
}

fn parse_myinfo(frame: &str, kind: Kind) -> Result<Message<'_>, ParseError> {
    let rest = strip(frame, "$MyINFO ");
    let (all, rest) = rest.split_once(' ').ok_or(ParseError::MissingField(kind))?;
    let (dest, rest) = rest.split_once(' ').ok_or(ParseError::MissingField(kind))?;
    // `<desc><tag>$ $<speed>\x01$<mail>$<share>$`
    let (info_and_desc, tail) = rest.split_once("$ $").ok_or(ParseError::MissingField(kind))?;
    let mut tail_fields = tail.splitn(3, '$');
    let speed_field = tail_fields.next().ok_or(ParseError::MissingField(kind))?;
    let mail = tail_fields.next().ok_or(ParseError::MissingField(kind))?;
    let size = tail_fields.next().unwrap_or("").trim_end_matches('$');
    let speed = speed_field.trim_end_matches('\x01');

    let desc = match info_and_desc.find('<') {
        Some(pos) => &info_and_desc[..pos],
        None => info_and_desc,
    };

    Ok(Message::MyInfo {
        all,
        dest,
        nick: dest,
        info: info_and_desc,
        desc,
        speed,
        mail,
        size,
    })
}

fn parse_mcto(frame: &str, kind: Kind) -> Result<Message<'_>, ParseError> {
    let rest = strip(frame, "$MCTo: ");
    let (to, rest) = rest.split_once(" $").ok_or(ParseError::MissingField(kind))?;
    let (from, msg) = rest.split_once(' ').ok_or(ParseError::MissingField(kind))?;
    Ok(Message::MCTo { to, from, msg })
}

fn parse_to(frame: &str, kind: Kind) -> Result<Message<'_>, ParseError> {
    let rest = strip(frame, "$To: ");
    let (to, rest) = rest.split_once(" From: ").ok_or(ParseError::MissingField(kind))?;
    let (from, rest) = rest.split_once(" $<").ok_or(ParseError::MissingField(kind))?;
    let (real_from, msg) = rest.split_once("> ").ok_or(ParseError::MissingField(kind))?;
    Ok(Message::To { to, from, real_from, msg })
}

fn parse_opforcemove(frame: &str, kind: Kind) -> Result<Message<'_>, ParseError> {
    let rest = strip(frame, "$OpForceMove $Who:");
    let (nick, rest) = rest.split_once("$Where:").ok_or(ParseError::MissingField(kind))?;
    let (dest, reason) = rest.split_once("$Msg:").unwrap_or((rest, ""));
    Ok(Message::OpForceMove { nick, dest, reason })
}

fn parse_myip(frame: &str, kind: Kind) -> Result<Message<'_>, ParseError> {
    let rest = strip(frame, "$MyIP ");
    match rest.split_once(' ') {
        Some((ip, tls)) => Ok(Message::MyIp { ip, tls_version: Some(tls) }),
        None if !rest.is_empty() => Ok(Message::MyIp { ip: rest, tls_version: None }),
        None => Err(ParseError::MissingField(kind)),
    }
}

fn parse_lock(frame: &str, kind: Kind) -> Result<Message<'_>, ParseError> {
    let rest = strip(frame, "$Lock ");
    match rest.split_once(" Pk=") {
        Some((lock, pk)) => Ok(Message::Lock { lock, pk: Some(pk) }),
        None if !rest.is_empty() => Ok(Message::Lock { lock: rest, pk: None }),
        None => Err(ParseError::MissingField(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat() {
        let m = Message::parse("alice hi there").unwrap();
        assert_eq!(m, Message::Chat { nick: "alice", text: "hi there" });
    }

    #[test]
    fn parses_myinfo() {
        let frame = "$MyINFO $ALL alice desc<++ V:1,M:A,H:1/0/0,S:1>$ $100\x01$alice@x$1073741824$";
        let m = Message::parse(frame).unwrap();
        match m {
            Message::MyInfo { all, dest, desc, speed, mail, size, .. } => {
                assert_eq!(all, "$ALL");
                assert_eq!(dest, "alice");
                assert_eq!(desc, "desc");
                assert_eq!(speed, "100");
                assert_eq!(mail, "alice@x");
                assert_eq!(size, "1073741824");
            }
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[test]
    fn parses_to() {
        let frame = "$To: bob From: alice $<alice> hello bob";
        let m = Message::parse(frame).unwrap();
        assert_eq!(
            m,
            Message::To { to: "bob", from: "alice", real_from: "alice", msg: "hello bob" }
        );
    }

    #[test]
    fn parses_search_active() {
        let frame = "$Search 10.0.0.5:412 F?T?0?9?TTH:AAAA";
        let m = Message::parse(frame).unwrap();
        assert_eq!(m, Message::Search { addr: "10.0.0.5:412", params: "F?T?0?9?TTH:AAAA" });
    }

    #[test]
    fn parses_connect_to_me() {
        let m = Message::parse("$ConnectToMe alice 1.2.3.4:412").unwrap();
        assert_eq!(m, Message::ConnectToMe { nick: "alice", ip: "1.2.3.4", port: "412" });
    }

    #[test]
    fn empty_frame_is_error_not_panic() {
        assert_eq!(Message::parse(""), Err(ParseError::Empty));
    }

    #[test]
    fn roundtrip_kind_matches_parsed_variant() {
        let m = Message::parse("$Key somekey").unwrap();
        assert_eq!(m.kind(), Kind::Key);
    }
}
