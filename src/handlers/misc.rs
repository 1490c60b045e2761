//! Operator console command dispatch (spec §6.4).
//!
//! One flat table of `!name rest` commands, routed by a match on the
//! first whitespace-separated token (case-insensitive, prefix already
//! stripped by the caller). Each handler is a plain async function
//! taking the parsed rest-of-line; there is no class hierarchy of
//! command objects here, just data (the gating class) and a function.

use super::context::{ConnCtx, HandlerClose, HUB_SECURITY_NICK};
use crate::config::CloseReason;
use crate::db::models::{BanKind, ClientRow, ConnTypeRow, RedirectRow};
use crate::error::PolicyError;
use crate::state::{Class, Right};

/// Send a plain hub-security-bot PM back to the invoking operator; used
/// for command output and denials alike (spec §6.1 `$To:` shape).
pub(crate) fn reply_pm(ctx: &mut ConnCtx, text: impl AsRef<str>) {
    let nick = ctx.nick.clone().unwrap_or_default();
    let frame = format!("$To: {nick} From: {bot} $<{bot}> {text}|", bot = HUB_SECURITY_NICK, text = text.as_ref());
    ctx.reply_str(frame);
}

pub(crate) fn require_class(ctx: &mut ConnCtx, min: Class, command: &'static str) -> Result<(), HandlerClose> {
    if ctx.class < min {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied(format!("{command}: insufficient class"))));
    }
    Ok(())
}

/// Split `rest` into at most `n` whitespace-separated fields, the last
/// of which absorbs any remaining text (descriptions, reasons, replies).
pub(crate) fn split_fields(rest: &str, n: usize) -> Vec<&str> {
    rest.splitn(n, char::is_whitespace).map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Route a stripped-prefix console command line (spec §6.4). Called from
/// [`super::messaging::handle_chat`] once the leading command prefix has
/// already been consumed.
pub async fn dispatch_console_command(ctx: &mut ConnCtx, rest: &str) -> Result<(), HandlerClose> {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_ascii_lowercase();
    let args = parts.next().unwrap_or_default().trim();

    match command.as_str() {
        "addconntype" => add_conn_type(ctx, args).await,
        "modconntype" => add_conn_type(ctx, args).await,
        "delconntype" => del_conn_type(ctx, args).await,
        "lstconntype" => list_conn_types(ctx).await,

        "addclient" => add_client(ctx, args).await,
        "modclient" => add_client(ctx, args).await,
        "delclient" => del_client(ctx, args).await,
        "lstclient" => list_clients(ctx).await,

        "addredirect" => add_redirect(ctx, args).await,
        "modredirect" => add_redirect(ctx, args).await,
        "delredirect" => del_redirect(ctx, args).await,
        "lstredirect" => list_redirects(ctx).await,

        "addtrigger" => add_trigger(ctx, args).await,
        "modtrigger" => add_trigger(ctx, args).await,
        "deltrigger" => del_trigger(ctx, args).await,
        "lsttrigger" => list_triggers(ctx).await,

        "ban" => ban(ctx, args, true).await,
        "tempban" => ban(ctx, args, false).await,
        "unban" => unban(ctx, args).await,
        "getbanlist" => getbanlist(ctx).await,
        "whoip" => whoip(ctx, args).await,

        "kick" => kick_or_drop(ctx, args, false).await,
        "drop" => kick_or_drop(ctx, args, true).await,
        "forcemove" => forcemove(ctx, args).await,

        "gag" => set_penalty(ctx, args, PenaltyField::Chat, true).await,
        "ungag" => set_penalty(ctx, args, PenaltyField::Chat, false).await,
        "mute" => set_penalty(ctx, args, PenaltyField::Pm, true).await,
        "unmute" => set_penalty(ctx, args, PenaltyField::Pm, false).await,
        "setright" => setright(ctx, args).await,

        _ => {
            reply_pm(ctx, format!("unknown command: {command}"));
            Ok(())
        }
    }
}

// ============================================================================
// !(add|mod|del)conntype, !lstconntype
// ============================================================================

async fn add_conn_type(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_class(ctx, Class::ADMIN, "addconntype")?;
    let fields = split_fields(args, 6);
    let [identifier, min_slots, max_slots, min_limit, min_ls_ratio, description] = fields.as_slice() else {
        reply_pm(ctx, "usage: addconntype <id> <min_slots> <max_slots> <min_limit> <min_ls_ratio> <description>");
        return Ok(());
    };
    let row = ConnTypeRow {
        identifier: identifier.to_string(),
        description: description.to_string(),
        tag_min_slots: min_slots.parse().unwrap_or(0),
        tag_max_slots: max_slots.parse().unwrap_or(0),
        tag_min_limit: min_limit.parse().unwrap_or(0.0),
        tag_min_ls_ratio: min_ls_ratio.parse().unwrap_or(0.0),
    };
    match crate::db::conntypes::upsert(ctx.db.pool(), &row).await {
        Ok(()) => reply_pm(ctx, format!("connection type {identifier} saved")),
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

async fn del_conn_type(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_class(ctx, Class::ADMIN, "delconntype")?;
    let identifier = args.trim();
    match crate::db::conntypes::remove(ctx.db.pool(), identifier).await {
        Ok(true) => reply_pm(ctx, format!("connection type {identifier} removed")),
        Ok(false) => reply_pm(ctx, format!("no such connection type: {identifier}")),
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

async fn list_conn_types(ctx: &mut ConnCtx) -> Result<(), HandlerClose> {
    require_class(ctx, Class::OP, "lstconntype")?;
    match crate::db::conntypes::list(ctx.db.pool()).await {
        Ok(rows) => {
            let mut out = String::from("connection types:");
            for row in rows {
                out.push_str(&format!(" {}[{}-{}]", row.identifier, row.tag_min_slots, row.tag_max_slots));
            }
            reply_pm(ctx, out);
        }
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

// ============================================================================
// !(add|mod|del)client, !lstclient
// ============================================================================

async fn add_client(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_class(ctx, Class::ADMIN, "addclient")?;
    let fields = split_fields(args, 7);
    let [name, tag_id, min_version, max_version, min_ver_use, ban_flag, enable_flag] = fields.as_slice() else {
        reply_pm(ctx, "usage: addclient <name> <tag_id> <min_version> <max_version> <min_ver_use> <ban 0|1> <enable 0|1>");
        return Ok(());
    };
    let row = ClientRow {
        name: name.to_string(),
        tag_id: tag_id.to_string(),
        min_version: min_version.parse().unwrap_or(0.0),
        max_version: max_version.parse().unwrap_or(0.0),
        min_ver_use: min_ver_use.parse().unwrap_or(0.0),
        ban: ban_flag.parse().unwrap_or(0),
        enable: enable_flag.parse().unwrap_or(1),
    };
    match crate::db::clients::upsert(ctx.db.pool(), &row).await {
        Ok(()) => reply_pm(ctx, format!("client {name} saved")),
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

async fn del_client(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_class(ctx, Class::ADMIN, "delclient")?;
    let name = args.trim();
    match crate::db::clients::remove(ctx.db.pool(), name).await {
        Ok(true) => reply_pm(ctx, format!("client {name} removed")),
        Ok(false) => reply_pm(ctx, format!("no such client: {name}")),
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

async fn list_clients(ctx: &mut ConnCtx) -> Result<(), HandlerClose> {
    require_class(ctx, Class::OP, "lstclient")?;
    match crate::db::clients::list(ctx.db.pool()).await {
        Ok(rows) => {
            let mut out = String::from("clients:");
            for row in rows {
                out.push_str(&format!(" {}({})", row.name, row.tag_id));
            }
            reply_pm(ctx, out);
        }
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

// ============================================================================
// !(add|mod|del)redirect, !lstredirect
// ============================================================================

async fn add_redirect(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_class(ctx, Class::ADMIN, "addredirect")?;
    let fields = split_fields(args, 7);
    let [address, flag, start, stop, secure, share, enable] = fields.as_slice() else {
        reply_pm(ctx, "usage: addredirect <address> <flag> <start> <stop> <secure 0|1> <share> <enable 0|1>");
        return Ok(());
    };
    let row = RedirectRow {
        address: address.to_string(),
        flag: flag.parse().unwrap_or(0),
        start: start.parse().unwrap_or(0),
        stop: stop.parse().unwrap_or(0),
        country: None,
        secure: secure.parse().unwrap_or(0),
        share: share.parse().unwrap_or(0),
        enable: enable.parse().unwrap_or(1),
    };
    match crate::db::redirects::upsert(ctx.db.pool(), &row).await {
        Ok(()) => reply_pm(ctx, format!("redirect {address} saved")),
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

async fn del_redirect(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_class(ctx, Class::ADMIN, "delredirect")?;
    let address = args.trim();
    match crate::db::redirects::remove(ctx.db.pool(), address).await {
        Ok(true) => reply_pm(ctx, format!("redirect {address} removed")),
        Ok(false) => reply_pm(ctx, format!("no such redirect: {address}")),
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

async fn list_redirects(ctx: &mut ConnCtx) -> Result<(), HandlerClose> {
    require_class(ctx, Class::OP, "lstredirect")?;
    match crate::db::redirects::list_enabled(ctx.db.pool(), ctx.now()).await {
        Ok(rows) => {
            let mut out = String::from("redirects:");
            for row in rows {
                out.push_str(&format!(" {}", row.address));
            }
            reply_pm(ctx, out);
        }
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

// ============================================================================
// !(add|mod|del)trigger, !lsttrigger
// ============================================================================

async fn add_trigger(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_class(ctx, Class::ADMIN, "addtrigger")?;
    let fields = split_fields(args, 2);
    let [prefix, reply] = fields.as_slice() else {
        reply_pm(ctx, "usage: addtrigger <prefix> <reply text>");
        return Ok(());
    };
    match crate::db::triggers::upsert(ctx.db.pool(), prefix, reply).await {
        Ok(()) => reply_pm(ctx, format!("trigger {prefix} saved")),
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

async fn del_trigger(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_class(ctx, Class::ADMIN, "deltrigger")?;
    let prefix = args.trim();
    match crate::db::triggers::remove(ctx.db.pool(), prefix).await {
        Ok(true) => reply_pm(ctx, format!("trigger {prefix} removed")),
        Ok(false) => reply_pm(ctx, format!("no such trigger: {prefix}")),
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

async fn list_triggers(ctx: &mut ConnCtx) -> Result<(), HandlerClose> {
    require_class(ctx, Class::OP, "lsttrigger")?;
    match crate::db::triggers::list(ctx.db.pool()).await {
        Ok(rows) => {
            let mut out = String::from("triggers:");
            for row in rows {
                out.push_str(&format!(" {}", row.prefix));
            }
            reply_pm(ctx, out);
        }
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

/// Check `text` against the registered trigger prefixes, replying with
/// the canned text and reporting whether a trigger fired (spec §9B).
/// Called from the main-chat path before the command prefix check.
pub async fn check_trigger(ctx: &mut ConnCtx, text: &str) -> bool {
    let Ok(rows) = crate::db::triggers::list(ctx.db.pool()).await else { return false };
    for row in rows {
        if row.enable != 0 && text.starts_with(&row.prefix) {
            reply_pm(ctx, row.reply);
            return true;
        }
    }
    false
}

// ============================================================================
// !ban, !tempban, !unban, !getbanlist, !whoip
// ============================================================================

pub(crate) async fn ban(ctx: &mut ConnCtx, args: &str, permanent: bool) -> Result<(), HandlerClose> {
    let right = if permanent { Right::BanPerm } else { Right::BanTemp };
    if !ctx.rights.can(right, ctx.class, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("ban: insufficient rights".into())));
    }

    let (nick, secs_or_reason, reason) = if permanent {
        let fields = split_fields(args, 2);
        let [n, r] = fields.as_slice() else {
            reply_pm(ctx, "usage: ban <nick> <reason>");
            return Ok(());
        };
        (n.to_string(), String::new(), r.to_string())
    } else {
        let fields = split_fields(args, 3);
        let [n, secs, r] = fields.as_slice() else {
            reply_pm(ctx, "usage: tempban <nick> <seconds> <reason>");
            return Ok(());
        };
        (n.to_string(), secs.to_string(), r.to_string())
    };

    let op = ctx.nick.clone().unwrap_or_default();
    let expires_at = if permanent { 0 } else { ctx.now() + secs_or_reason.parse::<i64>().unwrap_or(0) };

    match crate::db::bans::add_ban(ctx.db.pool(), BanKind::Nick, &nick, None, None, &reason, &op, None, expires_at).await
    {
        Ok(()) => {
            reply_pm(ctx, format!("{nick} banned: {reason}"));
            let frame = format!("$To: {nick} From: {bot} $<{bot}> {reason}|", bot = HUB_SECURITY_NICK);
            ctx.hub.disconnect(nick.clone(), Some(frame.into_bytes()), CloseReason::InvalidUser).await;
        }
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

pub(crate) async fn unban(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    if !ctx.rights.can(Right::BanTemp, ctx.class, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("unban: insufficient rights".into())));
    }
    let fields = split_fields(args, 2);
    let [nick, reason] = fields.as_slice() else {
        reply_pm(ctx, "usage: unban <nick> <reason>");
        return Ok(());
    };
    let op = ctx.nick.clone().unwrap_or_default();
    match crate::db::bans::unban(ctx.db.pool(), "_nickban_", nick, &op, reason).await {
        Ok(true) => reply_pm(ctx, format!("{nick} unbanned")),
        Ok(false) => reply_pm(ctx, format!("no active ban for {nick}")),
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

pub(crate) async fn getbanlist(ctx: &mut ConnCtx) -> Result<(), HandlerClose> {
    require_class(ctx, Class::OP, "getbanlist")?;
    match crate::db::bans::list_bans(ctx.db.pool()).await {
        Ok(rows) => {
            let mut out = String::from("bans:");
            for row in rows {
                out.push_str(&format!(" {}/{}", row.nick, row.ip));
            }
            reply_pm(ctx, out);
        }
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }
    Ok(())
}

pub(crate) async fn whoip(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_class(ctx, Class::OP, "whoip")?;
    let nick = args.trim();
    match ctx.hub.lookup(nick).await {
        Some(snapshot) => reply_pm(ctx, format!("{nick} is connected from {}", snapshot.ip)),
        None => reply_pm(ctx, format!("{nick} is not online")),
    }
    Ok(())
}

// ============================================================================
// !kick, !drop, !forcemove
// ============================================================================

async fn kick_or_drop(ctx: &mut ConnCtx, args: &str, is_drop: bool) -> Result<(), HandlerClose> {
    let right = if is_drop { Right::Drop } else { Right::Kick };
    if !ctx.rights.can(right, ctx.class, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("insufficient rights to kick/drop".into())));
    }
    let fields = split_fields(args, 2);
    let [victim, reason] = fields.as_slice() else {
        reply_pm(ctx, "usage: kick|drop <nick> <reason>");
        return Ok(());
    };
    let victim = victim.to_string();
    let reason = reason.to_string();

    let Some(snapshot) = ctx.hub.lookup(victim.clone()).await else {
        reply_pm(ctx, format!("{victim} is not online"));
        return Ok(());
    };
    if snapshot.class >= ctx.class.0 {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("cannot kick an equal or higher class".into())));
    }

    let op = ctx.nick.clone().unwrap_or_default();
    let _ = crate::db::kicks::record(
        ctx.db.pool(),
        &victim,
        &snapshot.ip.to_string(),
        None,
        None,
        Some(&reason),
        &op,
        is_drop,
        ctx.now(),
    )
    .await;

    let frame = format!("$To: {victim} From: {bot} $<{bot}> {reason}|", bot = HUB_SECURITY_NICK);
    ctx.hub.disconnect(victim.clone(), Some(frame.into_bytes()), CloseReason::Kicked).await;
    reply_pm(ctx, format!("{victim} kicked: {reason}"));
    Ok(())
}

async fn forcemove(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    if !ctx.rights.can(Right::Kick, ctx.class, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("insufficient rights to force-move".into())));
    }
    let fields = split_fields(args, 2);
    let [victim, address] = fields.as_slice() else {
        reply_pm(ctx, "usage: forcemove <nick> <address>");
        return Ok(());
    };
    let victim = victim.to_string();
    if ctx.hub.lookup(victim.clone()).await.is_none() {
        reply_pm(ctx, format!("{victim} is not online"));
        return Ok(());
    }
    let frame = format!("$ForceMove {address}|");
    ctx.hub.disconnect(victim.clone(), Some(frame.into_bytes()), CloseReason::ForceMove).await;
    reply_pm(ctx, format!("{victim} redirected to {address}"));
    Ok(())
}

// ============================================================================
// !gag, !ungag, !mute, !unmute, !setright
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum PenaltyField {
    Chat,
    Pm,
    Search,
    Ctm,
    Kick,
    Share0,
    Reg,
    OpChat,
}

impl PenaltyField {
    fn parse(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "chat" => PenaltyField::Chat,
            "pm" => PenaltyField::Pm,
            "search" => PenaltyField::Search,
            "ctm" => PenaltyField::Ctm,
            "kick" => PenaltyField::Kick,
            "share0" | "hideshare" => PenaltyField::Share0,
            "reg" => PenaltyField::Reg,
            "opchat" => PenaltyField::OpChat,
            _ => return None,
        })
    }
}

/// Flip one of the eleven `temp_rights` quotas for an online or offline
/// nick, persist it, then live-apply it if the victim is connected
/// (spec §6.4 "flip penalty fields").
async fn apply_penalty(ctx: &mut ConnCtx, nick: &str, field: PenaltyField, deadline: i64) -> Result<(), HandlerClose> {
    let mut row = crate::db::penalties::get(ctx.db.pool(), nick)
        .await
        .map_err(|e| ctx.storage_failure(e.into()))?
        .unwrap_or_else(|| crate::db::models::PenaltyRow { nick: nick.to_string(), ..Default::default() });

    match field {
        PenaltyField::Chat => row.st_chat = deadline,
        PenaltyField::Pm => row.st_pm = deadline,
        PenaltyField::Search => row.st_search = deadline,
        PenaltyField::Ctm => row.st_ctm = deadline,
        PenaltyField::Kick => row.st_kick = deadline,
        PenaltyField::Share0 => row.st_share0 = deadline,
        PenaltyField::Reg => row.st_reg = deadline,
        PenaltyField::OpChat => row.st_opchat = deadline,
    }
    row.op = ctx.nick.clone();
    row.since = ctx.now();

    crate::db::penalties::set(ctx.db.pool(), &row).await.map_err(|e| ctx.storage_failure(e.into()))?;

    let rights = crate::state::Rights {
        start_chat: crate::state::RightDeadline::from_raw(row.st_chat),
        start_pm: crate::state::RightDeadline::from_raw(row.st_pm),
        start_search: crate::state::RightDeadline::from_raw(row.st_search),
        start_ctm: crate::state::RightDeadline::from_raw(row.st_ctm),
        stop_kick: crate::state::RightDeadline::from_raw(row.st_kick),
        stop_drop: crate::state::RightDeadline::None,
        stop_ban_temp: crate::state::RightDeadline::None,
        stop_ban_perm: crate::state::RightDeadline::None,
        stop_share0: crate::state::RightDeadline::from_raw(row.st_share0),
        stop_reg: crate::state::RightDeadline::from_raw(row.st_reg),
        stop_opchat: crate::state::RightDeadline::from_raw(row.st_opchat),
    };
    ctx.hub.set_rights(nick, rights).await;
    Ok(())
}

async fn set_penalty(ctx: &mut ConnCtx, args: &str, field: PenaltyField, enable: bool) -> Result<(), HandlerClose> {
    require_class(ctx, Class::OP, if enable { "gag/mute" } else { "ungag/unmute" })?;
    let fields = split_fields(args, 2);
    let nick = match fields.first() {
        Some(n) => n.to_string(),
        None => {
            reply_pm(ctx, "usage: gag|mute <nick> [seconds]");
            return Ok(());
        }
    };
    let deadline = if !enable {
        0
    } else {
        match fields.get(1).and_then(|s| s.parse::<i64>().ok()) {
            Some(secs) => ctx.now() + secs,
            None => 1, // RightDeadline::Permanent sentinel
        }
    };
    apply_penalty(ctx, &nick, field, deadline).await?;
    reply_pm(ctx, format!("{nick}: {:?} {}", field, if enable { "restricted" } else { "cleared" }));
    Ok(())
}

async fn setright(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_class(ctx, Class::OP, "setright")?;
    let fields = split_fields(args, 3);
    let [nick, field_name, value] = fields.as_slice() else {
        reply_pm(ctx, "usage: setright <nick> <field> <off|perm|<seconds>>");
        return Ok(());
    };
    let Some(field) = PenaltyField::parse(field_name) else {
        reply_pm(ctx, format!("unknown right field: {field_name}"));
        return Ok(());
    };
    let deadline = match *value {
        "off" => 0,
        "perm" => 1,
        secs => ctx.now() + secs.parse::<i64>().unwrap_or(0),
    };
    apply_penalty(ctx, nick, field, deadline).await?;
    reply_pm(ctx, format!("{nick}: {field_name} set to {value}"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::context::tests_support::test_ctx;
    use crate::state::Class;

    #[tokio::test]
    async fn non_operator_cannot_add_conn_type() {
        let mut ctx = test_ctx(Some("mallory")).await;
        ctx.class = Class::NORMAL;
        let err = add_conn_type(&mut ctx, "dsl 1 10 10 0.1 DSL").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn operator_can_add_and_list_conn_type() {
        let mut ctx = test_ctx(Some("root")).await;
        ctx.class = Class::ADMIN;
        add_conn_type(&mut ctx, "dsl 1 10 10 0.1 DSL").await.unwrap();
        let rows = crate::db::conntypes::list(ctx.db.pool()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn unknown_command_replies_without_error() {
        let mut ctx = test_ctx(Some("root")).await;
        ctx.class = Class::ADMIN;
        dispatch_console_command(&mut ctx, "bogus").await.unwrap();
        assert!(!ctx.take_replies().is_empty());
    }

    #[tokio::test]
    async fn trigger_round_trips_through_console_command() {
        let mut ctx = test_ctx(Some("root")).await;
        ctx.class = Class::ADMIN;
        dispatch_console_command(&mut ctx, "addtrigger !rules Read the rules").await.unwrap();
        let fired = check_trigger(&mut ctx, "!rules please").await;
        assert!(fired);
    }
}
