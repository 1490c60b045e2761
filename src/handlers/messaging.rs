//! Main chat, PMs, multi-cast PMs, hub topic, and `$MyINFO` refreshes
//! after the initial login one (spec §4.3, §4.4).

use super::context::{ConnCtx, HandlerClose};
use crate::error::{PolicyError, ProtocolError};
use crate::hooks::{HookEvent, HookResult, Hooks};
use crate::security::flood::FloodVerdict;
use crate::security::FloodKind;
use crate::state::{Class, ConnState, Right};

fn require_in_list(ctx: &ConnCtx) -> Result<(), ProtocolError> {
    if ctx.clock.state() != ConnState::InList {
        return Err(ProtocolError::WrongState);
    }
    Ok(())
}

/// Apply the flood verdict for `kind`, translating `Drop`/`Kick`/`Ban`
/// into the caller's control flow (spec §4.6).
fn gate_flood(ctx: &mut ConnCtx, kind: FloodKind) -> Result<bool, HandlerClose> {
    let now = ctx.now();
    let verdict = ctx.flood.bump(kind, now, &ctx.config.flood);
    use crate::security::flood::FloodVerdict;
    match verdict {
        FloodVerdict::Allow | FloodVerdict::Warn => {
            crate::metrics::record_flood_action(kind.label(), "allow");
            Ok(true)
        }
        FloodVerdict::Drop => {
            crate::metrics::record_flood_action(kind.label(), "drop");
            Ok(false)
        }
        FloodVerdict::Kick => {
            crate::metrics::record_flood_action(kind.label(), "kick");
            Err(ctx.policy_violation(PolicyError::Flood(kind.label())))
        }
        FloodVerdict::Ban { secs } => {
            crate::metrics::record_flood_action(kind.label(), "ban");
            if let Some(nick) = &ctx.nick {
                ctx.security.short_bans.ban_nick(
                    nick,
                    now + secs,
                    format!("{} flood", kind.label()),
                    crate::security::ShortBanSubKind::Flood,
                );
            }
            if let Some(numeric) = ctx.ip_numeric {
                ctx.security.short_bans.ban_ip(
                    numeric,
                    now + secs,
                    format!("{} flood", kind.label()),
                    crate::security::ShortBanSubKind::Flood,
                );
            }
            Err(ctx.policy_violation(PolicyError::Flood(kind.label())))
        }
    }
}

/// `<nick> text|` main-chat broadcast. Leading `+`/`!` (the configured
/// command prefix) is routed to the console dispatcher instead of being
/// broadcast (spec §6.4).
pub async fn handle_chat(ctx: &mut ConnCtx, hooks: &Hooks, text: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    let nick = ctx.nick.clone().ok_or(ProtocolError::WrongState)?;

    if !ctx.rights.can(Right::Chat, ctx.class, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("chat is currently gagged".into())));
    }
    if !gate_flood(ctx, FloodKind::Chat)? {
        return Ok(());
    }

    if let Some(rest) = text.strip_prefix(ctx.config.server.command_prefix) {
        return super::misc::dispatch_console_command(ctx, rest).await;
    }

    if super::misc::check_trigger(ctx, text).await {
        return Ok(());
    }

    if hooks.dispatch(HookEvent::OnChat, ctx, text) == HookResult::Consumed {
        return Ok(());
    }

    let frame = format!("<{nick}> {text}|");
    ctx.hub.broadcast(frame.into_bytes(), Class::PINGER.0, Class::MASTER.0, None).await;
    Ok(())
}

/// `$To: <to> From: <from> $<real_from> <msg>|` — private message.
pub async fn handle_to(ctx: &mut ConnCtx, hooks: &Hooks, to: &str, msg: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    let nick = ctx.nick.clone().ok_or(ProtocolError::WrongState)?;

    if !ctx.rights.can(Right::Pm, ctx.class, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("private messages are currently gagged".into())));
    }
    if !gate_flood(ctx, FloodKind::Pm)? {
        return Ok(());
    }
    if hooks.dispatch(HookEvent::OnPm, ctx, msg) == HookResult::Consumed {
        return Ok(());
    }

    let frame = format!("$To: {to} From: {nick} $<{nick}> {msg}|");
    ctx.hub.send_to(to, frame.into_bytes()).await;
    Ok(())
}

/// `$MCTo: <to> $<from> <msg>|` — multi-cast PM variant some clients send
/// for message-to-self confirmations; relayed the same way as `$To:`.
pub async fn handle_mcto(ctx: &mut ConnCtx, to: &str, from: &str, msg: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    if !gate_flood(ctx, FloodKind::Mcto)? {
        return Ok(());
    }
    let frame = format!("$MCTo: {to} $<{from}> {msg}|");
    ctx.hub.send_to(to, frame.into_bytes()).await;
    Ok(())
}

pub fn handle_get_topic(ctx: &mut ConnCtx) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    let topic = ctx.topic.read().clone();
    if !topic.is_empty() {
        ctx.reply_str(format!("$HubTopic {} - {}|", ctx.config.server.name, topic));
    }
    Ok(())
}

pub async fn handle_set_topic(ctx: &mut ConnCtx, topic: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    if !ctx.class.is_operator() {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("only operators may set the hub topic".into())));
    }
    let _ = crate::db::setup::set(ctx.db.pool(), "hub_topic", topic).await;
    *ctx.topic.write() = topic.to_string();
    let frame = format!("$HubTopic {topic}|");
    ctx.hub.broadcast(frame.into_bytes(), Class::PINGER.0, Class::MASTER.0, None).await;
    Ok(())
}

/// `$GetNickList|` — re-push the full nicklist/infolist/iplist on demand
/// (spec §4.4). The Hub actor owns the cached strings; this just asks
/// for a fresh copy rather than tracking them locally.
pub async fn handle_get_nick_list(ctx: &mut ConnCtx) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    let batch = ctx.hub.get_lists().await;
    ctx.reply_str(&batch.infolist);
    ctx.reply_str(&batch.nicklist);
    ctx.reply_str(&batch.iplist);
    Ok(())
}

/// `$MyINFO` received after the initial login one: a refresh, not a
/// promotion. Coalesces identical frames (spec §4.3) by comparing
/// against the previously stored raw string before broadcasting.
pub async fn handle_my_info_update(
    ctx: &mut ConnCtx,
    msg: &verlihub_proto::Message<'_>,
) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    let verlihub_proto::Message::MyInfo { nick, desc, speed, mail, size, .. } = msg else {
        return Err(ProtocolError::Malformed("expected $MyINFO".into()).into());
    };
    let ctx_nick = ctx.nick.clone().ok_or(ProtocolError::WrongState)?;
    if *nick != ctx_nick {
        return Err(ProtocolError::Malformed("MyINFO nick mismatch".into()).into());
    }

    let myinfo_raw = format!("$MyINFO $ALL {nick} {desc}$ ${speed}\x01${mail}${size}$");
    if ctx.myinfo_raw.as_deref() == Some(myinfo_raw.as_str()) {
        return Ok(()); // identical to last accepted MyINFO, no-op
    }

    let share: u64 = size.parse().unwrap_or(0);
    ctx.share = share;
    ctx.desc = Some((*desc).to_string());
    ctx.myinfo_raw = Some(myinfo_raw.clone());

    let frame = format!("{myinfo_raw}|");
    ctx.hub.update_myinfo(ctx_nick, myinfo_raw, frame.clone(), share).await;
    ctx.hub.broadcast(frame.into_bytes(), Class::PINGER.0, Class::MASTER.0, None).await;
    Ok(())
}
