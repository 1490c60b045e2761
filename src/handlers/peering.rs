//! P2P connection setup (`$ConnectToMe`/`$RevConnectToMe`/`$MultiConnectToMe`),
//! IP/info exchange (`$MyIP`/`$UserIP`/`$BotINFO`/`$GetINFO`), and the
//! wire-frame equivalents of the operator console's ban/kick commands
//! (spec §4.4, §4.9).

use super::context::{ConnCtx, HandlerClose};
use crate::config::CloseReason;
use crate::error::{PolicyError, ProtocolError};
use crate::hooks::{HookEvent, HookResult, Hooks};
use crate::security::FloodKind;
use crate::state::{Class, ConnState, Right, SupportsBitmask};

fn require_in_list(ctx: &ConnCtx) -> Result<(), ProtocolError> {
    if ctx.clock.state() != ConnState::InList {
        return Err(ProtocolError::WrongState);
    }
    Ok(())
}

/// The class floor op-only wire messages must clear (spec §4.4 item 2).
fn require_op_floor(ctx: &mut ConnCtx, command: &'static str) -> Result<(), HandlerClose> {
    if !ctx.class.is_operator() {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied(format!("{command}: operators only"))));
    }
    Ok(())
}

async fn gate_ctm_flood(ctx: &mut ConnCtx, kind: FloodKind) -> Result<bool, HandlerClose> {
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
                ctx.security.short_bans.ban_nick(nick, now + secs, format!("{} flood", kind.label()), crate::security::ShortBanSubKind::Flood);
            }
            if let Some(numeric) = ctx.ip_numeric {
                ctx.security.short_bans.ban_ip(numeric, now + secs, format!("{} flood", kind.label()), crate::security::ShortBanSubKind::Flood);
            }
            Err(ctx.policy_violation(PolicyError::Flood(kind.label())))
        }
    }
}

/// Both peers must advertise `TLS` in `$Supports` when
/// `security.require_tls_for_ctm` is on (spec §4.9). `None` target means
/// the target isn't even online, which the caller already treats as a
/// no-op, so this only answers the policy question once both snapshots
/// are known to exist.
async fn ctm_tls_compat(ctx: &ConnCtx, target_supports: SupportsBitmask) -> bool {
    if !ctx.config.security.require_tls_for_ctm {
        return true;
    }
    ctx.supports.has(SupportsBitmask::TLS) && target_supports.has(SupportsBitmask::TLS)
}

/// `$ConnectToMe <target> <ip>:<port>|` sent by the initiating peer;
/// forwarded to `target` as `$ConnectToMe <from> <ip>:<port>|`.
pub async fn handle_connect_to_me(ctx: &mut ConnCtx, hooks: &Hooks, target: &str, ip: &str, port: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    let from = ctx.nick.clone().ok_or(ProtocolError::WrongState)?;
    if !ctx.rights.can(Right::Ctm, ctx.class, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("connecting is currently gagged".into())));
    }
    if !gate_ctm_flood(ctx, FloodKind::Ctm).await? {
        return Ok(());
    }
    let Some(snapshot) = ctx.hub.lookup(target).await else {
        return Ok(());
    };
    if !ctm_tls_compat(ctx, snapshot.supports).await {
        return Ok(());
    }
    if hooks.dispatch(HookEvent::OnConnectToMe, ctx, target) == HookResult::Consumed {
        return Ok(());
    }
    let frame = format!("$ConnectToMe {from} {ip}:{port}|");
    ctx.hub.send_to(target, frame.into_bytes()).await;
    Ok(())
}

/// `$RevConnectToMe <from> <to>|` — ask `to` to CTM back to `from`.
/// Forwarded verbatim; `from` must match the sender's own nick.
pub async fn handle_rev_connect_to_me(ctx: &mut ConnCtx, from: &str, to: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    let nick = ctx.nick.clone().ok_or(ProtocolError::WrongState)?;
    if from != nick {
        return Err(ProtocolError::Malformed("RevConnectToMe from mismatch".into()).into());
    }
    if !ctx.rights.can(Right::Ctm, ctx.class, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("connecting is currently gagged".into())));
    }
    if !gate_ctm_flood(ctx, FloodKind::Rctm).await? {
        return Ok(());
    }
    let Some(snapshot) = ctx.hub.lookup(to).await else {
        return Ok(());
    };
    if !ctm_tls_compat(ctx, snapshot.supports).await {
        return Ok(());
    }
    let frame = format!("$RevConnectToMe {from} {to}|");
    ctx.hub.send_to(to, frame.into_bytes()).await;
    Ok(())
}

/// `$MultiConnectToMe <target> <ip>:<port>|` — batched variant of CTM
/// some clients send; relayed with the same gating.
pub async fn handle_multi_connect_to_me(ctx: &mut ConnCtx, hooks: &Hooks, target: &str, ip: &str, port: &str) -> Result<(), HandlerClose> {
    handle_connect_to_me(ctx, hooks, target, ip, port).await
}

/// `$MyIP <ip>[ <tls_version>]|` — accepted only from the configured
/// TLS-terminating proxy, overriding the connection's source IP and
/// recording the negotiated TLS version (spec §4.4, §4.9).
pub fn handle_my_ip(ctx: &mut ConnCtx, ip: &str, tls_version: Option<&str>) -> Result<(), HandlerClose> {
    let Some(proxy_addr) = ctx.config.security.tls_proxy_addr else {
        return Ok(()); // no proxy configured, frame is simply ignored
    };
    if ctx.ip != proxy_addr {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("$MyIP from an unconfigured source".into())));
    }
    let Ok(parsed) = ip.parse::<std::net::IpAddr>() else {
        return Err(ProtocolError::Malformed("MyIP: bad address".into()).into());
    };
    ctx.ip = parsed;
    ctx.ip_numeric = match parsed {
        std::net::IpAddr::V4(v4) => Some(u32::from(v4)),
        std::net::IpAddr::V6(_) => None,
    };
    ctx.is_lan = super::context::is_lan(parsed);
    ctx.tls_version = tls_version.map(str::to_string);
    Ok(())
}

/// `$UserIP|` — full `$UserIP <nick> <ip>$$…|` list, gated to operators
/// per spec's explicit op-only listing (spec §4.4 item 2).
pub async fn handle_user_ip(ctx: &mut ConnCtx) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    require_op_floor(ctx, "UserIP")?;
    let batch = ctx.hub.get_lists().await;
    ctx.reply_str(&batch.iplist);
    Ok(())
}

/// `$BotINFO <info>|` — a bot identifying itself to the hub. Accepted and
/// dropped; this hub doesn't model third-party bot metadata beyond the
/// directory's own `UserKind::*Bot` variants.
pub fn handle_bot_info(ctx: &mut ConnCtx, _info: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    Ok(())
}

/// `$GetINFO <nick> <requester>|` — refresh one user's `$MyINFO` on
/// demand, replying only to the requesting connection.
pub async fn handle_get_info(ctx: &mut ConnCtx, nick: &str, requester: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    let ctx_nick = ctx.nick.clone().ok_or(ProtocolError::WrongState)?;
    if requester != ctx_nick {
        return Err(ProtocolError::Malformed("GetINFO requester mismatch".into()).into());
    }
    if let Some(snapshot) = ctx.hub.lookup(nick).await {
        ctx.reply_str(format!("{}|", snapshot.fake_myinfo));
    }
    Ok(())
}

/// `$Kick <nick>|` — wire-level kick, no reason field (unlike the console
/// `!kick <nick> <reason>`, spec §6.4).
pub async fn handle_kick(ctx: &mut ConnCtx, hooks: &Hooks, victim: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    require_op_floor(ctx, "Kick")?;
    if !ctx.rights.can(Right::Kick, ctx.class, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("insufficient rights to kick".into())));
    }
    let Some(snapshot) = ctx.hub.lookup(victim).await else {
        return Ok(());
    };
    if snapshot.class >= ctx.class.0 {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("cannot kick an equal or higher class".into())));
    }
    if hooks.dispatch(HookEvent::OnKick, ctx, victim) == HookResult::Consumed {
        return Ok(());
    }
    let op = ctx.nick.clone().unwrap_or_default();
    let _ = crate::db::kicks::record(ctx.db.pool(), victim, &snapshot.ip.to_string(), None, None, None, &op, false, ctx.now()).await;
    ctx.hub.disconnect(victim.to_string(), None, CloseReason::Kicked).await;
    Ok(())
}

/// `$OpForceMove $Who:<nick>$Where:<dest>$Msg:<reason>|`.
pub async fn handle_op_force_move(ctx: &mut ConnCtx, victim: &str, dest: &str, reason: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    require_op_floor(ctx, "OpForceMove")?;
    if !ctx.rights.can(Right::Kick, ctx.class, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::OperatorDenied("insufficient rights to force-move".into())));
    }
    if ctx.hub.lookup(victim).await.is_none() {
        return Ok(());
    }
    let frame = if reason.is_empty() {
        format!("$ForceMove {dest}|")
    } else {
        format!("$ForceMove {dest}|$To: {victim} From: {bot} $<{bot}> {reason}|", bot = super::context::HUB_SECURITY_NICK)
    };
    ctx.hub.disconnect(victim.to_string(), Some(frame.into_bytes()), CloseReason::ForceMove).await;
    Ok(())
}

/// `$Ban <nick> <reason>|` — wire equivalent of `!ban`, reusing the
/// console command's implementation since the argument shapes line up.
pub async fn handle_ban(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    require_op_floor(ctx, "Ban")?;
    super::misc::ban(ctx, args, true).await
}

/// `$TempBan <nick> <seconds> <reason>|`.
pub async fn handle_temp_ban(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    require_op_floor(ctx, "TempBan")?;
    super::misc::ban(ctx, args, false).await
}

/// `$UnBan <nick> <reason>|`.
pub async fn handle_unban(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    require_op_floor(ctx, "UnBan")?;
    super::misc::unban(ctx, args).await
}

/// `$GetBanList|`.
pub async fn handle_get_ban_list(ctx: &mut ConnCtx) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    require_op_floor(ctx, "GetBanList")?;
    super::misc::getbanlist(ctx).await
}

/// `$WhoIP <nick>|`.
pub async fn handle_who_ip(ctx: &mut ConnCtx, args: &str) -> Result<(), HandlerClose> {
    require_in_list(ctx)?;
    require_op_floor(ctx, "WhoIP")?;
    super::misc::whoip(ctx, args).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::context::tests_support::test_ctx;

    #[tokio::test]
    async fn non_operator_cannot_kick() {
        let mut ctx = test_ctx(Some("mallory")).await;
        ctx.clock.transition(ConnState::InList);
        ctx.class = Class::NORMAL;
        let hooks = Hooks::new();
        let err = handle_kick(&mut ctx, &hooks, "victim").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn my_ip_without_configured_proxy_is_ignored() {
        let mut ctx = test_ctx(Some("alice")).await;
        assert!(handle_my_ip(&mut ctx, "1.2.3.4", None).is_ok());
    }

    #[tokio::test]
    async fn ctm_to_offline_target_is_a_silent_no_op() {
        let mut ctx = test_ctx(Some("alice")).await;
        ctx.clock.transition(ConnState::InList);
        let hooks = Hooks::new();
        handle_connect_to_me(&mut ctx, &hooks, "nobody", "1.2.3.4", "412").await.unwrap();
    }
}
