//! Connection bring-up: `$Key` / `$ValidateNick` / `$MyPass` / `$Version`
//! / `$Supports` / first `$MyINFO` (spec §4.2, §4.4 login sequence).

use super::context::ConnCtx;
use crate::config::CloseReason;
use crate::error::{PolicyError, ProtocolError};
use crate::security::tag_validation;
use crate::state::{Class, ConnState, Mode, SupportsBitmask};
use verlihub_proto::{lock2key, Tag};

/// `$Key <key>|` — the client's reply to our `$Lock`. Wrong-key is a
/// protocol error (not a ban-worthy policy violation); the client may
/// simply be broken.
pub fn handle_key(ctx: &mut ConnCtx, key: &str) -> Result<(), ProtocolError> {
    if ctx.clock.state() != ConnState::LockSent {
        return Err(ProtocolError::WrongState);
    }
    let expected = lock2key(&ctx.lock);
    if key.as_bytes() != expected.as_slice() {
        return Err(ProtocolError::BadKey);
    }
    ctx.clock.transition(ConnState::NickValidated);
    Ok(())
}

/// `$ValidateNick <nick>|`. Runs the ban check, nick-shape check,
/// registration lookup, and directory registration — everything up to
/// (but not including) password verification, which is a separate frame.
pub async fn handle_validate_nick<'a>(ctx: &mut ConnCtx, nick: &'a str) -> Result<(), super::context::HandlerClose> {
    if ctx.clock.state() != ConnState::NickValidated {
        return Err(ProtocolError::WrongState.into());
    }

    let min = ctx.config.limits.min_nick_length;
    let max = ctx.config.limits.max_nick_length;
    let has_bad_char = nick
        .chars()
        .any(|c| matches!(c, '$' | '|' | ' ' | '<' | '>' | '\r' | '\n'));
    if nick.is_empty() || nick.len() < min || nick.len() > max || has_bad_char {
        return Err(ProtocolError::BadNick.into());
    }

    if let Some(short) = ctx.security.short_bans.check_nick(nick, ctx.now()) {
        return Err(ctx.policy_violation(PolicyError::Banned(short.reason)));
    }

    let subject = crate::db::bans::BanSubject {
        nick: Some(nick),
        ip: Some(&ctx.ip.to_string()),
        ip_numeric: ctx.ip_numeric,
        host: None,
        share: None,
    };
    match crate::db::bans::check_ban(ctx.db.pool(), &subject).await {
        Ok(Some(ban)) => return Err(ctx.policy_violation(PolicyError::Banned(ban.reason.unwrap_or_default()))),
        Ok(None) => {}
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }

    if ctx.hub.lookup(nick).await.is_some() {
        return Err(ctx.policy_violation(PolicyError::NickInUse));
    }

    let registration = match crate::db::registrations::get(ctx.db.pool(), nick).await {
        Ok(r) => r,
        Err(e) => return Err(ctx.storage_failure(e.into())),
    };

    let requires_password = registration.as_ref().map(|r| r.enabled != 0).unwrap_or(false);

    if let Some(row) = &registration {
        ctx.class = Class(row.class as i8);
    }
    for op in &ctx.config.operators {
        if op.nick.eq_ignore_ascii_case(nick) {
            ctx.class = Class(op.class);
        }
    }

    if let Ok(Some(penalty)) = crate::db::penalties::get(ctx.db.pool(), nick).await {
        ctx.rights.start_chat = crate::state::RightDeadline::from_raw(penalty.st_chat);
        ctx.rights.start_pm = crate::state::RightDeadline::from_raw(penalty.st_pm);
        ctx.rights.start_search = crate::state::RightDeadline::from_raw(penalty.st_search);
        ctx.rights.start_ctm = crate::state::RightDeadline::from_raw(penalty.st_ctm);
        ctx.rights.stop_kick = crate::state::RightDeadline::from_raw(penalty.st_kick);
        ctx.rights.stop_share0 = crate::state::RightDeadline::from_raw(penalty.st_share0);
        ctx.rights.stop_reg = crate::state::RightDeadline::from_raw(penalty.st_reg);
        ctx.rights.stop_opchat = crate::state::RightDeadline::from_raw(penalty.st_opchat);
    }

    ctx.nick = Some(nick.to_string());
    ctx.registration = registration;

    let user = crate::state::User {
        nick: nick.to_string(),
        kind: crate::state::UserKind::Human,
        class: ctx.class,
        myinfo: String::new(),
        fake_myinfo: String::new(),
        share: 0,
        mode: ctx.mode,
        is_lan: ctx.is_lan,
        rights: ctx.rights,
        supports: ctx.supports,
        in_list: false,
        ip: ctx.ip,
        outbox: Some(ctx.outbox_tx.clone()),
        close_tx: Some(ctx.close_tx.clone()),
        live_tx: Some(ctx.live_tx.clone()),
    };
    if !ctx.hub.register(user).await {
        return Err(ctx.policy_violation(PolicyError::NickInUse));
    }

    if requires_password {
        ctx.reply_str("$GetPass|");
        ctx.clock.transition(ConnState::PasswordPending);
    } else {
        ctx.reply_str("$Hello ");
        ctx.reply_str(nick);
        ctx.reply_str("|");
        ctx.clock.transition(ConnState::RegKnown);
    }
    Ok(())
}

/// `$MyPass <password>|` — only valid once `$GetPass` was sent.
pub async fn handle_my_pass(ctx: &mut ConnCtx, password: &str) -> Result<(), super::context::HandlerClose> {
    if ctx.clock.state() != ConnState::PasswordPending {
        return Err(ProtocolError::WrongState.into());
    }
    let nick = ctx.nick.clone().ok_or(ProtocolError::WrongState)?;
    let Some(registration) = ctx.registration.clone() else {
        return Err(ProtocolError::WrongState.into());
    };

    if !crate::db::registrations::verify_password(&registration, password) {
        let _ = crate::db::registrations::record_bad_password(ctx.db.pool(), &nick, ctx.now()).await;
        return Err(ctx.policy_violation(PolicyError::BadPassword));
    }

    let _ = crate::db::registrations::record_login(ctx.db.pool(), &nick, &ctx.ip.to_string(), ctx.now()).await;
    ctx.reply_str("$LogedIn ");
    ctx.reply_str(&nick);
    ctx.reply_str("|");
    ctx.clock.transition(ConnState::RegKnown);
    Ok(())
}

pub fn handle_version(ctx: &mut ConnCtx, _version: &str) -> Result<(), ProtocolError> {
    // No wire-level gate on version today; recorded for telemetry only.
    let _ = ctx;
    Ok(())
}

pub async fn handle_supports(ctx: &mut ConnCtx, tokens: &str) -> Result<(), ProtocolError> {
    ctx.supports = SupportsBitmask::parse(tokens);
    if let Some(nick) = ctx.nick.clone() {
        ctx.hub.update_supports(nick, ctx.supports).await;
    }
    Ok(())
}

/// First accepted `$MyINFO` promotes the connection into the shared
/// directory (spec §4.2 "Login sequence", step "MyINFO -> InList").
/// Subsequent `$MyINFO` frames are handled by
/// [`super::messaging::handle_my_info_update`] instead.
pub async fn handle_my_info_initial(
    ctx: &mut ConnCtx,
    msg: &verlihub_proto::Message<'_>,
) -> Result<(), super::context::HandlerClose> {
    let verlihub_proto::Message::MyInfo { nick, desc, speed, mail, size, .. } = msg else {
        return Err(ProtocolError::Malformed("expected $MyINFO".into()).into());
    };
    if !matches!(ctx.clock.state(), ConnState::RegKnown | ConnState::MyInfoPending) {
        return Err(ProtocolError::WrongState.into());
    }
    let Some(ctx_nick) = ctx.nick.clone() else {
        return Err(ProtocolError::WrongState.into());
    };
    if *nick != ctx_nick {
        return Err(ProtocolError::Malformed("MyINFO nick mismatch".into()).into());
    }

    let share: u64 = size.parse().unwrap_or(0);
    if ctx.config.limits.min_share_bytes > 0
        && share < ctx.config.limits.min_share_bytes
        && !ctx.rights.can(crate::state::Right::HideShare, ctx.class, ctx.now())
    {
        return Err(ctx.policy_violation(PolicyError::ShareLimit));
    }

    let share_subject = crate::db::bans::BanSubject { share: Some(share), ..Default::default() };
    match crate::db::bans::check_ban(ctx.db.pool(), &share_subject).await {
        Ok(Some(ban)) => return Err(ctx.policy_violation(PolicyError::Banned(ban.reason.unwrap_or_default()))),
        Ok(None) => {}
        Err(e) => return Err(ctx.storage_failure(e.into())),
    }

    let tag = Tag::parse(desc);
    let tag = match tag {
        Ok(tag) => {
            let client = crate::db::clients::get(ctx.db.pool(), &tag.client_id).await.unwrap_or(None);
            let conn_type = None; // connection-type resolution happens from supports/IP class, not modeled here.
            if let Err(e) = tag_validation::validate_tag(&tag, client.as_ref(), conn_type, &ctx.config.security.tag_validation)
            {
                return Err(ctx.policy_violation(PolicyError::TagInvalid(e.to_string())));
            }
            Some(tag)
        }
        Err(_) => None,
    };
    if tag.is_none() && ctx.class < Class::OP {
        return Err(ctx.policy_violation(PolicyError::TagMissing));
    }

    if let Some(holder) = ctx.security.clone_guard.check_and_register(&ctx_nick, desc) {
        if holder != ctx_nick {
            return Err(ctx.policy_violation(PolicyError::Clone));
        }
    }

    ctx.mode = tag.as_ref().map(|t| t.mode).unwrap_or(Mode::Active);
    ctx.share = share;
    ctx.desc = Some((*desc).to_string());
    ctx.tag = tag;

    let myinfo_raw = format!(
        "$MyINFO $ALL {nick} {desc}$ ${speed}\x01${mail}${size}$",
        nick = nick,
        desc = desc,
        speed = speed,
        mail = mail,
        size = size,
    );
    ctx.myinfo_raw = Some(myinfo_raw.clone());

    let fake_myinfo = myinfo_raw.clone();

    ctx.hub.update_myinfo(ctx_nick.clone(), myinfo_raw, fake_myinfo, share).await;
    let batch = ctx.hub.promote_to_in_list(ctx_nick.clone()).await;
    ctx.in_list = true;
    ctx.clock.transition(ConnState::InList);

    ctx.reply_str(&batch.infolist);
    ctx.reply_str(&batch.nicklist);
    ctx.reply_str(&batch.iplist);
    ctx.reply_str(format!("$HubName {}|", ctx.config.server.name));
    let topic = ctx.topic.read().clone();
    if !topic.is_empty() {
        ctx.reply_str(format!("$HubTopic {} - {}|", ctx.config.server.name, topic));
    }
    Ok(())
}

pub async fn handle_quit(ctx: &mut ConnCtx) {
    if let Some(nick) = ctx.nick.clone() {
        ctx.hub.remove(nick.clone()).await;
        let _ = crate::db::registrations::record_logout(ctx.db.pool(), &nick, ctx.now()).await;
        ctx.security.clone_guard.release(&nick, ctx.desc.as_deref().unwrap_or(""));
    }
}

/// Checked at the top of dispatch for every state's timeout floor
/// (spec §3 "Connection" state-clock invariant).
pub fn is_expired(ctx: &ConnCtx) -> bool {
    ctx.clock.is_expired(&ctx.config.limits)
}

pub fn timeout_close_reason() -> CloseReason {
    CloseReason::Timeout
}
