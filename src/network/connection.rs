//! The unified per-connection loop: read a frame, dispatch it to the
//! matching handler, flush whatever the handler queued, repeat until
//! the peer disconnects or a handler signals close (spec §3, §4.2,
//! §4.4, §6.1 error taxonomy).
//!
//! Unlike a handshake-then-steady-state split, NMDC's own state machine
//! already gates every frame kind by connection state (each handler
//! checks `ctx.clock.state()` itself), so one loop over the whole
//! connection lifetime is enough — there is no separate phase to model.

use crate::config::{CloseReason, Config};
use crate::db::Database;
use crate::handlers::context::{ConnCtx, HandlerClose, SecurityShared, SharedTopic};
use crate::handlers::{login, messaging, peering, search};
use crate::hooks::{HookEvent, Hooks};
use crate::state::{ConnState, HubHandle, SupportsBitmask};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use verlihub_proto::transport::{FramedReader, FramedWriter};
use verlihub_proto::Message;

/// Frames that fail to parse as any known kind before this many have
/// accumulated are tolerated as client noise; past it, the connection
/// is almost certainly not speaking NMDC and is closed.
const MAX_UNKNOWN_FRAMES: u32 = 32;

/// Random lock challenge length. NMDC places no requirement on this
/// beyond "long enough that a naive client can't hardcode the answer";
/// real hubs use lengths in the low tens of bytes.
const LOCK_LEN: usize = 40;

fn generate_lock() -> Vec<u8> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..LOCK_LEN).map(|_| rng.gen_range(33u8..127)).collect()
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_connection(
    socket: TcpStream,
    peer_addr: SocketAddr,
    conn_id: u64,
    hub: HubHandle,
    db: Database,
    config: Arc<Config>,
    security: Arc<SecurityShared>,
    topic: SharedTopic,
    hooks: Arc<Hooks>,
) -> std::io::Result<()> {
    let span = crate::telemetry::ConnTraceContext::new()
        .with_conn_id(conn_id)
        .with_peer_addr(peer_addr.to_string())
        .into_span();
    let _enter = span.enter();

    let stats = hub.stats().await;
    let (read_half, write_half) = socket.into_split();
    let mut reader = FramedReader::with_max_frame_len(read_half, config.limits.max_frame_len);
    let mut writer = FramedWriter::new(write_half);

    if stats.online >= config.server.max_users {
        tracing::info!("rejecting connection: hub is at its user limit");
        let _ = close_with_reason(&mut writer, &config, CloseReason::UserLimit, None).await;
        return Ok(());
    }

    let accept_ip_numeric = match peer_addr.ip() {
        std::net::IpAddr::V4(v4) => Some(u32::from(v4)),
        std::net::IpAddr::V6(_) => None,
    };
    let accept_subject = crate::db::bans::BanSubject {
        nick: None,
        ip: Some(&peer_addr.ip().to_string()),
        ip_numeric: accept_ip_numeric,
        host: None,
        share: None,
    };
    match crate::db::bans::check_ban(db.pool(), &accept_subject).await {
        Ok(Some(_)) => {
            tracing::info!(%peer_addr, "rejecting connection: banned at accept");
            let _ = close_with_reason(&mut writer, &config, CloseReason::InvalidUser, None).await;
            return Ok(());
        }
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(%err, "ban lookup failed at accept; admitting connection");
        }
    }

    let encoding = encoding_rs::Encoding::for_label(config.wire.encoding.as_bytes()).unwrap_or(encoding_rs::WINDOWS_1252);

    let lock = generate_lock();
    let lock_frame = format!("$Lock {} Pk={}|", String::from_utf8_lossy(&lock), config.server.name);
    writer.write_raw(&encode_out(encoding, lock_frame.as_bytes())).await?;

    let (outbox_tx, mut outbox_rx) = mpsc::channel::<Vec<u8>>(64);
    let (close_tx, mut close_rx) = mpsc::unbounded_channel::<CloseReason>();
    let (live_tx, live_rx) = mpsc::unbounded_channel();

    let mut ctx = ConnCtx::new(
        conn_id,
        peer_addr.ip(),
        false,
        lock,
        hub,
        db,
        config.clone(),
        security,
        topic,
        outbox_tx,
        close_tx,
        live_tx,
        live_rx,
    );
    ctx.clock.transition(ConnState::LockSent);

    let mut timeout_check = tokio::time::interval(std::time::Duration::from_secs(1));

    let close_reason = loop {
        ctx.sync_live_updates();

        tokio::select! {
            frame = reader.next_frame() => {
                let Some(raw) = frame? else { break CloseReason::Quit };
                let decoded = decode_in(encoding, &raw);
                let was_in_list = ctx.in_list;

                match dispatch_frame(&mut ctx, &hooks, &decoded).await {
                    Ok(()) => {}
                    Err(close) => {
                        flush_replies(&mut writer, encoding, &mut ctx).await?;
                        tracing::info!(reason = ?close.reason, detail = close.detail.as_deref(), "closing connection");
                        break close.reason;
                    }
                }

                if !was_in_list && ctx.in_list {
                    flush_initial_batch(&mut writer, encoding, &config, &mut ctx).await?;
                } else {
                    flush_replies(&mut writer, encoding, &mut ctx).await?;
                }

                if ctx.unknown_frame_count >= MAX_UNKNOWN_FRAMES {
                    break CloseReason::Syntax;
                }
            }
            Some(frame) = outbox_rx.recv() => {
                writer.write_raw(&encode_out(encoding, &frame)).await?;
            }
            Some(reason) = close_rx.recv() => {
                break reason;
            }
            _ = timeout_check.tick() => {
                if login::is_expired(&ctx) {
                    break login::timeout_close_reason();
                }
            }
        }
    };

    login::handle_quit(&mut ctx).await;
    close_with_reason(&mut writer, &config, close_reason, None).await?;
    hooks.dispatch(HookEvent::OnCloseConn, &mut ctx, close_reason.wire_name());
    Ok(())
}

async fn dispatch_frame(ctx: &mut ConnCtx, hooks: &Hooks, frame: &str) -> Result<(), HandlerClose> {
    if frame.is_empty() {
        return Ok(()); // empty frames are keepalive pings
    }
    let msg = match Message::parse(frame) {
        Ok(msg) => msg,
        Err(_) => {
            ctx.unknown_frame_count += 1;
            hooks.dispatch(HookEvent::OnUnknownFrame, ctx, frame);
            return Ok(());
        }
    };
    let _timer = crate::telemetry::MessageTimer::new(format!("{:?}", msg.kind()));

    match msg {
        Message::Key(key) => login::handle_key(ctx, key).map_err(HandlerClose::from),
        Message::ValidateNick(nick) => login::handle_validate_nick(ctx, nick).await,
        Message::MyPass(password) => login::handle_my_pass(ctx, password).await,
        Message::Version(version) => login::handle_version(ctx, version).map_err(HandlerClose::from),
        Message::Supports(tokens) => login::handle_supports(ctx, tokens).await.map_err(HandlerClose::from),
        Message::MyInfo { .. } => {
            if ctx.in_list {
                messaging::handle_my_info_update(ctx, &msg).await
            } else {
                login::handle_my_info_initial(ctx, &msg).await
            }
        }
        Message::Chat { text, .. } => messaging::handle_chat(ctx, hooks, text).await,
        Message::To { to, msg: text, .. } => messaging::handle_to(ctx, hooks, to, text).await,
        Message::MCTo { to, from, msg: text } => messaging::handle_mcto(ctx, to, from, text).await,
        Message::GetTopic => messaging::handle_get_topic(ctx),
        Message::SetTopic(topic) => messaging::handle_set_topic(ctx, topic).await,
        Message::GetNickList => messaging::handle_get_nick_list(ctx).await,

        Message::ConnectToMe { nick, ip, port } => peering::handle_connect_to_me(ctx, hooks, nick, ip, port).await,
        Message::RevConnectToMe { from, to } => peering::handle_rev_connect_to_me(ctx, from, to).await,
        Message::MultiConnectToMe { nick, ip, port } => peering::handle_multi_connect_to_me(ctx, hooks, nick, ip, port).await,
        Message::MyIp { ip, tls_version } => peering::handle_my_ip(ctx, ip, tls_version),
        Message::UserIp(_) => peering::handle_user_ip(ctx).await,
        Message::BotInfo(info) => peering::handle_bot_info(ctx, info),
        Message::GetInfo { nick, requester } => peering::handle_get_info(ctx, nick, requester).await,
        Message::Kick(victim) => peering::handle_kick(ctx, hooks, victim).await,
        Message::OpForceMove { nick, dest, reason } => peering::handle_op_force_move(ctx, nick, dest, reason).await,
        Message::Ban(args) => peering::handle_ban(ctx, args).await,
        Message::TempBan(args) => peering::handle_temp_ban(ctx, args).await,
        Message::UnBan(args) => peering::handle_unban(ctx, args).await,
        Message::GetBanList => peering::handle_get_ban_list(ctx).await,
        Message::WhoIp(args) => peering::handle_who_ip(ctx, args).await,

        Message::Search { addr, params } => search::handle_search(ctx, hooks, addr, params).await,
        Message::SearchHub { nick, params } => search::handle_search_hub(ctx, hooks, nick, params).await,
        Message::MultiSearch { addr, params } => search::handle_multi_search(ctx, hooks, addr, params).await,
        Message::SearchResult { to, .. } => search::handle_search_result(ctx, frame, to).await,

        Message::Quit(_) => Err(HandlerClose::new(CloseReason::Quit)),

        // Server-originated-only kinds a compliant client never sends, the
        // one-shot `$Lock` challenge we already sent ourselves, and frames
        // this hub accepts but attaches no behaviour to.
        Message::SA { .. }
        | Message::SP { .. }
        | Message::Lock { .. }
        | Message::MyNick(_)
        | Message::ExtJson(_)
        | Message::MyHubUrl(_)
        | Message::In(_) => {
            ctx.unknown_frame_count += 1;
            Ok(())
        }
        Message::Unknown(_) => {
            ctx.unknown_frame_count += 1;
            hooks.dispatch(HookEvent::OnUnknownFrame, ctx, frame);
            Ok(())
        }
    }
}

async fn flush_replies<W: tokio::io::AsyncWrite + Unpin>(
    writer: &mut FramedWriter<W>,
    encoding: &'static encoding_rs::Encoding,
    ctx: &mut ConnCtx,
) -> std::io::Result<()> {
    for frame in ctx.take_replies() {
        writer.write_raw(&encode_out(encoding, &frame)).await?;
    }
    Ok(())
}

/// The first `InList` transition pushes three potentially large batches
/// (infolist/nicklist/iplist) back to back. If the client advertised
/// `ZPipe` and the combined size clears the configured threshold, send
/// them as a single `$ZOn1|`-prefixed zlib stream instead of three plain
/// frames (spec §6.1 wire compression).
async fn flush_initial_batch<W: tokio::io::AsyncWrite + Unpin>(
    writer: &mut FramedWriter<W>,
    encoding: &'static encoding_rs::Encoding,
    config: &Config,
    ctx: &mut ConnCtx,
) -> std::io::Result<()> {
    let replies = ctx.take_replies();
    let total_len: usize = replies.iter().map(Vec::len).sum();

    if ctx.supports.has(SupportsBitmask::ZPipe) && total_len > config.wire.zon_threshold_bytes {
        let mut payload = Vec::with_capacity(total_len);
        for frame in &replies {
            payload.extend_from_slice(&encode_out(encoding, frame));
        }
        match zon_compress(&payload) {
            Ok(compressed) => {
                writer.write_frame(b"$ZOn1").await?;
                writer.write_raw(&compressed).await?;
                return Ok(());
            }
            Err(err) => {
                tracing::warn!(%err, "zon compression failed, falling back to plain frames");
            }
        }
    }

    for frame in replies {
        writer.write_raw(&encode_out(encoding, &frame)).await?;
    }
    Ok(())
}

fn zon_compress(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload)?;
    encoder.finish()
}

async fn close_with_reason<W: tokio::io::AsyncWrite + Unpin>(
    writer: &mut FramedWriter<W>,
    config: &Config,
    reason: CloseReason,
    _detail: Option<&str>,
) -> std::io::Result<()> {
    if let Some(url) = config.redirects.url_for(reason) {
        let frame = format!("$ForceMove {url}");
        let _ = writer.write_frame(frame.as_bytes()).await;
    }
    Ok(())
}

fn decode_in(encoding: &'static encoding_rs::Encoding, bytes: &[u8]) -> String {
    encoding.decode(bytes).0.into_owned()
}

fn encode_out(encoding: &'static encoding_rs::Encoding, bytes: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(bytes);
    encoding.encode(&text).0.into_owned()
}
