//! Per-connection state and the shared handles every handler needs
//! (spec §3 "Connection", §4.2).
//!
//! One [`ConnCtx`] is owned by a single connection task for its whole
//! lifetime. Nothing in here is shared across tasks except the cheaply
//! cloneable [`HubHandle`], the pooled [`Database`], and [`SecurityShared`]
//! (flood/clone/short-ban state, which is deliberately hub-wide).

use crate::config::{CloseReason, Config};
use crate::db::models::RegistrationRow;
use crate::db::Database;
use crate::error::{PolicyError, ProtocolError, StorageError};
use crate::security::{CloneGuard, HubFloodState, ShortBanStore, UserFloodState};
use crate::state::{Class, HubHandle, LiveUpdate, Mode, Rights, StateClock, SupportsBitmask};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use verlihub_proto::Tag;

/// State shared by every connection on this hub, as opposed to per-
/// connection state that lives directly on [`ConnCtx`].
pub struct SecurityShared {
    pub short_bans: ShortBanStore,
    pub hub_flood: HubFloodState,
    pub clone_guard: CloneGuard,
}

/// The hub topic, as a shared cell: `!settopic` and the reload timer
/// both write it, every connection's `$GetTopic`/login-time push reads
/// it (spec §9 "Config reload" — the mutable, DB-backed subset of
/// config is re-applied live rather than requiring a restart).
pub type SharedTopic = Arc<parking_lot::RwLock<String>>;

impl SecurityShared {
    pub fn new(clone_fragment_len: usize) -> Self {
        SecurityShared {
            short_bans: ShortBanStore::new(),
            hub_flood: HubFloodState::new(),
            clone_guard: CloneGuard::new(clone_fragment_len),
        }
    }
}

/// Why a connection is being closed, and the text (if any) that should
/// reach the client before it is — a hub-security-bot PM for policy
/// violations, nothing for protocol errors that a malformed client
/// likely can't even parse.
#[derive(Debug, Clone)]
pub struct HandlerClose {
    pub reason: CloseReason,
    pub detail: Option<String>,
}

impl HandlerClose {
    pub fn new(reason: CloseReason) -> Self {
        HandlerClose { reason, detail: None }
    }

    pub fn with_detail(reason: CloseReason, detail: impl Into<String>) -> Self {
        HandlerClose { reason, detail: Some(detail.into()) }
    }
}

impl From<ProtocolError> for HandlerClose {
    fn from(err: ProtocolError) -> Self {
        HandlerClose::with_detail(err.to_close_reason(), err.to_string())
    }
}

/// Everything one connection task tracks between accept and close. Field
/// names mirror the "User/Connection" split of spec §3, folded into one
/// struct since a connection task already is the exclusive owner of both
/// halves until `$MyINFO` promotes it into the shared `Directory`.
pub struct ConnCtx {
    pub hub: HubHandle,
    pub db: Database,
    pub config: Arc<Config>,
    pub security: Arc<SecurityShared>,
    pub topic: SharedTopic,

    pub conn_id: u64,
    pub ip: IpAddr,
    pub ip_numeric: Option<u32>,
    pub is_tls: bool,

    pub clock: StateClock,
    pub lock: Vec<u8>,

    pub nick: Option<String>,
    pub class: Class,
    pub rights: Rights,
    pub registration: Option<RegistrationRow>,
    pub supports: SupportsBitmask,
    pub mode: Mode,
    pub is_lan: bool,

    pub share: u64,
    pub myinfo_raw: Option<String>,
    pub desc: Option<String>,
    pub tag: Option<Tag>,
    pub in_list: bool,

    pub flood: UserFloodState,
    pub unknown_frame_count: u32,

    /// Frames queued to write back to this connection directly, drained
    /// by the connection task after each dispatched message.
    pub replies: Vec<Vec<u8>>,

    /// Receiving half of the `User.live_tx` the connection task registered
    /// with the directory; drained by [`ConnCtx::sync_live_updates`] before
    /// each dispatched frame so `!setright`/`!setclass` take effect on the
    /// very next command, not just at the next login.
    pub live_rx: Option<mpsc::UnboundedReceiver<LiveUpdate>>,

    /// Sender clones handed to the `User` record built at `$ValidateNick`
    /// time (spec §4.2/§4.3). The connection task owns the matching
    /// receiving halves (outbox writer loop, close-signal `select!`
    /// arm, `live_rx` above) and constructs these before `ConnCtx::new`.
    pub outbox_tx: mpsc::Sender<Vec<u8>>,
    pub close_tx: mpsc::UnboundedSender<CloseReason>,
    pub live_tx: mpsc::UnboundedSender<LiveUpdate>,

    /// Overridden by `$MyIP` from the configured TLS-terminating proxy
    /// (spec §4.4, §4.9); `None` until that frame arrives.
    pub tls_version: Option<String>,
}

/// Nick the hub-security robot presents itself under for policy-violation PMs.
pub const HUB_SECURITY_NICK: &str = "Hub-Security";

impl ConnCtx {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conn_id: u64,
        ip: IpAddr,
        is_tls: bool,
        lock: Vec<u8>,
        hub: HubHandle,
        db: Database,
        config: Arc<Config>,
        security: Arc<SecurityShared>,
        topic: SharedTopic,
        outbox_tx: mpsc::Sender<Vec<u8>>,
        close_tx: mpsc::UnboundedSender<CloseReason>,
        live_tx: mpsc::UnboundedSender<LiveUpdate>,
        live_rx: mpsc::UnboundedReceiver<LiveUpdate>,
    ) -> Self {
        let ip_numeric = match ip {
            IpAddr::V4(v4) => Some(u32::from(v4)),
            IpAddr::V6(_) => None,
        };
        ConnCtx {
            hub,
            db,
            config,
            security,
            topic,
            conn_id,
            ip,
            ip_numeric,
            is_tls,
            clock: StateClock::new(),
            lock,
            nick: None,
            class: Class::NORMAL,
            rights: Rights::default(),
            registration: None,
            supports: SupportsBitmask::default(),
            mode: Mode::Active,
            is_lan: is_lan(ip),
            share: 0,
            myinfo_raw: None,
            desc: None,
            tag: None,
            in_list: false,
            flood: UserFloodState::default(),
            unknown_frame_count: 0,
            replies: Vec::new(),
            live_rx: Some(live_rx),
            outbox_tx,
            close_tx,
            live_tx,
            tls_version: None,
        }
    }

    pub fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Queue a raw frame (terminator-free) to be written back to this
    /// connection once the current dispatch returns.
    pub fn reply(&mut self, frame: impl Into<Vec<u8>>) {
        self.replies.push(frame.into());
    }

    pub fn reply_str(&mut self, frame: impl AsRef<str>) {
        self.replies.push(frame.as_ref().as_bytes().to_vec());
    }

    /// Take and clear the queued outbound frames.
    pub fn take_replies(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.replies)
    }

    /// Apply any `!setright`/`!setclass` updates the Hub has pushed since
    /// the last dispatched frame (spec §6.4).
    pub fn sync_live_updates(&mut self) {
        let Some(rx) = &mut self.live_rx else { return };
        while let Ok(update) = rx.try_recv() {
            match update {
                LiveUpdate::Rights(rights) => self.rights = rights,
                LiveUpdate::Class(class) => self.class = class,
            }
        }
    }

    /// Send a hub-security-bot PM the way `$To:` frames are shaped
    /// (spec §6.1), then return the [`HandlerClose`] that follows it.
    pub fn policy_violation(&mut self, err: PolicyError) -> HandlerClose {
        let nick = self.nick.as_deref().unwrap_or("?");
        let pm = format!(
            "$To: {nick} From: {bot} $<{bot}> {text}|",
            bot = HUB_SECURITY_NICK,
            text = err.to_security_pm(),
        );
        self.reply_str(pm);
        HandlerClose::with_detail(err.to_close_reason(), err.to_string())
    }

    /// A storage failure encountered mid-handler. Most call sites are on
    /// the login path, so the closest-matching close reason is
    /// `LOGIN_ERR`; this is logged at WARN by the caller before the
    /// connection is torn down (spec §7 storage-error class).
    pub fn storage_failure(&mut self, err: StorageError) -> HandlerClose {
        HandlerClose::with_detail(CloseReason::LoginErr, err.to_string())
    }
}

pub(crate) fn is_lan(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use crate::state::Hub;

    pub async fn test_ctx(nick: Option<&str>) -> ConnCtx {
        let config = Arc::new(Config::default_for_test());
        let db = Database::in_memory_for_test().await;
        let hub = Hub::spawn(config.clone(), db.clone(), 16);
        let security = Arc::new(SecurityShared::new(config.flood.clone_fragment_len));
        let topic = Arc::new(parking_lot::RwLock::new(config.server.topic.clone()));
        let (outbox_tx, _outbox_rx) = mpsc::channel(16);
        let (close_tx, _close_rx) = mpsc::unbounded_channel();
        let (live_tx, live_rx) = mpsc::unbounded_channel();
        let mut ctx = ConnCtx::new(
            1,
            "127.0.0.1".parse().unwrap(),
            false,
            b"LOCKTESTLOCK".to_vec(),
            hub,
            db,
            config,
            security,
            topic,
            outbox_tx,
            close_tx,
            live_tx,
            live_rx,
        );
        ctx.nick = nick.map(str::to_string);
        ctx
    }
}
