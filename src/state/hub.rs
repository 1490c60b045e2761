//! The Hub actor: the single task that exclusively owns the [`Directory`]
//! (spec §5 "all state mutation happens on the main thread").
//!
//! Every per-connection task talks to the Hub only through [`HubCommand`]
//! messages sent over an `mpsc` channel; there is no other path to mutate
//! the directory. This is the async-native reading of the spec's single-
//! threaded event loop: one task, one owner, everyone else proposes
//! mutations and awaits the reply.

use super::directory::Directory;
use super::user::User;
use crate::config::Config;
use crate::db::Database;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// A request to mutate or read the directory, sent by connection tasks.
pub enum HubCommand {
    /// Attempt to add a brand new user at `$ValidateNick` time
    /// (directory membership, not yet `InList`).
    Register {
        user: Box<User>,
        reply_tx: oneshot::Sender<bool>,
    },
    /// Mark a previously registered user `InList` after MyINFO acceptance,
    /// returning the nicklist/oplist/botlist/iplist batch to send back.
    PromoteToInList {
        nick: String,
        reply_tx: oneshot::Sender<InListBatch>,
    },
    /// Update an existing user's MyINFO fields and refresh the directory
    /// caches + secondary collections; returns whether this is the user's
    /// first accepted MyINFO (coalesced: accepting the same info twice in
    /// a row must not cause a second broadcast — callers pass the raw
    /// frame and compare against the stored one before sending this).
    UpdateMyInfo {
        nick: String,
        myinfo: String,
        fake_myinfo: String,
        share: u64,
        reply_tx: oneshot::Sender<()>,
    },
    Remove {
        nick: String,
        reply_tx: oneshot::Sender<()>,
    },
    Lookup {
        nick: String,
        reply_tx: oneshot::Sender<Option<UserSnapshot>>,
    },
    /// Broadcast an identical frame to every sendable `InList` user in a
    /// class range, optionally excluding one nick.
    Broadcast {
        frame: Vec<u8>,
        min_class: i8,
        max_class: i8,
        exclude: Option<String>,
    },
    /// Deliver a frame to exactly one nick's outbox (used for `$To:`,
    /// `$SR`, `$ConnectToMe` routing).
    SendTo {
        nick: String,
        frame: Vec<u8>,
        reply_tx: oneshot::Sender<bool>,
    },
    Stats {
        reply_tx: oneshot::Sender<HubStats>,
    },
    /// Fetch the current nicklist/infolist/iplist without promoting
    /// anyone or touching membership, used by `$GetNickList` (spec §4.4).
    GetLists {
        reply_tx: oneshot::Sender<InListBatch>,
    },
    /// Live-apply a penalty/right change to an online user so an
    /// operator's `!gag`/`!mute`/`!setright` takes effect immediately
    /// instead of only at the victim's next login (spec §6.4).
    SetRights {
        nick: String,
        rights: Box<super::user::Rights>,
        reply_tx: oneshot::Sender<bool>,
    },
    /// Live-apply a class change (`!setclass`-equivalent reg update) to
    /// an online user, refreshing op-list membership.
    SetClass {
        nick: String,
        class: i8,
        reply_tx: oneshot::Sender<bool>,
    },
    /// Kick/ban/force-move: send an optional final frame, then signal the
    /// connection task to close with `reason`.
    Disconnect {
        nick: String,
        frame: Option<Vec<u8>>,
        reason: crate::config::CloseReason,
        reply_tx: oneshot::Sender<bool>,
    },
    /// The TTHS-aware search fan-out (spec §4.4): deliver `frame` to
    /// every sendable `InList` user except `exclude`, optionally
    /// restricted to users whose `$Supports` mask includes `TTHS`
    /// (`want_tths = Some(true/false)`, `None` = no TTHS filter) and/or
    /// to lan-sourced peers only.
    SearchFanout {
        frame: Vec<u8>,
        exclude: String,
        want_tths: Option<bool>,
        lan_only: bool,
    },
    /// Refresh a directory user's `$Supports` mask in place. Client
    /// `$Supports` frames can arrive either side of `$ValidateNick`, so
    /// [`super::user::User::supports`] is seeded from the connection's
    /// mask at `Register` time and re-synced here if the frame arrives
    /// later (needed for the compat-TLS check in spec §4.9, which reads
    /// the *other* peer's mask out of the directory).
    UpdateSupports {
        nick: String,
        supports: super::user::SupportsBitmask,
    },
}

/// Batch of directory snapshots sent to a newly `InList` user.
pub struct InListBatch {
    pub ok: bool,
    pub nicklist: String,
    pub infolist: String,
    pub iplist: String,
}

/// Read-only projection of a `User`, safe to hand across the channel
/// boundary without exposing the live `Directory` borrow.
#[derive(Debug, Clone)]
pub struct UserSnapshot {
    pub nick: String,
    pub class: i8,
    pub share: u64,
    pub in_list: bool,
    pub fake_myinfo: String,
    pub ip: std::net::IpAddr,
    pub supports: super::user::SupportsBitmask,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HubStats {
    pub online: usize,
    pub total_share: u64,
}

/// A cheaply-cloneable handle connection tasks use to talk to the Hub.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn register(&self, user: User) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(HubCommand::Register { user: Box::new(user), reply_tx })
            .await
            .is_err()
        {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    pub async fn promote_to_in_list(&self, nick: impl Into<String>) -> InListBatch {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(HubCommand::PromoteToInList { nick: nick.into(), reply_tx })
            .await
            .is_err()
        {
            return InListBatch { ok: false, nicklist: String::new(), infolist: String::new(), iplist: String::new() };
        }
        reply_rx.await.unwrap_or(InListBatch {
            ok: false,
            nicklist: String::new(),
            infolist: String::new(),
            iplist: String::new(),
        })
    }

    pub async fn update_myinfo(&self, nick: impl Into<String>, myinfo: String, fake_myinfo: String, share: u64) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(HubCommand::UpdateMyInfo { nick: nick.into(), myinfo, fake_myinfo, share, reply_tx })
            .await;
        let _ = reply_rx.await;
    }

    pub async fn remove(&self, nick: impl Into<String>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self.tx.send(HubCommand::Remove { nick: nick.into(), reply_tx }).await;
        let _ = reply_rx.await;
    }

    pub async fn lookup(&self, nick: impl Into<String>) -> Option<UserSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(HubCommand::Lookup { nick: nick.into(), reply_tx }).await.ok()?;
        reply_rx.await.ok().flatten()
    }

    pub async fn broadcast(&self, frame: Vec<u8>, min_class: i8, max_class: i8, exclude: Option<String>) {
        let _ = self.tx.send(HubCommand::Broadcast { frame, min_class, max_class, exclude }).await;
    }

    /// Fan a search frame out to every sendable `InList` user except
    /// `exclude`, filtered by TTHS support and/or lan membership.
    pub async fn search_fanout(&self, frame: Vec<u8>, exclude: impl Into<String>, want_tths: Option<bool>, lan_only: bool) {
        let _ = self
            .tx
            .send(HubCommand::SearchFanout { frame, exclude: exclude.into(), want_tths, lan_only })
            .await;
    }

    pub async fn send_to(&self, nick: impl Into<String>, frame: Vec<u8>) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(HubCommand::SendTo { nick: nick.into(), frame, reply_tx }).await.is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    /// Send `frame` (if any) to `nick`'s outbox then signal its
    /// connection task to close with `reason`. Returns `false` if the
    /// nick is not online or has no live connection to signal.
    pub async fn disconnect(&self, nick: impl Into<String>, frame: Option<Vec<u8>>, reason: crate::config::CloseReason) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(HubCommand::Disconnect { nick: nick.into(), frame, reason, reply_tx })
            .await
            .is_err()
        {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    pub async fn stats(&self) -> HubStats {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(HubCommand::Stats { reply_tx }).await.is_err() {
            return HubStats::default();
        }
        reply_rx.await.unwrap_or_default()
    }

    pub async fn get_lists(&self) -> InListBatch {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(HubCommand::GetLists { reply_tx }).await.is_err() {
            return InListBatch { ok: false, nicklist: String::new(), infolist: String::new(), iplist: String::new() };
        }
        reply_rx.await.unwrap_or(InListBatch {
            ok: false,
            nicklist: String::new(),
            infolist: String::new(),
            iplist: String::new(),
        })
    }

    pub async fn set_rights(&self, nick: impl Into<String>, rights: super::user::Rights) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(HubCommand::SetRights { nick: nick.into(), rights: Box::new(rights), reply_tx })
            .await
            .is_err()
        {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    pub async fn update_supports(&self, nick: impl Into<String>, supports: super::user::SupportsBitmask) {
        let _ = self.tx.send(HubCommand::UpdateSupports { nick: nick.into(), supports }).await;
    }

    pub async fn set_class(&self, nick: impl Into<String>, class: i8) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(HubCommand::SetClass { nick: nick.into(), class, reply_tx }).await.is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }
}

/// Owns the `Directory` exclusively; all mutation happens inside `run`.
pub struct Hub {
    directory: Directory,
    config: Arc<Config>,
    #[allow(dead_code)]
    db: Database,
}

impl Hub {
    /// Spawn the Hub actor task and return a handle for connection tasks.
    pub fn spawn(config: Arc<Config>, db: Database, mailbox_capacity: usize) -> HubHandle {
        let (tx, rx) = mpsc::channel(mailbox_capacity);
        let hub = Hub { directory: Directory::new(), config, db };
        tokio::spawn(hub.run(rx));
        HubHandle { tx }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<HubCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd).await;
        }
    }

    async fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register { user, reply_tx } => {
                let ok = self.directory.add(*user);
                let _ = reply_tx.send(ok);
            }
            HubCommand::PromoteToInList { nick, reply_tx } => {
                self.directory.mark_in_list(&nick);
                let batch = InListBatch {
                    ok: true,
                    nicklist: self.directory.nicklist().to_string(),
                    infolist: self.directory.infolist().to_string(),
                    iplist: self.directory.iplist().to_string(),
                };
                let _ = reply_tx.send(batch);
            }
            HubCommand::UpdateMyInfo { nick, myinfo, fake_myinfo, share, reply_tx } => {
                if let Some(user) = self.directory.get_mut(&nick) {
                    user.myinfo = myinfo;
                    user.fake_myinfo = fake_myinfo;
                    user.share = share;
                }
                self.directory.on_myinfo_changed(&nick);
                let _ = reply_tx.send(());
            }
            HubCommand::Remove { nick, reply_tx } => {
                self.directory.remove(&nick);
                let _ = reply_tx.send(());
            }
            HubCommand::Lookup { nick, reply_tx } => {
                let snapshot = self.directory.get(&nick).map(|u| UserSnapshot {
                    nick: u.nick.clone(),
                    class: u.class.0,
                    share: u.share,
                    in_list: u.in_list,
                    fake_myinfo: u.fake_myinfo.clone(),
                    ip: u.ip,
                    supports: u.supports,
                });
                let _ = reply_tx.send(snapshot);
            }
            HubCommand::Broadcast { frame, min_class, max_class, exclude } => {
                for user in self
                    .directory
                    .sendable_in_class_range(super::user::Class(min_class), super::user::Class(max_class))
                {
                    if exclude.as_deref() == Some(user.nick.as_str()) {
                        continue;
                    }
                    if let Some(outbox) = &user.outbox {
                        let _ = outbox.try_send(frame.clone());
                    }
                }
                crate::metrics::record_fanout(self.directory.len());
            }
            HubCommand::SendTo { nick, frame, reply_tx } => {
                let ok = match self.directory.get(&nick) {
                    Some(user) => match &user.outbox {
                        Some(outbox) => outbox.try_send(frame).is_ok(),
                        None => false,
                    },
                    None => false,
                };
                let _ = reply_tx.send(ok);
            }
            HubCommand::Stats { reply_tx } => {
                let stats = HubStats { online: self.directory.len(), total_share: self.directory.total_share() };
                let _ = reply_tx.send(stats);
            }
            HubCommand::GetLists { reply_tx } => {
                let batch = InListBatch {
                    ok: true,
                    nicklist: self.directory.nicklist().to_string(),
                    infolist: self.directory.infolist().to_string(),
                    iplist: self.directory.iplist().to_string(),
                };
                let _ = reply_tx.send(batch);
            }
            HubCommand::SetRights { nick, rights, reply_tx } => {
                let ok = match self.directory.get_mut(&nick) {
                    Some(user) => {
                        user.rights = *rights;
                        if let Some(live_tx) = &user.live_tx {
                            let _ = live_tx.send(super::user::LiveUpdate::Rights(user.rights));
                        }
                        true
                    }
                    None => false,
                };
                let _ = reply_tx.send(ok);
            }
            HubCommand::SetClass { nick, class, reply_tx } => {
                let ok = match self.directory.get_mut(&nick) {
                    Some(user) => {
                        user.class = super::user::Class(class);
                        if let Some(live_tx) = &user.live_tx {
                            let _ = live_tx.send(super::user::LiveUpdate::Class(user.class));
                        }
                        true
                    }
                    None => false,
                };
                if ok {
                    self.directory.on_myinfo_changed(&nick);
                }
                let _ = reply_tx.send(ok);
            }
            HubCommand::Disconnect { nick, frame, reason, reply_tx } => {
                let ok = match self.directory.get(&nick) {
                    Some(user) => {
                        if let Some(frame) = frame {
                            if let Some(outbox) = &user.outbox {
                                let _ = outbox.try_send(frame);
                            }
                        }
                        match &user.close_tx {
                            Some(close_tx) => close_tx.send(reason).is_ok(),
                            None => false,
                        }
                    }
                    None => false,
                };
                let _ = reply_tx.send(ok);
            }
            HubCommand::SearchFanout { frame, exclude, want_tths, lan_only } => {
                let tths_bit = super::user::SupportsBitmask::TTHS;
                for user in self.directory.sendable_matching(|u| {
                    if u.nick.eq_ignore_ascii_case(&exclude) {
                        return false;
                    }
                    if lan_only && !u.is_lan {
                        return false;
                    }
                    match want_tths {
                        Some(want) => u.supports.has(tths_bit) == want,
                        None => true,
                    }
                }) {
                    if let Some(outbox) = &user.outbox {
                        let _ = outbox.try_send(frame.clone());
                    }
                }
            }
            HubCommand::UpdateSupports { nick, supports } => {
                if let Some(user) = self.directory.get_mut(&nick) {
                    user.supports = supports;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::user::{Class, Mode, Rights, SupportsBitmask, UserKind};
    use std::net::IpAddr;

    fn test_user(nick: &str) -> User {
        User {
            nick: nick.to_string(),
            kind: UserKind::Human,
            class: Class::NORMAL,
            myinfo: String::new(),
            fake_myinfo: String::new(),
            share: 0,
            mode: Mode::Active,
            is_lan: false,
            rights: Rights::default(),
            supports: SupportsBitmask::default(),
            in_list: false,
            ip: "127.0.0.1".parse::<IpAddr>().unwrap(),
            outbox: None,
            close_tx: None,
            live_tx: None,
        }
    }

    #[tokio::test]
    async fn register_then_lookup_round_trips() {
        let config = Arc::new(Config::default_for_test());
        let db = Database::in_memory_for_test().await;
        let handle = Hub::spawn(config, db, 16);

        assert!(handle.register(test_user("alice")).await);
        let snap = handle.lookup("ALICE").await.expect("case-insensitive lookup");
        assert_eq!(snap.nick, "alice");
    }

    #[tokio::test]
    async fn duplicate_register_is_rejected() {
        let config = Arc::new(Config::default_for_test());
        let db = Database::in_memory_for_test().await;
        let handle = Hub::spawn(config, db, 16);

        assert!(handle.register(test_user("alice")).await);
        assert!(!handle.register(test_user("alice")).await);
    }

    #[tokio::test]
    async fn promote_to_in_list_returns_nonempty_nicklist() {
        let config = Arc::new(Config::default_for_test());
        let db = Database::in_memory_for_test().await;
        let handle = Hub::spawn(config, db, 16);

        handle.register(test_user("alice")).await;
        let batch = handle.promote_to_in_list("alice").await;
        assert!(batch.nicklist.contains("alice"));
    }
}
