//! The user directory (spec §4.3): a nick-hash table with lazily
//! regenerated text caches and parallel secondary collections.

use super::user::{Class, User, UserKind};
use std::collections::{HashMap, HashSet};

/// Which derived text cache is stale.
#[derive(Debug, Clone, Copy, Default)]
struct DirtyFlags {
    nicklist: bool,
    infolist: bool,
    iplist: bool,
}

impl DirtyFlags {
    fn mark_all(&mut self) {
        self.nicklist = true;
        self.infolist = true;
        self.iplist = true;
    }
}

/// Nick-keyed user table plus the three derived broadcast caches and the
/// secondary membership collections from spec §3/§4.3.
pub struct Directory {
    users: HashMap<String, User>,
    dirty: DirtyFlags,
    nicklist_cache: String,
    infolist_cache: String,
    iplist_cache: String,

    pub op_list: HashSet<String>,
    pub bot_list: HashSet<String>,
    pub active_list: HashSet<String>,
    pub passive_list: HashSet<String>,
    pub mainchat_subscribers: HashSet<String>,
    pub opchat_subscribers: HashSet<String>,
}

fn key(nick: &str) -> String {
    nick.to_lowercase()
}

impl Directory {
    pub fn new() -> Self {
        Directory {
            users: HashMap::new(),
            dirty: DirtyFlags::default(),
            nicklist_cache: String::new(),
            infolist_cache: String::new(),
            iplist_cache: String::new(),
            op_list: HashSet::new(),
            bot_list: HashSet::new(),
            active_list: HashSet::new(),
            passive_list: HashSet::new(),
            mainchat_subscribers: HashSet::new(),
            opchat_subscribers: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Returns `false` if the nick is already present.
    pub fn add(&mut self, user: User) -> bool {
        let k = key(&user.nick);
        if self.users.contains_key(&k) {
            return false;
        }
        if user.kind != UserKind::Human {
            self.bot_list.insert(k.clone());
        }
        self.users.insert(k, user);
        self.dirty.mark_all();
        true
    }

    /// Returns `false` if the nick was not present.
    pub fn remove(&mut self, nick: &str) -> bool {
        let k = key(nick);
        let Some(_user) = self.users.remove(&k) else {
            return false;
        };
        self.op_list.remove(&k);
        self.bot_list.remove(&k);
        self.active_list.remove(&k);
        self.passive_list.remove(&k);
        self.mainchat_subscribers.remove(&k);
        self.opchat_subscribers.remove(&k);
        self.dirty.mark_all();
        true
    }

    pub fn get(&self, nick: &str) -> Option<&User> {
        self.users.get(&key(nick))
    }

    pub fn get_mut(&mut self, nick: &str) -> Option<&mut User> {
        self.users.get_mut(&key(nick))
    }

    pub fn contains(&self, nick: &str) -> bool {
        self.users.contains_key(&key(nick))
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Marks a user `InList`, updates op/active/passive membership, and
    /// invalidates the derived caches. Called once MyINFO is accepted.
    pub fn mark_in_list(&mut self, nick: &str) {
        let k = key(nick);
        let (is_passive, in_operator_rank) = match self.users.get_mut(&k) {
            Some(user) => {
                user.in_list = true;
                (user.mode == super::user::Mode::Passive, user.class.is_operator())
            }
            None => return,
        };
        if in_operator_rank {
            self.op_list.insert(k.clone());
        }
        if is_passive {
            self.passive_list.insert(k.clone());
        } else {
            self.active_list.insert(k.clone());
        }
        self.mainchat_subscribers.insert(k);
        self.dirty.mark_all();
    }

    /// Call after mutating a user's MyINFO/class/mode in place to
    /// invalidate the derived caches and refresh op/active/passive
    /// membership without touching InList state.
    pub fn on_myinfo_changed(&mut self, nick: &str) {
        let k = key(nick);
        if let Some(user) = self.users.get(&k) {
            if user.class.is_operator() {
                self.op_list.insert(k.clone());
            } else {
                self.op_list.remove(&k);
            }
            match user.mode {
                super::user::Mode::Passive => {
                    self.passive_list.insert(k.clone());
                    self.active_list.remove(&k);
                }
                _ => {
                    self.active_list.insert(k.clone());
                    self.passive_list.remove(&k);
                }
            }
        }
        self.dirty.mark_all();
    }

    /// `$NickList <nick>$$<nick>$$…|`, rebuilt on demand.
    pub fn nicklist(&mut self) -> &str {
        if self.dirty.nicklist {
            self.nicklist_cache.clear();
            self.nicklist_cache.push_str("$NickList ");
            for user in self.users.values().filter(|u| u.in_list) {
                self.nicklist_cache.push_str(&user.nick);
                self.nicklist_cache.push_str("$$");
            }
            self.nicklist_cache.push('|');
            self.dirty.nicklist = false;
        }
        &self.nicklist_cache
    }

    /// Concatenated `$MyINFO` frames for every `InList` user.
    pub fn infolist(&mut self) -> &str {
        if self.dirty.infolist {
            self.infolist_cache.clear();
            for user in self.users.values().filter(|u| u.in_list) {
                self.infolist_cache.push_str(&user.fake_myinfo);
                self.infolist_cache.push('|');
            }
            self.dirty.infolist = false;
        }
        &self.infolist_cache
    }

    /// `$UserIP <nick> <ip>$$…|`, rebuilt on demand.
    pub fn iplist(&mut self) -> &str {
        if self.dirty.iplist {
            self.iplist_cache.clear();
            self.iplist_cache.push_str("$UserIP ");
            for user in self.users.values().filter(|u| u.in_list) {
                self.iplist_cache.push_str(&user.nick);
                self.iplist_cache.push(' ');
                self.iplist_cache.push_str(&user.ip.to_string());
                self.iplist_cache.push_str("$$");
            }
            self.iplist_cache.push('|');
            self.dirty.iplist = false;
        }
        &self.iplist_cache
    }

    /// Total declared share across `InList` users (spec §8 invariant).
    pub fn total_share(&self) -> u64 {
        self.users.values().filter(|u| u.in_list).map(|u| u.share).sum()
    }

    /// Recipients matching a class range and sendability, used by the
    /// broadcast engine's `SendToAll` family.
    pub fn sendable_in_class_range(&self, min: Class, max: Class) -> impl Iterator<Item = &User> {
        self.users
            .values()
            .filter(move |u| u.is_sendable_human() && u.class >= min && u.class <= max)
    }

    /// Sendable recipients matching an arbitrary predicate, used by the
    /// search fan-out split (TTHS-advertising vs. not, lan-restricted)
    /// where a class range alone can't express the filter (spec §4.4).
    pub fn sendable_matching<'a>(
        &'a self,
        mut pred: impl FnMut(&User) -> bool + 'a,
    ) -> impl Iterator<Item = &'a User> + 'a {
        self.users.values().filter(move |u| u.is_sendable_human() && pred(u))
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::user::{Mode, Rights, SupportsBitmask};
    use std::net::IpAddr;

    fn make_user(nick: &str, class: Class, in_list: bool) -> User {
        User {
            nick: nick.to_string(),
            kind: UserKind::Human,
            class,
            myinfo: String::new(),
            fake_myinfo: String::new(),
            share: 1024,
            mode: Mode::Active,
            is_lan: false,
            rights: Rights::default(),
            supports: SupportsBitmask::default(),
            in_list,
            ip: "127.0.0.1".parse::<IpAddr>().unwrap(),
            outbox: None,
            close_tx: None,
            live_tx: None,
        }
    }

    #[test]
    fn add_rejects_duplicate_nick() {
        let mut dir = Directory::new();
        assert!(dir.add(make_user("alice", Class::NORMAL, false)));
        assert!(!dir.add(make_user("Alice", Class::NORMAL, false)));
    }

    #[test]
    fn remove_invalidates_all_secondary_collections() {
        let mut dir = Directory::new();
        dir.add(make_user("alice", Class::OP, false));
        dir.mark_in_list("alice");
        assert!(dir.op_list.contains("alice"));
        dir.remove("alice");
        assert!(!dir.op_list.contains("alice"));
        assert!(dir.get("alice").is_none());
    }

    #[test]
    fn mark_in_list_populates_op_list_only_for_operators() {
        let mut dir = Directory::new();
        dir.add(make_user("bob", Class::NORMAL, false));
        dir.mark_in_list("bob");
        assert!(!dir.op_list.contains("bob"));
        assert!(dir.active_list.contains("bob"));
    }

    #[test]
    fn total_share_sums_only_inlist_users() {
        let mut dir = Directory::new();
        dir.add(make_user("alice", Class::NORMAL, true));
        dir.add(make_user("bob", Class::NORMAL, false));
        assert_eq!(dir.total_share(), 1024);
    }

    #[test]
    fn nicklist_cache_rebuilds_after_dirtying() {
        let mut dir = Directory::new();
        dir.add(make_user("alice", Class::NORMAL, true));
        let first = dir.nicklist().to_string();
        assert!(first.contains("alice"));
        dir.add(make_user("bob", Class::NORMAL, true));
        assert!(dir.nicklist().contains("bob"));
    }
}
