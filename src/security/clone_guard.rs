//! Clone detection by `MyINFO` description fragment (spec §4.6).

use dashmap::DashMap;

/// Maps a description fragment to the nick currently holding it, so a
/// second login with a matching fragment can be rejected in O(1).
#[derive(Default)]
pub struct CloneGuard {
    fragments: DashMap<String, String>,
    fragment_len: usize,
}

impl CloneGuard {
    pub fn new(fragment_len: usize) -> Self {
        CloneGuard { fragments: DashMap::new(), fragment_len }
    }

    fn fragment_of(&self, description: &str) -> Option<&str> {
        if description.len() < self.fragment_len || self.fragment_len == 0 {
            None
        } else {
            description.get(..self.fragment_len)
        }
    }

    /// Register `nick`'s description fragment. Returns the nick already
    /// holding a matching fragment, if any (the clone to reject).
    pub fn check_and_register(&self, nick: &str, description: &str) -> Option<String> {
        let fragment = self.fragment_of(description)?.to_string();
        if let Some(existing) = self.fragments.get(&fragment) {
            if existing.value() != nick {
                return Some(existing.value().clone());
            }
        }
        self.fragments.insert(fragment, nick.to_string());
        None
    }

    pub fn release(&self, nick: &str, description: &str) {
        if let Some(fragment) = self.fragment_of(description) {
            self.fragments.remove_if(fragment, |_, held| held == nick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_matching_fragment_is_reported_as_clone() {
        let guard = CloneGuard::new(6);
        assert!(guard.check_and_register("alice", "MyDesc stuff").is_none());
        let clone_of = guard.check_and_register("eve", "MyDesc other stuff");
        assert_eq!(clone_of.as_deref(), Some("alice"));
    }

    #[test]
    fn short_descriptions_below_fragment_len_are_not_checked() {
        let guard = CloneGuard::new(32);
        assert!(guard.check_and_register("alice", "hi").is_none());
        assert!(guard.check_and_register("eve", "hi").is_none());
    }
}
