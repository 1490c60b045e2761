//! The per-connection state machine (spec §4.2).

use std::time::{Duration, Instant};

/// Progression from TCP-accepted to in-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Accepted,
    LockSent,
    NickValidated,
    PasswordPending,
    RegKnown,
    MyInfoPending,
    InList,
    Closing,
}

impl ConnState {
    /// The configured timeout floor for the *next* transition out of this
    /// state, or `None` if this state has no independent deadline
    /// (`RegKnown` folds into the `MyInfoPending` floor; `InList` and
    /// `Closing` have none).
    pub fn timeout_floor(self, limits: &crate::config::LimitsConfig) -> Option<Duration> {
        match self {
            ConnState::Accepted => Some(Duration::from_secs(limits.accepted_timeout_secs)),
            ConnState::LockSent => Some(Duration::from_secs(limits.locksent_timeout_secs)),
            ConnState::NickValidated | ConnState::PasswordPending | ConnState::RegKnown => {
                Some(Duration::from_secs(limits.nickvalidated_timeout_secs))
            }
            ConnState::MyInfoPending => Some(Duration::from_secs(limits.myinfo_timeout_secs)),
            ConnState::InList | ConnState::Closing => None,
        }
    }
}

/// Tracks the deadline for the connection's current state, re-armed on
/// every transition.
pub struct StateClock {
    state: ConnState,
    entered_at: Instant,
}

impl StateClock {
    pub fn new() -> Self {
        StateClock {
            state: ConnState::Accepted,
            entered_at: Instant::now(),
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn transition(&mut self, next: ConnState) {
        self.state = next;
        self.entered_at = Instant::now();
    }

    /// Whether the current state's timeout floor has elapsed.
    pub fn is_expired(&self, limits: &crate::config::LimitsConfig) -> bool {
        match self.state.timeout_floor(limits) {
            Some(floor) => self.entered_at.elapsed() >= floor,
            None => false,
        }
    }
}

impl Default for StateClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_limits() -> crate::config::LimitsConfig {
        crate::config::Config::default_for_test().limits
    }

    #[test]
    fn accepted_state_has_a_timeout_floor() {
        let limits = test_limits();
        assert!(ConnState::Accepted.timeout_floor(&limits).is_some());
    }

    #[test]
    fn inlist_state_never_expires() {
        let limits = test_limits();
        assert!(ConnState::InList.timeout_floor(&limits).is_none());
    }

    #[test]
    fn fresh_clock_is_not_expired() {
        let clock = StateClock::new();
        assert!(!clock.is_expired(&test_limits()));
    }

    #[test]
    fn transition_rearms_the_clock() {
        let mut clock = StateClock::new();
        clock.transition(ConnState::LockSent);
        assert_eq!(clock.state(), ConnState::LockSent);
        assert!(!clock.is_expired(&test_limits()));
    }
}
