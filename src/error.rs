//! Unified error handling for verlihub-rs.
//!
//! Errors fall into four classes, matching the four propagation policies
//! handlers and the directory actor are built around: per-frame protocol
//! errors, per-user policy errors, storage errors, and fatal errors. Each
//! class gets a `thiserror` enum, an `error_code()` for metrics labels,
//! and (where the class is user-visible) a conversion to its wire-level
//! consequence: a [`CloseReason`] or a hub-security-bot PM string.

use crate::config::CloseReason;
use thiserror::Error;

// ============================================================================
// Protocol errors (per-frame, §7 class 1)
// ============================================================================

/// Malformed or out-of-sequence frames. Always closes the connection;
/// never short-bans on its own.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame exceeded maximum length")]
    FrameTooLong,

    #[error("could not parse frame: {0}")]
    Malformed(String),

    #[error("missing required field for {0}")]
    MissingField(&'static str),

    #[error("command not valid in current connection state")]
    WrongState,

    #[error("invalid $Key: lock/key mismatch")]
    BadKey,

    #[error("nickname fails length or charset rules")]
    BadNick,
}

impl ProtocolError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FrameTooLong => "frame_too_long",
            Self::Malformed(_) => "malformed_frame",
            Self::MissingField(_) => "missing_field",
            Self::WrongState => "wrong_state",
            Self::BadKey => "bad_key",
            Self::BadNick => "bad_nick",
        }
    }

    pub fn to_close_reason(&self) -> CloseReason {
        match self {
            Self::FrameTooLong => CloseReason::Syntax,
            Self::Malformed(_) => CloseReason::Syntax,
            Self::MissingField(_) => CloseReason::Syntax,
            Self::WrongState => CloseReason::Syntax,
            Self::BadKey => CloseReason::InvalidKey,
            Self::BadNick => CloseReason::BadNick,
        }
    }
}

// ============================================================================
// Policy errors (per-user, §7 class 2)
// ============================================================================

/// Bans, floods, bad credentials, bad tags: violations of hub policy by an
/// otherwise well-formed client. User-visible via a hub-security PM before
/// the connection closes.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    #[error("nick or IP matches an active ban: {0}")]
    Banned(String),

    #[error("nickname already registered and password required")]
    PasswordRequired,

    #[error("password incorrect")]
    BadPassword,

    #[error("nickname already in use")]
    NickInUse,

    #[error("tag missing from description")]
    TagMissing,

    #[error("tag failed validation: {0}")]
    TagInvalid(String),

    #[error("flood threshold exceeded for {0}")]
    Flood(&'static str),

    #[error("description fragment matches an online user (clone)")]
    Clone,

    #[error("hub is at its user limit")]
    UserLimit,

    #[error("share size below configured minimum")]
    ShareLimit,

    #[error("operator rejected the command: {0}")]
    OperatorDenied(String),
}

impl PolicyError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Banned(_) => "banned",
            Self::PasswordRequired => "password_required",
            Self::BadPassword => "bad_password",
            Self::NickInUse => "nick_in_use",
            Self::TagMissing => "tag_missing",
            Self::TagInvalid(_) => "tag_invalid",
            Self::Flood(_) => "flood",
            Self::Clone => "clone",
            Self::UserLimit => "user_limit",
            Self::ShareLimit => "share_limit",
            Self::OperatorDenied(_) => "operator_denied",
        }
    }

    pub fn to_close_reason(&self) -> CloseReason {
        match self {
            Self::Banned(_) => CloseReason::InvalidUser,
            Self::PasswordRequired | Self::BadPassword => CloseReason::Password,
            Self::NickInUse => CloseReason::BadNick,
            Self::TagMissing => CloseReason::TagNone,
            Self::TagInvalid(_) => CloseReason::TagInvalid,
            Self::Flood(_) => CloseReason::Syntax,
            Self::Clone => CloseReason::Clone,
            Self::UserLimit => CloseReason::UserLimit,
            Self::ShareLimit => CloseReason::ShareLimit,
            Self::OperatorDenied(_) => CloseReason::LoginErr,
        }
    }

    /// The text sent as a hub-security-bot PM before the connection closes.
    pub fn to_security_pm(&self) -> String {
        match self {
            Self::Banned(reason) => format!("You are banned: {reason}"),
            Self::PasswordRequired => "This nick is registered; a password is required.".into(),
            Self::BadPassword => "Incorrect password.".into(),
            Self::NickInUse => "That nickname is already in use.".into(),
            Self::TagMissing => "Your client did not advertise a tag.".into(),
            Self::TagInvalid(reason) => format!("Your client's tag failed validation: {reason}"),
            Self::Flood(kind) => format!("You have exceeded the {kind} rate limit."),
            Self::Clone => "Your client looks like a clone of an online user.".into(),
            Self::UserLimit => "This hub is full.".into(),
            Self::ShareLimit => "Your share is below this hub's minimum.".into(),
            Self::OperatorDenied(reason) => reason.clone(),
        }
    }
}

// ============================================================================
// Storage errors (§7 class 3)
// ============================================================================

/// Failures from the sqlite-backed repositories. The storage layer itself
/// retries with backoff (see `db::Database::with_retry`); this type
/// represents the outcome once retries are exhausted for a single call.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0} consecutive reconnect attempts failed")]
    Unavailable(u32),

    #[error("migration failed: {0}")]
    Migration(String),
}

impl From<crate::db::DbError> for StorageError {
    fn from(err: crate::db::DbError) -> Self {
        match err {
            crate::db::DbError::Sqlx(e) => StorageError::Database(e),
            crate::db::DbError::Migration(msg) => StorageError::Migration(msg),
        }
    }
}

impl StorageError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "database_error",
            Self::Unavailable(_) => "storage_unavailable",
            Self::Migration(_) => "migration_failed",
        }
    }

    /// Whether new logins should be redirected with `HUB_LOAD` while this
    /// condition persists.
    pub fn should_reject_logins(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// ============================================================================
// Fatal errors (§7 class 4)
// ============================================================================

/// Startup failures that leave the hub unable to run at all. Logged at
/// the highest level and cause process exit; never retried.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("failed to bind listen socket: {0}")]
    Bind(#[source] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("failed to open database: {0}")]
    Database(#[source] sqlx::Error),
}

impl FatalError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Bind(_) => "bind_failed",
            Self::Config(_) => "config_error",
            Self::Database(_) => "database_open_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_codes_are_stable() {
        assert_eq!(ProtocolError::FrameTooLong.error_code(), "frame_too_long");
        assert_eq!(ProtocolError::BadKey.to_close_reason(), CloseReason::InvalidKey);
    }

    #[test]
    fn policy_error_maps_to_close_reason_and_pm() {
        let err = PolicyError::Clone;
        assert_eq!(err.to_close_reason(), CloseReason::Clone);
        assert!(err.to_security_pm().contains("clone"));
    }

    #[test]
    fn storage_unavailable_rejects_logins() {
        assert!(StorageError::Unavailable(5).should_reject_logins());
        assert!(!StorageError::Migration("x".into()).should_reject_logins());
    }
}
