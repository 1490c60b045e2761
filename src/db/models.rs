//! Row models for the persistent tables of spec §6.3.

/// One of the ten ban matcher kinds sharing the `banlist` table via
/// sentinel values in the `ip`/`nick` columns (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanKind {
    Nick,
    Ip,
    NickIp,
    Range,
    Host1,
    Host2,
    Host3,
    HostR1,
    Share,
    Prefix,
}

impl BanKind {
    pub fn as_i64(self) -> i64 {
        match self {
            BanKind::Nick => 0,
            BanKind::Ip => 1,
            BanKind::NickIp => 2,
            BanKind::Range => 3,
            BanKind::Host1 => 4,
            BanKind::Host2 => 5,
            BanKind::Host3 => 6,
            BanKind::HostR1 => 7,
            BanKind::Share => 8,
            BanKind::Prefix => 9,
        }
    }

    pub fn from_i64(v: i64) -> Option<BanKind> {
        Some(match v {
            0 => BanKind::Nick,
            1 => BanKind::Ip,
            2 => BanKind::NickIp,
            3 => BanKind::Range,
            4 => BanKind::Host1,
            5 => BanKind::Host2,
            6 => BanKind::Host3,
            7 => BanKind::HostR1,
            8 => BanKind::Share,
            9 => BanKind::Prefix,
            _ => return None,
        })
    }
}

/// A `banlist` row (spec §6.3).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BanRow {
    pub ip: String,
    pub nick: String,
    pub ban_type: i64,
    pub host: Option<String>,
    pub range_fr: Option<i64>,
    pub range_to: Option<i64>,
    pub date_start: i64,
    pub date_limit: i64,
    pub last_hit: i64,
    pub nick_op: String,
    pub reason: Option<String>,
    pub note_op: Option<String>,
    pub note_usr: Option<String>,
    pub share_size: Option<String>,
}

impl BanRow {
    pub fn kind(&self) -> Option<BanKind> {
        BanKind::from_i64(self.ban_type)
    }

    /// `date_limit == 0` means permanent (spec §3 Ban record).
    pub fn is_permanent(&self) -> bool {
        self.date_limit == 0
    }

    pub fn is_expired(&self, now: i64) -> bool {
        !self.is_permanent() && self.date_limit <= now
    }
}

/// A `temp_rights` row (spec §3 Penalty record).
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct PenaltyRow {
    pub nick: String,
    pub op: Option<String>,
    pub since: i64,
    pub st_chat: i64,
    pub st_search: i64,
    pub st_ctm: i64,
    pub st_pm: i64,
    pub st_kick: i64,
    pub st_share0: i64,
    pub st_reg: i64,
    pub st_opchat: i64,
}

/// A registration-table row (spec §3 Registration record, §6.3).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegistrationRow {
    pub nick: String,
    pub pwd: Option<String>,
    pub pwd_type: i64,
    pub class: i64,
    pub enabled: i64,
    pub flags: i64,
    pub notes_op: Option<String>,
    pub notes_usr: Option<String>,
    pub regged_on: i64,
    pub last_login: i64,
    pub last_error: i64,
    pub last_logout: i64,
    pub login_count: i64,
    pub error_count: i64,
    pub auth_ip: Option<String>,
    pub alt_ip: Option<String>,
    pub fake_ip: Option<String>,
}

/// Password hashing discriminant stored as `pwd_type` (spec §3 "crypt-method tag").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    None,
    UnixCrypt,
    HexMd5,
}

impl CryptMethod {
    pub fn from_i64(v: i64) -> CryptMethod {
        match v {
            1 => CryptMethod::UnixCrypt,
            2 => CryptMethod::HexMd5,
            _ => CryptMethod::None,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            CryptMethod::None => 0,
            CryptMethod::UnixCrypt => 1,
            CryptMethod::HexMd5 => 2,
        }
    }
}

/// Distinct registration flag bits (spec §9B: hide-keys/show-keys are
/// distinct bits, not a single boolean).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegFlags(pub i64);

impl RegFlags {
    pub const HIDE_KICK: i64 = 1 << 0;
    pub const HIDE_KEYS: i64 = 1 << 1;
    pub const SHOW_KEYS: i64 = 1 << 2;
    pub const HIDE_SHARE: i64 = 1 << 3;
    pub const HIDE_CHAT: i64 = 1 << 4;
    pub const HIDE_CTM_MSG: i64 = 1 << 5;
    pub const PASSWORD_CHANGE_REQUIRED: i64 = 1 << 6;
    pub const ENABLED: i64 = 1 << 7;

    pub fn has(self, bit: i64) -> bool {
        self.0 & bit != 0
    }
}

/// A `kicklist` row (spec §3 Kick record, §6.3).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KickRow {
    pub nick: String,
    pub time: i64,
    pub ip: String,
    pub host: Option<String>,
    pub share_size: Option<String>,
    pub reason: Option<String>,
    pub op: String,
    pub is_drop: i64,
}

/// A `conn_types` row (spec §3 Connection-type record).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConnTypeRow {
    pub identifier: String,
    pub description: String,
    pub tag_min_slots: i64,
    pub tag_max_slots: i64,
    pub tag_min_limit: f64,
    pub tag_min_ls_ratio: f64,
}

/// A `client_list` row (spec §3 Client record).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClientRow {
    pub name: String,
    pub tag_id: String,
    pub min_version: f64,
    pub max_version: f64,
    pub min_ver_use: f64,
    pub ban: i64,
    pub enable: i64,
}

/// A `custom_redirects` row (spec §6.3).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RedirectRow {
    pub address: String,
    pub flag: i64,
    pub start: i64,
    pub stop: i64,
    pub country: Option<String>,
    pub secure: i64,
    pub share: i64,
    pub enable: i64,
}
