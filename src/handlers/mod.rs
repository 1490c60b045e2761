//! Per-connection protocol handlers (spec §4.3, §4.4, §6.4).

pub mod context;
pub mod login;
pub mod messaging;
pub mod misc;
pub mod peering;
pub mod search;
