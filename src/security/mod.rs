//! Access control: durable bans (via [`crate::db::bans`]), in-memory
//! short bans, flood/clone guards, and tag validation (spec §4.5–§4.7).

pub mod clone_guard;
pub mod flood;
pub mod short_bans;
pub mod tag_validation;

pub use clone_guard::CloneGuard;
pub use flood::{FloodKind, HubFloodState, UserFloodState};
pub use short_bans::{ShortBanStore, ShortBanSubKind};
pub use tag_validation::{validate_tag, TagValidationError};
