//! In-memory hub state: users, the directory, connection lifecycle, and
//! the actor that owns all of it exclusively (spec §3, §4.2, §4.3, §5).

mod connection_state;
mod directory;
mod hub;
mod user;

pub use connection_state::{ConnState, StateClock};
pub use directory::Directory;
pub use hub::{Hub, HubCommand, HubHandle, HubStats, InListBatch, UserSnapshot};
pub use user::{Class, LiveUpdate, Mode, Right, RightDeadline, Rights, SupportsBitmask, User, UserKind};
