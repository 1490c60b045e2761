//! TCP accept loop and per-connection frame pump (spec §3 "Connection",
//! §4.2 login sequence, §4.4 in-list dispatch).

mod connection;
mod gateway;

pub use connection::handle_connection;
pub use gateway::Gateway;
