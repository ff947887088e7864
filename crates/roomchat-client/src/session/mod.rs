//! Chat session state machine.
//!
//! [`ConnectionManager`] owns the current [`Session`](state::Session): its
//! room, connection status, message log and transport. Views observe it
//! through [`SessionSnapshot`]s and [`SessionNotice`]s.

mod manager;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use manager::ConnectionManager;
pub use types::{ConnectionStatus, SessionNotice, SessionSnapshot};
