//! Per-user conversation sessions
//!
//! A session is the ordered turn history one user shares with the
//! model. The registry owns all sessions and guarantees at most one
//! live session per user.

pub mod registry;
pub mod store;

pub use registry::{SessionHandle, SessionRegistry};
pub use store::{ChatTurn, Session};
