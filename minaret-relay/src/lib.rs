//! Relay loop for minaret
//!
//! Consumes inbound messages from the bus, drives the session registry
//! and the chat model, and publishes replies back to the bus.

pub mod answer;
pub mod relay_loop;

pub use answer::{AnswerService, FALLBACK_REPLY};
pub use relay_loop::{RelayLoop, RESET_REPLY};
