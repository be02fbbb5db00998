//! Core types for minaret
//!
//! This crate provides the foundational types shared by the other
//! minaret components: configuration, the session registry, the
//! message bus, and logging setup.

pub mod bus;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use error::{Error, Result};
