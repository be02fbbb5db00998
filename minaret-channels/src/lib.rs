//! Chat platform integration for minaret
//!
//! Currently Telegram only. A channel handler turns platform updates
//! into bus messages and bus replies back into platform messages.

pub mod base;
pub mod telegram;

pub use base::{ChannelError, ChannelHandler, Result};
pub use telegram::TelegramHandler;
