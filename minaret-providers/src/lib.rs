//! LLM provider integration for minaret
//!
//! This crate provides the chat-model abstraction and the Gemini
//! implementation behind it.

pub mod base;
pub mod gemini;

pub use base::{ChatModel, ProviderError, ProviderResult};
pub use gemini::GeminiClient;
