//! Base trait for channel handlers

use async_trait::async_trait;
use minaret_core::bus::{InboundMessage, OutboundMessage};
use tokio::sync::mpsc;

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel error: {0}")]
    Error(String),

    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Channel not running: {0}")]
    NotRunning(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Send error: {0}")]
    SendError(String),

    #[error("Access denied for sender: {0}")]
    AccessDenied(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// Trait for channel handlers
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Check if the channel is running
    fn is_running(&self) -> bool;

    /// Start the channel handler
    async fn start(&mut self) -> Result<()>;

    /// Stop the channel handler
    async fn stop(&mut self) -> Result<()>;

    /// Send a message
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Set the inbound message sender
    fn set_inbound_sender(&mut self, tx: mpsc::Sender<InboundMessage>);

    /// Check if a sender is allowed
    fn is_allowed(&self, sender_id: &str) -> bool;
}

/// Check a sender against an allow list. Empty list allows everyone.
///
/// Compound sender ids of the form "12345|username" match if either
/// part appears in the list.
pub fn sender_allowed(allow_from: &[String], sender_id: &str) -> bool {
    if allow_from.is_empty() {
        return true;
    }

    if allow_from.iter().any(|a| a == sender_id) {
        return true;
    }

    sender_id.contains('|')
        && sender_id
            .split('|')
            .any(|part| !part.is_empty() && allow_from.iter().any(|a| a == part))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sender_allowed_empty_list_allows_everyone() {
        assert!(sender_allowed(&[], "anyone"));
        assert!(sender_allowed(&[], "12345"));
    }

    #[test]
    fn test_sender_allowed_with_list() {
        let allow = list(&["user1", "12345"]);
        assert!(sender_allowed(&allow, "user1"));
        assert!(sender_allowed(&allow, "12345"));
        assert!(!sender_allowed(&allow, "user2"));
    }

    #[test]
    fn test_sender_allowed_compound_id() {
        let allow = list(&["user1", "12345"]);
        assert!(sender_allowed(&allow, "12345|someone"));
        assert!(sender_allowed(&allow, "99999|user1"));
        assert!(!sender_allowed(&allow, "99999|unknown"));
    }

    #[test]
    fn test_channel_error_display() {
        let err = ChannelError::NotConfigured("telegram".to_string());
        assert_eq!(err.to_string(), "Channel not configured: telegram");

        let err = ChannelError::AccessDenied("user1".to_string());
        assert_eq!(err.to_string(), "Access denied for sender: user1");
    }
}
