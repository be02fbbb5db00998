//! Event types for the message bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key marking an inbound message as a bot command
pub const COMMAND_KEY: &str = "command";

/// Message received from a chat channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel identifier (e.g., "telegram")
    pub channel: String,
    /// User identifier, stable per sender
    pub sender_id: String,
    /// Chat identifier replies should go to
    pub chat_id: String,
    /// Message text content
    pub content: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
    /// Channel-specific metadata
    pub metadata: HashMap<String, serde_json::Value>,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the message
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Mark this message as a bot command (e.g. "reset")
    pub fn with_command(self, name: impl Into<String>) -> Self {
        self.with_metadata(COMMAND_KEY, name.into())
    }

    /// The command name, if this message carries one
    pub fn command(&self) -> Option<&str> {
        self.metadata.get(COMMAND_KEY).and_then(|v| v.as_str())
    }
}

/// Message to send to a chat channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Channel identifier
    pub channel: String,
    /// Target chat identifier
    pub chat_id: String,
    /// Message text content
    pub content: String,
    /// Channel-specific metadata
    pub metadata: HashMap<String, serde_json::Value>,
}

impl OutboundMessage {
    /// Create a new outbound message
    pub fn new(
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Reply to an inbound message on its own channel and chat
    pub fn reply_to(inbound: &InboundMessage, content: impl Into<String>) -> Self {
        Self::new(inbound.channel.clone(), inbound.chat_id.clone(), content)
    }

    /// Add metadata to the message
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_metadata_round_trip() {
        let msg = InboundMessage::new("telegram", "42", "42", "").with_command("reset");
        assert_eq!(msg.command(), Some("reset"));

        let plain = InboundMessage::new("telegram", "42", "42", "hello");
        assert_eq!(plain.command(), None);
    }

    #[test]
    fn test_reply_to_targets_origin_chat() {
        let inbound = InboundMessage::new("telegram", "42|user", "9000", "question");
        let reply = OutboundMessage::reply_to(&inbound, "answer");
        assert_eq!(reply.channel, "telegram");
        assert_eq!(reply.chat_id, "9000");
        assert_eq!(reply.content, "answer");
    }
}
