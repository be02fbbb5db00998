//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of the human side of the conversation
pub const ROLE_USER: &str = "user";
/// Role of the model side of the conversation
pub const ROLE_MODEL: &str = "model";

/// A single turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Turn role (user, model)
    pub role: String,
    /// Turn text
    pub content: String,
    /// Turn timestamp
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    /// Create a new chat turn
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ROLE_USER, content)
    }

    /// Create a model turn
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(ROLE_MODEL, content)
    }
}

/// One user's ongoing conversation with the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable user identifier issued by the messaging platform
    pub user_id: String,
    /// Ordered turn history, starting with the persona seed exchange
    turns: Vec<ChatTurn>,
    /// Session creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session seeded with the persona exchange.
    ///
    /// The seed mirrors how the conversation is opened with the model:
    /// the persona instruction as a user turn, answered by a fixed
    /// acknowledgement turn.
    pub fn seeded(
        user_id: impl Into<String>,
        persona: impl Into<String>,
        persona_ack: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            turns: vec![ChatTurn::user(persona), ChatTurn::model(persona_ack)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn to the history
    pub fn add_turn(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }

    /// The full turn history, oldest first
    pub fn history(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Number of turns, seed exchange included
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Whether only the seed exchange has happened so far
    pub fn is_fresh(&self) -> bool {
        self.turns.len() == 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_session_starts_with_persona_exchange() {
        let session = Session::seeded("42", "persona text", "ack text");
        assert_eq!(session.user_id, "42");
        assert_eq!(session.turn_count(), 2);
        assert!(session.is_fresh());
        assert_eq!(session.history()[0].role, ROLE_USER);
        assert_eq!(session.history()[0].content, "persona text");
        assert_eq!(session.history()[1].role, ROLE_MODEL);
        assert_eq!(session.history()[1].content, "ack text");
    }

    #[test]
    fn test_add_turn_preserves_order() {
        let mut session = Session::seeded("42", "p", "a");
        session.add_turn(ChatTurn::user("What are the pillars of prayer?"));
        session.add_turn(ChatTurn::model("There are several..."));

        assert_eq!(session.turn_count(), 4);
        assert!(!session.is_fresh());
        assert_eq!(session.history()[2].role, ROLE_USER);
        assert_eq!(session.history()[3].role, ROLE_MODEL);
    }
}
