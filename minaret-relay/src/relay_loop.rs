//! Relay loop: the message processing engine

use crate::answer::AnswerService;
use minaret_core::bus::{InboundMessage, MessageBus, OutboundMessage};
use minaret_core::session::SessionRegistry;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Confirmation sent after a reset, whether or not a session existed
pub const RESET_REPLY: &str =
    "Your previous conversation has been cleared. You can now ask a new question.";

/// Appended to every answer, inviting the next question
const FOLLOW_UP: &str =
    "\n\nIs there anything more you would like to know about this, or another question?";

/// The relay loop consumes inbound messages and produces replies.
///
/// It is the only owner of the session registry's operations: the
/// channel layer never touches sessions directly, it only tags reset
/// commands on their way through the bus.
pub struct RelayLoop {
    bus: MessageBus,
    registry: Arc<SessionRegistry>,
    answerer: AnswerService,
}

impl RelayLoop {
    /// Create a new relay loop
    pub fn new(bus: MessageBus, registry: Arc<SessionRegistry>, answerer: AnswerService) -> Self {
        Self {
            bus,
            registry,
            answerer,
        }
    }

    /// Run the relay loop, processing messages from the bus
    pub async fn run(&mut self) -> minaret_core::Result<()> {
        info!("Relay loop started");

        let Some(mut inbound_rx) = self.bus.take_inbound_receiver().await else {
            error!("Inbound receiver already taken");
            return Err(minaret_core::Error::Internal(
                "Inbound receiver already taken".to_string(),
            ));
        };

        loop {
            match tokio::time::timeout(std::time::Duration::from_secs(1), inbound_rx.recv()).await
            {
                Ok(Some(msg)) => {
                    debug!("Received message from {}:{}", msg.channel, msg.sender_id);
                    if let Some(reply) = self.process_inbound_message(msg).await {
                        if let Err(e) = self.bus.publish_outbound(reply) {
                            error!("Failed to publish reply: {}", e);
                        }
                    }
                }
                Ok(None) => {
                    info!("Message bus closed, stopping relay loop");
                    break;
                }
                Err(_) => {
                    // Timeout, keep polling
                    continue;
                }
            }
        }

        info!("Relay loop stopped");
        Ok(())
    }

    /// Process a single inbound message
    pub async fn process_inbound_message(
        &mut self,
        msg: InboundMessage,
    ) -> Option<OutboundMessage> {
        if msg.command() == Some("reset") {
            // Idempotent: the confirmation reads the same either way
            let existed = self.registry.reset(&msg.sender_id).await;
            debug!(
                "Reset for user {} (session existed: {})",
                msg.sender_id, existed
            );
            return Some(OutboundMessage::reply_to(&msg, RESET_REPLY));
        }

        if msg.content.trim().is_empty() {
            return None;
        }

        info!("User {} asked: {}", msg.sender_id, preview(&msg.content));

        let session = self.registry.get_or_create(&msg.sender_id).await;
        let answer = self.answerer.ask(&session, &msg.content).await;

        info!(
            "Answered for user {}: {}",
            msg.sender_id,
            preview(&answer)
        );

        Some(OutboundMessage::reply_to(
            &msg,
            format!("{}{}", answer, FOLLOW_UP),
        ))
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > 100 {
        format!("{}...", text.chars().take(100).collect::<String>())
    } else {
        text.to_string()
    }
}
