//! Answer service: one model call, one displayable string

use minaret_core::session::{ChatTurn, SessionHandle};
use minaret_providers::{ChatModel, ProviderError, ProviderResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Shown to the user whenever the model cannot be reached
pub const FALLBACK_REPLY: &str =
    "Sorry, I cannot process your question right now. Please try again in a moment.";

/// Turns a (session, user text) pair into a reply string.
///
/// All provider failure handling lives here: timeouts, bounded retry
/// for transient failures, and translation of anything unrecoverable
/// into the fixed fallback string. Callers never see a raw error.
pub struct AnswerService {
    model: Arc<dyn ChatModel>,
    timeout: Duration,
    max_retries: u32,
}

impl AnswerService {
    /// Create a new answer service
    pub fn new(model: Arc<dyn ChatModel>, timeout: Duration, max_retries: u32) -> Self {
        Self {
            model,
            timeout,
            max_retries,
        }
    }

    /// Send `text` as the next turn of `session` and return the reply.
    ///
    /// The session lock is held for the duration of the call, so
    /// requests from the same user are answered one at a time. Both
    /// turns are committed to the history only after a successful
    /// generate; a failed call leaves the session untouched and yields
    /// the fallback string.
    pub async fn ask(&self, session: &SessionHandle, text: &str) -> String {
        let mut session = session.lock().await;

        let mut turns: Vec<ChatTurn> = session.history().to_vec();
        turns.push(ChatTurn::user(text));

        match self.generate_with_retry(&turns).await {
            Ok(reply) => {
                session.add_turn(ChatTurn::user(text));
                session.add_turn(ChatTurn::model(reply.clone()));
                reply
            }
            Err(err) => {
                error!(
                    "Failed to get model reply for user {}: {}",
                    session.user_id, err
                );
                FALLBACK_REPLY.to_string()
            }
        }
    }

    async fn generate_with_retry(&self, turns: &[ChatTurn]) -> ProviderResult<String> {
        let mut attempt: u32 = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, self.model.generate(turns)).await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
            };

            match result {
                Ok(reply) => return Ok(reply),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                    warn!(
                        "Transient provider failure (attempt {}/{}): {}; retrying in {:?}",
                        attempt, self.max_retries, err, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
