//! Telegram channel integration

use crate::base::{sender_allowed, ChannelError, ChannelHandler, Result};
use async_trait::async_trait;
use minaret_core::bus::{InboundMessage, OutboundMessage};
use minaret_core::config::schema::TelegramConfig;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::prelude::*;
use teloxide::types::{BotCommand, ParseMode};
use teloxide::utils::command::BotCommands;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Telegram bot commands
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "minaret commands:")]
enum Command {
    /// Greet the user
    #[command(description = "Start the bot")]
    Start,
    /// Ask a question
    #[command(description = "Ask a question")]
    Ask(String),
    /// Clear conversation history
    #[command(description = "Clear conversation history")]
    Reset,
    /// Show available commands
    #[command(description = "Show this help message")]
    Help,
}

const USAGE_HINT: &str =
    "Please write your question after the command, for example:\n/ask What breaks the fast?";

/// State shared between the dispatcher endpoints and the handler
struct TelegramCtx {
    name: String,
    allow_from: Vec<String>,
    inbound_tx: Option<mpsc::Sender<InboundMessage>>,
    /// Same map as the handler's, so send() can cancel indicators
    typing_tasks: Arc<Mutex<HashMap<i64, JoinHandle<()>>>>,
}

impl TelegramCtx {
    /// Build the stable sender id for a message, enforcing the allow list
    fn sender_of(&self, msg: &Message) -> Option<(teloxide::types::User, String)> {
        let user = msg.from.clone()?;
        let sender_id = match &user.username {
            Some(username) => format!("{}|{}", user.id.0, username),
            None => user.id.0.to_string(),
        };

        if !sender_allowed(&self.allow_from, &sender_id) {
            tracing::warn!(
                "Access denied for sender {} on channel {}",
                sender_id,
                self.name
            );
            return None;
        }

        Some((user, sender_id))
    }

    /// Keep sending the typing action until the reply goes out
    async fn start_typing(&self, bot: Bot, chat_id: i64) {
        self.stop_typing(chat_id).await;

        let handle = tokio::spawn(async move {
            loop {
                let _ = bot
                    .send_chat_action(ChatId(chat_id), teloxide::types::ChatAction::Typing)
                    .await;
                tokio::time::sleep(tokio::time::Duration::from_secs(4)).await;
            }
        });

        self.typing_tasks.lock().await.insert(chat_id, handle);
    }

    async fn stop_typing(&self, chat_id: i64) {
        if let Some(handle) = self.typing_tasks.lock().await.remove(&chat_id) {
            handle.abort();
        }
    }

    /// Publish a message onto the inbound queue
    async fn publish(&self, msg: InboundMessage) {
        if let Some(tx) = &self.inbound_tx {
            if let Err(e) = tx.send(msg).await {
                tracing::error!("Failed to queue inbound message: {}", e);
            }
        }
    }

    /// Forward a question to the relay and show the typing indicator
    async fn forward_question(
        &self,
        bot: &Bot,
        msg: &Message,
        user: &teloxide::types::User,
        sender_id: String,
        text: String,
    ) {
        let chat_id = msg.chat.id.0;
        self.start_typing(bot.clone(), chat_id).await;

        let inbound = InboundMessage::new(
            self.name.clone(),
            sender_id,
            chat_id.to_string(),
            text,
        )
        .with_metadata("message_id", msg.id.0)
        .with_metadata("first_name", user.first_name.clone());

        self.publish(inbound).await;
    }

    async fn handle_command(&self, bot: Bot, msg: Message, cmd: Command) {
        let Some((user, sender_id)) = self.sender_of(&msg) else {
            return;
        };

        let result = match cmd {
            Command::Start => {
                let text = format!(
                    "Assalamu alaikum, {}!\n\nI am Minaret. Ask me about Islamic topics \
                     with /ask or just send your question as a message.\nType /help to see \
                     the available commands.",
                    user.first_name
                );
                bot.send_message(msg.chat.id, text).await.map(|_| ())
            }
            Command::Ask(question) => {
                if question.trim().is_empty() {
                    bot.send_message(msg.chat.id, USAGE_HINT).await.map(|_| ())
                } else {
                    self.forward_question(&bot, &msg, &user, sender_id, question)
                        .await;
                    Ok(())
                }
            }
            Command::Reset => {
                let inbound = InboundMessage::new(
                    self.name.clone(),
                    sender_id,
                    msg.chat.id.0.to_string(),
                    "",
                )
                .with_command("reset");
                self.publish(inbound).await;
                Ok(())
            }
            Command::Help => {
                let help_text = "<b>minaret commands</b>\n\n\
                    /start — Start the bot\n\
                    /ask — Ask a question\n\
                    /reset — Clear conversation history\n\
                    /help — Show this help message\n\n\
                    You can also just send your question as a plain message.";
                bot.send_message(msg.chat.id, help_text)
                    .parse_mode(ParseMode::Html)
                    .await
                    .map(|_| ())
            }
        };

        if let Err(e) = result {
            tracing::error!("Error handling command: {}", e);
        }
    }

    async fn handle_text(&self, bot: Bot, msg: Message) {
        let Some((user, sender_id)) = self.sender_of(&msg) else {
            return;
        };

        let Some(text) = msg.text().map(|t| t.to_string()) else {
            return;
        };

        self.forward_question(&bot, &msg, &user, sender_id, text)
            .await;
    }
}

/// Telegram channel handler
pub struct TelegramHandler {
    name: String,
    token: String,
    allow_from: Vec<String>,
    bot: Option<Bot>,
    running: bool,
    inbound_tx: Option<mpsc::Sender<InboundMessage>>,
    dispatcher_handle: Option<JoinHandle<()>>,
    /// Typing indicator tasks, shared with the dispatcher context
    typing_tasks: Arc<Mutex<HashMap<i64, JoinHandle<()>>>>,
}

impl TelegramHandler {
    /// Create a new Telegram handler from config
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            name: "telegram".to_string(),
            token: config.token.clone(),
            allow_from: config.allow_from.clone(),
            bot: None,
            running: false,
            inbound_tx: None,
            dispatcher_handle: None,
            typing_tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn stop_typing(&self, chat_id: i64) {
        if let Some(handle) = self.typing_tasks.lock().await.remove(&chat_id) {
            handle.abort();
        }
    }

    /// Convert markdown to Telegram HTML
    fn markdown_to_telegram_html(text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut result = text.to_string();

        // Protect code blocks
        let mut code_blocks: Vec<String> = Vec::new();
        let code_block_re = Regex::new(r"```[\w]*\n?([\s\S]*?)```").unwrap();
        result = code_block_re
            .replace_all(&result, |caps: &regex::Captures| {
                let idx = code_blocks.len();
                code_blocks.push(caps[1].to_string());
                format!("\x00CB{idx}\x00")
            })
            .to_string();

        // Protect inline code
        let mut inline_codes: Vec<String> = Vec::new();
        let inline_code_re = Regex::new(r"`([^`]+)`").unwrap();
        result = inline_code_re
            .replace_all(&result, |caps: &regex::Captures| {
                let idx = inline_codes.len();
                inline_codes.push(caps[1].to_string());
                format!("\x00IC{idx}\x00")
            })
            .to_string();

        // Headers and blockquotes become plain lines
        let header_re = Regex::new(r"(?m)^#{1,6}\s+(.+)$").unwrap();
        result = header_re.replace_all(&result, "$1").to_string();
        let quote_re = Regex::new(r"(?m)^>\s*(.*)$").unwrap();
        result = quote_re.replace_all(&result, "$1").to_string();

        // Escape HTML special chars
        result = result.replace('&', "&amp;");
        result = result.replace('<', "&lt;");
        result = result.replace('>', "&gt;");

        // Links [text](url) -> <a href="url">text</a>
        let link_re = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap();
        result = link_re
            .replace_all(&result, r#"<a href="$2">$1</a>"#)
            .to_string();

        // Bold **text** or __text__
        let bold_re = Regex::new(r"\*\*(.+?)\*\*").unwrap();
        result = bold_re.replace_all(&result, "<b>$1</b>").to_string();
        let bold2_re = Regex::new(r"__(.+?)__").unwrap();
        result = bold2_re.replace_all(&result, "<b>$1</b>").to_string();

        // Italic _text_ - simplified without look-around
        let italic_re = Regex::new(r"_([^_]+)_").unwrap();
        result = italic_re.replace_all(&result, "<i>$1</i>").to_string();

        // Strikethrough ~~text~~
        let strike_re = Regex::new(r"~~(.+?)~~").unwrap();
        result = strike_re.replace_all(&result, "<s>$1</s>").to_string();

        // Bullet lists
        let bullet_re = Regex::new(r"(?m)^[-*]\s+").unwrap();
        result = bullet_re.replace_all(&result, "• ").to_string();

        // Restore inline code
        for (i, code) in inline_codes.iter().enumerate() {
            let escaped = code
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;");
            result = result.replace(
                &format!("\x00IC{i}\x00"),
                &format!("<code>{escaped}</code>"),
            );
        }

        // Restore code blocks
        for (i, code) in code_blocks.iter().enumerate() {
            let escaped = code
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;");
            result = result.replace(
                &format!("\x00CB{i}\x00"),
                &format!("<pre><code>{escaped}</code></pre>"),
            );
        }

        result
    }
}

#[async_trait]
impl ChannelHandler for TelegramHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_running(&self) -> bool {
        self.running
    }

    async fn start(&mut self) -> Result<()> {
        if self.token.is_empty() {
            return Err(ChannelError::NotConfigured(
                "Telegram token not configured".to_string(),
            ));
        }

        if self.running {
            return Ok(());
        }

        tracing::info!("Starting Telegram bot (polling mode)...");

        let bot = Bot::new(&self.token);

        let commands = vec![
            BotCommand::new("start", "Start the bot"),
            BotCommand::new("ask", "Ask a question"),
            BotCommand::new("reset", "Clear conversation history"),
            BotCommand::new("help", "Show available commands"),
        ];

        if let Err(e) = bot.set_my_commands(commands).await {
            tracing::warn!("Failed to set bot commands: {}", e);
        }

        match bot.get_me().await {
            Ok(me) => {
                let username = me.username.clone().unwrap_or_else(|| "unknown".to_string());
                tracing::info!("Telegram bot @{} connected", username);
            }
            Err(e) => {
                return Err(ChannelError::ApiError(format!(
                    "Failed to get bot info: {}",
                    e
                )));
            }
        }

        self.bot = Some(bot.clone());
        self.running = true;

        let ctx = Arc::new(TelegramCtx {
            name: self.name.clone(),
            allow_from: self.allow_from.clone(),
            inbound_tx: self.inbound_tx.clone(),
            typing_tasks: self.typing_tasks.clone(),
        });

        let ctx_cmd = ctx.clone();
        let ctx_text = ctx.clone();

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let ctx = ctx_cmd.clone();
                        async move {
                            ctx.handle_command(bot, msg, cmd).await;
                            Ok::<(), teloxide::RequestError>(())
                        }
                    }),
            )
            .branch(Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                let ctx = ctx_text.clone();
                async move {
                    ctx.handle_text(bot, msg).await;
                    Ok::<(), teloxide::RequestError>(())
                }
            }));

        let dispatcher_handle = tokio::spawn(async move {
            Dispatcher::builder(bot, handler)
                .enable_ctrlc_handler()
                .build()
                .dispatch()
                .await;
        });

        self.dispatcher_handle = Some(dispatcher_handle);

        tracing::info!("Telegram bot started successfully");

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }

        tracing::info!("Stopping Telegram bot...");

        let mut tasks = self.typing_tasks.lock().await;
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
        drop(tasks);

        if let Some(handle) = self.dispatcher_handle.take() {
            handle.abort();
        }

        self.bot = None;
        self.running = false;

        tracing::info!("Telegram bot stopped");

        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let bot = self
            .bot
            .as_ref()
            .ok_or_else(|| ChannelError::NotRunning("Telegram bot not running".to_string()))?;

        let chat_id: i64 = message
            .chat_id
            .parse()
            .map_err(|_| ChannelError::Error(format!("Invalid chat_id: {}", message.chat_id)))?;

        self.stop_typing(chat_id).await;

        let html_content = Self::markdown_to_telegram_html(&message.content);

        match bot
            .send_message(ChatId(chat_id), html_content.clone())
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                // Fallback to plain text
                tracing::warn!("HTML parse failed, falling back to plain text: {}", e);
                bot.send_message(ChatId(chat_id), &message.content)
                    .await
                    .map_err(|e2| {
                        ChannelError::ApiError(format!("Failed to send message: {}", e2))
                    })?;
                Ok(())
            }
        }
    }

    fn set_inbound_sender(&mut self, tx: mpsc::Sender<InboundMessage>) {
        self.inbound_tx = Some(tx);
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        sender_allowed(&self.allow_from, sender_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_to_telegram_html_basic() {
        let input = "Hello **world**";
        let output = TelegramHandler::markdown_to_telegram_html(input);
        assert!(output.contains("<b>world</b>"));
    }

    #[test]
    fn test_markdown_to_telegram_html_italic() {
        let input = "Hello _world_";
        let output = TelegramHandler::markdown_to_telegram_html(input);
        assert!(output.contains("<i>world</i>"));
    }

    #[test]
    fn test_markdown_to_telegram_html_code() {
        let input = "Use `code` here";
        let output = TelegramHandler::markdown_to_telegram_html(input);
        assert!(output.contains("<code>code</code>"));
    }

    #[test]
    fn test_markdown_to_telegram_html_code_block() {
        let input = "```rust\nfn main() {}\n```";
        let output = TelegramHandler::markdown_to_telegram_html(input);
        assert!(output.contains("<pre><code>"));
        assert!(output.contains("fn main() {}"));
    }

    #[test]
    fn test_markdown_to_telegram_html_link() {
        let input = "[link](https://example.com)";
        let output = TelegramHandler::markdown_to_telegram_html(input);
        assert!(output.contains(r#"<a href="https://example.com">link</a>"#));
    }

    #[test]
    fn test_markdown_to_telegram_html_escape_html() {
        let input = "<script>alert('xss')</script>";
        let output = TelegramHandler::markdown_to_telegram_html(input);
        assert!(!output.contains("<script>"));
        assert!(output.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_markdown_to_telegram_html_headers_flattened() {
        let input = "# Title\n\nBody text";
        let output = TelegramHandler::markdown_to_telegram_html(input);
        assert!(output.starts_with("Title"));
        assert!(!output.contains('#'));
    }

    #[test]
    fn test_telegram_handler_new() {
        let config = TelegramConfig {
            enabled: true,
            token: "test_token".to_string(),
            allow_from: vec!["user1".to_string()],
        };

        let handler = TelegramHandler::new(&config);
        assert_eq!(handler.name(), "telegram");
        assert!(!handler.is_running());
        assert!(handler.is_allowed("user1"));
        assert!(!handler.is_allowed("someone-else"));
    }
}
