//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for minaret
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Telegram channel configuration
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Gemini provider configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Assistant behavior configuration
    #[serde(default)]
    pub assistant: AssistantConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub token: String,
    /// Allowed sender ids (empty = allow everyone)
    #[serde(default)]
    pub allow_from: Vec<String>,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
        }
    }
}

/// Assistant behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Persona instruction each new session is seeded with
    #[serde(default = "default_persona")]
    pub persona: String,
    /// Fixed model acknowledgement paired with the persona turn
    #[serde(default = "default_persona_ack")]
    pub persona_ack: String,
    /// Maximum tokens the model may generate per reply
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Timeout for a single model call, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Bounded retries for transient provider failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_persona() -> String {
    "You are Minaret, a careful assistant for Islamic scholarship. Your knowledge \
     covers the Quran, hadith, fiqh, logic, history and the sciences within the \
     Islamic tradition. Every answer must be accurate, reliable and grounded in \
     established scholarship. Only help with Islamic topics. If a question falls \
     outside them, or you do not know the answer, say so plainly. Never fabricate \
     or speculate."
        .to_string()
}

fn default_persona_ack() -> String {
    "I am ready to answer your questions on Islamic topics.".to_string()
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            persona_ack: default_persona_ack(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
