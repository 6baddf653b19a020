pub mod openai;

use async_trait::async_trait;

use crate::config::{Config, ConfigError};
use crate::state::ChatMessage;

pub use openai::OpenAIClient;

/// Scope instruction sent as the first entry of every request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that ONLY answers questions related to L'Oréal products, skincare and haircare routines, product recommendations, ingredients, usage instructions, and store/online availability for L'Oréal-branded products. If a user asks something outside that scope, politely reply that you can only assist with L'Oréal products and offer to help with product recommendations or routine advice. Do not provide medical diagnoses or prescriptions; instead, recommend consulting a professional when necessary. Keep answers friendly and concise.";

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Fixed sampling parameters for every request in a process.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl RequestConfig {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            model: config.model.clone().unwrap_or(defaults.model),
            max_tokens: config.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: config.temperature.unwrap_or(defaults.temperature),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompletionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{} - {body}", status_line(.status, .status_text))]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Decode(String),
}

fn status_line(status: &u16, status_text: &str) -> String {
    if status_text.is_empty() {
        status.to_string()
    } else {
        format!("{} {}", status, status_text)
    }
}

/// A completion provider. `Ok(None)` means the provider answered but the
/// reply carried no text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &RequestConfig,
    ) -> Result<Option<String>, CompletionError>;
}

/// Build the request payload for one question. Earlier turns are never sent.
pub fn build_messages(question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(question),
    ]
}
