mod canned;
mod chat;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::settings::CompletionSettings;

pub use canned::{canned_reply, CannedReply, CANNED_REPLIES, GENERIC_REPLY};
pub use chat::ChatCompletionsClient;

/// Instruction sent ahead of every user message.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful customer service chatbot. Keep responses concise and professional.";

/// Ways the completion collaborator can be unavailable.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request timed out")]
    Timeout,
    #[error("failed to reach completion API: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("completion API error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("completion response did not contain any text")]
    EmptyResponse,
    #[error("failed to decode completion response: {0}")]
    Decode(String),
}

/// Generates the assistant's reply to a user message.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, message: &str) -> Result<String, CompletionError>;

    /// Short label used in logs and status output.
    fn name(&self) -> &'static str;
}

/// Offline client answering every message from the canned reply table.
#[derive(Debug, Default, Clone)]
pub struct CannedReplyClient;

#[async_trait]
impl CompletionClient for CannedReplyClient {
    async fn complete(&self, message: &str) -> Result<String, CompletionError> {
        Ok(canned_reply(message).to_string())
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}

/// Pick the HTTP client when an API key is configured, canned replies otherwise.
pub fn completion_client(settings: &CompletionSettings) -> Result<Arc<dyn CompletionClient>> {
    if !settings.has_api_key() {
        info!("no completion API key configured; replies come from the canned table");
        return Ok(Arc::new(CannedReplyClient));
    }
    Ok(Arc::new(ChatCompletionsClient::new(settings)?))
}
