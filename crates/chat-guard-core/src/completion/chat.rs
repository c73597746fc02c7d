use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use super::{CompletionClient, CompletionError, SYSTEM_PROMPT};
use crate::settings::{CompletionSettings, DEFAULT_ENDPOINT, DEFAULT_MODEL};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(5);
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    max_retries: u32,
}

impl ChatCompletionsClient {
    pub fn new(settings: &CompletionSettings) -> Result<Self> {
        let Some(api_key) = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
        else {
            bail!("completion API key must be provided via CHAT_GUARD_API_KEY");
        };
        let base = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let url = format!("{}/chat/completions", base.trim_end_matches('/'));
        let http = Client::builder()
            .user_agent("chat-guard/0.3")
            .timeout(Duration::from_secs(
                settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .context("failed to build completion HTTP client")?;
        Ok(Self {
            http,
            url,
            api_key: api_key.to_string(),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            max_retries: settings.max_retries,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn payload<'a>(&'a self, message: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionsClient {
    #[instrument(name = "completion_request", skip(self, message), fields(model = %self.model))]
    async fn complete(&self, message: &str) -> Result<String, CompletionError> {
        let payload = self.payload(message);

        let mut attempt = 0u32;
        let mut backoff = INITIAL_BACKOFF;
        loop {
            let response = self
                .http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await;

            let failure = match response {
                Ok(resp) if resp.status().is_success() => {
                    let chat: ChatCompletionResponse = resp
                        .json()
                        .await
                        .map_err(|err| CompletionError::Decode(err.to_string()))?;
                    return extract_reply(chat);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    let err = CompletionError::Status {
                        status: status.as_u16(),
                        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                    };
                    if !is_retryable_status(status) {
                        return Err(err);
                    }
                    err
                }
                Err(err) if err.is_timeout() => CompletionError::Timeout,
                Err(err) => CompletionError::Transport(err),
            };

            if attempt >= self.max_retries {
                return Err(failure);
            }
            warn!(attempt, error = %failure, "completion attempt failed; retrying");
            sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
            attempt += 1;
        }
    }

    fn name(&self) -> &'static str {
        "chat_completions"
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn extract_reply(chat: ChatCompletionResponse) -> Result<String, CompletionError> {
    let reply = chat
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(CompletionError::EmptyResponse)?;
    debug!(reply_len = reply.len(), "completion received");
    Ok(reply)
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
