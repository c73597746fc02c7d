use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://api.brev.com/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-nemotron-super-49b-v1";
pub const DEFAULT_SCANNER_PROGRAM: &str = "./pii-compliance-agent";

/// Settings for the chat completion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Bearer token; when absent every reply comes from the canned table.
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: u32,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            model: None,
            timeout_secs: None,
            max_retries: 2,
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

impl CompletionSettings {
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Settings for the external scanner executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub program: PathBuf,
    /// Arguments placed before the message text.
    pub args: Vec<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_SCANNER_PROGRAM),
            args: vec!["scan".into(), "--text".into()],
            timeout_secs: None,
        }
    }
}

/// Combined collaborator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSettings {
    pub completion: CompletionSettings,
    pub scanner: ScannerSettings,
}

impl GuardSettings {
    pub const API_KEY_ENV: &'static str = "CHAT_GUARD_API_KEY";
    pub const ENDPOINT_ENV: &'static str = "CHAT_GUARD_ENDPOINT";
    pub const MODEL_ENV: &'static str = "CHAT_GUARD_MODEL";
    pub const TIMEOUT_ENV: &'static str = "CHAT_GUARD_TIMEOUT_SECS";
    pub const RETRIES_ENV: &'static str = "CHAT_GUARD_MAX_RETRIES";
    pub const SCANNER_BIN_ENV: &'static str = "CHAT_GUARD_SCANNER_BIN";
    pub const SCANNER_TIMEOUT_ENV: &'static str = "CHAT_GUARD_SCANNER_TIMEOUT_SECS";

    /// Defaults overridden by environment variables.
    ///
    /// * `CHAT_GUARD_API_KEY`: bearer token for the completion API (optional).
    /// * `CHAT_GUARD_ENDPOINT`: base URL of the OpenAI-compatible API.
    /// * `CHAT_GUARD_SCANNER_BIN`: path to the scanner executable.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env();
        settings
    }

    /// Override fields from the process environment; blank values are ignored.
    pub fn apply_env(&mut self) {
        self.apply_vars(&std::env::vars().collect());
    }

    fn apply_vars(&mut self, vars: &HashMap<String, String>) {
        let get = |key: &str| {
            vars.get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(api_key) = get(Self::API_KEY_ENV) {
            self.completion.api_key = Some(api_key);
        }
        if let Some(endpoint) = get(Self::ENDPOINT_ENV) {
            self.completion.endpoint = Some(endpoint);
        }
        if let Some(model) = get(Self::MODEL_ENV) {
            self.completion.model = Some(model);
        }
        if let Some(timeout) = get(Self::TIMEOUT_ENV).and_then(|v| v.parse::<u64>().ok()) {
            self.completion.timeout_secs = Some(timeout);
        }
        if let Some(retries) = get(Self::RETRIES_ENV).and_then(|v| v.parse::<u32>().ok()) {
            self.completion.max_retries = retries;
        }
        if let Some(program) = get(Self::SCANNER_BIN_ENV) {
            self.scanner.program = PathBuf::from(program);
        }
        if let Some(timeout) = get(Self::SCANNER_TIMEOUT_ENV).and_then(|v| v.parse::<u64>().ok())
        {
            self.scanner.timeout_secs = Some(timeout);
        }
    }
}
