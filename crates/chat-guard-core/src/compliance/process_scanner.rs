use std::{path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{process::Command, time::timeout};
use tracing::{debug, instrument};

use super::{ScanError, ScannerClient};
use crate::settings::ScannerSettings;

const DEFAULT_SCANNER_TIMEOUT_SECS: u64 = 10;
const MAX_STDERR_CHARS: usize = 240;

/// Runs the external scanner executable as `<program> <args...> <text>`.
#[derive(Debug, Clone)]
pub struct ProcessScanner {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessScanner {
    pub fn new(settings: &ScannerSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            timeout: Duration::from_secs(
                settings
                    .timeout_secs
                    .unwrap_or(DEFAULT_SCANNER_TIMEOUT_SECS),
            ),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

#[async_trait]
impl ScannerClient for ProcessScanner {
    #[instrument(
        name = "scanner_invoke",
        skip(self, text),
        fields(program = %self.program.display(), input_len = text.len())
    )]
    async fn scan(&self, text: &str) -> Result<String, ScanError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(ScanError::ScannerUnavailable {
                    reason: format!("timed out after {}ms", self.timeout.as_millis()),
                })
            }
            Ok(Err(err)) => {
                return Err(ScanError::ScannerUnavailable {
                    reason: format!("failed to launch {}: {err}", self.program.display()),
                })
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(ScanError::ScannerUnavailable {
                reason: if stderr.is_empty() {
                    format!("scanner exited with {}", output.status)
                } else {
                    format!("scanner exited with {}: {stderr}", output.status)
                },
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(stdout_len = stdout.len(), "scanner completed");
        Ok(stdout)
    }
}
