#![allow(dead_code)]

use assert_cmd::Command;
use once_cell::sync::Lazy;
use std::fs::{self, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

// Serializes script creation so no concurrently spawned child inherits a
// half-written executable.
static SCRIPT_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const ENV_VARS: &[&str] = &[
    "CHAT_GUARD_API_KEY",
    "CHAT_GUARD_ENDPOINT",
    "CHAT_GUARD_MODEL",
    "CHAT_GUARD_TIMEOUT_SECS",
    "CHAT_GUARD_MAX_RETRIES",
    "CHAT_GUARD_SCANNER_BIN",
    "CHAT_GUARD_SCANNER_TIMEOUT_SECS",
];

pub fn lock() -> MutexGuard<'static, ()> {
    SCRIPT_LOCK.lock().unwrap_or_else(|err| err.into_inner())
}

/// Binary with a clean environment: canned replies, no scanner configured.
pub fn cli() -> Command {
    let mut cmd = Command::cargo_bin("chat-guard-cli").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("RUST_LOG", "warn");
    cmd
}

/// Path that is guaranteed not to exist inside `dir`.
pub fn missing_scanner(dir: &Path) -> PathBuf {
    dir.join("no-such-scanner")
}

/// Write an executable shell script acting as the scanner.
pub fn scanner_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("scanner.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, Permissions::from_mode(0o755)).unwrap();
    path
}

/// Scanner reporting a low-scoring labelled result for any input.
pub fn labeled_ssn_scanner(dir: &Path) -> PathBuf {
    scanner_script(
        dir,
        r#"echo "Original: $3"
echo "Redacted: My SSN is [SSN]"
echo "Score: 40%"
echo "PII Found: 1 items""#,
    )
}
