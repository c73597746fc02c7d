use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod parser;
pub mod process_scanner;
pub mod severity;

/// Score assigned to a message the scanner found nothing wrong with.
pub const FULLY_COMPLIANT: f64 = 1.0;

/// Recommendation attached to records produced without a usable scan.
pub const DEFAULT_PASS_RECOMMENDATION: &str = "Message appears compliant";

/// A single sensitive item reported by the scanner.
///
/// `kind` is left open-ended: the scanner is external and may introduce new
/// categories at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiItem {
    #[serde(alias = "pii_type")]
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

impl PiiItem {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Canonical result of scanning one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceRecord {
    pub original_text: String,
    pub redacted_text: String,
    #[serde(alias = "detected_pii")]
    pub detected_items: Vec<PiiItem>,
    /// Normalized into `0.0..=1.0`; 1.0 means fully compliant.
    pub compliance_score: f64,
    pub recommendations: Vec<String>,
}

impl Default for ComplianceRecord {
    fn default() -> Self {
        Self {
            original_text: String::new(),
            redacted_text: String::new(),
            detected_items: Vec::new(),
            compliance_score: FULLY_COMPLIANT,
            recommendations: Vec::new(),
        }
    }
}

impl ComplianceRecord {
    /// Record used whenever no trustworthy scan result is available.
    pub fn default_pass(message: &str) -> Self {
        Self {
            original_text: message.to_string(),
            redacted_text: message.to_string(),
            detected_items: Vec::new(),
            compliance_score: FULLY_COMPLIANT,
            recommendations: vec![DEFAULT_PASS_RECOMMENDATION.to_string()],
        }
    }

    /// Redacted text, or `fallback` when the scanner reported none.
    pub fn redacted_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.redacted_text.is_empty() {
            fallback
        } else {
            &self.redacted_text
        }
    }

    pub fn pii_count(&self) -> usize {
        self.detected_items.len()
    }
}

/// Clamp a score into `0.0..=1.0`. NaN is treated as fully compliant.
pub fn normalize_score(score: f64) -> f64 {
    if score.is_nan() {
        FULLY_COMPLIANT
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Why a record had to fall back to the default-pass result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPassReason {
    ScannerUnavailable,
    OutputMalformed,
}

/// Which path produced a `ComplianceRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "reason", rename_all = "snake_case")]
pub enum ScanProvenance {
    /// Scanner emitted a structured (JSON/JSON5) report.
    Structured,
    /// Scanner emitted free text; labelled lines were recovered.
    Labeled,
    /// No usable scan; the record is a fail-open placeholder.
    DefaultPass(DefaultPassReason),
}

impl ScanProvenance {
    pub fn is_default_pass(&self) -> bool {
        matches!(self, Self::DefaultPass(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Labeled => "labeled",
            Self::DefaultPass(DefaultPassReason::ScannerUnavailable) => {
                "default_pass (scanner unavailable)"
            }
            Self::DefaultPass(DefaultPassReason::OutputMalformed) => {
                "default_pass (output malformed)"
            }
        }
    }
}

/// Record together with the path that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub record: ComplianceRecord,
    pub provenance: ScanProvenance,
}

/// Failures while obtaining or interpreting scanner output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("scanner unavailable: {reason}")]
    ScannerUnavailable { reason: String },
    #[error("scanner output matched neither the structured nor the labelled format")]
    OutputMalformed,
}

impl ScanError {
    pub fn default_pass_reason(&self) -> DefaultPassReason {
        match self {
            Self::ScannerUnavailable { .. } => DefaultPassReason::ScannerUnavailable,
            Self::OutputMalformed => DefaultPassReason::OutputMalformed,
        }
    }
}

/// External process (or service) that inspects a message for sensitive data.
#[async_trait]
pub trait ScannerClient: Send + Sync {
    /// Return the scanner's raw output for `text`.
    async fn scan(&self, text: &str) -> Result<String, ScanError>;
}
