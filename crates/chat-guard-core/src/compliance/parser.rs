use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::{normalize_score, ComplianceRecord, ScanError, ScanOutcome, ScanProvenance};

/// Banner the scanner CLI prints immediately before its JSON report.
pub const REPORT_MARKER: &str = "Compliance Report:";

const ORIGINAL_LABEL: &str = "Original:";
const REDACTED_LABEL: &str = "Redacted:";
const SCORE_LABEL: &str = "Score:";
const PII_FOUND_LABEL: &str = "PII Found:";

/// Amount subtracted from the score when a labelled report mentions PII.
pub const PII_PENALTY: f64 = 0.3;
/// The penalty never pushes a score below this floor.
pub const PII_PENALTY_FLOOR: f64 = 0.1;

/// Which of the two accepted output formats a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanFormat {
    Structured,
    Labeled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScan {
    pub record: ComplianceRecord,
    pub format: ScanFormat,
}

/// Normalizes heterogeneous scanner output into a `ComplianceRecord`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanResultParser;

impl ScanResultParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse raw scanner output, trying the structured format before the
    /// labelled line format.
    pub fn parse(&self, raw: &str) -> Result<ParsedScan, ScanError> {
        if let Some(record) = parse_structured(raw) {
            return Ok(ParsedScan {
                record,
                format: ScanFormat::Structured,
            });
        }
        if let Some(record) = parse_labeled(raw) {
            return Ok(ParsedScan {
                record,
                format: ScanFormat::Labeled,
            });
        }
        Err(ScanError::OutputMalformed)
    }

    /// Turn a scanner invocation result into a record, failing open to the
    /// default-pass record when the scanner is down or its output is unusable.
    pub fn resolve(&self, message: &str, scanned: Result<String, ScanError>) -> ScanOutcome {
        match scanned.and_then(|raw| self.parse(&raw)) {
            Ok(parsed) => {
                let provenance = match parsed.format {
                    ScanFormat::Structured => ScanProvenance::Structured,
                    ScanFormat::Labeled => ScanProvenance::Labeled,
                };
                debug!(
                    scan_source = provenance.label(),
                    score = parsed.record.compliance_score,
                    pii_count = parsed.record.pii_count(),
                    "scanner result normalized"
                );
                ScanOutcome {
                    record: parsed.record,
                    provenance,
                }
            }
            Err(err) => {
                let provenance = ScanProvenance::DefaultPass(err.default_pass_reason());
                warn!(
                    scan_source = provenance.label(),
                    error = %err,
                    "no usable scan result; recording default-pass compliance"
                );
                ScanOutcome {
                    record: ComplianceRecord::default_pass(message),
                    provenance,
                }
            }
        }
    }
}

fn parse_structured(raw: &str) -> Option<ComplianceRecord> {
    let payload = structured_payload(raw);
    if payload.is_empty() {
        return None;
    }
    let mut record = match serde_json::from_str::<ComplianceRecord>(payload) {
        Ok(record) => record,
        Err(strict_err) => {
            trace!(error = %strict_err, "strict JSON parse failed; trying relaxed JSON5");
            let value: serde_json::Value = json5::from_str(payload).ok()?;
            if !value.is_object() {
                return None;
            }
            serde_json::from_value(value).ok()?
        }
    };
    record.compliance_score = normalize_score(record.compliance_score);
    Some(record)
}

/// Text after the report banner line when present, otherwise the whole output.
///
/// Only a line ending in the marker counts as the banner; the phrase may also
/// appear inside the report itself when the scanner echoes the message.
fn structured_payload(raw: &str) -> &str {
    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end().ends_with(REPORT_MARKER) {
            return raw[offset..].trim();
        }
    }
    raw.trim()
}

fn parse_labeled(raw: &str) -> Option<ComplianceRecord> {
    let mut record = ComplianceRecord::default();
    let mut matched = false;

    for line in raw.lines().map(str::trim) {
        if let Some(value) = line.strip_prefix(ORIGINAL_LABEL) {
            record.original_text = value.trim().to_string();
            matched = true;
        } else if let Some(value) = line.strip_prefix(REDACTED_LABEL) {
            record.redacted_text = value.trim().to_string();
            matched = true;
        } else if let Some(value) = line.strip_prefix(SCORE_LABEL) {
            matched = true;
            match parse_percentage(value) {
                Some(score) => record.compliance_score = score,
                None => trace!(value, "ignoring non-numeric score line"),
            }
        } else if let Some(value) = line.strip_prefix(PII_FOUND_LABEL) {
            matched = true;
            match leading_count(value) {
                Some(count) if count > 0 => {
                    record.compliance_score =
                        (record.compliance_score - PII_PENALTY).max(PII_PENALTY_FLOOR);
                }
                Some(_) => {}
                None => trace!(value, "ignoring PII count without a leading integer"),
            }
        }
    }

    if !matched {
        return None;
    }
    record.compliance_score = normalize_score(record.compliance_score);
    Some(record)
}

/// `"40%"` or `"40.0 %"` into `0.4`.
fn parse_percentage(value: &str) -> Option<f64> {
    let number = value.trim().trim_end_matches('%').trim();
    let percent: f64 = number.parse().ok()?;
    percent.is_finite().then_some(percent / 100.0)
}

fn leading_count(value: &str) -> Option<i64> {
    value.split_whitespace().next()?.parse().ok()
}
