use std::fmt::Write;

use serde::Serialize;

use crate::{
    ledger::{LedgerSummary, ViolationEntry},
    orchestrator::TurnResponse,
};

/// Format styles supported by the renderers below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

const EXCERPT_CHARS: usize = 50;
const MAX_RECOMMENDATIONS: usize = 3;

pub fn render_turn(response: &TurnResponse, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_turn_human(response),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
    }
}

/// Session summary followed by its violations.
pub fn render_session(
    summary: &LedgerSummary,
    violations: &[ViolationEntry],
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => {
            let mut out = render_summary_human(summary)?;
            writeln!(out)?;
            out.push_str(&render_violations_human(violations)?);
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonSession {
            summary,
            violations,
        })?),
    }
}

pub fn render_summary(summary: &LedgerSummary, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_summary_human(summary),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
    }
}

pub fn render_violations(
    violations: &[ViolationEntry],
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_violations_human(violations),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(violations)?),
    }
}

fn render_turn_human(response: &TurnResponse) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "Bot: {}", response.bot_response)?;
    writeln!(
        out,
        "Compliance Score: {:.1}%",
        response.compliance_score * 100.0
    )?;
    writeln!(out, "PII Detected: {} item(s)", response.pii_detected)?;
    for item in &response.detected_items {
        let value = if item.value.is_empty() {
            "N/A"
        } else {
            item.value.as_str()
        };
        writeln!(out, "  - {}: {}", item.kind, value)?;
    }
    writeln!(out, "Redacted: {}", response.redacted_text)?;
    writeln!(out, "Scan Source: {}", response.scan_source.label())?;
    if let Some(severity) = response.violation {
        writeln!(out, "Violation: {}", severity.as_str())?;
    }
    if !response.recommendations.is_empty() {
        writeln!(out, "Recommendations:")?;
        for rec in response.recommendations.iter().take(MAX_RECOMMENDATIONS) {
            writeln!(out, "  - {rec}")?;
        }
    }
    Ok(out)
}

fn render_summary_human(summary: &LedgerSummary) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "Session: {}", summary.session_id)?;
    writeln!(out, "Started: {}", summary.started_at.to_rfc3339())?;
    writeln!(out, "Messages: {}", summary.turn_count)?;
    writeln!(
        out,
        "Violations: {} ({} high)",
        summary.violation_count, summary.high_violation_count
    )?;
    writeln!(
        out,
        "Average Compliance Score: {:.1}%",
        summary.average_score * 100.0
    )?;
    Ok(out)
}

fn render_violations_human(violations: &[ViolationEntry]) -> anyhow::Result<String> {
    let mut out = String::new();
    if violations.is_empty() {
        writeln!(out, "No compliance violations detected.")?;
        return Ok(out);
    }

    writeln!(out, "Compliance Violations ({}):", violations.len())?;
    for (idx, violation) in violations.iter().enumerate() {
        writeln!(
            out,
            "  {n}. [{severity}] {timestamp}",
            n = idx + 1,
            severity = violation.severity.as_str(),
            timestamp = violation.timestamp.to_rfc3339()
        )?;
        writeln!(out, "     PII Items: {}", violation.pii_count)?;
        writeln!(out, "     Original: {}", excerpt(&violation.original_message))?;
        writeln!(out, "     Redacted: {}", excerpt(&violation.redacted_message))?;
    }
    Ok(out)
}

fn excerpt(input: &str) -> String {
    let flat: String = input
        .chars()
        .map(|c| match c {
            '\n' | '\r' => ' ',
            _ => c,
        })
        .collect();
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    flat.chars().take(EXCERPT_CHARS).collect::<String>() + "…"
}

#[derive(Debug, Serialize)]
struct JsonSession<'a> {
    summary: &'a LedgerSummary,
    violations: &'a [ViolationEntry],
}
