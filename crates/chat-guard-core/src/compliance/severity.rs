use serde::{Deserialize, Serialize};

use super::normalize_score;

/// Score cut-offs separating compliant turns from violations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    /// Scores strictly below this are violations.
    pub violation: f64,
    /// Scores strictly below this are high-severity violations.
    pub high: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            violation: 0.8,
            high: 0.6,
        }
    }
}

/// Classification buckets for a compliance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    None,
    Medium,
    High,
}

impl SeverityTier {
    /// Map a compliance score (0–1) into a tier using the default thresholds.
    pub fn from_score(score: f64) -> Self {
        Self::from_score_with_thresholds(score, &SeverityThresholds::default())
    }

    /// Map a compliance score using caller-provided thresholds.
    pub fn from_score_with_thresholds(score: f64, thresholds: &SeverityThresholds) -> Self {
        let score = normalize_score(score);
        if score >= thresholds.violation {
            Self::None
        } else if score >= thresholds.high {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Severity to record for this tier, if it is a violation at all.
    pub fn violation(self) -> Option<ViolationSeverity> {
        match self {
            Self::None => None,
            Self::Medium => Some(ViolationSeverity::Medium),
            Self::High => Some(ViolationSeverity::High),
        }
    }
}

/// Severity carried by a recorded violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ViolationSeverity {
    Medium,
    High,
}

impl ViolationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// Pure score-to-tier classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeverityClassifier {
    thresholds: SeverityThresholds,
}

impl SeverityClassifier {
    pub fn new(thresholds: SeverityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SeverityThresholds {
        &self.thresholds
    }

    pub fn classify(&self, score: f64) -> SeverityTier {
        SeverityTier::from_score_with_thresholds(score, &self.thresholds)
    }
}
