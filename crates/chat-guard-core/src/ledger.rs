use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::compliance::{
    severity::{SeverityClassifier, ViolationSeverity},
    normalize_score, ComplianceRecord, FULLY_COMPLIANT,
};

/// Identifier of one conversation session (UUIDv7: time-ordered plus random bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One recorded chat turn. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub bot_response: String,
    pub compliance_score: f64,
    pub pii_count: usize,
    pub redacted_text: String,
}

/// Derived record for a turn whose score fell below the violation threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: ViolationSeverity,
    pub pii_count: usize,
    pub original_message: String,
    pub redacted_message: String,
}

/// Aggregate view of a ledger at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub turn_count: usize,
    pub violation_count: usize,
    pub high_violation_count: usize,
    pub average_score: f64,
}

#[derive(Debug, Default)]
struct LedgerState {
    turns: Vec<ConversationEntry>,
    violations: Vec<ViolationEntry>,
    score_total: f64,
}

impl LedgerState {
    fn average_score(&self) -> f64 {
        if self.turns.is_empty() {
            return FULLY_COMPLIANT;
        }
        self.score_total / self.turns.len() as f64
    }
}

/// Append-only record of one session's turns and the violations derived from them.
///
/// `record_turn` is the only mutator and the only place violations are created;
/// it runs as a single critical section so concurrent callers never interleave
/// a turn with its violation.
#[derive(Debug)]
pub struct ConversationLedger {
    session_id: SessionId,
    started_at: DateTime<Utc>,
    classifier: SeverityClassifier,
    state: Mutex<LedgerState>,
}

impl Default for ConversationLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLedger {
    pub fn new() -> Self {
        Self::with_session(SessionId::generate())
    }

    pub fn with_session(session_id: SessionId) -> Self {
        Self::with_classifier(session_id, SeverityClassifier::default())
    }

    pub fn with_classifier(session_id: SessionId, classifier: SeverityClassifier) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            classifier,
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn classifier(&self) -> &SeverityClassifier {
        &self.classifier
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        // Entries are only ever pushed whole, so a poisoned lock still holds
        // consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a turn and, when its score classifies as a violation, the
    /// matching violation entry. The score is normalized before it is stored.
    pub fn record_turn(
        &self,
        user_message: &str,
        bot_response: &str,
        record: &ComplianceRecord,
    ) -> ConversationEntry {
        let score = normalize_score(record.compliance_score);
        let redacted = record.redacted_or(user_message);
        let severity = self.classifier.classify(score).violation();

        let mut state = self.state();
        let timestamp = Utc::now();
        let entry = ConversationEntry {
            timestamp,
            user_message: user_message.to_string(),
            bot_response: bot_response.to_string(),
            compliance_score: score,
            pii_count: record.pii_count(),
            redacted_text: redacted.to_string(),
        };
        state.turns.push(entry.clone());
        state.score_total += score;

        if let Some(severity) = severity {
            state.violations.push(ViolationEntry {
                timestamp,
                severity,
                pii_count: entry.pii_count,
                original_message: user_message.to_string(),
                redacted_message: redacted.to_string(),
            });
            info!(
                session = %self.session_id,
                severity = severity.as_str(),
                score,
                pii_count = entry.pii_count,
                "compliance violation recorded"
            );
        } else {
            debug!(session = %self.session_id, score, "turn recorded");
        }
        entry
    }

    pub fn turn_count(&self) -> usize {
        self.state().turns.len()
    }

    pub fn violation_count(&self) -> usize {
        self.state().violations.len()
    }

    /// Mean compliance score over all turns; 1.0 for an empty ledger.
    pub fn average_score(&self) -> f64 {
        self.state().average_score()
    }

    pub fn list_violations(&self) -> Vec<ViolationEntry> {
        self.state().violations.clone()
    }

    pub fn list_turns(&self) -> Vec<ConversationEntry> {
        self.state().turns.clone()
    }

    pub fn summary(&self) -> LedgerSummary {
        let state = self.state();
        LedgerSummary {
            session_id: self.session_id,
            started_at: self.started_at,
            turn_count: state.turns.len(),
            violation_count: state.violations.len(),
            high_violation_count: state
                .violations
                .iter()
                .filter(|v| v.severity == ViolationSeverity::High)
                .count(),
            average_score: state.average_score(),
        }
    }
}

/// One ledger per session, created on demand.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    classifier: SeverityClassifier,
    sessions: Mutex<HashMap<SessionId, Arc<ConversationLedger>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(classifier: SeverityClassifier) -> Self {
        Self {
            classifier,
            sessions: Mutex::default(),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<ConversationLedger>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new session with a freshly generated id.
    pub fn open(&self) -> Arc<ConversationLedger> {
        let ledger = Arc::new(ConversationLedger::with_classifier(
            SessionId::generate(),
            self.classifier,
        ));
        self.sessions()
            .insert(ledger.session_id(), Arc::clone(&ledger));
        ledger
    }

    pub fn get(&self, session_id: &SessionId) -> Option<Arc<ConversationLedger>> {
        self.sessions().get(session_id).cloned()
    }

    pub fn get_or_open(&self, session_id: SessionId) -> Arc<ConversationLedger> {
        let mut sessions = self.sessions();
        let ledger = sessions.entry(session_id).or_insert_with(|| {
            Arc::new(ConversationLedger::with_classifier(
                session_id,
                self.classifier,
            ))
        });
        Arc::clone(ledger)
    }

    pub fn close(&self, session_id: &SessionId) -> Option<Arc<ConversationLedger>> {
        self.sessions().remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    /// Summaries of every open session, oldest session first.
    pub fn summaries(&self) -> Vec<LedgerSummary> {
        let ledgers: Vec<_> = self.sessions().values().cloned().collect();
        let mut summaries: Vec<_> = ledgers.iter().map(|l| l.summary()).collect();
        summaries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        summaries
    }
}
