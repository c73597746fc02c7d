use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::{
    compliance::{
        parser::ScanResultParser, severity::ViolationSeverity, PiiItem, ScanProvenance,
        ScannerClient,
    },
    completion::{canned_reply, CompletionClient},
    ledger::ConversationLedger,
};

/// Errors surfaced to the caller of a turn. Collaborator outages never are.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("message must not be empty")]
    InvalidInput,
}

/// What the presentation layer receives for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub bot_response: String,
    pub compliance_score: f64,
    pub pii_detected: usize,
    pub redacted_text: String,
    /// Items as the scanner reported them, in emission order.
    pub detected_items: Vec<PiiItem>,
    pub recommendations: Vec<String>,
    pub scan_source: ScanProvenance,
    pub violation: Option<ViolationSeverity>,
}

/// Runs one chat turn: scan, reply, record.
pub struct ResponseOrchestrator {
    scanner: Arc<dyn ScannerClient>,
    completion: Arc<dyn CompletionClient>,
    parser: ScanResultParser,
    ledger: Arc<ConversationLedger>,
}

impl ResponseOrchestrator {
    pub fn new(
        scanner: Arc<dyn ScannerClient>,
        completion: Arc<dyn CompletionClient>,
        ledger: Arc<ConversationLedger>,
    ) -> Self {
        Self {
            scanner,
            completion,
            parser: ScanResultParser::new(),
            ledger,
        }
    }

    pub fn ledger(&self) -> &Arc<ConversationLedger> {
        &self.ledger
    }

    pub fn completion_name(&self) -> &'static str {
        self.completion.name()
    }

    /// Same collaborators, different session.
    pub fn for_session(&self, ledger: Arc<ConversationLedger>) -> Self {
        Self {
            scanner: Arc::clone(&self.scanner),
            completion: Arc::clone(&self.completion),
            parser: self.parser,
            ledger,
        }
    }

    #[instrument(
        name = "handle_turn",
        skip(self, user_message),
        fields(session = %self.ledger.session_id(), message_len = user_message.len())
    )]
    pub async fn handle_turn(&self, user_message: &str) -> Result<TurnResponse, TurnError> {
        if user_message.trim().is_empty() {
            return Err(TurnError::InvalidInput);
        }

        let scanned = self.scanner.scan(user_message).await;
        let outcome = self.parser.resolve(user_message, scanned);

        let bot_response = match self.completion.complete(user_message).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(
                    client = self.completion.name(),
                    error = %err,
                    "completion unavailable; answering from canned replies"
                );
                canned_reply(user_message).to_string()
            }
        };

        let entry = self
            .ledger
            .record_turn(user_message, &bot_response, &outcome.record);

        Ok(TurnResponse {
            bot_response: entry.bot_response,
            compliance_score: entry.compliance_score,
            pii_detected: entry.pii_count,
            redacted_text: entry.redacted_text,
            detected_items: outcome.record.detected_items,
            recommendations: outcome.record.recommendations,
            scan_source: outcome.provenance,
            violation: self
                .ledger
                .classifier()
                .classify(entry.compliance_score)
                .violation(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{DefaultPassReason, ScanError, DEFAULT_PASS_RECOMMENDATION};
    use crate::completion::{CompletionError, GENERIC_REPLY};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedScanner {
        output: Result<String, ScanError>,
        calls: AtomicUsize,
    }

    impl FixedScanner {
        fn new(output: Result<&str, ScanError>) -> Arc<Self> {
            Arc::new(Self {
                output: output.map(str::to_string),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ScannerClient for FixedScanner {
        async fn scan(&self, _text: &str) -> Result<String, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.output.clone()
        }
    }

    enum Reply {
        Text(&'static str),
        TimedOut,
    }

    struct FixedCompletion {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FixedCompletion {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for FixedCompletion {
        async fn complete(&self, _message: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::TimedOut => Err(CompletionError::Timeout),
            }
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn orchestrator(
        scanner: Arc<FixedScanner>,
        completion: Arc<FixedCompletion>,
    ) -> ResponseOrchestrator {
        ResponseOrchestrator::new(scanner, completion, Arc::new(ConversationLedger::new()))
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_collaborators() {
        let scanner = FixedScanner::new(Ok("Score: 100%"));
        let completion = FixedCompletion::new(Reply::Text("hi"));
        let orch = orchestrator(Arc::clone(&scanner), Arc::clone(&completion));

        assert_eq!(orch.handle_turn("").await.unwrap_err(), TurnError::InvalidInput);
        assert_eq!(orch.handle_turn("  \n").await.unwrap_err(), TurnError::InvalidInput);
        assert_eq!(scanner.calls.load(Ordering::SeqCst), 0);
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.ledger().turn_count(), 0);
    }

    #[tokio::test]
    async fn completion_timeout_falls_back_to_generic_reply() {
        let orch = orchestrator(
            FixedScanner::new(Ok(r#"{"compliance_score": 1.0}"#)),
            FixedCompletion::new(Reply::TimedOut),
        );
        let response = orch.handle_turn("What is the weather today?").await.unwrap();
        assert_eq!(response.bot_response, GENERIC_REPLY);
        assert_eq!(orch.ledger().list_turns()[0].bot_response, GENERIC_REPLY);
    }

    #[tokio::test]
    async fn completion_timeout_uses_keyword_reply() {
        let orch = orchestrator(
            FixedScanner::new(Ok("Score: 100%")),
            FixedCompletion::new(Reply::TimedOut),
        );
        let response = orch
            .handle_turn("Hi, I need help with my account")
            .await
            .unwrap();
        assert_eq!(
            response.bot_response,
            "I can help you with your account. What specific issue are you experiencing?"
        );
    }

    #[tokio::test]
    async fn scanner_failure_still_replies_and_records_default_pass() {
        let scanner = FixedScanner::new(Err(ScanError::ScannerUnavailable {
            reason: "exit status: 1".into(),
        }));
        let completion = FixedCompletion::new(Reply::Text("Noted."));
        let orch = orchestrator(scanner, Arc::clone(&completion));

        let response = orch.handle_turn("My SSN is 123-45-6789").await.unwrap();
        assert_eq!(response.bot_response, "Noted.");
        assert!((response.compliance_score - 1.0).abs() < f64::EPSILON);
        assert_eq!(response.pii_detected, 0);
        assert_eq!(response.redacted_text, "My SSN is 123-45-6789");
        assert_eq!(
            response.scan_source,
            ScanProvenance::DefaultPass(DefaultPassReason::ScannerUnavailable)
        );
        assert_eq!(response.violation, None);
        assert_eq!(response.recommendations, vec![DEFAULT_PASS_RECOMMENDATION]);
        assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.ledger().violation_count(), 0);
    }

    #[tokio::test]
    async fn low_score_turn_records_violation() {
        let orch = orchestrator(
            FixedScanner::new(Ok(
                "Original: My SSN is 123-45-6789\nRedacted: My SSN is [SSN]\nScore: 40%\nPII Found: 1 items\n",
            )),
            FixedCompletion::new(Reply::Text("I can't store that.")),
        );
        let response = orch.handle_turn("My SSN is 123-45-6789").await.unwrap();
        assert_eq!(response.scan_source, ScanProvenance::Labeled);
        assert_eq!(response.redacted_text, "My SSN is [SSN]");
        assert_eq!(response.violation, Some(ViolationSeverity::High));

        let violations = orch.ledger().list_violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].redacted_message, "My SSN is [SSN]");
    }

    #[tokio::test]
    async fn penalized_score_on_high_threshold_is_medium() {
        let orch = orchestrator(
            FixedScanner::new(Ok("Score: 90.0%\nPII Found: 1 items\n")),
            FixedCompletion::new(Reply::Text("ok")),
        );
        let response = orch.handle_turn("call 555-123-4567").await.unwrap();
        assert_eq!(response.violation, Some(ViolationSeverity::Medium));
        assert_eq!(
            orch.ledger().list_violations()[0].severity,
            ViolationSeverity::Medium
        );
        assert_eq!(orch.ledger().summary().high_violation_count, 0);
    }

    #[tokio::test]
    async fn structured_items_are_counted() {
        let orch = orchestrator(
            FixedScanner::new(Ok(
                r#"{"redacted_text": "mail [EMAIL]", "detected_pii": [{"pii_type": "Email", "value": "a@b.io"}], "compliance_score": 0.7}"#,
            )),
            FixedCompletion::new(Reply::Text("Thanks")),
        );
        let response = orch.handle_turn("mail a@b.io").await.unwrap();
        assert_eq!(response.pii_detected, 1);
        assert_eq!(response.detected_items, vec![PiiItem::new("Email", "a@b.io")]);
        assert!(response.recommendations.is_empty());
        assert_eq!(response.violation, Some(ViolationSeverity::Medium));
        assert_eq!(orch.ledger().list_turns()[0].pii_count, 1);
    }

    #[tokio::test]
    async fn sessions_share_collaborators_but_not_ledgers() {
        let orch = orchestrator(
            FixedScanner::new(Ok("Score: 50%")),
            FixedCompletion::new(Reply::Text("ok")),
        );
        let other = orch.for_session(Arc::new(ConversationLedger::new()));
        orch.handle_turn("one").await.unwrap();
        other.handle_turn("two").await.unwrap();
        other.handle_turn("three").await.unwrap();
        assert_eq!(orch.ledger().turn_count(), 1);
        assert_eq!(other.ledger().turn_count(), 2);
        assert_eq!(other.ledger().violation_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_turns_on_shared_ledger_keep_counts() {
        let ledger = Arc::new(ConversationLedger::new());
        let flagged = Arc::new(ResponseOrchestrator::new(
            FixedScanner::new(Ok("Score: 70%")),
            FixedCompletion::new(Reply::Text("ok")),
            Arc::clone(&ledger),
        ));
        let compliant = Arc::new(ResponseOrchestrator::new(
            FixedScanner::new(Ok("Score: 95%")),
            FixedCompletion::new(Reply::Text("ok")),
            Arc::clone(&ledger),
        ));

        let mut tasks = Vec::new();
        for idx in 0..20 {
            let orch = if idx % 4 == 0 {
                Arc::clone(&flagged)
            } else {
                Arc::clone(&compliant)
            };
            tasks.push(tokio::spawn(async move {
                orch.handle_turn(&format!("message {idx}")).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(ledger.turn_count(), 20);
        assert_eq!(ledger.violation_count(), 5);
    }
}
