pub mod compliance;
pub mod completion;
pub mod ledger;
pub mod orchestrator;
pub mod report;
pub mod settings;

pub use compliance::{
    parser::{ParsedScan, ScanFormat, ScanResultParser},
    process_scanner::ProcessScanner,
    severity::{SeverityClassifier, SeverityThresholds, SeverityTier, ViolationSeverity},
    ComplianceRecord, DefaultPassReason, PiiItem, ScanError, ScanOutcome, ScanProvenance,
    ScannerClient,
};
pub use completion::{
    canned_reply, completion_client, CannedReplyClient, ChatCompletionsClient, CompletionClient,
    CompletionError,
};
pub use ledger::{
    ConversationEntry, ConversationLedger, LedgerSummary, SessionId, SessionRegistry,
    ViolationEntry,
};
pub use orchestrator::{ResponseOrchestrator, TurnError, TurnResponse};
pub use report::OutputFormat;
pub use settings::{CompletionSettings, GuardSettings, ScannerSettings};
