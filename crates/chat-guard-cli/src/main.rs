use std::{
    io::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chat_guard_core::{
    completion_client,
    report::{render_session, render_summary, render_turn, render_violations},
    ComplianceRecord, ConversationLedger, GuardSettings, OutputFormat, ProcessScanner,
    ResponseOrchestrator, ScanProvenance, ScanResultParser, SeverityClassifier, SeverityTier,
    TurnError,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Scripted conversation replayed by `chat --demo`.
const DEMO_SCENARIOS: &[(&str, &str)] = &[
    ("Account help", "Hi, I need help with my account"),
    ("Email disclosure", "My email is john.doe@company.com"),
    ("Phone disclosure", "Please call me at 555-123-4567"),
    ("SSN disclosure", "My SSN is 123-45-6789"),
    (
        "Credit card disclosure",
        "I want to update my card 4111-1111-1111-1111",
    ),
    ("Harmless question", "What's the weather like today?"),
];

const CHAT_HELP: &str = "\
Commands:
  help        show this message
  status      session summary
  violations  compliance violations so far
  quit        end the session (also: exit, q)
Anything else is sent to the assistant.";

#[derive(Parser, Debug)]
#[command(
    name = "chat-guard",
    author,
    version,
    about = "Compliance-checked customer service chat"
)]
struct Cli {
    /// Settings file (TOML, YAML or JSON); environment variables override it
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Path to the compliance scanner executable
    #[arg(long = "scanner-bin", value_name = "PATH", global = true)]
    scanner_bin: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single turn on a fresh session
    Turn {
        #[arg(long)]
        message: String,
        /// Emit JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Interactive session over stdin
    Chat {
        /// Replay the scripted demo scenarios before reading stdin
        #[arg(long)]
        demo: bool,
        /// Emit JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Normalize raw scanner output read from stdin
    Parse {
        #[arg(long, value_enum, default_value_t = ParseFormat::Human)]
        format: ParseFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ParseFormat {
    Human,
    Json,
    Yaml,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref(), cli.scanner_bin)?;
    match cli.command {
        Commands::Turn { message, json } => run_turn(&settings, &message, format(json)).await?,
        Commands::Chat { demo, json } => run_chat(&settings, demo, format(json)).await?,
        Commands::Parse { format } => run_parse(format).await?,
    }
    Ok(())
}

fn format(json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    }
}

fn load_settings(
    config_path: Option<&Path>,
    scanner_bin: Option<PathBuf>,
) -> Result<GuardSettings> {
    let mut settings = match config_path {
        Some(path) => config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .and_then(|cfg| cfg.try_deserialize::<GuardSettings>())
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => GuardSettings::default(),
    };
    settings.apply_env();
    if let Some(program) = scanner_bin {
        settings.scanner.program = program;
    }
    Ok(settings)
}

fn build_orchestrator(settings: &GuardSettings) -> Result<ResponseOrchestrator> {
    let scanner = Arc::new(ProcessScanner::new(&settings.scanner));
    let completion = completion_client(&settings.completion)?;
    let orchestrator =
        ResponseOrchestrator::new(scanner, completion, Arc::new(ConversationLedger::new()));
    info!(
        session = %orchestrator.ledger().session_id(),
        scanner = %settings.scanner.program.display(),
        completion = orchestrator.completion_name(),
        "session started"
    );
    Ok(orchestrator)
}

async fn run_turn(settings: &GuardSettings, message: &str, format: OutputFormat) -> Result<()> {
    let orchestrator = build_orchestrator(settings)?;
    let response = orchestrator.handle_turn(message).await?;
    print!("{}", render_turn(&response, format)?);
    if format == OutputFormat::Json {
        println!();
    }
    Ok(())
}

async fn run_chat(settings: &GuardSettings, demo: bool, format: OutputFormat) -> Result<()> {
    let orchestrator = build_orchestrator(settings)?;

    if demo {
        for (idx, (title, message)) in DEMO_SCENARIOS.iter().enumerate() {
            if format == OutputFormat::Human {
                println!("--- Scenario {}: {title} ---", idx + 1);
                println!("You: {message}");
            }
            chat_turn(&orchestrator, message, format).await?;
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(format)?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "help" => println!("{CHAT_HELP}"),
            "status" => print_block(&render_summary(&orchestrator.ledger().summary(), format)?),
            "violations" => print_block(&render_violations(
                &orchestrator.ledger().list_violations(),
                format,
            )?),
            _ => chat_turn(&orchestrator, line, format).await?,
        }
    }

    let ledger = orchestrator.ledger();
    print_block(&render_session(
        &ledger.summary(),
        &ledger.list_violations(),
        format,
    )?);
    Ok(())
}

async fn chat_turn(
    orchestrator: &ResponseOrchestrator,
    message: &str,
    format: OutputFormat,
) -> Result<()> {
    match orchestrator.handle_turn(message).await {
        Ok(response) => print_block(&render_turn(&response, format)?),
        Err(err @ TurnError::InvalidInput) => eprintln!("{err}"),
    }
    Ok(())
}

fn prompt(format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Human {
        print!("You: ");
        std::io::stdout().flush().context("failed to flush stdout")?;
    }
    Ok(())
}

fn print_block(text: &str) {
    println!("{}", text.trim_end());
}

#[derive(Debug, Serialize)]
struct ParseReport {
    provenance: ScanProvenance,
    tier: SeverityTier,
    record: ComplianceRecord,
}

async fn run_parse(format: ParseFormat) -> Result<()> {
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("failed to read scanner output from stdin")?;

    let outcome = ScanResultParser::new().resolve("", Ok(raw));
    let report = ParseReport {
        provenance: outcome.provenance,
        tier: SeverityClassifier::default().classify(outcome.record.compliance_score),
        record: outcome.record,
    };

    match format {
        ParseFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ParseFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        ParseFormat::Human => {
            println!("Source: {}", report.provenance.label());
            println!(
                "Compliance Score: {:.1}%",
                report.record.compliance_score * 100.0
            );
            println!("Tier: {:?}", report.tier);
            println!("PII Items: {}", report.record.pii_count());
            for item in &report.record.detected_items {
                println!("  - {}: {}", item.kind, item.value);
            }
            if !report.record.redacted_text.is_empty() {
                println!("Redacted: {}", report.record.redacted_text);
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
