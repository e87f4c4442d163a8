//! ClauseGuard CLI
//!
//! Command-line interface for contract risk assessment.
//!
//! ## Usage
//!
//! ```bash
//! # Analyze a contract with rule checks and LLM judgments
//! clauseguard analyze --input contract.txt --contract-type vendor
//!
//! # Pipe from stdin, rules only, JSON report
//! cat contract.txt | clauseguard analyze --input - --rules-only --format json
//!
//! # Explanations in English and Hindi, with party names anonymized
//! clauseguard analyze --input contract.txt --language both --party "Acme Ltd"
//!
//! # Inspect the rule catalog and checklists
//! clauseguard rules
//! clauseguard checklist lease
//! ```
//!
//! ## Exit Codes
//!
//! - 0: overall risk Low
//! - 1: overall risk Medium
//! - 2: overall risk High
//! - 3: Error

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use clauseguard_core::health::checklist;
use clauseguard_core::{
    AmbiguityReason, ContractReport, ContractType, Language, PreparedSource, RiskLevel, RuleEngine,
};
use clauseguard_runtime::{AnalysisOrchestratorBuilder, CancelHandle, RuntimeConfig};

/// ClauseGuard: risk assessment for legal contracts
#[derive(Parser)]
#[command(name = "clauseguard")]
#[command(version)]
#[command(about = "Assess clause-level and contract-level risk in legal contracts", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a contract
    Analyze {
        /// Path to the extracted contract text, or "-" for stdin
        #[arg(short, long)]
        input: String,

        /// Contract type, selects the completeness checklist
        #[arg(short = 't', long, value_parser = parse_contract_type)]
        contract_type: Option<ContractType>,

        /// Runtime configuration file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Language for explanations
        #[arg(short, long)]
        language: Option<OutputLanguage>,

        /// Party name to anonymize (can be specified multiple times)
        #[arg(long = "party")]
        parties: Vec<String>,

        /// Language tag of the source document
        #[arg(long, default_value = "en")]
        source_language: String,

        /// Skip LLM judgments and assess with rules only
        #[arg(long)]
        rules_only: bool,

        /// Skip the contract-level business summary
        #[arg(long)]
        no_summary: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Show the verdict for every clause
        #[arg(long)]
        explain: bool,

        /// Explicit timestamp for reproducible reports (RFC 3339).
        /// Example: --analyzed-at 2025-01-15T12:00:00Z
        #[arg(long, value_parser = parse_datetime)]
        analyzed_at: Option<DateTime<Utc>>,
    },

    /// List the rule catalog
    Rules,

    /// List the critical-clause checklist for a contract type
    Checklist {
        #[arg(value_parser = parse_contract_type)]
        contract_type: ContractType,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as YAML
    Show {
        /// Configuration file to load instead of the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputLanguage {
    English,
    Hindi,
    Both,
}

impl OutputLanguage {
    fn languages(self) -> Vec<Language> {
        match self {
            OutputLanguage::English => vec![Language::English],
            OutputLanguage::Hindi => vec![Language::Hindi],
            OutputLanguage::Both => vec![Language::English, Language::Hindi],
        }
    }
}

/// Parse RFC 3339 datetime string to DateTime<Utc>.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid datetime format: {}. Expected RFC 3339 (e.g., 2025-01-15T12:00:00Z)", e))
}

fn parse_contract_type(s: &str) -> Result<ContractType, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging on stderr so JSON reports stay clean on stdout
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(3)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Analyze {
            input,
            contract_type,
            config,
            language,
            parties,
            source_language,
            rules_only,
            no_summary,
            format,
            explain,
            analyzed_at,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(contract_type) = contract_type {
                config.analysis.contract_type = contract_type;
            }
            if let Some(language) = language {
                config.llm.languages = language.languages();
            }
            if analyzed_at.is_some() {
                config.determinism.analyzed_at = analyzed_at;
            }
            if no_summary {
                config.llm.summarize = false;
            }

            let raw = read_input(&input)?;
            let source = PreparedSource::from_bytes(&raw, &source_language, &parties)
                .context("Failed to prepare contract text")?;

            let report = analyze(source, config, rules_only).await?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => print_text_report(&report, explain),
            }

            Ok(ExitCode::from(exit_status(report.health.overall_risk)))
        }

        Commands::Rules => {
            list_rules();
            Ok(ExitCode::from(0))
        }

        Commands::Checklist { contract_type } => {
            println!("Checklist for {} contracts:", contract_type);
            for item in checklist(contract_type) {
                println!("  {:<24} {}", item.id, item.label);
            }
            Ok(ExitCode::from(0))
        }

        Commands::Config { action } => match action {
            ConfigAction::Show { config } => {
                let config = load_config(config.as_deref())?;
                print!("{}", serde_yaml::to_string(&config)?);
                Ok(ExitCode::from(0))
            }
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => Ok(RuntimeConfig::default()),
    }
}

fn read_input(input: &str) -> Result<Vec<u8>> {
    let bytes = if input == "-" {
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        std::fs::read(input).with_context(|| format!("Failed to read contract from {:?}", input))?
    };

    if bytes.is_empty() {
        bail!("Contract input is empty");
    }
    Ok(bytes)
}

async fn analyze(source: PreparedSource, config: RuntimeConfig, rules_only: bool) -> Result<ContractReport> {
    let mut builder = AnalysisOrchestratorBuilder::new().config(config);
    if !rules_only {
        builder = builder
            .openai_from_env()
            .context("LLM provider unavailable (use --rules-only to skip LLM judgments)")?;
    }
    let orchestrator = builder.build().context("Invalid configuration")?;

    // Ctrl-C cancels the analysis; no partial report is printed
    let cancel = CancelHandle::new();
    let token = cancel.token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling analysis");
            cancel.cancel();
        }
    });

    let result = orchestrator.analyze_with_cancel(&source, token).await;
    interrupt.abort();

    result.context("Analysis failed")
}

fn exit_status(level: RiskLevel) -> u8 {
    match level {
        RiskLevel::Low => 0,
        RiskLevel::Medium => 1,
        RiskLevel::High => 2,
    }
}

fn list_rules() {
    let engine = RuleEngine::new();
    for rule in engine.rules() {
        println!("{:<26} {:<6} {}", rule.id, rule.risk_level, rule.description);
    }
}

fn print_text_report(report: &ContractReport, explain: bool) {
    let health = &report.health;

    println!("Overall risk: {}", health.overall_risk.as_str().to_uppercase());
    println!(
        "  Rule-based: {}  LLM: {}",
        health.overall_risk_rules,
        health
            .overall_risk_llm
            .map(|level| level.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    );
    println!();
    println!("Contract type: {}", report.contract_type);
    println!("Clauses: {} ({} words)", report.clauses.len(), report.document_word_count);
    println!("Completeness: {}%", health.completeness_score);

    if let Some(summary) = &report.summary {
        println!();
        println!("Summary:");
        println!("  {}", summary.business_summary);
        for risk in &summary.key_risks {
            println!("  - {}", risk);
        }
    }

    if !health.missing_checklist_items.is_empty() {
        println!();
        println!("Missing clauses:");
        for item in &health.missing_checklist_items {
            println!("  - {}", item);
        }
    }

    if !health.top_risks.is_empty() {
        println!();
        println!("Top risks:");
        for (i, risk) in health.top_risks.iter().enumerate() {
            let label = risk
                .heading_label
                .as_deref()
                .map(|l| format!(" (section {})", l))
                .unwrap_or_default();
            println!("  {}. Clause {}{} [{}]", i + 1, risk.clause_index + 1, label, risk.risk_level);
            println!("     {}", risk.explanation);
        }
    }

    let recommendations = report.summary.iter().flat_map(|s| s.recommendations.iter());
    let insights: Vec<&String> = health.negotiation_insights.iter().chain(recommendations).collect();
    if !insights.is_empty() {
        println!();
        println!("Negotiation insights:");
        for insight in insights {
            println!("  - {}", insight);
        }
    }

    if !health.conflicts.is_empty() {
        println!();
        println!("Conflicts:");
        for conflict in &health.conflicts {
            println!("  - {}", conflict.explanation);
        }
    }

    if !health.ambiguity_flags.is_empty() {
        println!();
        println!("Ambiguities:");
        for flag in &health.ambiguity_flags {
            match &flag.reason {
                AmbiguityReason::VagueTerm { term } => {
                    println!("  - Clause {}: undefined term \"{}\"", flag.clause_index + 1, term)
                }
                AmbiguityReason::NearDuplicate { other_index, similarity } => println!(
                    "  - Clause {}: near-duplicate of clause {} ({:.0}% similar)",
                    flag.clause_index + 1,
                    other_index + 1,
                    similarity * 100.0
                ),
            }
        }
    }

    if report.degraded_clause_count > 0 {
        println!();
        println!(
            "Note: {} of {} clauses were assessed by rules only{}.",
            report.degraded_clause_count,
            report.verdicts.len(),
            if report.timed_out { " (time limit reached)" } else { "" }
        );
    }

    if explain {
        println!();
        println!("--- Clause Verdicts ---");

        for (clause, verdict) in report.clauses.iter().zip(&report.verdicts) {
            println!();
            println!(
                "Clause {} [{}, score {:.2}]",
                clause.index + 1,
                verdict.final_risk_level,
                verdict.final_risk_score
            );
            println!("  Text: {}", clause.text);
            println!("  Explanation: {}", verdict.explanation);
            if let Some(reason) = &verdict.risk_reason {
                println!("  Reason: {}", reason);
            }
            println!("  Affected party: {}", verdict.affected_party);
            if !verdict.contributing_rule_ids.is_empty() {
                println!("  Rules: {}", verdict.contributing_rule_ids.join(", "));
            }
            if let Some(wording) = &verdict.alternative_wording {
                println!("  Alternative: {}", wording);
            }
            if let Some(tip) = &verdict.negotiation_tip {
                println!("  Tip: {}", tip);
            }
        }
    }

    if !report.party_map.is_empty() {
        println!();
        println!("Parties:");
        for (placeholder, name) in &report.party_map {
            println!("  {} = {}", placeholder, name);
        }
    }
}
