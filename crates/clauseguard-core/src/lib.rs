//! # clauseguard-core
//!
//! Deterministic clause risk assessment for legal contracts.
//!
//! This crate segments a prepared contract into clauses, runs the rule
//! catalog over every clause, reconciles rule findings with an optional
//! language-model judgment and aggregates the verdicts into contract-level
//! health metrics.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input, config and timestamp always produce the same report
//! 2. **Conservative**: A verdict is never lower than any signal that fed it
//! 3. **Degrades, never fails**: A missing LLM judgment is recorded, not fatal
//! 4. **No I/O**: Judgments arrive through [`ClauseJudge`]; the async side lives in `clauseguard-runtime`
//!
//! ## Example
//!
//! ```rust,ignore
//! use clauseguard_core::{assess, AnalysisConfig, PreparedSource};
//!
//! let source = PreparedSource::prepare(&raw_text, "en", &["Acme Ltd".into()])?;
//! let report = assess(&source, &AnalysisConfig::default())?;
//!
//! for risk in &report.health.top_risks {
//!     println!("clause {}: {} - {}", risk.clause_index, risk.risk_level, risk.explanation);
//! }
//! ```

pub mod config;
pub mod health;
pub mod keywords;
pub mod reconcile;
pub mod rules;
pub mod segment;
pub mod source;
pub mod types;

pub use config::{AnalysisConfig, ConfigError, HealthConfig, SegmentationConfig};
pub use health::HealthAggregator;
pub use reconcile::{risk_score, Reconciler};
pub use rules::{aggregate_level, Rule, RuleEngine};
pub use segment::segment;
pub use source::{clean_text, PartyMap, PreparedSource};
pub use types::{
    AmbiguityFlag, AmbiguityReason, Clause, ClauseConflict, ClauseVerdict, ContractHealth,
    ContractReport, ContractSummary, ContractType, JudgmentOutcome, Language, LlmFailure, LlmJudgment, RiskLevel,
    RuleFinding, TopRisk, UnknownRiskLevel,
};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Fatal errors. Any of these aborts the analysis before a report exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Source preparation failed: {0}")]
    SourcePreparationFailed(String),

    #[error("Contract is empty or cannot be segmented: {0}")]
    EmptyOrUnsegmentableContract(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Synchronous source of per-clause judgments.
///
/// The runtime crate resolves judgments asynchronously and hands them to
/// [`assemble_report`] directly; this trait exists for callers (and tests)
/// that already have an answer for each clause.
pub trait ClauseJudge {
    fn judge(&self, clause: &Clause) -> JudgmentOutcome;
}

/// Judge that never answers. Every verdict is driven by rules alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesOnly;

impl ClauseJudge for RulesOnly {
    fn judge(&self, _clause: &Clause) -> JudgmentOutcome {
        JudgmentOutcome::unavailable(LlmFailure::Disabled)
    }
}

impl<F> ClauseJudge for F
where
    F: Fn(&Clause) -> JudgmentOutcome,
{
    fn judge(&self, clause: &Clause) -> JudgmentOutcome {
        self(clause)
    }
}

/// Rules-only assessment with the built-in catalog, stamped with the current time.
///
/// For reproducible reports use [`assess_at`].
pub fn assess(source: &PreparedSource, config: &AnalysisConfig) -> Result<ContractReport, AnalysisError> {
    assess_at(source, config, &RulesOnly, Utc::now())
}

/// Assess a prepared contract with the built-in catalog and an explicit timestamp.
///
/// See [`assess_with`] for a custom catalog.
pub fn assess_at(
    source: &PreparedSource,
    config: &AnalysisConfig,
    judge: &dyn ClauseJudge,
    analyzed_at: DateTime<Utc>,
) -> Result<ContractReport, AnalysisError> {
    assess_with(&RuleEngine::new(), source, config, judge, analyzed_at)
}

/// Assess a prepared contract against `engine`, e.g. a catalog extended
/// with [`RuleEngine::with_rule`].
///
/// This function is fully deterministic: same inputs always produce same output.
///
/// # Errors
///
/// * `InvalidConfig` when `config` fails validation
/// * `EmptyOrUnsegmentableContract` when no clause can be produced
pub fn assess_with(
    engine: &RuleEngine,
    source: &PreparedSource,
    config: &AnalysisConfig,
    judge: &dyn ClauseJudge,
    analyzed_at: DateTime<Utc>,
) -> Result<ContractReport, AnalysisError> {
    config.validate()?;

    let clauses = segment(&source.text, &config.segmentation)?;
    let findings: Vec<Vec<RuleFinding>> = clauses.iter().map(|c| engine.evaluate(c)).collect();
    let outcomes: Vec<JudgmentOutcome> = clauses.iter().map(|c| judge.judge(c)).collect();

    Ok(assemble_report(
        source,
        config,
        engine,
        clauses,
        findings,
        outcomes,
        false,
        analyzed_at,
    ))
}

/// Reconcile every clause and aggregate the verdicts into a report.
///
/// `findings` and `outcomes` are indexed like `clauses`. A clause without
/// an outcome is treated as timed out.
#[allow(clippy::too_many_arguments)]
pub fn assemble_report(
    source: &PreparedSource,
    config: &AnalysisConfig,
    engine: &RuleEngine,
    clauses: Vec<Clause>,
    findings: Vec<Vec<RuleFinding>>,
    outcomes: Vec<JudgmentOutcome>,
    timed_out: bool,
    analyzed_at: DateTime<Utc>,
) -> ContractReport {
    let reconciler = Reconciler::new(engine);
    let mut findings = findings.into_iter();
    let mut outcomes = outcomes.into_iter();

    let verdicts: Vec<ClauseVerdict> = clauses
        .iter()
        .map(|clause| {
            let clause_findings = findings.next().unwrap_or_default();
            let outcome = outcomes
                .next()
                .unwrap_or_else(|| JudgmentOutcome::unavailable(LlmFailure::TimedOut));
            reconciler.reconcile(clause, &clause_findings, &outcome)
        })
        .collect();

    let health = HealthAggregator::new(config.contract_type, &config.health).aggregate(&clauses, &verdicts);
    let degraded_clause_count = verdicts.iter().filter(|v| !v.llm_available).count();

    ContractReport {
        schema_version: ContractReport::SCHEMA_VERSION.to_string(),
        analyzed_at,
        contract_type: config.contract_type,
        source_language: source.language.clone(),
        document_word_count: source.word_count(),
        clauses,
        verdicts,
        health,
        degraded_clause_count,
        timed_out,
        party_map: source.party_map.entries().clone(),
        summary: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    const SERVICE_CONTRACT: &str = "\
1. Services. The Provider shall deliver the consulting services described in Schedule A to the Client in a professional manner.

2. Payment. The Client shall pay each invoice within 30 days of receipt, and late amounts accrue interest at an interest rate of 36% per annum.

3. Liability. The Vendor shall have unlimited liability for any damages arising out of or in connection with the performance of this agreement.

4. Confidentiality. Each party shall keep the other party's confidential information secret and use it only for the purposes of this agreement.

5. Governing Law. This agreement is governed by the laws of England and Wales and the courts of London have exclusive jurisdiction.";

    #[test]
    fn test_rules_only_assessment() {
        let source = PreparedSource::new(SERVICE_CONTRACT, "en");
        let report = assess_at(&source, &AnalysisConfig::default(), &RulesOnly, fixed_time()).unwrap();

        assert_eq!(report.schema_version, "1.0");
        assert_eq!(report.clauses.len(), 5);
        assert_eq!(report.verdicts.len(), report.clauses.len());
        assert_eq!(report.degraded_clause_count, 5);
        assert!(!report.timed_out);

        let liability = report.verdict(2).unwrap();
        assert_eq!(liability.final_risk_level, RiskLevel::High);
        assert!(!liability.llm_available);
        assert!(liability.contributing_rule_ids.contains(&"unlimited_liability".to_string()));

        assert_eq!(report.health.overall_risk, RiskLevel::High);
        assert_eq!(report.health.top_risks[0].clause_index, 2);
    }

    #[test]
    fn test_missing_termination_lowers_completeness() {
        let source = PreparedSource::new(SERVICE_CONTRACT, "en");
        let config = AnalysisConfig::for_contract_type(ContractType::Service);
        let report = assess_at(&source, &config, &RulesOnly, fixed_time()).unwrap();

        assert!(report.health.completeness_score < 100);
        assert!(report
            .health
            .missing_checklist_items
            .iter()
            .any(|item| item.to_lowercase().contains("termination")));
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let source = PreparedSource::new(SERVICE_CONTRACT, "en");
        let config = AnalysisConfig::default();

        let first = assess_at(&source, &config, &RulesOnly, fixed_time()).unwrap();
        let second = assess_at(&source, &config, &RulesOnly, fixed_time()).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_llm_judgment_can_raise_but_not_lower() {
        let source = PreparedSource::new(SERVICE_CONTRACT, "en");
        let judge = |_: &Clause| {
            JudgmentOutcome::available(LlmJudgment {
                risk_level: RiskLevel::Medium,
                explanation: "Reviewed.".to_string(),
                risk_reason: None,
                alternative_wording: None,
                affected_party: "Client".to_string(),
                negotiation_tip: "Ask for balance.".to_string(),
            })
        };

        let report = assess_at(&source, &AnalysisConfig::default(), &judge, fixed_time()).unwrap();

        assert_eq!(report.degraded_clause_count, 0);
        assert_eq!(report.verdict(0).unwrap().final_risk_level, RiskLevel::Medium);
        assert_eq!(report.verdict(2).unwrap().final_risk_level, RiskLevel::High);
    }

    #[test]
    fn test_empty_source_is_fatal() {
        let source = PreparedSource::new("   \n\n  ", "en");
        let result = assess_at(&source, &AnalysisConfig::default(), &RulesOnly, fixed_time());
        assert!(matches!(result, Err(AnalysisError::EmptyOrUnsegmentableContract(_))));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let source = PreparedSource::new(SERVICE_CONTRACT, "en");
        let mut config = AnalysisConfig::default();
        config.segmentation.max_clause_len = 0;

        let result = assess_at(&source, &config, &RulesOnly, fixed_time());
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_party_map_carried_into_report() {
        let source = PreparedSource::prepare(
            "1. Services. Acme Ltd shall provide the services to Beta Corp in accordance with the statement of work agreed between them.",
            "en",
            &["Acme Ltd".to_string(), "Beta Corp".to_string()],
        )
        .unwrap();

        let report = assess_at(&source, &AnalysisConfig::default(), &RulesOnly, fixed_time()).unwrap();

        assert!(report.clauses[0].text.contains("PARTY_1"));
        assert!(!report.clauses[0].text.contains("Acme"));
        assert_eq!(report.party_map.get("PARTY_2").map(String::as_str), Some("Beta Corp"));
    }

    #[test]
    fn test_custom_rule_reaches_synchronous_assessment() {
        fn external_schedule(text: &str) -> Option<String> {
            text.contains("Schedule A").then(|| "Schedule A".to_string())
        }

        let engine = RuleEngine::new().with_rule(Rule::new(
            "schedule_reference",
            RiskLevel::Medium,
            "Obligations are defined outside the contract body.",
            "Attach every referenced schedule before signing.",
            external_schedule,
        ));
        let source = PreparedSource::new(SERVICE_CONTRACT, "en");

        let report = assess_with(&engine, &source, &AnalysisConfig::default(), &RulesOnly, fixed_time()).unwrap();
        let services = report.verdict(0).unwrap();
        assert_eq!(services.final_risk_level, RiskLevel::Medium);
        assert_eq!(services.contributing_rule_ids, vec!["schedule_reference"]);
        assert_eq!(
            services.negotiation_tip.as_deref(),
            Some("Attach every referenced schedule before signing.")
        );

        let default = assess_at(&source, &AnalysisConfig::default(), &RulesOnly, fixed_time()).unwrap();
        assert_eq!(default.verdict(0).unwrap().final_risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_report_splits_rule_and_llm_overall_risk() {
        let source = PreparedSource::new(SERVICE_CONTRACT, "en");
        let rules_only = assess_at(&source, &AnalysisConfig::default(), &RulesOnly, fixed_time()).unwrap();
        assert_eq!(rules_only.health.overall_risk_rules, RiskLevel::High);
        assert_eq!(rules_only.health.overall_risk_llm, None);
        assert!(!rules_only.health.negotiation_insights.is_empty());
        assert!(rules_only.summary.is_none());
        assert!(rules_only.verdict(2).unwrap().final_risk_score >= 0.67);
    }
}
