//! Core types for clause risk assessment.
//!
//! These types are the data structures passed between the segmenter, the
//! rule engine, the reconciler and the health aggregator, and the report
//! handed to whatever renders results for the user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Risk level of a clause or rule.
///
/// Ordered `Low < Medium < High` so that `max` is the conservative merge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the three risk levels.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown risk level '{0}' (expected Low, Medium or High)")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    /// Accepts exactly `low`, `medium` or `high`, ignoring case and
    /// surrounding whitespace. Anything else is rejected, never coerced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(UnknownRiskLevel(s.to_string())),
        }
    }
}

/// The kind of contract, selected upstream. Drives the completeness checklist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    Employment,
    Vendor,
    Lease,
    Partnership,
    #[default]
    Service,
}

impl ContractType {
    pub const ALL: [ContractType; 5] = [
        ContractType::Employment,
        ContractType::Vendor,
        ContractType::Lease,
        ContractType::Partnership,
        ContractType::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Employment => "employment",
            ContractType::Vendor => "vendor",
            ContractType::Lease => "lease",
            ContractType::Partnership => "partnership",
            ContractType::Service => "service",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContractType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown contract type '{}' (expected employment, vendor, lease, partnership or service)",
                    s
                )
            })
    }
}

/// Language an explanation should be written in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    Hindi,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
        }
    }
}

/// One ordered unit of contract text.
///
/// Created once by the segmenter and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Clause {
    /// 0-based position in the contract
    pub index: usize,

    /// Numbered heading (e.g. "3.2") when one was detected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_label: Option<String>,

    /// Anonymized clause body, heading number included
    pub text: String,
}

impl Clause {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Output of one rule matcher against one clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleFinding {
    /// Catalog ID of the rule (e.g. "unlimited_liability")
    pub rule_id: String,

    /// Fixed level assigned to the rule
    pub risk_level: RiskLevel,

    /// Rule description filled with the matched text
    pub rationale: String,
}

/// Structured judgment returned by the external language service for one clause.
///
/// Either fully populated or absent; the adapter rejects partial responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmJudgment {
    pub risk_level: RiskLevel,

    /// Plain-language explanation of the clause
    pub explanation: String,

    /// Why the level was chosen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_reason: Option<String>,

    /// Safer alternative wording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_wording: Option<String>,

    /// Party that bears the risk (e.g. "Client", "Both Parties")
    pub affected_party: String,

    pub negotiation_tip: String,
}

/// Why no LLM judgment is available for a clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LlmFailure {
    /// Transport or rate-limit failures exhausted every retry
    Unavailable { attempts: u32, last_error: String },

    /// The service answered but the response was malformed
    ValidationFailed { detail: String },

    /// The overall analysis deadline passed before the judgment arrived
    TimedOut,

    /// No language service was configured (rules-only analysis)
    Disabled,
}

impl LlmFailure {
    /// Short human-readable reason, used in rule-only explanations.
    pub fn describe(&self) -> String {
        match self {
            LlmFailure::Unavailable { attempts, .. } => {
                format!("the language service was unavailable after {} attempt(s)", attempts)
            }
            LlmFailure::ValidationFailed { .. } => {
                "the language service returned a malformed judgment".to_string()
            }
            LlmFailure::TimedOut => "the analysis time limit was reached".to_string(),
            LlmFailure::Disabled => "automated judgment is disabled".to_string(),
        }
    }
}

impl fmt::Display for LlmFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmFailure::Unavailable { attempts, last_error } => {
                write!(f, "LLM unavailable after {} attempt(s): {}", attempts, last_error)
            }
            LlmFailure::ValidationFailed { detail } => write!(f, "LLM response failed validation: {}", detail),
            LlmFailure::TimedOut => write!(f, "LLM judgment timed out"),
            LlmFailure::Disabled => write!(f, "LLM judgment disabled"),
        }
    }
}

/// Result of asking for an LLM judgment on one clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JudgmentOutcome {
    Available { judgment: LlmJudgment },
    Unavailable { failure: LlmFailure },
}

impl JudgmentOutcome {
    pub fn available(judgment: LlmJudgment) -> Self {
        JudgmentOutcome::Available { judgment }
    }

    pub fn unavailable(failure: LlmFailure) -> Self {
        JudgmentOutcome::Unavailable { failure }
    }

    pub fn judgment(&self) -> Option<&LlmJudgment> {
        match self {
            JudgmentOutcome::Available { judgment } => Some(judgment),
            JudgmentOutcome::Unavailable { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&LlmFailure> {
        match self {
            JudgmentOutcome::Available { .. } => None,
            JudgmentOutcome::Unavailable { failure } => Some(failure),
        }
    }
}

/// The reconciled, authoritative assessment of one clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClauseVerdict {
    pub clause_index: usize,

    /// Never lower than either the rule level or the LLM level
    pub final_risk_level: RiskLevel,

    /// 0.0-1.0, banded by `final_risk_level` (see [`crate::reconcile::risk_score`])
    pub final_risk_score: f64,

    /// Highest level among fired rules, if any fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_risk_level: Option<RiskLevel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_risk_level: Option<RiskLevel>,

    /// Every rule that fired, in catalog order
    #[serde(default)]
    pub contributing_rule_ids: Vec<String>,

    pub llm_available: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_failure: Option<LlmFailure>,

    pub explanation: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_wording: Option<String>,

    pub affected_party: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub negotiation_tip: Option<String>,
}

/// Two clauses whose extracted obligations contradict each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClauseConflict {
    /// Lower clause index of the pair
    pub first: usize,

    /// Higher clause index of the pair
    pub second: usize,

    /// Obligation the two clauses disagree on (e.g. "termination notice")
    pub topic: String,

    pub explanation: String,
}

impl ClauseConflict {
    pub fn pair(&self) -> (usize, usize) {
        (self.first, self.second)
    }
}

/// Why a clause was flagged as ambiguous.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmbiguityReason {
    /// Vague wording with no defining clause anywhere in the contract
    VagueTerm { term: String },

    /// Near-duplicate of another, non-adjacent clause
    NearDuplicate { other_index: usize, similarity: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmbiguityFlag {
    pub clause_index: usize,
    pub reason: AmbiguityReason,
}

/// One of the highest-severity verdicts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopRisk {
    pub clause_index: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_label: Option<String>,

    pub risk_level: RiskLevel,

    pub explanation: String,
}

/// Contract-wide health metrics computed from all verdicts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractHealth {
    /// 0-100, share of checklist items covered
    pub completeness_score: u8,

    #[serde(default)]
    pub missing_checklist_items: Vec<String>,

    #[serde(default)]
    pub conflicts: Vec<ClauseConflict>,

    #[serde(default)]
    pub ambiguity_flags: Vec<AmbiguityFlag>,

    #[serde(default)]
    pub ambiguous_clause_indices: BTreeSet<usize>,

    /// At most `top_risk_count` entries, highest level first, lower index on ties
    #[serde(default)]
    pub top_risks: Vec<TopRisk>,

    /// Distinct negotiation tips of the top risks, in top-risk order
    #[serde(default)]
    pub negotiation_insights: Vec<String>,

    pub overall_risk: RiskLevel,

    /// Highest level among fired rules, Low when none fired
    pub overall_risk_rules: RiskLevel,

    /// Highest level among available LLM judgments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_risk_llm: Option<RiskLevel>,
}

/// Contract-level summary written by the language service.
///
/// Optional: a report without one is complete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractSummary {
    /// Plain-language overview of purpose, parties and key terms
    pub business_summary: String,

    #[serde(default)]
    pub key_risks: Vec<String>,

    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Aggregate result of one analysis run.
///
/// Owned by the caller and never persisted by the engine itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractReport {
    pub schema_version: String,

    pub analyzed_at: DateTime<Utc>,

    pub contract_type: ContractType,

    pub source_language: String,

    pub document_word_count: usize,

    pub clauses: Vec<Clause>,

    /// 1:1 with `clauses`, same order
    pub verdicts: Vec<ClauseVerdict>,

    #[serde(flatten)]
    pub health: ContractHealth,

    /// Verdicts produced without an LLM judgment
    pub degraded_clause_count: usize,

    /// True when the overall deadline cut LLM judgments short
    #[serde(default)]
    pub timed_out: bool,

    /// Placeholder to original party name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub party_map: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ContractSummary>,
}

impl ContractReport {
    pub const SCHEMA_VERSION: &'static str = "1.0";

    /// Conflicting clause index pairs.
    pub fn conflict_pairs(&self) -> BTreeSet<(usize, usize)> {
        self.health.conflicts.iter().map(ClauseConflict::pair).collect()
    }

    pub fn verdict(&self, clause_index: usize) -> Option<&ClauseVerdict> {
        self.verdicts.get(clause_index)
    }
}
