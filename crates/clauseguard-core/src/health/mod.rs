//! Health Aggregator: contract-wide metrics computed from all verdicts.
//!
//! Consumes the ordered clause and verdict sequences only after every
//! clause has been reconciled. Completeness, conflicts and ambiguity look
//! at clause text; overall risk, its rules/LLM split, top risks and
//! negotiation insights look at verdicts.

pub mod ambiguity;
pub mod checklist;
pub mod conflicts;

pub use ambiguity::{detect_ambiguity, VAGUE_TERMS};
pub use checklist::{checklist, completeness, ChecklistItem};
pub use conflicts::{detect_conflicts, ObligationTopic};

use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::config::HealthConfig;
use crate::types::{Clause, ClauseVerdict, ContractHealth, ContractType, RiskLevel, TopRisk};

pub struct HealthAggregator<'a> {
    contract_type: ContractType,
    config: &'a HealthConfig,
}

impl<'a> HealthAggregator<'a> {
    pub fn new(contract_type: ContractType, config: &'a HealthConfig) -> Self {
        Self { contract_type, config }
    }

    pub fn aggregate(&self, clauses: &[Clause], verdicts: &[ClauseVerdict]) -> ContractHealth {
        let (completeness_score, missing_checklist_items) = completeness(checklist(self.contract_type), clauses);
        let ambiguity_flags = detect_ambiguity(clauses, self.config);
        let ambiguous_clause_indices: BTreeSet<usize> = ambiguity_flags.iter().map(|f| f.clause_index).collect();
        let top_risks = top_risks(clauses, verdicts, self.config.top_risk_count);

        ContractHealth {
            completeness_score,
            missing_checklist_items,
            conflicts: detect_conflicts(clauses),
            ambiguity_flags,
            ambiguous_clause_indices,
            negotiation_insights: negotiation_insights(&top_risks, verdicts),
            top_risks,
            overall_risk: overall_risk(verdicts),
            overall_risk_rules: overall_risk_rules(verdicts),
            overall_risk_llm: overall_risk_llm(verdicts),
        }
    }
}

/// Highest final level across verdicts, Low when there are none.
pub fn overall_risk(verdicts: &[ClauseVerdict]) -> RiskLevel {
    verdicts
        .iter()
        .map(|v| v.final_risk_level)
        .max()
        .unwrap_or(RiskLevel::Low)
}

/// Highest rule level across verdicts, Low when no rule fired.
pub fn overall_risk_rules(verdicts: &[ClauseVerdict]) -> RiskLevel {
    verdicts
        .iter()
        .filter_map(|v| v.rule_risk_level)
        .max()
        .unwrap_or(RiskLevel::Low)
}

/// Highest LLM level across verdicts, `None` when no judgment was available.
pub fn overall_risk_llm(verdicts: &[ClauseVerdict]) -> Option<RiskLevel> {
    verdicts.iter().filter_map(|v| v.llm_risk_level).max()
}

/// Distinct negotiation tips of the top risks, first occurrence wins.
pub fn negotiation_insights(top_risks: &[TopRisk], verdicts: &[ClauseVerdict]) -> Vec<String> {
    let mut insights: Vec<String> = Vec::new();
    for risk in top_risks {
        let tip = verdicts
            .iter()
            .find(|v| v.clause_index == risk.clause_index)
            .and_then(|v| v.negotiation_tip.as_deref())
            .map(str::trim)
            .filter(|tip| !tip.is_empty());

        if let Some(tip) = tip {
            if !insights.iter().any(|seen| seen == tip) {
                insights.push(tip.to_string());
            }
        }
    }
    insights
}

/// The `limit` most severe non-Low verdicts, lower clause index first on ties.
pub fn top_risks(clauses: &[Clause], verdicts: &[ClauseVerdict], limit: usize) -> Vec<TopRisk> {
    let mut ranked: Vec<&ClauseVerdict> = verdicts
        .iter()
        .filter(|v| v.final_risk_level > RiskLevel::Low)
        .collect();
    ranked.sort_by_key(|v| (Reverse(v.final_risk_level), v.clause_index));

    ranked
        .into_iter()
        .take(limit)
        .map(|verdict| TopRisk {
            clause_index: verdict.clause_index,
            heading_label: clauses
                .iter()
                .find(|c| c.index == verdict.clause_index)
                .and_then(|c| c.heading_label.clone()),
            risk_level: verdict.final_risk_level,
            explanation: verdict.explanation.clone(),
        })
        .collect()
}
