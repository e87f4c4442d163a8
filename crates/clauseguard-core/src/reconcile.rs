//! Reconciler: merges rule findings and the LLM judgment into one verdict.
//!
//! The reconciler applies a strict, non-configurable conservative policy:
//! 1. `rule_level` = highest level among fired rules, or none
//! 2. LLM available → final = max(rule_level or Low, LLM level)
//! 3. LLM unavailable → final = rule_level, or Low when nothing fired
//! 4. Every fired rule is recorded, whether or not it set the final level
//!
//! A missing LLM signal never suppresses a rule finding, and the LLM can
//! never lower a level a rule established.
//!
//! Each verdict also carries a numeric score. The score lives inside the
//! band of its final level, so ordering by score never contradicts ordering
//! by level; within a band it rises with signal agreement and rule count.

use crate::rules::{aggregate_level, RuleEngine};
use crate::types::{Clause, ClauseVerdict, JudgmentOutcome, LlmFailure, LlmJudgment, RiskLevel, RuleFinding};

/// Affected party reported when no judgment says otherwise.
pub const UNKNOWN_PARTY: &str = "Unclear";

const BAND_FLOOR_MEDIUM: f64 = 0.34;
const BAND_FLOOR_HIGH: f64 = 0.67;
const AGREEMENT_WEIGHT: f64 = 0.12;
const RULE_WEIGHT: f64 = 0.02;
const MAX_COUNTED_RULES: usize = 4;

/// Numeric score in `[0.0, 1.0)` for a reconciled clause.
///
/// Low scores fall in `[0.00, 0.32]`, Medium in `[0.34, 0.66]` and High in
/// `[0.67, 0.99]`. Each signal (rules, LLM) that reached the final level adds
/// 0.12; each fired rule adds 0.02, counting at most four.
pub fn risk_score(
    final_level: RiskLevel,
    rule_level: Option<RiskLevel>,
    llm_level: Option<RiskLevel>,
    fired_rules: usize,
) -> f64 {
    let floor = match final_level {
        RiskLevel::Low => 0.0,
        RiskLevel::Medium => BAND_FLOOR_MEDIUM,
        RiskLevel::High => BAND_FLOOR_HIGH,
    };
    let agreeing = [rule_level, llm_level]
        .iter()
        .filter(|level| **level == Some(final_level))
        .count();
    let score = floor
        + AGREEMENT_WEIGHT * agreeing as f64
        + RULE_WEIGHT * fired_rules.min(MAX_COUNTED_RULES) as f64;

    (score * 100.0).round() / 100.0
}

/// Produces exactly one verdict per clause.
pub struct Reconciler<'a> {
    engine: &'a RuleEngine,
}

impl<'a> Reconciler<'a> {
    /// The engine supplies negotiation tips for rule-only verdicts.
    pub fn new(engine: &'a RuleEngine) -> Self {
        Self { engine }
    }

    pub fn reconcile(&self, clause: &Clause, findings: &[RuleFinding], outcome: &JudgmentOutcome) -> ClauseVerdict {
        let rule_level = aggregate_level(findings);
        let contributing_rule_ids = findings.iter().map(|f| f.rule_id.clone()).collect();

        match outcome {
            JudgmentOutcome::Available { judgment } => {
                self.with_judgment(clause, rule_level, contributing_rule_ids, judgment)
            }
            JudgmentOutcome::Unavailable { failure } => {
                self.rules_only(clause, findings, rule_level, contributing_rule_ids, failure)
            }
        }
    }

    fn with_judgment(
        &self,
        clause: &Clause,
        rule_level: Option<RiskLevel>,
        contributing_rule_ids: Vec<String>,
        judgment: &LlmJudgment,
    ) -> ClauseVerdict {
        let final_risk_level = rule_level.unwrap_or(RiskLevel::Low).max(judgment.risk_level);

        ClauseVerdict {
            clause_index: clause.index,
            final_risk_level,
            final_risk_score: risk_score(
                final_risk_level,
                rule_level,
                Some(judgment.risk_level),
                contributing_rule_ids.len(),
            ),
            rule_risk_level: rule_level,
            llm_risk_level: Some(judgment.risk_level),
            contributing_rule_ids,
            llm_available: true,
            llm_failure: None,
            explanation: judgment.explanation.clone(),
            risk_reason: judgment.risk_reason.clone(),
            alternative_wording: judgment.alternative_wording.clone(),
            affected_party: judgment.affected_party.clone(),
            negotiation_tip: Some(judgment.negotiation_tip.clone()),
        }
    }

    fn rules_only(
        &self,
        clause: &Clause,
        findings: &[RuleFinding],
        rule_level: Option<RiskLevel>,
        contributing_rule_ids: Vec<String>,
        failure: &LlmFailure,
    ) -> ClauseVerdict {
        // Tip from the first rule at the deciding level.
        let negotiation_tip = rule_level.and_then(|level| {
            findings
                .iter()
                .find(|f| f.risk_level == level)
                .and_then(|f| self.engine.rule(&f.rule_id))
                .map(|rule| rule.negotiation_tip.to_string())
        });

        let final_risk_level = rule_level.unwrap_or(RiskLevel::Low);

        ClauseVerdict {
            clause_index: clause.index,
            final_risk_level,
            final_risk_score: risk_score(final_risk_level, rule_level, None, findings.len()),
            rule_risk_level: rule_level,
            llm_risk_level: None,
            contributing_rule_ids,
            llm_available: false,
            llm_failure: Some(failure.clone()),
            explanation: rule_only_explanation(findings, failure),
            risk_reason: Some(format!("Automated analysis unavailable: {}.", failure.describe())),
            alternative_wording: None,
            affected_party: UNKNOWN_PARTY.to_string(),
            negotiation_tip,
        }
    }
}

/// Templated explanation built from fired rule rationales.
fn rule_only_explanation(findings: &[RuleFinding], failure: &LlmFailure) -> String {
    if findings.is_empty() {
        return format!(
            "Rule-based assessment only ({}). No known risk pattern was detected; manual review is advised.",
            failure.describe()
        );
    }

    let rationales: Vec<&str> = findings.iter().map(|f| f.rationale.as_str()).collect();
    format!(
        "Rule-based assessment only ({}). {}",
        failure.describe(),
        rationales.join(" ")
    )
}
