//! Rule Engine: a registered catalog of independent risk matchers.
//!
//! Each rule is a pure predicate over clause text with a fixed risk level.
//! Rules never see each other's results and may all fire on one clause.
//!
//! ## Rule Independence
//!
//! - No matcher ordering dependency; findings are emitted in catalog order
//! - No shared mutable state between matchers
//! - Same clause text always yields the same findings

mod catalog;

pub use catalog::default_rules;

use std::fmt;

use crate::types::{Clause, RiskLevel, RuleFinding};

/// Matcher signature: returns the matched excerpt when the rule fires.
pub type Matcher = fn(&str) -> Option<String>;

/// Longest excerpt quoted in a rationale.
const MAX_EXCERPT_CHARS: usize = 80;

/// One catalog entry.
#[derive(Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub risk_level: RiskLevel,

    /// Human-readable rationale template
    pub description: &'static str,

    /// Advice used when no LLM judgment is available
    pub negotiation_tip: &'static str,

    matcher: Matcher,
}

impl Rule {
    pub fn new(
        id: &'static str,
        risk_level: RiskLevel,
        description: &'static str,
        negotiation_tip: &'static str,
        matcher: Matcher,
    ) -> Self {
        Self {
            id,
            risk_level,
            description,
            negotiation_tip,
            matcher,
        }
    }

    /// Run the matcher. Emits exactly one finding when the rule fires.
    pub fn check(&self, text: &str) -> Option<RuleFinding> {
        (self.matcher)(text).map(|excerpt| RuleFinding {
            rule_id: self.id.to_string(),
            risk_level: self.risk_level,
            rationale: self.rationale(&excerpt),
        })
    }

    fn rationale(&self, excerpt: &str) -> String {
        let excerpt = excerpt.trim();
        if excerpt.chars().count() > MAX_EXCERPT_CHARS {
            let cut: String = excerpt.chars().take(MAX_EXCERPT_CHARS).collect();
            format!("{} Matched: \"{}...\"", self.description, cut.trim_end())
        } else {
            format!("{} Matched: \"{}\"", self.description, excerpt)
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("risk_level", &self.risk_level)
            .field("description", &self.description)
            .finish()
    }
}

/// Evaluates clauses against the rule catalog.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    /// Engine with the built-in catalog.
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// Engine with no rules registered.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a rule. A rule with the same ID is replaced in place.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        match self.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn evaluate(&self, clause: &Clause) -> Vec<RuleFinding> {
        self.evaluate_text(&clause.text)
    }

    pub fn evaluate_text(&self, text: &str) -> Vec<RuleFinding> {
        self.rules.iter().filter_map(|rule| rule.check(text)).collect()
    }
}

/// Highest risk level among findings, `None` when nothing fired.
pub fn aggregate_level(findings: &[RuleFinding]) -> Option<RiskLevel> {
    findings.iter().map(|f| f.risk_level).max()
}
