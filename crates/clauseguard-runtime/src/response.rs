//! Strict validation of judgment and summary responses.
//!
//! A response is accepted only when every required field is present and
//! non-empty and `risk_level` is exactly Low, Medium or High. Partial
//! judgments are rejected; no field is ever defaulted.

use clauseguard_core::{ContractSummary, LlmJudgment, RiskLevel};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("response contains no JSON object")]
    NoJsonObject,

    #[error("malformed JSON: {0}")]
    Malformed(String),

    #[error("missing or empty required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid risk_level `{0}`")]
    InvalidRiskLevel(String),
}

#[derive(Debug, Deserialize)]
struct RawJudgment {
    risk_level: Option<String>,
    #[serde(alias = "plain_english_explanation")]
    explanation: Option<String>,
    risk_reason: Option<String>,
    #[serde(alias = "suggested_alternative_clause")]
    alternative_wording: Option<String>,
    affected_party: Option<String>,
    #[serde(alias = "negotiation_insight")]
    negotiation_tip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    #[serde(alias = "summary")]
    business_summary: Option<String>,
    #[serde(default, alias = "top_3_business_risks")]
    key_risks: Vec<String>,
    #[serde(default, alias = "negotiation_recommendations")]
    recommendations: Vec<String>,
}

/// Text between the first `{` and the last `}`, after dropping code fences.
pub fn extract_json_object(content: &str) -> Option<&str> {
    let trimmed = strip_code_fence(content.trim());
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end).then(|| &trimmed[start..=end])
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") up to the first newline.
    let body = rest.find('\n').map(|i| &rest[i + 1..]).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse and validate a raw completion into a judgment.
pub fn parse_judgment(content: &str) -> Result<LlmJudgment, ValidationError> {
    let json = extract_json_object(content).ok_or(ValidationError::NoJsonObject)?;
    let raw: RawJudgment = serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let level = required(raw.risk_level, "risk_level")?;
    let risk_level: RiskLevel = level
        .parse()
        .map_err(|_| ValidationError::InvalidRiskLevel(level.clone()))?;

    Ok(LlmJudgment {
        risk_level,
        explanation: required(raw.explanation, "explanation")?,
        risk_reason: optional(raw.risk_reason),
        alternative_wording: optional(raw.alternative_wording),
        affected_party: required(raw.affected_party, "affected_party")?,
        negotiation_tip: required(raw.negotiation_tip, "negotiation_tip")?,
    })
}

/// Parse and validate a raw completion into a contract summary.
///
/// `business_summary` is required; blank list entries are dropped.
pub fn parse_summary(content: &str) -> Result<ContractSummary, ValidationError> {
    let json = extract_json_object(content).ok_or(ValidationError::NoJsonObject)?;
    let raw: RawSummary = serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let non_blank = |items: Vec<String>| -> Vec<String> { items.into_iter().filter_map(|i| optional(Some(i))).collect() };

    Ok(ContractSummary {
        business_summary: required(raw.business_summary, "business_summary")?,
        key_risks: non_blank(raw.key_risks),
        recommendations: non_blank(raw.recommendations),
    })
}
