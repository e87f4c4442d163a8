//! Prompt construction for clause judgments and the contract summary.

use clauseguard_core::{Clause, Language};

use crate::providers::ChatMessage;

const TASK_INSTRUCTION: &str = "\
You are a contract risk analyst for small and medium businesses. \
You review one contract clause at a time and explain it in plain language. \
Rate the clause Low, Medium or High risk for the party signing it, considering \
obligations, penalties, liability exposure, termination rights and ambiguity.";

const FAIRNESS_POLICY: &str = "\
Base the assessment only on contractual content: obligations, rights, liabilities, \
payment terms, termination conditions, intellectual property and dispute resolution. \
Never let names, nationality, gender, ethnicity, religion or any other demographic \
or identity attribute influence the rating. Placeholders such as PARTY_1 are neutral.";

const RESPONSE_SCHEMA: &str = r#"Respond with a single JSON object and nothing else:
{
  "risk_level": "Low" | "Medium" | "High",
  "explanation": "what the clause means in simple business terms",
  "risk_reason": "the specific obligation, penalty, liability or ambiguity behind the rating",
  "alternative_wording": "a fairer version of the clause",
  "affected_party": "the party bearing the risk, e.g. Client, Vendor or Both Parties",
  "negotiation_tip": "one concrete point to raise in negotiation"
}"#;

const SUMMARY_INSTRUCTION: &str = "\
You are a senior contract analyst. Summarize the whole contract for a business \
owner who is not a lawyer: its purpose, the parties' main obligations, payment, \
duration, liability, intellectual property, termination and dispute resolution.";

const SUMMARY_SCHEMA: &str = r#"Respond with a single JSON object and nothing else:
{
  "business_summary": "150-250 words in plain language",
  "key_risks": ["the three most important business risks"],
  "recommendations": ["up to three concrete negotiation recommendations"]
}"#;

/// Longest contract excerpt sent for summarization, in characters.
pub const MAX_SUMMARY_INPUT_CHARS: usize = 8000;

/// Output-language instruction. Risk labels always stay English.
pub fn language_instruction(languages: &[Language]) -> String {
    let wants_english = languages.is_empty() || languages.contains(&Language::English);
    let wants_hindi = languages.contains(&Language::Hindi);

    match (wants_english, wants_hindi) {
        (true, true) => "Write every text field in English followed by a Hindi translation \
             in Devanagari script. Keep risk_level in English."
            .to_string(),
        (false, true) => "Write every text field in Hindi using Devanagari script. \
             Keep risk_level and the JSON keys in English."
            .to_string(),
        _ => "Write every text field in clear, simple English.".to_string(),
    }
}

/// System and user messages for one clause.
pub fn build_messages(clause: &Clause, languages: &[Language]) -> Vec<ChatMessage> {
    let system = format!(
        "{}\n\n{}\n\n{}\n\n{}",
        TASK_INSTRUCTION,
        FAIRNESS_POLICY,
        language_instruction(languages),
        RESPONSE_SCHEMA
    );

    let heading = clause
        .heading_label
        .as_deref()
        .map(|label| format!(" (section {})", label))
        .unwrap_or_default();

    let user = format!(
        "Analyze clause {}{} of the contract:\n\n\"\"\"\n{}\n\"\"\"",
        clause.index + 1,
        heading,
        clause.text
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// System and user messages asking for a contract-level summary.
///
/// Contracts longer than [`MAX_SUMMARY_INPUT_CHARS`] are cut at that length.
pub fn build_summary_messages(text: &str, languages: &[Language]) -> Vec<ChatMessage> {
    let system = format!(
        "{}\n\n{}\n\n{}\n\n{}",
        SUMMARY_INSTRUCTION,
        FAIRNESS_POLICY,
        language_instruction(languages),
        SUMMARY_SCHEMA
    );

    let excerpt = match text.char_indices().nth(MAX_SUMMARY_INPUT_CHARS) {
        Some((cut, _)) => &text[..cut],
        None => text,
    };
    let user = format!("Summarize this contract:\n\n\"\"\"\n{}\n\"\"\"", excerpt);

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}
