//! Source text preparation.
//!
//! Extraction from PDF/DOCX happens upstream. This module only normalizes
//! the extracted text and swaps caller-supplied party names for stable
//! placeholders before the segmenter sees it.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::AnalysisError;

lazy_static! {
    static ref TRAILING_SPACE: Regex = Regex::new(r"[ \t]+\n").unwrap();
    static ref EXCESS_NEWLINES: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref SPACE_RUNS: Regex = Regex::new(r"[ \t]+").unwrap();
}

/// Normalize whitespace and typography of extracted text.
///
/// Paragraph breaks (blank lines) survive; everything else collapses.
pub fn clean_text(raw: &str) -> String {
    let text = raw
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{a0}', " ")
        .replace(&['•', '·'][..], "-")
        .replace(&['\u{201c}', '\u{201d}'][..], "\"")
        .replace(&['\u{2018}', '\u{2019}'][..], "'");

    let text = TRAILING_SPACE.replace_all(&text, "\n");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}

/// Mapping from placeholder (`PARTY_1`, ...) to original party name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartyMap {
    entries: BTreeMap<String, String>,
}

impl PartyMap {
    /// Replace every whole-word occurrence of each party name with a placeholder.
    ///
    /// Placeholders are numbered in the order the names are given; longer
    /// names are substituted first so "Acme Holdings" wins over "Acme".
    /// Word boundaries are only required on sides where the name starts or
    /// ends with a word character, so "Beta Co." still matches.
    ///
    /// Fails with `SourcePreparationFailed` when a name cannot be turned
    /// into a matcher (e.g. it exceeds the regex size limit).
    pub fn anonymize(text: &str, parties: &[String]) -> Result<(String, PartyMap), AnalysisError> {
        let mut named: Vec<(String, String)> = Vec::new();
        for name in parties.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            if named.iter().any(|(_, existing)| existing == name) {
                continue;
            }
            named.push((format!("PARTY_{}", named.len() + 1), name.to_string()));
        }

        let mut by_length = named.clone();
        by_length.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let mut out = text.to_string();
        for (placeholder, name) in &by_length {
            let re = Regex::new(&party_pattern(name)).map_err(|e| {
                AnalysisError::SourcePreparationFailed(format!("party name '{}' cannot be matched: {}", name, e))
            })?;
            out = re.replace_all(&out, placeholder.as_str()).into_owned();
        }

        Ok((out, PartyMap { entries: named.into_iter().collect() }))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries.get(placeholder).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

fn party_pattern(name: &str) -> String {
    let is_word = |c: Option<char>| c.map_or(false, |c| c.is_alphanumeric() || c == '_');
    let start = if is_word(name.chars().next()) { r"\b" } else { "" };
    let end = if is_word(name.chars().last()) { r"\b" } else { "" };
    format!("{}{}{}", start, regex::escape(name), end)
}

/// Cleaned, anonymized contract text ready for the segmenter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreparedSource {
    pub text: String,

    /// Language tag of the original document (e.g. "en")
    pub language: String,

    #[serde(default)]
    pub party_map: PartyMap,
}

impl PreparedSource {
    /// Wrap text that was already cleaned and anonymized upstream.
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            party_map: PartyMap::default(),
        }
    }

    /// Clean raw extracted text and anonymize the given party names.
    ///
    /// Fails with `SourcePreparationFailed` when the input is not text at all.
    pub fn prepare(raw: &str, language: &str, parties: &[String]) -> Result<Self, AnalysisError> {
        if raw.contains('\0') {
            return Err(AnalysisError::SourcePreparationFailed(
                "input contains NUL bytes; text extraction appears to have failed".to_string(),
            ));
        }

        let cleaned = clean_text(raw);
        let (text, party_map) = PartyMap::anonymize(&cleaned, parties)?;

        Ok(Self {
            text,
            language: language.to_string(),
            party_map,
        })
    }

    /// Like [`prepare`](Self::prepare), for raw bytes from a file or pipe.
    ///
    /// Bytes that are not valid UTF-8 are rejected, never replaced.
    pub fn from_bytes(raw: &[u8], language: &str, parties: &[String]) -> Result<Self, AnalysisError> {
        let text = std::str::from_utf8(raw).map_err(|e| {
            AnalysisError::SourcePreparationFailed(format!(
                "input is not valid UTF-8 text ({}); text extraction appears to have failed",
                e
            ))
        })?;
        Self::prepare(text, language, parties)
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
