//! Clause segmentation.
//!
//! Splits prepared contract text into ordered clauses:
//!
//! 1. Numbered headings (`1.`, `3.2`, `Section 4:`, `Article 7`) start a new clause.
//!    The heading stays in the clause text. Text before the first heading is its own clause.
//! 2. Without any heading, blank lines separate clauses.
//! 3. Fragments under `min_clause_words` are merged into the preceding clause
//!    (the first fragment merges forward instead).
//! 4. Clauses over `max_clause_len` characters are split recursively at the
//!    sentence boundary nearest their midpoint.
//!
//! Every non-whitespace character of the input lands in exactly one clause.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::SegmentationConfig;
use crate::types::Clause;
use crate::AnalysisError;

lazy_static! {
    /// Numbered heading at the start of a line.
    ///
    /// Bare numbers ("30 days") are not headings: a trailing dot, a dotted
    /// multi-level number or a Section/Article/Clause prefix is required.
    static ref HEADING: Regex = Regex::new(
        r"(?m)^[ \t]*(?:(?i:section|article|clause)[ \t]+(\d+(?:\.\d+)*)[ \t]*[:.\-]?|(\d+\.(?:\d+\.?)*))(?:[ \t]+|$)"
    ).unwrap();

    static ref BLANK_LINE: Regex = Regex::new(r"\n[ \t]*\n").unwrap();

    /// End of a sentence: terminal punctuation, optional closing quote or bracket, whitespace.
    static ref SENTENCE_END: Regex = Regex::new(r#"[.;!?]["')\]]?\s+"#).unwrap();
}

/// A clause before indices are assigned.
#[derive(Debug, Clone)]
struct Fragment {
    label: Option<String>,
    text: String,
}

impl Fragment {
    fn words(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Segment prepared text into ordered clauses.
///
/// # Errors
///
/// `EmptyOrUnsegmentableContract` when the text holds no words at all.
pub fn segment(text: &str, config: &SegmentationConfig) -> Result<Vec<Clause>, AnalysisError> {
    config.validate()?;

    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyOrUnsegmentableContract(
            "contract text is empty".to_string(),
        ));
    }

    let mut fragments = split_on_headings(text);
    if fragments.is_empty() {
        fragments = split_on_paragraphs(text);
    }

    let merged = merge_short(fragments, config.min_clause_words);

    let mut clauses = Vec::new();
    for fragment in merged {
        for piece in split_long(&fragment.text, config.max_clause_len) {
            clauses.push(Clause {
                index: clauses.len(),
                heading_label: fragment.label.clone(),
                text: piece,
            });
        }
    }

    if clauses.is_empty() {
        return Err(AnalysisError::EmptyOrUnsegmentableContract(
            "no clause could be produced from the contract text".to_string(),
        ));
    }

    Ok(clauses)
}

/// Split at every numbered heading. Returns nothing when no heading exists.
fn split_on_headings(text: &str) -> Vec<Fragment> {
    let headings: Vec<(usize, String)> = HEADING
        .captures_iter(text)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let number = caps.get(1).or_else(|| caps.get(2))?.as_str();
            Some((start, number.trim_end_matches('.').to_string()))
        })
        .collect();

    if headings.is_empty() {
        return Vec::new();
    }

    let mut fragments = Vec::new();

    let preamble = normalize(&text[..headings[0].0]);
    if !preamble.is_empty() {
        fragments.push(Fragment { label: None, text: preamble });
    }

    for (i, (start, label)) in headings.iter().enumerate() {
        let end = headings.get(i + 1).map(|(next, _)| *next).unwrap_or(text.len());
        let body = normalize(&text[*start..end]);
        if !body.is_empty() {
            fragments.push(Fragment {
                label: Some(label.clone()),
                text: body,
            });
        }
    }

    fragments
}

fn split_on_paragraphs(text: &str) -> Vec<Fragment> {
    BLANK_LINE
        .split(text)
        .map(normalize)
        .filter(|p| !p.is_empty())
        .map(|text| Fragment { label: None, text })
        .collect()
}

/// Merge fragments under `min_words` into their neighbour.
fn merge_short(fragments: Vec<Fragment>, min_words: usize) -> Vec<Fragment> {
    let mut out: Vec<Fragment> = Vec::with_capacity(fragments.len());

    for fragment in fragments {
        match out.last_mut() {
            Some(previous) if fragment.words() < min_words => {
                previous.text.push(' ');
                previous.text.push_str(&fragment.text);
            }
            _ => out.push(fragment),
        }
    }

    // Only the first fragment can still be short; it has no predecessor.
    if out.len() > 1 && out[0].words() < min_words {
        let first = out.remove(0);
        let next = &mut out[0];
        next.text = format!("{} {}", first.text, next.text);
        let next_label = next.label.take();
        next.label = first.label.or(next_label);
    }

    out
}

/// Split text longer than `max_len` characters, recursively, near the midpoint.
fn split_long(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let Some(at) = split_point(text) else {
        return vec![text.to_string()];
    };

    let (left, right) = text.split_at(at);
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() {
        return vec![text.to_string()];
    }

    let mut pieces = split_long(left, max_len);
    pieces.extend(split_long(right, max_len));
    pieces
}

/// Byte offset to split at: sentence end nearest the midpoint, else nearest
/// whitespace, else the nearest char boundary.
fn split_point(text: &str) -> Option<usize> {
    let mid = text.len() / 2;
    let nearest = |candidates: Vec<usize>| {
        candidates
            .into_iter()
            .filter(|&pos| pos > 0 && pos < text.len())
            .min_by_key(|&pos| (pos.abs_diff(mid), pos))
    };

    let sentence_ends: Vec<usize> = SENTENCE_END.find_iter(text).map(|m| m.end()).collect();
    if let Some(pos) = nearest(sentence_ends) {
        return Some(pos);
    }

    let spaces: Vec<usize> = text
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .collect();
    if let Some(pos) = nearest(spaces) {
        return Some(pos);
    }

    nearest(text.char_indices().map(|(i, _)| i).collect())
}

/// Collapse all internal whitespace to single spaces.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
