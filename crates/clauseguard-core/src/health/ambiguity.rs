//! Ambiguous-clause detection.
//!
//! Two heuristics:
//! - vague wording ("reasonable efforts", "promptly", ...) that no clause defines
//! - near-duplicate clauses: non-adjacent clauses with high keyword overlap

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::HealthConfig;
use crate::keywords::{jaccard, keyword_set};
use crate::types::{AmbiguityFlag, AmbiguityReason, Clause};

/// Vague terms flagged when the contract never defines them.
pub const VAGUE_TERMS: [&str; 10] = [
    "reasonable efforts",
    "best efforts",
    "commercially reasonable",
    "to the extent possible",
    "as soon as practicable",
    "reasonable time",
    "promptly",
    "from time to time",
    "as mutually agreed",
    "substantially",
];

struct VagueTerm {
    term: &'static str,
    usage: Regex,
    definition: Regex,
}

lazy_static! {
    static ref VAGUE: Vec<VagueTerm> = VAGUE_TERMS
        .iter()
        .map(|&term| {
            let escaped = regex::escape(term);
            VagueTerm {
                term,
                usage: Regex::new(&format!(r"(?i)\b{}\b", escaped)).unwrap(),
                definition: Regex::new(&format!(r#"(?i)"?\b{}\b"?\s+(?:shall\s+)?means?\b"#, escaped)).unwrap(),
            }
        })
        .collect();
}

/// Vague-term flags, one per clause and undefined term used in it.
pub fn vague_term_flags(clauses: &[Clause]) -> Vec<AmbiguityFlag> {
    let undefined: Vec<&VagueTerm> = VAGUE
        .iter()
        .filter(|vague| !clauses.iter().any(|c| vague.definition.is_match(&c.text)))
        .collect();

    clauses
        .iter()
        .flat_map(|clause| {
            undefined
                .iter()
                .filter(|vague| vague.usage.is_match(&clause.text))
                .map(|vague| AmbiguityFlag {
                    clause_index: clause.index,
                    reason: AmbiguityReason::VagueTerm {
                        term: vague.term.to_string(),
                    },
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Near-duplicate flags. Both clauses of a matching pair are flagged.
pub fn near_duplicate_flags(clauses: &[Clause], config: &HealthConfig) -> Vec<AmbiguityFlag> {
    let keyword_sets: Vec<_> = clauses.iter().map(|c| keyword_set(&c.text)).collect();
    let mut flags = Vec::new();

    for i in 0..clauses.len() {
        if keyword_sets[i].len() < config.min_duplicate_keywords {
            continue;
        }
        // Adjacent clauses are often continuations of each other.
        for j in (i + 2)..clauses.len() {
            if keyword_sets[j].len() < config.min_duplicate_keywords {
                continue;
            }

            let similarity = jaccard(&keyword_sets[i], &keyword_sets[j]);
            if similarity >= config.near_duplicate_threshold {
                flags.push(AmbiguityFlag {
                    clause_index: clauses[i].index,
                    reason: AmbiguityReason::NearDuplicate {
                        other_index: clauses[j].index,
                        similarity,
                    },
                });
                flags.push(AmbiguityFlag {
                    clause_index: clauses[j].index,
                    reason: AmbiguityReason::NearDuplicate {
                        other_index: clauses[i].index,
                        similarity,
                    },
                });
            }
        }
    }

    flags
}

/// All ambiguity flags, ordered by clause index.
pub fn detect_ambiguity(clauses: &[Clause], config: &HealthConfig) -> Vec<AmbiguityFlag> {
    let mut flags = vague_term_flags(clauses);
    flags.extend(near_duplicate_flags(clauses, config));
    flags.sort_by_key(|flag| flag.clause_index);
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clauses(texts: &[&str]) -> Vec<Clause> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| Clause {
                index,
                heading_label: None,
                text: text.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_undefined_vague_term_flagged() {
        let contract = clauses(&[
            "The Supplier shall use reasonable efforts to deliver on time.",
            "The Buyer shall pay on delivery.",
        ]);

        let flags = vague_term_flags(&contract);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].clause_index, 0);
        assert_eq!(
            flags[0].reason,
            AmbiguityReason::VagueTerm {
                term: "reasonable efforts".to_string()
            }
        );
    }

    #[test]
    fn test_defined_vague_term_not_flagged() {
        let contract = clauses(&[
            "\"Reasonable Efforts\" means the steps set out in Schedule 2.",
            "The Supplier shall use reasonable efforts to deliver on time.",
        ]);
        assert!(vague_term_flags(&contract).is_empty());
    }

    #[test]
    fn test_near_duplicates_non_adjacent_only() {
        let duplicate = "The Supplier shall deliver conforming goods to the Buyer warehouse within agreed delivery windows.";
        let contract = clauses(&[
            duplicate,
            "This agreement is governed by the laws of India.",
            "The Supplier shall deliver conforming goods to the Buyer warehouse within agreed delivery windows.",
            duplicate,
        ]);

        let flags = near_duplicate_flags(&contract, &HealthConfig::default());
        let pairs: Vec<(usize, usize)> = flags
            .iter()
            .filter_map(|f| match f.reason {
                AmbiguityReason::NearDuplicate { other_index, .. } => Some((f.clause_index, other_index)),
                _ => None,
            })
            .collect();

        // 0-2 and 0-3 are non-adjacent; 2-3 are adjacent and skipped.
        assert!(pairs.contains(&(0, 2)));
        assert!(pairs.contains(&(2, 0)));
        assert!(pairs.contains(&(0, 3)));
        assert!(!pairs.contains(&(2, 3)));
    }

    #[test]
    fn test_short_clauses_never_duplicates() {
        let contract = clauses(&["Fees apply.", "Other text here.", "Fees apply."]);
        assert!(near_duplicate_flags(&contract, &HealthConfig::default()).is_empty());
    }

    #[test]
    fn test_detect_ambiguity_sorted() {
        let contract = clauses(&[
            "Deliveries happen promptly.",
            "Fees are fixed.",
            "Support is provided as soon as practicable.",
        ]);
        let flags = detect_ambiguity(&contract, &HealthConfig::default());
        let indices: Vec<usize> = flags.iter().map(|f| f.clause_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }
}
