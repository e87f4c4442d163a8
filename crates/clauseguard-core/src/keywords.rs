//! Keyword extraction for clause similarity.
//!
//! Clauses are reduced to sets of meaningful lowercase keywords so that
//! near-duplicate clauses can be found with a Jaccard overlap, independent
//! of word order and filler words.

use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashSet};

lazy_static! {
    /// Common English stopwords and contract boilerplate that carry no meaning for comparison.
    static ref STOPWORDS: HashSet<&'static str> = {
        let words = [
            // Articles
            "a", "an", "the",
            // Prepositions
            "about", "above", "across", "after", "against", "along", "among", "around",
            "at", "before", "behind", "below", "beneath", "beside", "between", "beyond",
            "by", "down", "during", "except", "for", "from", "in", "inside", "into",
            "near", "of", "off", "on", "onto", "out", "outside", "over", "past",
            "through", "to", "toward", "under", "until", "up", "upon", "with", "within", "without",
            // Conjunctions
            "and", "but", "or", "nor", "so", "yet", "both", "either", "neither",
            // Pronouns
            "i", "me", "my", "we", "our", "ours", "you", "your", "yours",
            "he", "him", "his", "she", "her", "hers",
            "it", "its", "itself", "they", "them", "their", "theirs",
            "what", "which", "who", "whom", "this", "that", "these", "those",
            // Modal and auxiliary verbs
            "is", "are", "was", "were", "be", "been", "being",
            "have", "has", "had", "having", "do", "does", "did", "doing",
            "can", "could", "shall", "should", "will", "would", "may", "might", "must",
            // Other common words
            "all", "any", "each", "every", "few", "more", "most", "other", "some", "such",
            "no", "not", "only", "own", "same", "than", "too", "very",
            "also", "here", "there", "when", "where", "how",
            // Contract boilerplate
            "hereby", "herein", "hereof", "hereto", "hereunder", "thereof", "therein",
            "thereto", "whereas", "agreement", "party", "parties",
        ];
        words.into_iter().collect()
    };
}

/// Extract meaningful keywords from clause text.
///
/// Lowercased, split on non-alphanumeric characters, words of two
/// characters or fewer and stopwords removed. Order is preserved.
///
/// # Examples
///
/// ```ignore
/// let keywords = extract_keywords("The Supplier shall deliver the Goods to the Buyer");
/// // Returns: ["supplier", "deliver", "goods", "buyer"]
/// ```
pub fn extract_keywords(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|word| {
            let word: &str = word;
            word.chars().count() > 2 && !STOPWORDS.contains(word)
        })
        .map(String::from)
        .collect()
}

/// Distinct keywords of a clause, ordered.
pub fn keyword_set(text: &str) -> BTreeSet<String> {
    extract_keywords(text).into_iter().collect()
}

/// Jaccard similarity of two keyword sets: |A ∩ B| / |A ∪ B|.
///
/// Two empty sets have similarity 0.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords_basic() {
        let keywords = extract_keywords("The Supplier shall deliver the Goods to the Buyer");
        assert_eq!(keywords, vec!["supplier", "deliver", "goods", "buyer"]);
    }

    #[test]
    fn test_extract_keywords_handles_punctuation() {
        let keywords = extract_keywords("Fees, taxes and (all) expenses; payable monthly.");
        assert!(keywords.contains(&"fees".to_string()));
        assert!(keywords.contains(&"taxes".to_string()));
        assert!(keywords.contains(&"expenses".to_string()));
        assert!(keywords.contains(&"payable".to_string()));
        assert!(!keywords.contains(&"all".to_string()));
    }

    #[test]
    fn test_placeholders_survive() {
        let keywords = extract_keywords("PARTY_1 shall pay PARTY_2");
        assert!(keywords.contains(&"party_1".to_string()));
        assert!(keywords.contains(&"party_2".to_string()));
    }

    #[test]
    fn test_boilerplate_removed() {
        let keywords = extract_keywords("The parties hereby agree that this Agreement is binding");
        assert_eq!(keywords, vec!["agree", "binding"]);
    }

    #[test]
    fn test_jaccard() {
        let a = keyword_set("supplier deliver goods buyer premises");
        let b = keyword_set("supplier deliver goods buyer warehouse");
        let similarity = jaccard(&a, &b);
        assert!((similarity - 4.0 / 6.0).abs() < 1e-9);

        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&BTreeSet::new(), &BTreeSet::new()), 0.0);
    }
}
