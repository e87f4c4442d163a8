//! Conflicting-clause detection.
//!
//! Numeric terms are extracted per sentence: durations normalized to days
//! and, for payment, percentages. Each term is attributed to the obligation
//! topic whose keyword governs it, i.e. the nearest keyword before the term
//! ("fees payable within 30 days of termination" is a payment term), or the
//! nearest one after it when none precedes. Two clauses conflict on a topic
//! when both state a value of the same kind for it and the values differ.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::types::{Clause, ClauseConflict};

/// Obligation topic. Declaration order breaks ties between equally near keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObligationTopic {
    Cure,
    Termination,
    Renewal,
    Confidentiality,
    Warranty,
    Payment,
    Delivery,
    Notice,
}

impl ObligationTopic {
    const ALL: [ObligationTopic; 8] = [
        ObligationTopic::Cure,
        ObligationTopic::Termination,
        ObligationTopic::Renewal,
        ObligationTopic::Confidentiality,
        ObligationTopic::Warranty,
        ObligationTopic::Payment,
        ObligationTopic::Delivery,
        ObligationTopic::Notice,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ObligationTopic::Cure => "cure period",
            ObligationTopic::Termination => "termination notice",
            ObligationTopic::Renewal => "renewal notice",
            ObligationTopic::Confidentiality => "confidentiality period",
            ObligationTopic::Warranty => "warranty period",
            ObligationTopic::Payment => "payment terms",
            ObligationTopic::Delivery => "delivery time",
            ObligationTopic::Notice => "notice period",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            ObligationTopic::Cure => &CURE,
            ObligationTopic::Termination => &TERMINATION,
            ObligationTopic::Renewal => &RENEWAL,
            ObligationTopic::Confidentiality => &CONFIDENTIALITY,
            ObligationTopic::Warranty => &WARRANTY,
            ObligationTopic::Payment => &PAYMENT,
            ObligationTopic::Delivery => &DELIVERY,
            ObligationTopic::Notice => &NOTICE,
        }
    }

    /// Topic governing the term at byte range `term` of `sentence`.
    ///
    /// The nearest keyword starting before the term wins; without one, the
    /// nearest keyword after it. Equal distances fall back to declaration order.
    pub fn classify_at(sentence: &str, term: Range<usize>) -> Option<ObligationTopic> {
        Self::ALL
            .iter()
            .enumerate()
            .filter_map(|(rank, topic)| {
                let nearest = topic
                    .pattern()
                    .find_iter(sentence)
                    .filter_map(|m| {
                        if m.start() < term.start {
                            Some((0u8, term.start.saturating_sub(m.end())))
                        } else if m.start() >= term.end {
                            Some((1u8, m.start() - term.end))
                        } else {
                            None
                        }
                    })
                    .min()?;
                Some((nearest, rank, *topic))
            })
            .min()
            .map(|(_, _, topic)| topic)
    }
}

impl fmt::Display for ObligationTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

lazy_static! {
    static ref CURE: Regex = Regex::new(r"(?i)\bcure[ds]?\b|\bremedy the breach\b|\bremedied\b|\brectif").unwrap();
    static ref TERMINATION: Regex = Regex::new(r"(?i)\bterminat|\bcancel").unwrap();
    static ref RENEWAL: Regex = Regex::new(r"(?i)\brenew").unwrap();
    static ref CONFIDENTIALITY: Regex = Regex::new(r"(?i)\bconfidential|\bnon-disclosure\b|\bdisclos").unwrap();
    static ref WARRANTY: Regex = Regex::new(r"(?i)\bwarrant|\bdefects?\b").unwrap();
    static ref PAYMENT: Regex = Regex::new(r"(?i)\bpay|\binvoice|\bfees?\b|\binterest\b|\bremit").unwrap();
    static ref DELIVERY: Regex = Regex::new(r"(?i)\bdeliver|\bship|\bsupply\b").unwrap();
    static ref NOTICE: Regex = Regex::new(r"(?i)\bnotice\b|\bnotif").unwrap();

    static ref SENTENCE_BREAK: Regex = Regex::new(r"[.;!?]\s+").unwrap();

    /// "30 days", "thirty (30) days", "15 business days", "two-year", "6 months"
    static ref DURATION: Regex = Regex::new(
        r"(?i)\b(\d{1,4}|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|fourteen|fifteen|eighteen|twenty|twenty-one|twenty-four|thirty|forty|forty-five|fifty|sixty|seventy|eighty|ninety)(?:\s*\(\d{1,4}\))?[\s-]+(business |working |calendar )?(day|week|month|year)s?\b"
    ).unwrap();

    static ref PERCENT: Regex = Regex::new(r"(\d{1,3}(?:\.\d+)?)\s?(?:%|per ?cent\b)").unwrap();
}

/// Days considered equal when comparing normalized durations.
const DAY_TOLERANCE: f64 = 0.5;

fn written_number(word: &str) -> Option<f64> {
    let value = match word {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "fourteen" => 14,
        "fifteen" => 15,
        "eighteen" => 18,
        "twenty" => 20,
        "twenty-one" => 21,
        "twenty-four" => 24,
        "thirty" => 30,
        "forty" => 40,
        "forty-five" => 45,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(value as f64)
}

/// A numeric term stated in a clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Duration normalized to calendar days
    Days { days: f64, text: String },
    Percent { value: f64, text: String },
}

impl Term {
    fn text(&self) -> &str {
        match self {
            Term::Days { text, .. } | Term::Percent { text, .. } => text,
        }
    }

    fn differs_from(&self, other: &Term) -> Option<bool> {
        match (self, other) {
            (Term::Days { days: a, .. }, Term::Days { days: b, .. }) => Some((a - b).abs() > DAY_TOLERANCE),
            (Term::Percent { value: a, .. }, Term::Percent { value: b, .. }) => Some((a - b).abs() > f64::EPSILON),
            _ => None,
        }
    }
}

/// First duration in the text, normalized to days.
///
/// Business days count 7/5, weeks 7, months 30, years 365.
pub fn parse_duration(text: &str) -> Option<Term> {
    find_duration(text).map(|(_, term)| term)
}

pub fn parse_percent(text: &str) -> Option<Term> {
    find_percent(text).map(|(_, term)| term)
}

fn find_duration(text: &str) -> Option<(Range<usize>, Term)> {
    let caps = DURATION.captures(text)?;
    let whole = caps.get(0)?;
    let number = caps.get(1)?.as_str().to_lowercase();
    let value = number.parse::<f64>().ok().or_else(|| written_number(&number))?;
    let business = caps
        .get(2)
        .map(|m| !m.as_str().trim().eq_ignore_ascii_case("calendar"))
        .unwrap_or(false);

    let days = match caps.get(3)?.as_str().to_lowercase().as_str() {
        "day" if business => value * 7.0 / 5.0,
        "day" => value,
        "week" => value * 7.0,
        "month" => value * 30.0,
        "year" => value * 365.0,
        _ => return None,
    };

    Some((
        whole.range(),
        Term::Days {
            days,
            text: whole.as_str().to_string(),
        },
    ))
}

fn find_percent(text: &str) -> Option<(Range<usize>, Term)> {
    let caps = PERCENT.captures(text)?;
    let whole = caps.get(0)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some((
        whole.range(),
        Term::Percent {
            value,
            text: whole.as_str().to_string(),
        },
    ))
}

/// Numeric terms a clause states, keyed by topic. First statement per topic wins.
fn clause_terms(clause: &Clause) -> BTreeMap<ObligationTopic, Vec<Term>> {
    let mut terms: BTreeMap<ObligationTopic, Vec<Term>> = BTreeMap::new();

    for sentence in SENTENCE_BREAK.split(&clause.text) {
        let mut found: Vec<(ObligationTopic, Term)> = Vec::new();

        if let Some((span, duration)) = find_duration(sentence) {
            if let Some(topic) = ObligationTopic::classify_at(sentence, span) {
                found.push((topic, duration));
            }
        }
        if let Some((span, percent)) = find_percent(sentence) {
            if ObligationTopic::classify_at(sentence, span) == Some(ObligationTopic::Payment) {
                found.push((ObligationTopic::Payment, percent));
            }
        }

        for (topic, term) in found {
            let entry = terms.entry(topic).or_default();
            if !entry.iter().any(|existing| existing.differs_from(&term).is_some()) {
                entry.push(term);
            }
        }
    }

    terms
}

/// Find clause pairs whose numeric terms for the same topic contradict.
///
/// At most one conflict per clause pair and topic. Sorted by pair, then topic.
pub fn detect_conflicts(clauses: &[Clause]) -> Vec<ClauseConflict> {
    let extracted: Vec<BTreeMap<ObligationTopic, Vec<Term>>> = clauses.iter().map(clause_terms).collect();
    let mut conflicts = Vec::new();

    for (i, first_terms) in extracted.iter().enumerate() {
        for (j, second_terms) in extracted.iter().enumerate().skip(i + 1) {
            for (topic, a_terms) in first_terms {
                let Some(b_terms) = second_terms.get(topic) else {
                    continue;
                };

                let clash = a_terms.iter().find_map(|a| {
                    b_terms
                        .iter()
                        .find(|b| a.differs_from(b) == Some(true))
                        .map(|b| (a, b))
                });

                if let Some((a, b)) = clash {
                    conflicts.push(ClauseConflict {
                        first: clauses[i].index,
                        second: clauses[j].index,
                        topic: topic.name().to_string(),
                        explanation: format!(
                            "Clause {} states {} of \"{}\" but clause {} states \"{}\".",
                            clauses[i].index,
                            topic,
                            a.text(),
                            clauses[j].index,
                            b.text()
                        ),
                    });
                }
            }
        }
    }

    conflicts
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

    fn days(term: Option<Term>) -> f64 {
        match term {
            Some(Term::Days { days, .. }) => days,
            other => panic!("expected a duration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(days(parse_duration("within 30 days of notice")), 30.0);
        assert_eq!(days(parse_duration("thirty (30) days")), 30.0);
        assert_eq!(days(parse_duration("10 business days")), 14.0);
        assert_eq!(days(parse_duration("two weeks")), 14.0);
        assert_eq!(days(parse_duration("a 3 month period")), 90.0);
        assert_eq!(days(parse_duration("for one year")), 365.0);
        assert_eq!(days(parse_duration("a two-year term")), 730.0);
        assert!(parse_duration("promptly upon request").is_none());
    }

    #[test]
    fn test_parse_percent() {
        match parse_percent("interest of 1.5% per month") {
            Some(Term::Percent { value, .. }) => assert_eq!(value, 1.5),
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_percent("no rate stated").is_none());
    }

    #[test]
    fn test_classify_without_keyword() {
        let sentence = "The sky stays blue for 30 days";
        let span = find_duration(sentence).map(|(span, _)| span).unwrap();
        assert_eq!(ObligationTopic::classify_at(sentence, span), None);
    }

    #[test]
    fn test_termination_notice_conflict() {
        let contract = clauses(&[
            "Either party may terminate this agreement by giving 30 days' notice.",
            "The Client shall pay all invoices within 15 days.",
            "Termination requires 60 days' notice in writing.",
        ]);

        let conflicts = detect_conflicts(&contract);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].pair(), (0, 2));
        assert_eq!(conflicts[0].topic, "termination notice");
        assert!(conflicts[0].explanation.contains("30 days"));
        assert!(conflicts[0].explanation.contains("60 days"));
    }

    #[test]
    fn test_equivalent_durations_do_not_conflict() {
        let contract = clauses(&[
            "Either party may terminate on one month's notice.",
            "A party wishing to terminate shall give thirty (30) days notice.",
        ]);
        assert!(detect_conflicts(&contract).is_empty());
    }

    #[test]
    fn test_different_topics_do_not_conflict() {
        let contract = clauses(&[
            "Either party may terminate on 30 days' notice.",
            "The warranty period is 12 months from delivery.",
        ]);
        assert!(detect_conflicts(&contract).is_empty());
    }

    #[test]
    fn test_payment_percentage_conflict() {
        let contract = clauses(&[
            "Late payments bear interest at 2% per month.",
            "Overdue invoices accrue interest at 5% per month.",
        ]);

        let conflicts = detect_conflicts(&contract);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].topic, "payment terms");
    }

    #[test]
    fn test_one_conflict_per_pair_and_topic() {
        let contract = clauses(&[
            "Either party may terminate on 30 days' notice. Termination for convenience needs 45 days.",
            "Termination requires 90 days' notice.",
        ]);
        assert_eq!(detect_conflicts(&contract).len(), 1);
    }

    #[test]
    fn test_term_attributed_to_governing_keyword() {
        let sentence = "All fees are payable within 30 days of termination";
        let span = find_duration(sentence).map(|(span, _)| span).unwrap();
        assert_eq!(ObligationTopic::classify_at(sentence, span), Some(ObligationTopic::Payment));

        let sentence = "Either party may terminate on 30 days' written notice";
        let span = find_duration(sentence).map(|(span, _)| span).unwrap();
        assert_eq!(ObligationTopic::classify_at(sentence, span), Some(ObligationTopic::Termination));

        let sentence = "terminate if the breach is not cured within 15 days";
        let span = find_duration(sentence).map(|(span, _)| span).unwrap();
        assert_eq!(ObligationTopic::classify_at(sentence, span), Some(ObligationTopic::Cure));

        let sentence = "Within 10 days the Supplier shall deliver the goods";
        let span = find_duration(sentence).map(|(span, _)| span).unwrap();
        assert_eq!(ObligationTopic::classify_at(sentence, span), Some(ObligationTopic::Delivery));
    }

    #[test]
    fn test_payment_due_after_termination_is_not_a_notice_conflict() {
        let contract = clauses(&[
            "Either party may terminate this agreement by giving 90 days' notice.",
            "All outstanding fees are payable within 30 days of termination.",
            "The Client shall pay each invoice within 30 days of receipt.",
        ]);
        assert!(detect_conflicts(&contract).is_empty());

        let contract = clauses(&[
            "All outstanding fees are payable within 30 days of termination.",
            "The Client shall pay each invoice within 45 days of receipt.",
        ]);
        let conflicts = detect_conflicts(&contract);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].topic, "payment terms");
    }
}
