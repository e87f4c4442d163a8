//! Built-in risk pattern catalog.
//!
//! | Rule | Level | Fires on |
//! |------|-------|----------|
//! | `unlimited_liability` | High | Unbounded liability with no cap phrase |
//! | `one_sided_indemnity` | High | Indemnity plus hold-harmless/all-claims wording, not mutual |
//! | `no_termination_right` | High | Explicit removal of the right to terminate |
//! | `unilateral_termination` | High | One party may terminate at any time |
//! | `automatic_renewal` | Medium | Auto-renewal with no non-renewal or opt-out route |
//! | `broad_ip_assignment` | Medium | Assignment of all IP or all right, title and interest |
//! | `vague_payment_terms` | Medium | Payment "as mutually agreed" / "from time to time" |
//! | `high_penalty_interest` | Medium | Interest or penalty rate of 30% or more |
//! | `ambiguous_obligation` | Medium | Subjective effort standards |
//! | `perpetual_confidentiality` | Medium | Confidentiality with no time limit |
//! | `unilateral_amendment` | Medium | One party may change the terms alone |
//! | `broad_non_compete` | Medium | Non-compete that is worldwide or lasts years |
//! | `waiver_of_remedies` | Medium | Waiver of rights, claims or remedies |

use lazy_static::lazy_static;
use regex::Regex;

use super::Rule;
use crate::types::RiskLevel;

lazy_static! {
    static ref UNLIMITED_LIABILITY: Regex = Regex::new(
        r"(?i)\bunlimited liability\b|\bwithout (?:any )?limit(?:ation)? (?:of|on|to) (?:its |their )?liability\b|\bliable for all (?:losses|damages)\b|\bliability shall not be limited\b"
    ).unwrap();

    static ref LIABILITY_CAP: Regex = Regex::new(
        r"(?i)\bshall not exceed\b|\bcapped at\b|\bcap on (?:its |their )?liability\b|\blimited to (?:the |an )?(?:amount|sum|total|fees|aggregate|\d)"
    ).unwrap();

    static ref INDEMNITY: Regex = Regex::new(
        r"(?i)shall indemnify.+(?:and hold harmless|from and against all claims)"
    ).unwrap();

    static ref MUTUAL_INDEMNITY: Regex = Regex::new(
        r"(?i)\beach party shall indemnify\b|\bmutual(?:ly)? indemnif"
    ).unwrap();

    static ref NO_TERMINATION: Regex = Regex::new(
        r"(?i)\bmay not terminate\b|\bno right to terminate\b|\bshall not (?:be entitled|have the right) to terminate\b"
    ).unwrap();

    static ref TERMINATE_ANY_TIME: Regex = Regex::new(
        r"(?i)\bmay terminate (?:this )?agreement at any time(?: without notice)?|\bmay terminate (?:this )?agreement (?:at|in) its (?:sole|absolute) discretion"
    ).unwrap();

    static ref EITHER_PARTY_TERMINATES: Regex = Regex::new(
        r"(?i)\b(?:either|each) party may terminate\b"
    ).unwrap();

    static ref AUTO_RENEWAL: Regex = Regex::new(
        r"(?i)\bautomatically renew(?:s|ed)?\b|\bauto-?renew(?:s|ed|al)?\b|\bshall be renewed automatically\b|\brenew(?:s|ed)? automatically\b"
    ).unwrap();

    static ref RENEWAL_OPT_OUT: Regex = Regex::new(
        r"(?i)\bnon-?renewal\b|\bopt[- ]out\b|\bunless .{0,80}\bnotice\b"
    ).unwrap();

    static ref IP_ASSIGNMENT: Regex = Regex::new(
        r"(?i)\bassigns? all intellectual property\b|\ball rights?,? title,? and interest\b"
    ).unwrap();

    static ref VAGUE_PAYMENT: Regex = Regex::new(
        r"(?i)\b(?:payment|fees?|price|compensation)\b.*\b(?:as mutually agreed|from time to time|to be agreed|to be determined|at a later date)\b"
    ).unwrap();

    static ref PENALTY_RATE: Regex = Regex::new(
        r"(?i)\b(?:interest|penalty|late fee)\b[^.%]{0,60}?(\d{1,3}(?:\.\d+)?)\s?%"
    ).unwrap();

    static ref EFFORT_STANDARD: Regex = Regex::new(
        r"(?i)\breasonable efforts\b|\bcommercially reasonable\b|\bbest efforts\b|\bto the extent possible\b"
    ).unwrap();

    static ref PERPETUAL: Regex = Regex::new(
        r"(?i)\bperpetual confidentiality\b|\bin perpetuity\b|\bwithout time limitation\b|\bsurvive indefinitely\b"
    ).unwrap();

    static ref AMENDMENT: Regex = Regex::new(
        r"(?i)\breserves the right to (?:amend|modify|change|vary)\b|\bmay (?:amend|modify|change|vary) (?:this agreement|these terms|the terms)[^.]{0,60}\b(?:at any time|sole discretion|without (?:notice|consent))"
    ).unwrap();

    static ref NON_COMPETE: Regex = Regex::new(
        r"(?i)\bnon-?compet|\bshall not,? (?:directly or indirectly,? )?(?:engage in|compete|carry on)\b"
    ).unwrap();

    static ref NON_COMPETE_BREADTH: Regex = Regex::new(
        r"(?i)\bworldwide\b|\banywhere in the world\b|\bthroughout the world\b|\bindefinitely\b|\bin perpetuity\b|\b(?:[2-9]|\d{2,}|two|three|four|five|ten) \(?\d*\)? ?years?\b"
    ).unwrap();

    static ref WAIVER: Regex = Regex::new(
        r"(?i)\bwaives? (?:any and all|any|all) (?:rights?|claims?|remed(?:y|ies))\b|\bsole and exclusive remedy\b|\bno (?:right|recourse) to (?:claim|seek|sue)\b"
    ).unwrap();
}

/// Interest or penalty rates at or above this percentage fire `high_penalty_interest`.
const PENALTY_RATE_THRESHOLD: f64 = 30.0;

fn first_match(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| m.as_str().to_string())
}

fn unlimited_liability(text: &str) -> Option<String> {
    if LIABILITY_CAP.is_match(text) {
        return None;
    }
    first_match(&UNLIMITED_LIABILITY, text)
}

fn one_sided_indemnity(text: &str) -> Option<String> {
    if MUTUAL_INDEMNITY.is_match(text) {
        return None;
    }
    first_match(&INDEMNITY, text)
}

fn no_termination_right(text: &str) -> Option<String> {
    first_match(&NO_TERMINATION, text)
}

fn unilateral_termination(text: &str) -> Option<String> {
    if EITHER_PARTY_TERMINATES.is_match(text) {
        return None;
    }
    first_match(&TERMINATE_ANY_TIME, text)
}

fn automatic_renewal(text: &str) -> Option<String> {
    if RENEWAL_OPT_OUT.is_match(text) {
        return None;
    }
    first_match(&AUTO_RENEWAL, text)
}

fn broad_ip_assignment(text: &str) -> Option<String> {
    first_match(&IP_ASSIGNMENT, text)
}

fn vague_payment_terms(text: &str) -> Option<String> {
    first_match(&VAGUE_PAYMENT, text)
}

fn high_penalty_interest(text: &str) -> Option<String> {
    PENALTY_RATE.captures_iter(text).find_map(|caps| {
        let rate: f64 = caps.get(1)?.as_str().parse().ok()?;
        if rate >= PENALTY_RATE_THRESHOLD {
            caps.get(0).map(|m| m.as_str().to_string())
        } else {
            None
        }
    })
}

fn ambiguous_obligation(text: &str) -> Option<String> {
    first_match(&EFFORT_STANDARD, text)
}

fn perpetual_confidentiality(text: &str) -> Option<String> {
    first_match(&PERPETUAL, text)
}

fn unilateral_amendment(text: &str) -> Option<String> {
    first_match(&AMENDMENT, text)
}

fn broad_non_compete(text: &str) -> Option<String> {
    let restraint = first_match(&NON_COMPETE, text)?;
    NON_COMPETE_BREADTH.find(text).map(|breadth| format!("{} ... {}", restraint, breadth.as_str()))
}

fn waiver_of_remedies(text: &str) -> Option<String> {
    first_match(&WAIVER, text)
}

/// The built-in catalog, in evaluation order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "unlimited_liability",
            RiskLevel::High,
            "Unlimited or unbounded liability for one party.",
            "Ask for a liability cap, for example the fees paid in the previous 12 months, and exclude indirect losses.",
            unlimited_liability,
        ),
        Rule::new(
            "one_sided_indemnity",
            RiskLevel::High,
            "Strong one-sided indemnity in favour of one party.",
            "Make the indemnity mutual and limit it to third-party claims caused by the indemnifying party's breach or negligence.",
            one_sided_indemnity,
        ),
        Rule::new(
            "no_termination_right",
            RiskLevel::High,
            "Explicitly removes the right to terminate the agreement.",
            "Insist on termination rights for material breach, insolvency and convenience with reasonable notice.",
            no_termination_right,
        ),
        Rule::new(
            "unilateral_termination",
            RiskLevel::High,
            "Termination rights granted to only one party, creating imbalance and business risk.",
            "Request the same termination right for both parties and a minimum notice period.",
            unilateral_termination,
        ),
        Rule::new(
            "automatic_renewal",
            RiskLevel::Medium,
            "Automatic renewal without explicit opt-in.",
            "Add a reminder obligation and a right to give notice of non-renewal before each renewal date.",
            automatic_renewal,
        ),
        Rule::new(
            "broad_ip_assignment",
            RiskLevel::Medium,
            "Very broad assignment of intellectual property rights.",
            "Limit the assignment to deliverables created under this agreement and keep pre-existing IP.",
            broad_ip_assignment,
        ),
        Rule::new(
            "vague_payment_terms",
            RiskLevel::Medium,
            "Unclear or vague payment terms.",
            "Fix the amount, currency, invoicing schedule and due date in writing.",
            vague_payment_terms,
        ),
        Rule::new(
            "high_penalty_interest",
            RiskLevel::Medium,
            "Very high interest or penalty rate.",
            "Cap late-payment interest at a statutory or market rate and add a grace period.",
            high_penalty_interest,
        ),
        Rule::new(
            "ambiguous_obligation",
            RiskLevel::Medium,
            "Ambiguous or subjective obligation wording, which may weaken enforceability or expectations.",
            "Replace subjective effort standards with measurable deliverables and deadlines.",
            ambiguous_obligation,
        ),
        Rule::new(
            "perpetual_confidentiality",
            RiskLevel::Medium,
            "Confidentiality obligations with no time limit may restrict future business operations.",
            "Limit confidentiality to a fixed period after termination, except for genuine trade secrets.",
            perpetual_confidentiality,
        ),
        Rule::new(
            "unilateral_amendment",
            RiskLevel::Medium,
            "One party may change the terms without the other's agreement.",
            "Require amendments to be in writing and signed by both parties.",
            unilateral_amendment,
        ),
        Rule::new(
            "broad_non_compete",
            RiskLevel::Medium,
            "Non-compete restriction that is unusually wide in territory or duration.",
            "Narrow the restriction to the specific business, a defined territory and a short period.",
            broad_non_compete,
        ),
        Rule::new(
            "waiver_of_remedies",
            RiskLevel::Medium,
            "Waiver or limitation of legal rights and remedies.",
            "Keep the right to claim damages and seek injunctive relief for serious breaches.",
            waiver_of_remedies,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liability_cap_suppresses_unlimited() {
        assert!(unlimited_liability("The Supplier accepts unlimited liability for fraud.").is_some());
        assert!(unlimited_liability(
            "Liability is unlimited liability for fraud, otherwise total liability shall not exceed the fees paid."
        )
        .is_none());
        assert!(unlimited_liability("PARTY_1 shall be liable for all damages suffered.").is_some());
    }

    #[test]
    fn test_mutual_indemnity_is_not_one_sided() {
        assert!(one_sided_indemnity(
            "PARTY_1 shall indemnify and hold harmless PARTY_2 from any loss."
        )
        .is_some());
        assert!(one_sided_indemnity(
            "PARTY_1 shall indemnify PARTY_2 and hold harmless its affiliates."
        )
        .is_some());
        assert!(one_sided_indemnity(
            "Each party shall indemnify the other from and against all claims arising from its breach."
        )
        .is_none());
    }

    #[test]
    fn test_termination_rules() {
        assert!(no_termination_right("The Client may not terminate this agreement during the term.").is_some());
        assert!(unilateral_termination("PARTY_1 may terminate this agreement at any time without notice.").is_some());
        assert!(unilateral_termination("Either party may terminate this agreement at any time on 30 days' notice.").is_none());
    }

    #[test]
    fn test_automatic_renewal_with_opt_out() {
        assert!(automatic_renewal("This agreement automatically renews for successive one-year terms.").is_some());
        assert!(automatic_renewal(
            "This agreement automatically renews for one-year terms unless either party gives 60 days' notice."
        )
        .is_none());
        assert!(automatic_renewal("The licence shall auto-renew unless a notice of non-renewal is served.").is_none());
    }

    #[test]
    fn test_penalty_rate_threshold() {
        assert!(high_penalty_interest("Late amounts bear interest at 36% per annum.").is_some());
        assert!(high_penalty_interest("Late amounts bear interest at an interest rate of 30 % per annum.").is_some());
        assert!(high_penalty_interest("Late amounts bear interest at 18% per annum.").is_none());
        assert!(high_penalty_interest("A discount of 40% applies to bulk orders.").is_none());
    }

    #[test]
    fn test_payment_and_effort_wording() {
        assert!(vague_payment_terms("Payment shall be made as mutually agreed between the parties.").is_some());
        assert!(vague_payment_terms("Payment is due within 30 days of invoice.").is_none());
        assert!(ambiguous_obligation("The Supplier shall use commercially reasonable efforts.").is_some());
    }

    #[test]
    fn test_ip_and_confidentiality() {
        assert!(broad_ip_assignment("The Employee assigns all intellectual property created at any time.").is_some());
        assert!(broad_ip_assignment("PARTY_2 transfers all right, title and interest in the Work.").is_some());
        assert!(perpetual_confidentiality("These obligations continue in perpetuity.").is_some());
        assert!(perpetual_confidentiality("These obligations continue for three years.").is_none());
    }

    #[test]
    fn test_amendment_non_compete_waiver() {
        assert!(unilateral_amendment("PARTY_1 reserves the right to modify the fees.").is_some());
        assert!(unilateral_amendment("PARTY_1 may amend these terms at any time by posting them online.").is_some());
        assert!(unilateral_amendment("Any amendment must be signed by both parties.").is_none());

        assert!(broad_non_compete("The Employee shall not engage in any competing business worldwide.").is_some());
        assert!(broad_non_compete("The Employee shall not compete for five (5) years after termination.").is_some());
        assert!(broad_non_compete("The Employee shall not compete within the city for 6 months.").is_none());

        assert!(waiver_of_remedies("The Client waives any and all claims against PARTY_1.").is_some());
        assert!(waiver_of_remedies("Refund is the sole and exclusive remedy.").is_some());
    }
}
