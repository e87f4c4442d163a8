//! Critical-clause checklists per contract type.
//!
//! An item is covered when at least one clause matches its pattern.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{Clause, ContractType};

/// One critical clause a contract of a given type is expected to contain.
#[derive(Debug)]
pub struct ChecklistItem {
    pub id: &'static str,
    pub label: &'static str,
    pattern: Regex,
}

impl ChecklistItem {
    fn new(id: &'static str, label: &'static str, pattern: &str) -> Self {
        Self {
            id,
            label,
            pattern: Regex::new(&format!("(?i){}", pattern)).unwrap(),
        }
    }

    pub fn is_covered_by(&self, clause: &Clause) -> bool {
        self.pattern.is_match(&clause.text)
    }
}

const TERMINATION: &str = r"\bterminat|\bcancell?ation\b";
const CONFIDENTIALITY: &str = r"\bconfidential|\bnon-disclosure\b";
const GOVERNING_LAW: &str = r"\bgoverning law\b|\bgoverned by\b|\bjurisdiction\b|\barbitrat|\bdispute";
const INTELLECTUAL_PROPERTY: &str = r"\bintellectual property\b|\bcopyright|\bpatent|\binventions?\b";
const LIABILITY: &str = r"\bliabilit|\bliable\b";

lazy_static! {
    static ref EMPLOYMENT: Vec<ChecklistItem> = vec![
        ChecklistItem::new("position", "Position and duties", r"\bposition\b|\bduties\b|\bjob title\b|\brole\b|\bresponsibilit"),
        ChecklistItem::new("compensation", "Salary and compensation", r"\bsalary\b|\bwages?\b|\bcompensation\b|\bremuneration\b"),
        ChecklistItem::new("working_time", "Working hours and leave", r"\bworking hours\b|\bhours of work\b|\bleave\b|\bholidays?\b|\bvacation\b"),
        ChecklistItem::new("termination", "Termination and notice period", TERMINATION),
        ChecklistItem::new("confidentiality", "Confidentiality", CONFIDENTIALITY),
        ChecklistItem::new("intellectual_property", "Intellectual property", INTELLECTUAL_PROPERTY),
        ChecklistItem::new("governing_law", "Governing law and disputes", GOVERNING_LAW),
    ];

    static ref VENDOR: Vec<ChecklistItem> = vec![
        ChecklistItem::new("scope", "Goods or services supplied", r"\bgoods\b|\bproducts?\b|\bspecifications?\b|\bservices\b"),
        ChecklistItem::new("payment", "Price and payment terms", r"\bpay|\bprice\b|\binvoice"),
        ChecklistItem::new("delivery", "Delivery", r"\bdeliver|\bshipment\b|\blead time\b"),
        ChecklistItem::new("warranty", "Warranties", r"\bwarrant|\bdefect"),
        ChecklistItem::new("liability", "Limitation of liability", LIABILITY),
        ChecklistItem::new("indemnity", "Indemnity", r"\bindemni"),
        ChecklistItem::new("termination", "Termination", TERMINATION),
        ChecklistItem::new("governing_law", "Governing law and disputes", GOVERNING_LAW),
    ];

    static ref LEASE: Vec<ChecklistItem> = vec![
        ChecklistItem::new("premises", "Description of premises", r"\bpremises\b|\bproperty\b|\bdemised\b"),
        ChecklistItem::new("rent", "Rent and payment", r"\brent\b|\brental\b"),
        ChecklistItem::new("deposit", "Security deposit", r"\bdeposit\b"),
        ChecklistItem::new("term", "Lease term", r"\blease term\b|\bterm of (?:this|the) lease\b|\bcommenc|\bperiod of \w+ (?:months|years)\b"),
        ChecklistItem::new("maintenance", "Maintenance and repairs", r"\bmaintenance\b|\bmaintain\b|\brepairs?\b"),
        ChecklistItem::new("use", "Permitted use", r"\bpermitted use\b|\buse of the premises\b|\bshall use\b|\bresidential\b|\bcommercial purposes?\b"),
        ChecklistItem::new("termination", "Termination and vacating", r"\bterminat|\bvacate\b|\beviction\b"),
        ChecklistItem::new("governing_law", "Governing law and disputes", GOVERNING_LAW),
    ];

    static ref PARTNERSHIP: Vec<ChecklistItem> = vec![
        ChecklistItem::new("capital", "Capital contributions", r"\bcapital\b|\bcontribut"),
        ChecklistItem::new("profit_sharing", "Profit and loss sharing", r"\bprofits?\b|\blosses\b"),
        ChecklistItem::new("management", "Management and decision making", r"\bmanagement\b|\bmanage\b|\bdecisions?\b|\bvoting\b"),
        ChecklistItem::new("exit", "Admission, withdrawal and retirement", r"\bwithdraw|\bretire|\badmission\b|\bexit\b"),
        ChecklistItem::new("dissolution", "Dissolution", r"\bdissol|\bwind(?:ing)? up\b|\bterminat"),
        ChecklistItem::new("confidentiality", "Confidentiality", CONFIDENTIALITY),
        ChecklistItem::new("governing_law", "Governing law and disputes", GOVERNING_LAW),
    ];

    static ref SERVICE: Vec<ChecklistItem> = vec![
        ChecklistItem::new("scope", "Scope of services", r"\bscope\b|\bservices\b|\bstatement of work\b|\bdeliverables?\b"),
        ChecklistItem::new("payment", "Fees and payment", r"\bpay|\bfees?\b|\binvoice"),
        ChecklistItem::new("term", "Term and duration", r"\bterm\b|\bduration\b|\bcommenc|\beffective date\b"),
        ChecklistItem::new("termination", "Termination", TERMINATION),
        ChecklistItem::new("liability", "Limitation of liability", LIABILITY),
        ChecklistItem::new("confidentiality", "Confidentiality", CONFIDENTIALITY),
        ChecklistItem::new("intellectual_property", "Intellectual property", INTELLECTUAL_PROPERTY),
        ChecklistItem::new("governing_law", "Governing law and disputes", GOVERNING_LAW),
    ];
}

/// The checklist used for a contract type.
pub fn checklist(contract_type: ContractType) -> &'static [ChecklistItem] {
    match contract_type {
        ContractType::Employment => &EMPLOYMENT,
        ContractType::Vendor => &VENDOR,
        ContractType::Lease => &LEASE,
        ContractType::Partnership => &PARTNERSHIP,
        ContractType::Service => &SERVICE,
    }
}

/// Completeness score (0-100) and the labels of uncovered items, in checklist order.
pub fn completeness(items: &[ChecklistItem], clauses: &[Clause]) -> (u8, Vec<String>) {
    if items.is_empty() {
        return (100, Vec::new());
    }

    let missing: Vec<String> = items
        .iter()
        .filter(|item| !clauses.iter().any(|c| item.is_covered_by(c)))
        .map(|item| item.label.to_string())
        .collect();

    let covered = items.len() - missing.len();
    let score = (covered * 100 + items.len() / 2) / items.len();
    (score.min(100) as u8, missing)
}
