use async_trait::async_trait;

use super::{BackendInfo, Classifier, ClassifierError};
use crate::storage::Category;

/// Keyword prefixes per category, checked in order. The first category with
/// a hit wins, so the more specific `Refund` sits ahead of `Billing`.
const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Refund,
        &["refund", "money back", "reimburse", "chargeback", "return my"],
    ),
    (
        Category::Billing,
        &[
            "bill", "invoice", "charge", "payment", "pay ", "subscription", "pricing", "receipt",
            "credit card",
        ],
    ),
    (
        Category::Account,
        &[
            "account", "login", "log in", "password", "sign in", "username", "locked out",
            "two factor", "2fa", "email address",
        ],
    ),
    (
        Category::Technical,
        &[
            "error", "bug", "crash", "not working", "broken", "install", "timeout", "slow",
            "outage", "fails", "failing",
        ],
    ),
    (
        Category::Complaint,
        &[
            "complain", "unacceptable", "terrible", "awful", "disappointed", "worst", "rude",
            "angry",
        ],
    ),
    (
        Category::Feedback,
        &[
            "feedback", "suggest", "feature request", "would be nice", "love", "great job",
            "improve",
        ],
    ),
];

/// Deterministic offline classifier driven by a keyword table.
#[derive(Debug, Default, Clone)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Lower-cased words joined by single spaces, padded on both ends so a
    /// keyword only matches at the start of a word.
    fn normalize(subject: &str, body: &str) -> String {
        let mut out = String::from(" ");
        for word in format!("{} {}", subject, body)
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            out.push_str(word);
            out.push(' ');
        }
        out
    }

    pub fn label(&self, subject: &str, body: &str) -> Category {
        let text = Self::normalize(subject, body);
        KEYWORDS
            .iter()
            .find(|(_, words)| {
                words
                    .iter()
                    .any(|w| text.contains(&format!(" {}", w)))
            })
            .map(|(category, _)| *category)
            .unwrap_or(Category::Other)
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            backend: "keyword".to_string(),
            model: "keyword-table".to_string(),
            device: "cpu".to_string(),
        }
    }

    async fn classify(&self, subject: &str, body: &str) -> Result<Category, ClassifierError> {
        Ok(self.label(subject, body))
    }
}
