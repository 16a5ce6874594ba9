use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use helpdesk_core::{Category, NewTicket};

/// One line of a synthetic ticket file.
#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticTicket {
    pub subject: String,
    pub body: String,
    /// Ground-truth label; some generators write it as `label`.
    #[serde(default, alias = "label")]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl SyntheticTicket {
    /// The labelled category, if it names a known one.
    pub fn expected_category(&self) -> Option<Category> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }

    pub fn to_new_ticket(&self) -> NewTicket {
        NewTicket {
            subject: self.subject.clone(),
            body: self.body.clone(),
            priority: self.priority.clone(),
            language: self.language.clone(),
        }
    }
}

/// Tickets read from a JSON Lines file.
#[derive(Debug, Default)]
pub struct TicketFile {
    pub tickets: Vec<SyntheticTicket>,
    /// Line numbers (1-based) that were not valid tickets.
    pub skipped: Vec<usize>,
}

/// Parse JSON Lines text. Blank lines are ignored; malformed lines and lines
/// without `subject` or `body` are skipped and reported.
pub fn parse_tickets(text: &str) -> TicketFile {
    let mut file = TicketFile::default();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<SyntheticTicket>(line) {
            Ok(ticket) => file.tickets.push(ticket),
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping malformed ticket line");
                file.skipped.push(index + 1);
            }
        }
    }

    file
}

pub fn read_tickets(path: &Path) -> Result<TicketFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tickets from {:?}", path))?;
    Ok(parse_tickets(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_bad_lines() {
        let text = r#"{"subject":"Refund please","body":"charged twice","category":"Refund"}

not json
{"subject":"No body"}
{"subject":"Login","body":"locked out","label":"account","priority":"high"}
"#;
        let file = parse_tickets(text);

        assert_eq!(file.tickets.len(), 2);
        assert_eq!(file.skipped, vec![3, 4]);
        assert_eq!(file.tickets[0].expected_category(), Some(Category::Refund));
        assert_eq!(file.tickets[1].expected_category(), Some(Category::Account));
        assert_eq!(
            file.tickets[1].to_new_ticket().priority.as_deref(),
            Some("high")
        );
    }

    #[test]
    fn test_unknown_label_has_no_expected_category() {
        let file = parse_tickets(r#"{"subject":"s","body":"b","category":"Shipping"}"#);
        assert_eq!(file.tickets[0].expected_category(), None);
    }

    #[test]
    fn test_read_missing_file_fails() {
        let result = read_tickets(Path::new("/definitely/not/here.jsonl"));
        assert!(result.is_err());
    }
}
