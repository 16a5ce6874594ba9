use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::LogLevel;

/// Closed set of ticket categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Billing,
    Technical,
    Account,
    Complaint,
    Feedback,
    Refund,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Billing,
        Category::Technical,
        Category::Account,
        Category::Complaint,
        Category::Feedback,
        Category::Refund,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Billing => "Billing",
            Category::Technical => "Technical",
            Category::Account => "Account",
            Category::Complaint => "Complaint",
            Category::Feedback => "Feedback",
            Category::Refund => "Refund",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// A persisted support ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub subject: String,
    pub body: String,
    /// Unset until classification succeeds.
    pub category: Option<Category>,
    pub priority: Option<String>,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a ticket.
#[derive(Debug, Clone, Default)]
pub struct NewTicket {
    pub subject: String,
    pub body: String,
    pub priority: Option<String>,
    pub language: Option<String>,
}

impl NewTicket {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Outcome recorded on a drafted response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Completed,
    Failed,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Completed => "completed",
            ResponseStatus::Failed => "failed",
        }
    }
}

impl FromStr for ResponseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ResponseStatus::Completed),
            "failed" => Ok(ResponseStatus::Failed),
            other => Err(format!("unknown response status: {}", other)),
        }
    }
}

/// One drafting attempt. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: i64,
    pub ticket_id: i64,
    pub generated_response: String,
    pub reviewed: bool,
    pub sent: bool,
    pub status: Option<ResponseStatus>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewResponse {
    pub ticket_id: i64,
    pub generated_response: String,
    pub status: ResponseStatus,
}

impl NewResponse {
    pub fn completed(ticket_id: i64, text: impl Into<String>) -> Self {
        Self {
            ticket_id,
            generated_response: text.into(),
            status: ResponseStatus::Completed,
        }
    }

    pub fn failed(ticket_id: i64, text: impl Into<String>) -> Self {
        Self {
            ticket_id,
            generated_response: text.into(),
            status: ResponseStatus::Failed,
        }
    }
}

/// A persisted log event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: i64,
    pub ticket_id: Option<i64>,
    pub event_type: Option<String>,
    pub message: String,
    pub level: LogLevel,
    pub details: Option<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
}

/// Filter for querying persisted log events
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub ticket_id: Option<i64>,
    pub event_type: Option<String>,
    pub level: Option<LogLevel>,
    pub limit: i64,
    pub offset: i64,
}

impl LogFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_ticket_id(mut self, ticket_id: i64) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}
