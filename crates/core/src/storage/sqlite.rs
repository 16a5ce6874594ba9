//! SQLite-backed storage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection};

use super::{
    Category, LogFilter, LogRecord, NewResponse, NewTicket, Response, ResponseStatus, Session,
    SessionFactory, StoreError, Ticket,
};
use crate::events::{LogEvent, LogLevel};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS tickets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        subject TEXT NOT NULL,
        body TEXT NOT NULL,
        category TEXT,
        priority TEXT,
        language TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS responses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ticket_id INTEGER NOT NULL REFERENCES tickets(id),
        generated_response TEXT NOT NULL,
        reviewed INTEGER NOT NULL DEFAULT 0,
        sent INTEGER NOT NULL DEFAULT 0,
        status TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ticket_id INTEGER REFERENCES tickets(id),
        event_type TEXT,
        message TEXT NOT NULL,
        level TEXT NOT NULL,
        details TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_responses_ticket_id ON responses(ticket_id);
    CREATE INDEX IF NOT EXISTS idx_logs_ticket_id ON logs(ticket_id);
    CREATE INDEX IF NOT EXISTS idx_logs_event_type ON logs(event_type);
"#;

/// SQLite session factory. Every session gets its own connection.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open the database at `path`, creating the file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let store = Self::without_schema(path);
        store.ensure_schema()?;
        Ok(store)
    }

    /// Point at `path` without touching the database.
    ///
    /// Tables are created lazily by [`SessionFactory::ensure_schema`].
    pub fn without_schema(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path).map_err(StoreError::from_db)?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(StoreError::from_db)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA synchronous = NORMAL;")
            .map_err(StoreError::from_db)?;
        Ok(conn)
    }
}

impl SessionFactory for SqliteStore {
    fn open(&self) -> Result<Box<dyn Session>, StoreError> {
        Ok(Box::new(SqliteSession {
            conn: self.connect()?,
            in_transaction: false,
        }))
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let _mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(StoreError::from_db)?;
        conn.execute_batch(SCHEMA).map_err(StoreError::from_db)?;
        Ok(())
    }
}

/// A unit of work over one SQLite connection.
///
/// Reads run in autocommit mode. The first write opens an immediate
/// transaction, so the write lock is taken up front and never upgraded.
pub struct SqliteSession {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteSession {
    fn begin_write(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            self.conn
                .execute_batch("BEGIN IMMEDIATE")
                .map_err(StoreError::from_db)?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn build_where_clause(filter: &LogFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ticket_id) = filter.ticket_id {
            conditions.push("ticket_id = ?");
            params.push(Box::new(ticket_id));
        }

        if let Some(ref event_type) = filter.event_type {
            conditions.push("event_type = ?");
            params.push(Box::new(event_type.clone()));
        }

        if let Some(level) = filter.level {
            conditions.push("level = ?");
            params.push(Box::new(level.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let category: Option<String> = row.get(3)?;
        let created_at: String = row.get(6)?;

        Ok(Ticket {
            id: row.get(0)?,
            subject: row.get(1)?,
            body: row.get(2)?,
            category: category.and_then(|c| c.parse().ok()),
            priority: row.get(4)?,
            language: row.get(5)?,
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_response(row: &rusqlite::Row) -> rusqlite::Result<Response> {
        let status: Option<String> = row.get(5)?;
        let created_at: String = row.get(6)?;

        Ok(Response {
            id: row.get(0)?,
            ticket_id: row.get(1)?,
            generated_response: row.get(2)?,
            reviewed: row.get(3)?,
            sent: row.get(4)?,
            status: status.and_then(|s| s.parse().ok()),
            created_at: parse_timestamp(&created_at),
        })
    }
}

impl Session for SqliteSession {
    fn get_ticket(&mut self, id: i64) -> Result<Option<Ticket>, StoreError> {
        let result = self.conn.query_row(
            "SELECT id, subject, body, category, priority, language, created_at FROM tickets WHERE id = ?",
            params![id],
            Self::row_to_ticket,
        );

        match result {
            Ok(ticket) => Ok(Some(ticket)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::from_db(e)),
        }
    }

    fn add_ticket(&mut self, ticket: &NewTicket) -> Result<Ticket, StoreError> {
        self.begin_write()?;
        let now = Utc::now().trunc_subsecs(6);

        self.conn
            .execute(
                "INSERT INTO tickets (subject, body, priority, language, created_at) VALUES (?, ?, ?, ?, ?)",
                params![
                    ticket.subject,
                    ticket.body,
                    ticket.priority,
                    ticket.language,
                    format_timestamp(&now),
                ],
            )
            .map_err(StoreError::from_db)?;

        Ok(Ticket {
            id: self.conn.last_insert_rowid(),
            subject: ticket.subject.clone(),
            body: ticket.body.clone(),
            category: None,
            priority: ticket.priority.clone(),
            language: ticket.language.clone(),
            created_at: now,
        })
    }

    fn set_category(&mut self, id: i64, category: Category) -> Result<(), StoreError> {
        self.begin_write()?;
        let updated = self
            .conn
            .execute(
                "UPDATE tickets SET category = ? WHERE id = ?",
                params![category.as_str(), id],
            )
            .map_err(StoreError::from_db)?;

        if updated == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn add_response(&mut self, response: &NewResponse) -> Result<Response, StoreError> {
        self.begin_write()?;
        let now = Utc::now().trunc_subsecs(6);

        self.conn
            .execute(
                "INSERT INTO responses (ticket_id, generated_response, status, created_at) VALUES (?, ?, ?, ?)",
                params![
                    response.ticket_id,
                    response.generated_response,
                    response.status.as_str(),
                    format_timestamp(&now),
                ],
            )
            .map_err(StoreError::from_db)?;

        Ok(Response {
            id: self.conn.last_insert_rowid(),
            ticket_id: response.ticket_id,
            generated_response: response.generated_response.clone(),
            reviewed: false,
            sent: false,
            status: Some(response.status),
            created_at: now,
        })
    }

    fn add_log(&mut self, event: &LogEvent) -> Result<i64, StoreError> {
        self.begin_write()?;

        let details_json = event
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO logs (ticket_id, event_type, message, level, details, created_at) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    event.ticket_id,
                    event.event_type,
                    event.message,
                    event.level.as_str(),
                    details_json,
                    format_timestamp(&event.created_at),
                ],
            )
            .map_err(StoreError::from_db)?;

        Ok(self.conn.last_insert_rowid())
    }

    fn list_tickets(&mut self, limit: i64, offset: i64) -> Result<Vec<Ticket>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, subject, body, category, priority, language, created_at FROM tickets ORDER BY id DESC LIMIT ? OFFSET ?",
            )
            .map_err(StoreError::from_db)?;

        let tickets = stmt
            .query_map(params![limit, offset], Self::row_to_ticket)
            .map_err(StoreError::from_db)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from_db)?;

        Ok(tickets)
    }

    fn list_responses(&mut self, ticket_id: i64) -> Result<Vec<Response>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, ticket_id, generated_response, reviewed, sent, status, created_at FROM responses WHERE ticket_id = ? ORDER BY created_at DESC, id DESC",
            )
            .map_err(StoreError::from_db)?;

        let responses = stmt
            .query_map(params![ticket_id], Self::row_to_response)
            .map_err(StoreError::from_db)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from_db)?;

        Ok(responses)
    }

    fn list_logs(&mut self, filter: &LogFilter) -> Result<Vec<LogRecord>, StoreError> {
        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT id, ticket_id, event_type, message, level, details, created_at FROM logs {} ORDER BY id DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from_db)?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let id: i64 = row.get(0)?;
                let ticket_id: Option<i64> = row.get(1)?;
                let event_type: Option<String> = row.get(2)?;
                let message: String = row.get(3)?;
                let level: String = row.get(4)?;
                let details: Option<String> = row.get(5)?;
                let created_at: String = row.get(6)?;

                Ok((id, ticket_id, event_type, message, level, details, created_at))
            })
            .map_err(StoreError::from_db)?;

        let mut records = Vec::new();
        for row_result in rows {
            let (id, ticket_id, event_type, message, level, details, created_at) =
                row_result.map_err(StoreError::from_db)?;

            let details = details
                .map(|json| serde_json::from_str(&json))
                .transpose()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            records.push(LogRecord {
                id,
                ticket_id,
                event_type,
                message,
                level: level.parse().unwrap_or(LogLevel::Info),
                details,
                created_at: parse_timestamp(&created_at),
            });
        }

        Ok(records)
    }

    fn count_logs(&mut self, filter: &LogFilter) -> Result<i64, StoreError> {
        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM logs {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        self.conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(StoreError::from_db)
    }

    fn ping(&mut self) -> Result<(), StoreError> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(StoreError::from_db)?;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;

        if let Err(e) = self.conn.execute_batch("COMMIT") {
            let _ = self.conn.execute_batch("ROLLBACK");
            return Err(StoreError::from_db(e));
        }
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(StoreError::from_db)
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.in_transaction {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// Rows are only ever written by this module, so a bad value means a foreign writer.
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
