//! Durable storage for tickets, drafted responses and log events.
//!
//! Work is grouped into sessions: a [`SessionFactory`] hands out a fresh
//! [`Session`] per unit of work, and every mutation made through a session
//! becomes visible only after [`Session::commit`].

mod session;
mod sqlite;
mod types;

pub use session::{Session, SessionFactory, StoreError};
pub use sqlite::{SqliteSession, SqliteStore};
pub use types::{
    Category, LogFilter, LogRecord, NewResponse, NewTicket, Response, ResponseStatus, Ticket,
};
