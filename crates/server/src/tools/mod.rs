//! Offline helpers behind the `helpdesk-tools` binary: bulk-load synthetic
//! tickets, score the configured classifier against labelled tickets, and
//! replay tickets against a running service.

pub mod evaluate;
pub mod jsonl;
pub mod load;
pub mod send;

pub use evaluate::{evaluate, Evaluation, Mismatch};
pub use jsonl::{parse_tickets, read_tickets, SyntheticTicket, TicketFile};
pub use load::{load_tickets, LoadReport};
pub use send::{send_tickets, SendReport};
