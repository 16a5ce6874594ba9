use anyhow::{ensure, Context, Result};

use helpdesk_core::SessionFactory;

use super::jsonl::SyntheticTicket;

/// Default number of tickets written per transaction.
pub const DEFAULT_CHUNK: usize = 200;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: usize,
    /// Tickets whose label was stored as their category.
    pub categorized: usize,
    pub chunks: usize,
}

/// Insert tickets straight into the store, one transaction per chunk.
///
/// A known `category` label is stored on the ticket as-is; the classifier
/// is not involved. A failing chunk is rolled back and stops the load;
/// chunks committed before it stay.
pub fn load_tickets(
    sessions: &dyn SessionFactory,
    tickets: &[SyntheticTicket],
    chunk: usize,
) -> Result<LoadReport> {
    ensure!(chunk > 0, "chunk size must be at least 1");

    let mut report = LoadReport::default();
    for (index, rows) in tickets.chunks(chunk).enumerate() {
        let mut session = sessions.open().context("Failed to open session")?;
        let mut categorized = 0;

        for row in rows {
            let ticket = session
                .add_ticket(&row.to_new_ticket())
                .with_context(|| format!("Failed to insert ticket in chunk {}", index + 1))?;
            if let Some(category) = row.expected_category() {
                session.set_category(ticket.id, category)?;
                categorized += 1;
            }
        }

        session
            .commit()
            .with_context(|| format!("Failed to commit chunk {}", index + 1))?;

        report.inserted += rows.len();
        report.categorized += categorized;
        report.chunks += 1;
        tracing::info!(chunk = index + 1, tickets = rows.len(), "Chunk committed");
    }

    Ok(report)
}
