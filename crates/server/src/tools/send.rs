use std::time::Duration;

use serde_json::json;

use super::jsonl::SyntheticTicket;

pub const DEFAULT_URL: &str = "http://localhost:8000/tickets";
pub const DEFAULT_DELAY_SECS: u64 = 10;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    pub sent: usize,
    pub failed: usize,
}

fn preview(subject: &str) -> String {
    subject.chars().take(50).collect()
}

/// POST each ticket to a running service, pausing `delay` after every
/// request whether or not it succeeded.
///
/// Failures are logged and counted; they never stop the replay.
pub async fn send_tickets(
    client: &reqwest::Client,
    url: &str,
    tickets: &[SyntheticTicket],
    delay: Duration,
) -> SendReport {
    let mut report = SendReport::default();
    let total = tickets.len();

    for (index, ticket) in tickets.iter().enumerate() {
        let subject = preview(&ticket.subject);
        let payload = json!({ "subject": ticket.subject, "body": ticket.body });

        match client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                tracing::info!(
                    ticket = index + 1,
                    total,
                    status,
                    response = %body,
                    "Sent ticket '{}'",
                    subject
                );
                report.sent += 1;
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                tracing::error!(
                    ticket = index + 1,
                    status,
                    response = %body,
                    "Failed to send ticket '{}'",
                    subject
                );
                report.failed += 1;
            }
            Err(e) => {
                tracing::error!(ticket = index + 1, error = %e, "Error sending ticket '{}'", subject);
                report.failed += 1;
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    report
}
