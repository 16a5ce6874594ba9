use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpdesk_core::{create_classifier, load_config, validate_config, Config, SqliteStore};
use helpdesk_server::tools::{evaluate, load, read_tickets, send, send_tickets};

#[derive(Debug, Parser)]
#[command(name = "helpdesk-tools")]
#[command(about = "Load, score and replay synthetic support tickets")]
struct Cli {
    /// Service config; defaults to $HELPDESK_CONFIG, then config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Insert tickets from a JSON Lines file directly into the database
    Load {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = load::DEFAULT_CHUNK)]
        chunk: usize,
    },
    /// Score the configured classifier against labelled tickets
    Evaluate {
        #[arg(long, default_value = "challengetickets.jsonl")]
        file: PathBuf,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// POST tickets to a running service, one at a time
    Send {
        #[arg(long, default_value = "synthetic_tickets.jsonl")]
        file: PathBuf,
        #[arg(long, default_value = send::DEFAULT_URL)]
        url: String,
        /// Seconds to wait after each ticket
        #[arg(long, default_value_t = send::DEFAULT_DELAY_SECS)]
        delay: u64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn service_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(|| {
        std::env::var("HELPDESK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    });
    let config = load_config(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Load { file, chunk } => {
            let config = service_config(cli.config.as_deref())?;
            let store = SqliteStore::new(&config.database.path)
                .with_context(|| format!("Failed to open {:?}", config.database.path))?;
            let input = read_tickets(&file)?;

            let report = load::load_tickets(&store, &input.tickets, chunk)?;
            println!(
                "Loaded {} tickets in {} chunks ({} with a category, {} lines skipped)",
                report.inserted,
                report.chunks,
                report.categorized,
                input.skipped.len()
            );
        }
        Command::Evaluate { file, limit } => {
            let config = service_config(cli.config.as_deref())?;
            let classifier =
                create_classifier(&config.classifier).context("Failed to build classifier")?;
            classifier.warm_up().await;
            let input = read_tickets(&file)?;

            let evaluation = evaluate::evaluate(&classifier, &input.tickets, limit).await;
            print!("{}", evaluation.render());
        }
        Command::Send { file, url, delay } => {
            let input = read_tickets(&file)?;
            tracing::info!(
                tickets = input.tickets.len(),
                skipped = input.skipped.len(),
                url = %url,
                delay_secs = delay,
                "Sending tickets"
            );

            let report = send_tickets(
                &reqwest::Client::new(),
                &url,
                &input.tickets,
                Duration::from_secs(delay),
            )
            .await;
            println!("Sent {} tickets, {} failed", report.sent, report.failed);
        }
    }

    Ok(())
}
