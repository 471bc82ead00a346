use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod api;
mod config;
mod enrich;
mod error;
mod export;
mod models;
mod pipeline;
mod report;
mod seed;
mod server;
mod store;
mod view;

use crate::api::FeedbackApi;
use crate::config::Settings;

#[derive(Parser)]
#[command(name = "feedback-dashboard")]
#[command(about = "Realtor client-feedback dashboard and test-call trigger", long_about = None)]
struct Cli {
    /// Base address of the feedback backend
    #[arg(long, env = "FEEDBACK_API_URL", default_value = api::DEFAULT_API_URL, global = true)]
    api_url: String,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = config::DEFAULT_REQUEST_TIMEOUT_SECS, global = true)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard page
    Serve {
        #[arg(long, env = "DASHBOARD_BIND", default_value = config::DEFAULT_BIND)]
        bind: SocketAddr,
        /// Delay between a successful test call and the follow-up reload
        #[arg(long, default_value_t = config::DEFAULT_REFRESH_DELAY_SECS)]
        refresh_delay_secs: u64,
    },
    /// Print ratings, sentiment mix and the latest feedback
    Summary {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "feedback-report.md")]
        out: PathBuf,
    },
    /// Export enriched feedback as CSV
    Export {
        #[arg(long, default_value = "feedback.csv")]
        out: PathBuf,
    },
    /// Place a test call to the given number
    Call { phone_number: String },
    /// Load the demo agents, clients and feedback into the backend
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::new(cli.api_url, cli.timeout_secs);

    match cli.command {
        Commands::Serve {
            bind,
            refresh_delay_secs,
        } => {
            let settings = settings.with_server(bind, refresh_delay_secs);
            server::serve(&settings).await?;
        }
        Commands::Summary { limit } => {
            let api = FeedbackApi::new(&settings.api_url, settings.request_timeout)?;
            let snapshot = pipeline::load_snapshot(&api)
                .await
                .context("failed to load feedback data")?;

            if snapshot.feedback.is_empty() {
                println!("No feedback data available yet.");
                return Ok(());
            }

            println!("Average ratings by agent:");
            if snapshot.agent_ratings.is_empty() {
                println!("- none rated yet");
            }
            for rating in &snapshot.agent_ratings {
                println!("- {} {:.2}/10", rating.name, rating.rating);
            }

            let total: usize = snapshot.sentiments.iter().map(|slice| slice.value).sum();
            println!("Sentiment mix:");
            for slice in &snapshot.sentiments {
                println!(
                    "- {} {} ({:.0}%)",
                    slice.name,
                    slice.value,
                    report::sentiment_share(slice.value, total)
                );
            }

            println!("Latest feedback:");
            for record in snapshot.feedback.iter().rev().take(limit) {
                println!(
                    "- {} - {}: {}",
                    record.client_name, record.agent_name, record.summary
                );
            }

            if !snapshot.rejected.is_empty() {
                println!("Skipped {} malformed record(s).", snapshot.rejected.len());
            }
        }
        Commands::Report { out } => {
            let api = FeedbackApi::new(&settings.api_url, settings.request_timeout)?;
            let snapshot = pipeline::load_snapshot(&api)
                .await
                .context("failed to load feedback data")?;
            let report = report::build_report(api.base_url(), &snapshot);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out } => {
            let api = FeedbackApi::new(&settings.api_url, settings.request_timeout)?;
            let snapshot = pipeline::load_snapshot(&api)
                .await
                .context("failed to load feedback data")?;
            let written = export::export_to_path(&out, &snapshot.feedback)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Exported {written} feedback records to {}.", out.display());
        }
        Commands::Call { phone_number } => {
            let api = FeedbackApi::new(&settings.api_url, settings.request_timeout)?;
            let status = place_call(&api, &phone_number).await?;
            println!("{status}");
        }
        Commands::Seed => {
            let api = FeedbackApi::new(&settings.api_url, settings.request_timeout)?;
            let summary = seed::seed(&api).await?;
            println!(
                "Seeded {} agents, {} clients, {} calls and {} feedback records.",
                summary.agents, summary.clients, summary.calls, summary.feedbacks
            );
        }
    }

    Ok(())
}

/// Places one test call and returns the status line; a failed call is an error.
async fn place_call(backend: &FeedbackApi, phone_number: &str) -> anyhow::Result<String> {
    let phone_number = api::validate_phone_number(phone_number)?;
    let outcome = backend.trigger_test_call(&phone_number).await;
    if !outcome.is_success() {
        anyhow::bail!("{}", outcome.status_message());
    }
    Ok(outcome.status_message())
}
