use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod audit;
mod collectors;
mod config;
mod delivery;
mod error;
mod fetch;
mod models;
mod narrative;
mod page;
mod report;
mod scoring;
mod storage;
mod submission;
#[cfg(test)]
mod test_support;

use crate::config::Config;
use crate::delivery::{Attachment, EmailDispatcher};
use crate::error::DeliveryError;
use crate::fetch::Fetcher;
use crate::models::AuditResult;
use crate::storage::LeadStore;

#[derive(Parser)]
#[command(name = "ai-visibility-audit")]
#[command(about = "AI visibility audit for business websites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    #[arg(long)]
    business: String,
    #[arg(long)]
    url: String,
    #[arg(long)]
    email: String,
    /// Used when the business name is missing or a placeholder
    #[arg(long)]
    contact_name: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a website, write the report, email it and record the lead
    Audit {
        #[command(flatten)]
        target: Target,
        /// Report directory (defaults to <reports dir>/<business>_<timestamp>)
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        no_email: bool,
    },
    /// Score a website without writing anything
    Score {
        #[command(flatten)]
        target: Target,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create the lead store if it does not exist
    InitStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ai_visibility_audit=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_redacted();

    match cli.command {
        Commands::InitStore => {
            let store = LeadStore::open(&config.data_dir)?;
            println!("Lead store ready at {}.", store.path().display());
        }
        Commands::Score { target, json } => {
            let result = run(&config, &target).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_scores(&result);
            }
        }
        Commands::Audit {
            target,
            output,
            no_email,
        } => {
            let result = run(&config, &target).await?;
            print_scores(&result);

            let out_dir = output.unwrap_or_else(|| {
                report::report_dir(&config.reports_dir, &result.submission.business_name, Utc::now())
            });
            let detail_path = report::write_report(&result, &config.branding, &out_dir)?;
            let detail_path = std::fs::canonicalize(&detail_path).unwrap_or(detail_path);

            if !no_email {
                deliver(&config, &result, &detail_path).await?;
            }

            let store = LeadStore::open(&config.data_dir)?;
            store.append(&result, &detail_path)?;
            println!("Report written to {}.", detail_path.display());
        }
    }

    Ok(())
}

async fn run(config: &Config, target: &Target) -> anyhow::Result<AuditResult> {
    let submission = submission::build_submission(
        &target.business,
        target.contact_name.as_deref(),
        &target.url,
        &target.email,
        &config.placeholder_names,
    )?;
    let fetcher = Fetcher::new(config.fetch_timeout, config.probe_timeout)?;
    Ok(audit::run_audit(&fetcher, submission, None, config.narrative_timeout).await)
}

async fn deliver(config: &Config, result: &AuditResult, detail_path: &std::path::Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(detail_path)
        .with_context(|| format!("failed to read report {}", detail_path.display()))?;
    let attachment = Attachment {
        filename: report::DETAIL_FILE,
        mime_type: "text/markdown",
        bytes: &bytes,
    };

    let dispatcher = EmailDispatcher::new(config.delivery.clone())?;
    let submission = &result.submission;
    match dispatcher
        .send_audit_report(&submission.contact_email, &submission.business_name, &attachment)
        .await
    {
        Ok(()) => println!("Report emailed to {}.", submission.contact_email),
        Err(DeliveryError::NotConfigured) => warn!("Email delivery not configured; skipping"),
        Err(err) => warn!(error = %err, "Email delivery failed"),
    }
    Ok(())
}

fn print_scores(result: &AuditResult) {
    let overall = &result.overall;
    println!(
        "Overall score: {}/{} grade {}",
        overall.total_points, overall.max_total_points, overall.grade
    );
    for score in &overall.category_scores {
        println!(
            "- Layer {} ({}): {}/{}",
            score.category.id(),
            score.category_name,
            score.points_earned,
            score.points_possible
        );
    }
    println!("{}", overall.summary_text);
}
