//! Contest Auditor - Application Entry Point

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contest_auditor::{
    config::Config,
    models::ContestKind,
    scheduler::{self, TriggerScheduler},
    services::{Pipeline, StatsRefresher},
    sources::{LeetCodeClient, MirrorClient, SheetsClient},
    utils::time::now_utc,
    BatchScorer, FileLedger,
};

#[derive(Parser)]
#[command(
    name = "contest-auditor",
    about = "Score registered participants against ended coding contests and record results in the tracking sheet"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score one specific contest by slug
    Run {
        /// Contest slug, e.g. weekly-contest-478
        #[arg(long)]
        slug: String,
        /// Evaluate and log results without writing the sheet or the ledger
        #[arg(long)]
        dry_run: bool,
    },
    /// Detect and score the latest ended contest of a kind
    Latest {
        /// Contest kind: weekly or biweekly
        #[arg(long, default_value = "weekly")]
        kind: String,
    },
    /// Refresh the roster-wide solved-count and rating columns
    Stats {
        /// Refresh even if already done today
        #[arg(long)]
        force: bool,
    },
    /// Run the cron trigger loop until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Arc::new(Config::from_env().context("Failed to load configuration")?);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting contest-auditor...");

    let metadata = Arc::new(LeetCodeClient::new(
        config.upstream.contest_api_base.clone(),
        config.upstream.http_timeout,
    )?);
    let evidence = Arc::new(MirrorClient::new(
        config.upstream.evidence_mirrors.clone(),
        config.upstream.http_timeout,
    )?);
    let sheets = Arc::new(SheetsClient::new(
        config.sheet.api_base.clone(),
        config.sheet.sheet_id.clone(),
        config.sheet.tab.clone(),
        config.sheet.token.clone(),
        config.upstream.http_timeout,
    )?);
    let ledger = Arc::new(FileLedger::new(config.storage.ledger_path.clone()));

    let pipeline = Arc::new(Pipeline::new(
        metadata.clone(),
        sheets.clone(),
        evidence.clone(),
        sheets.clone(),
        ledger.clone(),
        BatchScorer::new(config.scoring.retry_policy(), config.scoring.pacing),
        config.storage.backup_dir.clone(),
    ));
    let stats = Arc::new(StatsRefresher::new(
        sheets.clone(),
        evidence,
        sheets,
        ledger,
        config.scoring.retry_policy(),
        config.scoring.pacing,
    ));

    match cli.command {
        Command::Run { slug, dry_run } => {
            let outcome = pipeline.run(&slug, dry_run).await?;
            tracing::info!("Run finished: {:?}", outcome);
        }
        Command::Latest { kind } => {
            let kind = match kind.as_str() {
                "weekly" => ContestKind::Weekly,
                "biweekly" => ContestKind::Biweekly,
                other => anyhow::bail!("unknown contest kind '{}'", other),
            };
            let outcome =
                scheduler::score_latest(&config, &pipeline, metadata.as_ref(), kind).await?;
            tracing::info!("Run finished: {:?}", outcome);
        }
        Command::Stats { force } => {
            let outcome = stats.refresh(now_utc().date_naive(), force).await?;
            tracing::info!("Stats refresh finished: {:?}", outcome);
        }
        Command::Watch => {
            let mut triggers =
                TriggerScheduler::new(config.clone(), pipeline, metadata.clone(), stats.clone())
                    .await?;
            triggers.setup_jobs().await?;
            triggers.start().await?;
            tracing::info!("Trigger scheduler running, waiting for Ctrl-C");

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutting down");
            triggers.shutdown().await?;
        }
    }

    Ok(())
}
