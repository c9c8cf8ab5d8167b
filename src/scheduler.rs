//! Cron trigger layer
//!
//! Fires the scoring pipeline shortly after each contest kind's usual end
//! time, and the stats refresh once a day. The firing schedule is
//! deliberately coarse: the biweekly job fires every Saturday even though
//! the contest runs on alternate weeks, and the idempotency ledger makes
//! the off-week (and any duplicate) firings no-ops; the daily date gate
//! plays the same role for the stats job. Firings run inside the job body,
//! so two runs for the same slug never overlap.

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::Config;
use crate::models::ContestKind;
use crate::services::detector::{self, ProbeRange};
use crate::services::{Pipeline, RunOutcome, StatsOutcome, StatsRefresher};
use crate::sources::ContestMetadataSource;
use crate::utils::time::now_utc;

/// Scheduler that triggers contest scoring and the daily stats refresh
pub struct TriggerScheduler {
    config: Arc<Config>,
    pipeline: Arc<Pipeline>,
    metadata: Arc<dyn ContestMetadataSource>,
    stats: Arc<StatsRefresher>,
    scheduler: JobScheduler,
}

impl TriggerScheduler {
    pub async fn new(
        config: Arc<Config>,
        pipeline: Arc<Pipeline>,
        metadata: Arc<dyn ContestMetadataSource>,
        stats: Arc<StatsRefresher>,
    ) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            config,
            pipeline,
            metadata,
            stats,
            scheduler,
        })
    }

    /// Register the weekly, biweekly, and daily stats trigger jobs
    pub async fn setup_jobs(&mut self) -> Result<()> {
        self.add_contest_job(ContestKind::Weekly, self.config.schedule.weekly_cron.clone())
            .await?;
        self.add_contest_job(
            ContestKind::Biweekly,
            self.config.schedule.biweekly_cron.clone(),
        )
        .await?;
        self.add_stats_job(self.config.schedule.stats_cron.clone())
            .await?;
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        self.scheduler.start().await?;
        Ok(())
    }

    /// Shutdown the scheduler gracefully
    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    async fn add_contest_job(&self, kind: ContestKind, cron_expr: String) -> Result<()> {
        let config = self.config.clone();
        let pipeline = self.pipeline.clone();
        let metadata = self.metadata.clone();

        tracing::info!(?kind, cron = %cron_expr, "Adding contest trigger job");

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let config = config.clone();
            let pipeline = pipeline.clone();
            let metadata = metadata.clone();

            Box::pin(async move {
                tracing::info!(?kind, "Contest trigger fired");
                if let Err(e) = score_latest(&config, &pipeline, metadata.as_ref(), kind).await {
                    tracing::error!(
                        ?kind,
                        code = e.error_code(),
                        "Triggered scoring run failed: {}",
                        e
                    );
                }
            })
        })?;

        self.scheduler.add(job).await?;
        Ok(())
    }

    async fn add_stats_job(&self, cron_expr: String) -> Result<()> {
        let stats = self.stats.clone();

        tracing::info!(cron = %cron_expr, "Adding daily stats trigger job");

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let stats = stats.clone();

            Box::pin(async move {
                tracing::info!("Daily stats trigger fired");
                match stats.refresh(now_utc().date_naive(), false).await {
                    Ok(StatsOutcome::Skipped { date }) => {
                        tracing::info!(%date, "Stats already refreshed, nothing to do")
                    }
                    Ok(StatsOutcome::Completed { date, refreshed, invalid, unknown }) => {
                        tracing::info!(%date, refreshed, invalid, unknown, "Stats refresh completed")
                    }
                    Err(e) => {
                        tracing::error!(code = e.error_code(), "Triggered stats refresh failed: {}", e)
                    }
                }
            })
        })?;

        self.scheduler.add(job).await?;
        Ok(())
    }
}

/// Detect the latest ended contest of `kind` and run the pipeline for it.
/// The ledger turns repeat invocations for an already-scored contest into
/// cheap skips.
pub async fn score_latest(
    config: &Config,
    pipeline: &Pipeline,
    metadata: &dyn ContestMetadataSource,
    kind: ContestKind,
) -> crate::error::AppResult<RunOutcome> {
    let range = match kind {
        ContestKind::Biweekly => ProbeRange {
            start: config.detection.biweekly_probe_start,
            lookback: config.detection.probe_lookback,
        },
        _ => ProbeRange {
            start: config.detection.weekly_probe_start,
            lookback: config.detection.probe_lookback,
        },
    };

    let latest = detector::latest_ended(metadata, kind, range, now_utc()).await?;
    let outcome = pipeline.run(&latest.slug, false).await?;

    match &outcome {
        RunOutcome::Skipped { slug } => tracing::info!(slug, "Already scored, nothing to do"),
        RunOutcome::Completed { slug, summary } => {
            tracing::info!(slug, %summary, "Scoring run completed")
        }
        RunOutcome::DryRun { slug, summary } => {
            tracing::info!(slug, %summary, "Dry run completed")
        }
    }
    Ok(outcome)
}
