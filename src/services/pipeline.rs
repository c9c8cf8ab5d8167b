//! Scoring pipeline
//!
//! End-to-end orchestration for one contest: ledger gate, window resolution,
//! roster snapshot, batch scoring, sink write, ledger mark. The ledger is
//! marked only after the sink has durably accepted the column; any failure
//! before that leaves the ledger untouched so the next trigger can rerun the
//! contest from scratch.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::ledger::ProcessedLedger;
use crate::models::VerdictSummary;
use crate::services::scorer::{summarize, BatchScorer, ParticipantResult};
use crate::services::{resolver, roster};
use crate::sources::{ColumnCell, ContestMetadataSource, EvidenceSource, ResultSink, RosterSource};

/// Outcome of one pipeline invocation
#[derive(Debug)]
pub enum RunOutcome {
    /// Ledger already holds the slug; nothing was fetched or written
    Skipped { slug: String },
    /// Sink written and ledger marked. A summary with unknowns is a partial
    /// success, still durably recorded.
    Completed { slug: String, summary: VerdictSummary },
    /// Scored but nothing written and nothing marked
    DryRun { slug: String, summary: VerdictSummary },
}

/// The full contest-scoring pipeline with its collaborators
pub struct Pipeline {
    metadata: Arc<dyn ContestMetadataSource>,
    roster: Arc<dyn RosterSource>,
    evidence: Arc<dyn EvidenceSource>,
    sink: Arc<dyn ResultSink>,
    ledger: Arc<dyn ProcessedLedger>,
    scorer: BatchScorer,
    backup_dir: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        metadata: Arc<dyn ContestMetadataSource>,
        roster: Arc<dyn RosterSource>,
        evidence: Arc<dyn EvidenceSource>,
        sink: Arc<dyn ResultSink>,
        ledger: Arc<dyn ProcessedLedger>,
        scorer: BatchScorer,
        backup_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            metadata,
            roster,
            evidence,
            sink,
            ledger,
            scorer,
            backup_dir,
        }
    }

    /// Score one contest end to end. In dry-run mode the would-be column is
    /// logged and neither the sink nor the ledger is touched.
    pub async fn run(&self, slug: &str, dry_run: bool) -> AppResult<RunOutcome> {
        if self.ledger.is_processed(slug)? {
            tracing::info!(slug, "Contest already processed, skipping");
            return Ok(RunOutcome::Skipped { slug: slug.to_string() });
        }

        let window = resolver::resolve(self.metadata.as_ref(), slug, Utc::now()).await?;
        let participants = roster::snapshot(self.roster.as_ref()).await?;

        tracing::info!(
            slug,
            participants = participants.len(),
            "Scoring contest '{}'",
            window.display_name
        );
        let results = self
            .scorer
            .score(&window, &participants, self.evidence.as_ref())
            .await;
        let summary = summarize(&results);
        tracing::info!(slug, %summary, "Batch scoring finished");

        let cells: Vec<ColumnCell> = results
            .iter()
            .map(|r| ColumnCell {
                row: r.participant.row,
                value: r.verdict.cell(),
            })
            .collect();

        if dry_run {
            for result in &results {
                tracing::info!(
                    row = result.participant.row,
                    "DRY RUN: {} -> {}",
                    result.participant.display_name,
                    result.verdict.cell()
                );
            }
            return Ok(RunOutcome::DryRun { slug: slug.to_string(), summary });
        }

        self.sink.append_column(&window.display_name, &cells).await?;

        if let Some(dir) = &self.backup_dir {
            // Best effort; a failed backup never blocks the ledger mark
            if let Err(e) = write_backup(dir, slug, &window.display_name, &results) {
                tracing::warn!(slug, "Failed to write result backup: {}", e);
            }
        }

        self.ledger.mark_processed(slug, &summary)?;

        if summary.has_unknowns() {
            tracing::warn!(
                slug,
                unknown = summary.unknown,
                "Run completed with unretrievable participants"
            );
        }
        Ok(RunOutcome::Completed { slug: slug.to_string(), summary })
    }
}

fn write_backup(
    dir: &PathBuf,
    slug: &str,
    title: &str,
    results: &[ParticipantResult],
) -> Result<(), AppError> {
    std::fs::create_dir_all(dir).map_err(|e| AppError::Persistence(e.to_string()))?;

    let path = dir.join(format!("{}_{}.json", slug, Utc::now().timestamp()));
    let by_id: serde_json::Map<String, serde_json::Value> = results
        .iter()
        .map(|r| {
            (
                r.participant.normalized_id.clone(),
                serde_json::Value::String(r.verdict.cell()),
            )
        })
        .collect();
    let payload = serde_json::json!({
        "contest_slug": slug,
        "contest_title": title,
        "processed_at": Utc::now().to_rfc3339(),
        "results": by_id,
    });

    let raw = serde_json::to_string_pretty(&payload)
        .map_err(|e| AppError::Persistence(e.to_string()))?;
    std::fs::write(&path, raw).map_err(|e| AppError::Persistence(e.to_string()))?;
    tracing::info!(path = %path.display(), "Saved result backup");
    Ok(())
}
