//! Daily profile stats refresh
//!
//! Keeps two roster-wide columns current: each participant's lifetime
//! solved count and their contest rating. Unlike contest scoring this is
//! not tied to an event, so the ledger gates it by calendar day instead of
//! by slug; the date is advanced only after both columns are durably
//! written, so a failed refresh reruns on the next trigger.
//!
//! Per-participant fault isolation matches the batch scorer: an unknown
//! account marks both cells `INVALID`, a fetch that survives the retry
//! budget marks them `ERROR`, and the refresh moves on either way.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::constants::{RATING_COLUMN_HEADER, SOLVED_COLUMN_HEADER};
use crate::error::AppResult;
use crate::ledger::ProcessedLedger;
use crate::models::{Participant, Verdict};
use crate::retry::RetryPolicy;
use crate::services::roster;
use crate::sources::{
    ColumnCell, EvidenceError, ProfileStats, ProfileStatsSource, ResultSink, RosterSource,
};

/// Outcome of one stats refresh invocation
#[derive(Debug)]
pub enum StatsOutcome {
    /// The ledger already holds today's date; nothing fetched or written
    Skipped { date: NaiveDate },
    /// Both columns written and the ledger date advanced
    Completed {
        date: NaiveDate,
        refreshed: usize,
        invalid: usize,
        unknown: usize,
    },
}

enum ProfileOutcome {
    Fetched(ProfileStats),
    Invalid,
    Unknown,
}

/// Refreshes the aggregate stats columns for the whole roster
pub struct StatsRefresher {
    roster: Arc<dyn RosterSource>,
    stats: Arc<dyn ProfileStatsSource>,
    sink: Arc<dyn ResultSink>,
    ledger: Arc<dyn ProcessedLedger>,
    retry: RetryPolicy,
    pacing: Duration,
}

impl StatsRefresher {
    pub fn new(
        roster: Arc<dyn RosterSource>,
        stats: Arc<dyn ProfileStatsSource>,
        sink: Arc<dyn ResultSink>,
        ledger: Arc<dyn ProcessedLedger>,
        retry: RetryPolicy,
        pacing: Duration,
    ) -> Self {
        Self {
            roster,
            stats,
            sink,
            ledger,
            retry,
            pacing,
        }
    }

    /// Refresh both stats columns. Runs at most once per calendar day
    /// unless `force` is set.
    pub async fn refresh(&self, today: NaiveDate, force: bool) -> AppResult<StatsOutcome> {
        if !force && self.ledger.stats_refreshed_on()? == Some(today) {
            tracing::info!(%today, "Stats already refreshed today, skipping");
            return Ok(StatsOutcome::Skipped { date: today });
        }

        let participants = roster::snapshot(self.roster.as_ref()).await?;
        tracing::info!(
            participants = participants.len(),
            "Refreshing profile stats"
        );

        let mut solved_cells = Vec::with_capacity(participants.len());
        let mut rating_cells = Vec::with_capacity(participants.len());
        let mut invalid = 0usize;
        let mut unknown = 0usize;

        for (idx, participant) in participants.iter().enumerate() {
            tracing::info!(
                "[{}/{}] Fetching stats for {}",
                idx + 1,
                participants.len(),
                participant.display_name
            );

            let (solved, rating) = match self.profile_for(participant).await {
                ProfileOutcome::Fetched(stats) => {
                    (stats.solved_count.to_string(), rating_cell(stats.contest_rating))
                }
                ProfileOutcome::Invalid => {
                    invalid += 1;
                    (Verdict::InvalidParticipant.cell(), Verdict::InvalidParticipant.cell())
                }
                ProfileOutcome::Unknown => {
                    unknown += 1;
                    (Verdict::Unknown.cell(), Verdict::Unknown.cell())
                }
            };
            solved_cells.push(ColumnCell {
                row: participant.row,
                value: solved,
            });
            rating_cells.push(ColumnCell {
                row: participant.row,
                value: rating,
            });

            if idx + 1 < participants.len() && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        self.sink
            .append_column(SOLVED_COLUMN_HEADER, &solved_cells)
            .await?;
        self.sink
            .append_column(RATING_COLUMN_HEADER, &rating_cells)
            .await?;

        self.ledger.mark_stats_refreshed(today)?;

        if unknown > 0 {
            tracing::warn!(unknown, "Stats refresh completed with unretrievable profiles");
        }
        Ok(StatsOutcome::Completed {
            date: today,
            refreshed: participants.len(),
            invalid,
            unknown,
        })
    }

    async fn profile_for(&self, participant: &Participant) -> ProfileOutcome {
        let mut attempt: u32 = 1;

        loop {
            match self.stats.fetch_profile(&participant.normalized_id).await {
                Ok(stats) => return ProfileOutcome::Fetched(stats),
                Err(EvidenceError::UnknownUser) => {
                    tracing::warn!(
                        raw_id = %participant.raw_id,
                        "Identifier does not correspond to any account"
                    );
                    return ProfileOutcome::Invalid;
                }
                Err(EvidenceError::RateLimited { retry_after }) => {
                    let Some(backoff) = self.retry.backoff_with_jitter(attempt) else {
                        tracing::error!(
                            id = %participant.normalized_id,
                            attempts = attempt,
                            "Rate limited on every attempt, recording ERROR"
                        );
                        return ProfileOutcome::Unknown;
                    };
                    let wait = retry_after.map_or(backoff, |hint| hint.max(backoff));
                    tracing::warn!(
                        id = %participant.normalized_id,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(EvidenceError::Transient(msg)) => {
                    let Some(backoff) = self.retry.backoff_with_jitter(attempt) else {
                        tracing::error!(
                            id = %participant.normalized_id,
                            attempts = attempt,
                            "Stats fetch failed after all retries: {}",
                            msg
                        );
                        return ProfileOutcome::Unknown;
                    };
                    tracing::warn!(
                        id = %participant.normalized_id,
                        attempt,
                        "Stats fetch failed ({}), retrying",
                        msg
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
            attempt += 1;
        }
    }
}

/// Render a contest rating for its sheet cell. Whole-number ratings drop
/// the fraction; others keep two decimals.
fn rating_cell(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{}", rating as i64)
    } else {
        format!("{:.2}", rating)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::sources::{RosterRow, SheetError};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
    }

    struct FixedRoster(Vec<RosterRow>);

    #[async_trait]
    impl RosterSource for FixedRoster {
        async fn read_rows(&self) -> Result<Vec<RosterRow>, SheetError> {
            Ok(self.0.clone())
        }
    }

    fn roster_of(ids: &[&str]) -> Arc<FixedRoster> {
        Arc::new(FixedRoster(
            ids.iter()
                .enumerate()
                .map(|(idx, id)| RosterRow {
                    raw_id: id.to_string(),
                    display_name: format!("Student {}", idx + 1),
                    row: idx as u32 + 2,
                })
                .collect(),
        ))
    }

    /// Stats source replaying a per-identifier script, repeating the last
    /// entry once the script runs out.
    struct ScriptedStats {
        scripts: Mutex<HashMap<String, Vec<Result<ProfileStats, EvidenceError>>>>,
        calls: AtomicU32,
    }

    impl ScriptedStats {
        fn new() -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                calls: AtomicU32::new(0),
            }
        }

        fn script(self, id: &str, responses: Vec<Result<ProfileStats, EvidenceError>>) -> Self {
            self.scripts.lock().unwrap().insert(id.to_string(), responses);
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileStatsSource for ScriptedStats {
        async fn fetch_profile(&self, normalized_id: &str) -> Result<ProfileStats, EvidenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts
                .get_mut(normalized_id)
                .unwrap_or_else(|| panic!("no script for {}", normalized_id));
            if script.len() > 1 {
                script.remove(0)
            } else {
                match &script[0] {
                    Ok(stats) => Ok(*stats),
                    Err(EvidenceError::UnknownUser) => Err(EvidenceError::UnknownUser),
                    Err(EvidenceError::RateLimited { retry_after }) => {
                        Err(EvidenceError::RateLimited { retry_after: *retry_after })
                    }
                    Err(EvidenceError::Transient(m)) => Err(EvidenceError::Transient(m.clone())),
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        columns: Mutex<Vec<(String, Vec<ColumnCell>)>>,
        fail: AtomicBool,
    }

    impl RecordingSink {
        fn failing() -> Self {
            let sink = Self::default();
            sink.fail.store(true, Ordering::SeqCst);
            sink
        }

        fn columns(&self) -> Vec<(String, Vec<ColumnCell>)> {
            self.columns.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResultSink for RecordingSink {
        async fn append_column(
            &self,
            contest_display_name: &str,
            cells: &[ColumnCell],
        ) -> Result<(), SheetError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SheetError::Request("503 Service Unavailable".to_string()));
            }
            self.columns
                .lock()
                .unwrap()
                .push((contest_display_name.to_string(), cells.to_vec()));
            Ok(())
        }
    }

    fn refresher(
        roster: Arc<FixedRoster>,
        stats: Arc<ScriptedStats>,
        sink: Arc<RecordingSink>,
        ledger: Arc<MemoryLedger>,
    ) -> StatsRefresher {
        StatsRefresher::new(
            roster,
            stats,
            sink,
            ledger,
            RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(100)),
            Duration::from_millis(5),
        )
    }

    fn profile(solved: u64, rating: f64) -> ProfileStats {
        ProfileStats {
            solved_count: solved,
            contest_rating: rating,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_writes_both_columns_and_marks_the_day() {
        let stats = Arc::new(
            ScriptedStats::new()
                .script("alice01", vec![Ok(profile(350, 1576.51))])
                .script("bob02", vec![Ok(profile(0, 0.0))]),
        );
        let sink = Arc::new(RecordingSink::default());
        let ledger = Arc::new(MemoryLedger::new());
        let refresher = refresher(roster_of(&["alice01", "bob02"]), stats, sink.clone(), ledger.clone());

        let outcome = refresher.refresh(date(), false).await.unwrap();

        assert!(matches!(
            outcome,
            StatsOutcome::Completed { refreshed: 2, invalid: 0, unknown: 0, .. }
        ));
        let columns = sink.columns();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].0, SOLVED_COLUMN_HEADER);
        assert_eq!(columns[1].0, RATING_COLUMN_HEADER);
        assert_eq!(columns[0].1[0], ColumnCell { row: 2, value: "350".to_string() });
        assert_eq!(columns[0].1[1], ColumnCell { row: 3, value: "0".to_string() });
        assert_eq!(columns[1].1[0], ColumnCell { row: 2, value: "1576.51".to_string() });
        assert_eq!(columns[1].1[1], ColumnCell { row: 3, value: "0".to_string() });
        assert_eq!(ledger.stats_refreshed_on().unwrap(), Some(date()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_day_refresh_skips_without_upstream_calls() {
        let stats = Arc::new(ScriptedStats::new());
        let sink = Arc::new(RecordingSink::default());
        let ledger = Arc::new(MemoryLedger::new());
        ledger.mark_stats_refreshed(date()).unwrap();
        let refresher = refresher(roster_of(&["alice01"]), stats.clone(), sink.clone(), ledger);

        let outcome = refresher.refresh(date(), false).await.unwrap();

        assert!(matches!(outcome, StatsOutcome::Skipped { .. }));
        assert_eq!(stats.calls(), 0);
        assert!(sink.columns().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_day_refreshes_again() {
        let stats = Arc::new(ScriptedStats::new().script("alice01", vec![Ok(profile(10, 0.0))]));
        let sink = Arc::new(RecordingSink::default());
        let ledger = Arc::new(MemoryLedger::new());
        ledger
            .mark_stats_refreshed(date().pred_opt().unwrap())
            .unwrap();
        let refresher = refresher(roster_of(&["alice01"]), stats, sink, ledger.clone());

        let outcome = refresher.refresh(date(), false).await.unwrap();

        assert!(matches!(outcome, StatsOutcome::Completed { .. }));
        assert_eq!(ledger.stats_refreshed_on().unwrap(), Some(date()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_bypasses_daily_gate() {
        let stats = Arc::new(ScriptedStats::new().script("alice01", vec![Ok(profile(10, 0.0))]));
        let sink = Arc::new(RecordingSink::default());
        let ledger = Arc::new(MemoryLedger::new());
        ledger.mark_stats_refreshed(date()).unwrap();
        let refresher = refresher(roster_of(&["alice01"]), stats, sink.clone(), ledger);

        let outcome = refresher.refresh(date(), true).await.unwrap();

        assert!(matches!(outcome, StatsOutcome::Completed { .. }));
        assert_eq!(sink.columns().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_account_marks_invalid_in_both_columns() {
        let stats = Arc::new(
            ScriptedStats::new()
                .script("ghost", vec![Err(EvidenceError::UnknownUser)])
                .script("alice01", vec![Ok(profile(42, 1500.0))]),
        );
        let sink = Arc::new(RecordingSink::default());
        let ledger = Arc::new(MemoryLedger::new());
        let refresher =
            refresher(roster_of(&["ghost", "alice01"]), stats.clone(), sink.clone(), ledger);

        let outcome = refresher.refresh(date(), false).await.unwrap();

        assert!(matches!(outcome, StatsOutcome::Completed { invalid: 1, .. }));
        let columns = sink.columns();
        assert_eq!(columns[0].1[0].value, "INVALID");
        assert_eq!(columns[1].1[0].value, "INVALID");
        assert_eq!(columns[0].1[1].value, "42");
        assert_eq!(columns[1].1[1].value, "1500");
        // No retry for a confirmed non-existent account
        assert_eq!(stats.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_degrade_to_error_cells_but_refresh_completes() {
        let stats = Arc::new(
            ScriptedStats::new()
                .script("flaky", vec![Err(EvidenceError::Transient("timeout".to_string()))])
                .script("alice01", vec![Ok(profile(42, 1500.0))]),
        );
        let sink = Arc::new(RecordingSink::default());
        let ledger = Arc::new(MemoryLedger::new());
        let refresher = refresher(
            roster_of(&["flaky", "alice01"]),
            stats.clone(),
            sink.clone(),
            ledger.clone(),
        );

        let outcome = refresher.refresh(date(), false).await.unwrap();

        assert!(matches!(outcome, StatsOutcome::Completed { unknown: 1, .. }));
        let columns = sink.columns();
        assert_eq!(columns[0].1[0].value, "ERROR");
        assert_eq!(columns[1].1[0].value, "ERROR");
        // 3 attempts for the flaky account, 1 for the good one
        assert_eq!(stats.calls(), 4);
        // A degraded refresh is still recorded for the day
        assert_eq!(ledger.stats_refreshed_on().unwrap(), Some(date()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_leaves_daily_gate_unmarked() {
        let stats = Arc::new(ScriptedStats::new().script("alice01", vec![Ok(profile(10, 0.0))]));
        let sink = Arc::new(RecordingSink::failing());
        let ledger = Arc::new(MemoryLedger::new());
        let refresher = refresher(roster_of(&["alice01"]), stats, sink, ledger.clone());

        let err = refresher.refresh(date(), false).await.unwrap_err();

        assert!(err.is_retry_safe());
        assert_eq!(ledger.stats_refreshed_on().unwrap(), None);
    }

    #[test]
    fn test_rating_cell_rendering() {
        assert_eq!(rating_cell(0.0), "0");
        assert_eq!(rating_cell(1576.0), "1576");
        assert_eq!(rating_cell(1576.517), "1576.52");
    }
}
