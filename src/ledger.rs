//! Idempotency ledger: the durable "this contest has been scored" record
//!
//! The ledger is the sole gate against reprocessing a contest, and it also
//! carries the date of the last roster-wide stats refresh so that job runs
//! at most once per day. It is passed into the pipeline by reference so
//! tests can substitute an in-memory implementation.
//!
//! Failure asymmetry is deliberate: an unreadable backing store reads as
//! "nothing processed" (the system may rescore an already-scored contest),
//! never as "processed" (which would silently skip an unscored one).

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::VerdictSummary;

/// Durable record of one processed contest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedContestRecord {
    pub processed_at: DateTime<Utc>,
    pub summary: VerdictSummary,
}

/// Errors from the ledger's backing store
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ledger write error: {0}")]
    Persist(String),
}

/// Durable set of processed contest slugs
pub trait ProcessedLedger: Send + Sync {
    /// Whether the contest has already been scored and durably recorded
    fn is_processed(&self, slug: &str) -> Result<bool, LedgerError>;

    /// Record a contest as scored. Must be called only after the result sink
    /// has durably accepted the run's output.
    fn mark_processed(&self, slug: &str, summary: &VerdictSummary) -> Result<(), LedgerError>;

    /// Fetch the record for a processed contest, if any
    fn record(&self, slug: &str) -> Result<Option<ProcessedContestRecord>, LedgerError>;

    /// Calendar day of the last completed stats refresh, if any
    fn stats_refreshed_on(&self) -> Result<Option<NaiveDate>, LedgerError>;

    /// Record a completed stats refresh. Must be called only after the
    /// stats columns have been durably written.
    fn mark_stats_refreshed(&self, date: NaiveDate) -> Result<(), LedgerError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    processed_contests: HashMap<String, ProcessedContestRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_stats_refresh: Option<NaiveDate>,
}

/// JSON-file-backed ledger. Writes go to a temporary file in the same
/// directory and are renamed into place, so a crash mid-write leaves the
/// previous state intact.
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the backing file. A missing file is an empty ledger; an
    /// unreadable or corrupt file also degrades to empty (warn-logged), so
    /// corruption can only cause reprocessing, never a silent skip.
    fn load(&self) -> LedgerFile {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return LedgerFile::default();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Ledger file unreadable, treating as empty: {}",
                    e
                );
                return LedgerFile::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Ledger file corrupt, treating as empty: {}",
                    e
                );
                LedgerFile::default()
            }
        }
    }

    fn store(&self, file: &LedgerFile) -> Result<(), LedgerError> {
        let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            std::fs::create_dir_all(parent)?;
        }

        let dir = parent.unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, file)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| LedgerError::Persist(e.to_string()))?;
        Ok(())
    }
}

impl ProcessedLedger for FileLedger {
    fn is_processed(&self, slug: &str) -> Result<bool, LedgerError> {
        Ok(self.load().processed_contests.contains_key(slug))
    }

    fn mark_processed(&self, slug: &str, summary: &VerdictSummary) -> Result<(), LedgerError> {
        let mut file = self.load();
        file.processed_contests.insert(
            slug.to_string(),
            ProcessedContestRecord {
                processed_at: Utc::now(),
                summary: summary.clone(),
            },
        );
        self.store(&file)?;
        tracing::info!(slug, "Marked contest as processed");
        Ok(())
    }

    fn record(&self, slug: &str) -> Result<Option<ProcessedContestRecord>, LedgerError> {
        Ok(self.load().processed_contests.get(slug).cloned())
    }

    fn stats_refreshed_on(&self) -> Result<Option<NaiveDate>, LedgerError> {
        Ok(self.load().last_stats_refresh)
    }

    fn mark_stats_refreshed(&self, date: NaiveDate) -> Result<(), LedgerError> {
        let mut file = self.load();
        file.last_stats_refresh = Some(date);
        self.store(&file)?;
        tracing::info!(%date, "Marked stats as refreshed");
        Ok(())
    }
}

/// In-memory ledger for tests and dry runs
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<HashMap<String, ProcessedContestRecord>>,
    stats_refresh: Mutex<Option<NaiveDate>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessedLedger for MemoryLedger {
    fn is_processed(&self, slug: &str) -> Result<bool, LedgerError> {
        Ok(self
            .records
            .lock()
            .map_err(|_| LedgerError::Persist("ledger mutex poisoned".to_string()))?
            .contains_key(slug))
    }

    fn mark_processed(&self, slug: &str, summary: &VerdictSummary) -> Result<(), LedgerError> {
        self.records
            .lock()
            .map_err(|_| LedgerError::Persist("ledger mutex poisoned".to_string()))?
            .insert(
                slug.to_string(),
                ProcessedContestRecord {
                    processed_at: Utc::now(),
                    summary: summary.clone(),
                },
            );
        Ok(())
    }

    fn record(&self, slug: &str) -> Result<Option<ProcessedContestRecord>, LedgerError> {
        Ok(self
            .records
            .lock()
            .map_err(|_| LedgerError::Persist("ledger mutex poisoned".to_string()))?
            .get(slug)
            .cloned())
    }

    fn stats_refreshed_on(&self) -> Result<Option<NaiveDate>, LedgerError> {
        Ok(*self
            .stats_refresh
            .lock()
            .map_err(|_| LedgerError::Persist("ledger mutex poisoned".to_string()))?)
    }

    fn mark_stats_refreshed(&self, date: NaiveDate) -> Result<(), LedgerError> {
        *self
            .stats_refresh
            .lock()
            .map_err(|_| LedgerError::Persist("ledger mutex poisoned".to_string()))? = Some(date);
        Ok(())
    }
}
