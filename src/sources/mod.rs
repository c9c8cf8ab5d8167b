//! External collaborator contracts and their HTTP implementations
//!
//! Every upstream the pipeline touches is abstracted behind a trait so the
//! core can be driven by scripted fakes in tests. The error enums are
//! deliberately tagged: the evidence source in particular must distinguish
//! "identifier does not exist" from "rate limited" from "network failure",
//! because collapsing those to an empty history corrupts verdicts.

pub mod leetcode;
pub mod mirrors;
pub mod sheets;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::SubmissionRecord;

pub use leetcode::LeetCodeClient;
pub use mirrors::MirrorClient;
pub use sheets::SheetsClient;

/// Raw contest metadata as published upstream, before window resolution
#[derive(Debug, Clone)]
pub struct ContestMetadata {
    pub slug: String,
    pub display_name: String,
    pub start: DateTime<Utc>,
    pub duration: Duration,
    /// Problem slugs in published contest order
    pub problem_slugs: Vec<String>,
}

impl ContestMetadata {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + chrono::Duration::from_std(self.duration).unwrap_or_default()
    }
}

/// Errors from the contest metadata source
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("contest '{0}' not found")]
    NotFound(String),

    #[error("metadata source unreachable: {0}")]
    Transient(String),
}

/// Source of canonical contest metadata
#[async_trait]
pub trait ContestMetadataSource: Send + Sync {
    async fn fetch(&self, slug: &str) -> Result<ContestMetadata, MetadataError>;
}

/// Errors from the submission evidence source.
///
/// The three variants must never be conflated: `UnknownUser` becomes an
/// `INVALID_PARTICIPANT` verdict, while the other two are retried and
/// eventually degrade to `UNKNOWN`.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("identifier does not correspond to any account")]
    UnknownUser,

    #[error("rate limited by evidence source")]
    RateLimited {
        /// Server-specified wait hint, honored before the next attempt
        retry_after: Option<Duration>,
    },

    #[error("evidence source unreachable: {0}")]
    Transient(String),
}

/// Source of a participant's full submission history
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn fetch_submissions(
        &self,
        normalized_id: &str,
    ) -> Result<Vec<SubmissionRecord>, EvidenceError>;
}

/// Lifetime aggregate numbers for one account, refreshed daily
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileStats {
    /// Total problems the account has ever solved
    pub solved_count: u64,
    /// Current contest rating; zero for accounts that never competed
    pub contest_rating: f64,
}

/// Source of per-account aggregate stats. Shares the evidence error
/// taxonomy: an unknown account must stay distinguishable from a fetch
/// failure here too.
#[async_trait]
pub trait ProfileStatsSource: Send + Sync {
    async fn fetch_profile(&self, normalized_id: &str) -> Result<ProfileStats, EvidenceError>;
}

/// One raw roster row as read from the sheet, before normalization
#[derive(Debug, Clone)]
pub struct RosterRow {
    pub raw_id: String,
    pub display_name: String,
    /// 1-based sheet row the entry came from
    pub row: u32,
}

/// A single cell of a result column, aligned to a roster row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCell {
    /// 1-based sheet row to write into
    pub row: u32,
    pub value: String,
}

/// Errors from the roster sheet / result sink
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("sheet request failed: {0}")]
    Request(String),

    #[error("sheet response malformed: {0}")]
    Malformed(String),
}

/// External, mutable list of participants to evaluate
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Read roster rows in sheet order. Header rows are excluded.
    async fn read_rows(&self) -> Result<Vec<RosterRow>, SheetError>;
}

/// Spreadsheet column consuming the scorer's output
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Write one result column under the contest's display name. Reuses an
    /// existing column with the same header, so rewrites are idempotent.
    async fn append_column(
        &self,
        contest_display_name: &str,
        cells: &[ColumnCell],
    ) -> Result<(), SheetError>;
}
