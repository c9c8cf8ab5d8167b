//! Contest Auditor - contest participation scoring
//!
//! This library detects newly-ended coding-contest events, determines which
//! registered participants solved which problems during the contest window,
//! and records the results in a tracking spreadsheet, without ever
//! double-processing a contest or conflating "did not participate" with
//! "could not be checked".
//!
//! # Architecture
//!
//! The application follows a layered architecture:
//! - **Sources**: collaborator traits and HTTP clients (metadata, evidence,
//!   spreadsheet)
//! - **Services**: window resolution, verdict evaluation, roster snapshot,
//!   batch scoring, pipeline orchestration, contest detection, daily stats
//!   refresh
//! - **Ledger**: durable idempotency record gating reprocessing
//! - **Scheduler**: cron trigger layer invoking the pipeline

pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod models;
pub mod retry;
pub mod scheduler;
pub mod services;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use ledger::{FileLedger, MemoryLedger, ProcessedLedger};
pub use models::{ContestWindow, Participant, Verdict, VerdictSummary};
pub use retry::RetryPolicy;
pub use services::{BatchScorer, Pipeline, RunOutcome, StatsOutcome, StatsRefresher};
