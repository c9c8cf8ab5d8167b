//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// UPSTREAM ENDPOINTS
// =============================================================================

/// Base URL of the contest metadata API (contest info lives at `{base}/{slug}/`)
pub const DEFAULT_CONTEST_API_BASE: &str = "https://leetcode.com/contest/api/info";

/// Submission evidence mirrors, rotated round-robin to spread request load
pub const DEFAULT_EVIDENCE_MIRRORS: &[&str] = &[
    "https://alfa-pi.vercel.app",
    "https://alfa-weld.vercel.app",
    "https://alfa-nu.vercel.app",
];

/// Base URL of the spreadsheet values API
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

// =============================================================================
// RETRY & PACING DEFAULTS
// =============================================================================

/// Maximum evidence-fetch attempts per participant (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base backoff delay in milliseconds (doubles per attempt)
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 2_000;

/// Upper bound on a single backoff delay in milliseconds
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 60_000;

/// Delay between consecutive participants, to stay under mirror rate budgets
pub const DEFAULT_PACING_MS: u64 = 500;

/// Per-request HTTP timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// CONTEST DETECTION DEFAULTS
// =============================================================================

/// Contest number to start the weekly probe from (scanned downward)
pub const DEFAULT_WEEKLY_PROBE_START: u32 = 485;

/// Contest number to start the biweekly probe from (scanned downward)
pub const DEFAULT_BIWEEKLY_PROBE_START: u32 = 150;

/// How many contest numbers a probe scans before giving up
pub const DEFAULT_PROBE_LOOKBACK: u32 = 20;

/// Fixed duration of weekly and biweekly contests, in seconds
pub const CONTEST_DURATION_SECS: i64 = 90 * 60;

// =============================================================================
// SPREADSHEET LAYOUT
// =============================================================================

/// 0-based column holding the participant display name
pub const ROSTER_NAME_COLUMN: usize = 1;

/// 0-based column holding the participant identifier
pub const ROSTER_ID_COLUMN: usize = 2;

/// 1-based row of the header (data starts on the row after)
pub const SHEET_HEADER_ROW: u32 = 1;

/// Header of the roster-wide lifetime-solved column
pub const SOLVED_COLUMN_HEADER: &str = "Total Solved";

/// Header of the roster-wide contest-rating column
pub const RATING_COLUMN_HEADER: &str = "Contest Rating";

// =============================================================================
// TRIGGER SCHEDULE DEFAULTS (cron, UTC)
// =============================================================================

/// Weekly contests end Sunday 04:00 UTC; score a few minutes later
pub const DEFAULT_WEEKLY_CRON: &str = "0 4 4 * * Sun";

/// Biweekly contests end Saturday 16:00 UTC on alternate weeks; the
/// idempotency ledger absorbs the off-week firings
pub const DEFAULT_BIWEEKLY_CRON: &str = "0 4 16 * * Sat";

/// Daily stats refresh at 06:30 UTC; the ledger's date gate absorbs
/// duplicate firings within a day
pub const DEFAULT_STATS_CRON: &str = "0 30 6 * * *";

// =============================================================================
// STORAGE DEFAULTS
// =============================================================================

/// Default path of the processed-contest ledger file
pub const DEFAULT_LEDGER_PATH: &str = "contest_status.json";

/// Default directory for per-contest result backup files
pub const DEFAULT_BACKUP_DIR: &str = "results_backup";
