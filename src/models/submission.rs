//! Submission evidence model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single submission as reported upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Accepted,
    Rejected,
    /// Status string the judge reported that maps to neither of the above
    /// (e.g. still queued). Counts as participation, never as a solve.
    Other,
}

impl SubmissionOutcome {
    /// Map an upstream status display string to an outcome
    pub fn from_status(status: &str) -> Self {
        match status {
            "Accepted" => Self::Accepted,
            "Wrong Answer"
            | "Time Limit Exceeded"
            | "Memory Limit Exceeded"
            | "Output Limit Exceeded"
            | "Runtime Error"
            | "Compile Error" => Self::Rejected,
            _ => Self::Other,
        }
    }
}

/// One submission from a participant's history. Read-only evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Slug of the problem the submission targets
    pub problem_slug: String,
    /// Instant the submission was made
    pub submitted_at: DateTime<Utc>,
    pub outcome: SubmissionOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(SubmissionOutcome::from_status("Accepted"), SubmissionOutcome::Accepted);
        assert_eq!(SubmissionOutcome::from_status("Wrong Answer"), SubmissionOutcome::Rejected);
        assert_eq!(SubmissionOutcome::from_status("Runtime Error"), SubmissionOutcome::Rejected);
        assert_eq!(SubmissionOutcome::from_status("Pending"), SubmissionOutcome::Other);
    }
}
