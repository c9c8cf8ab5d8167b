//! Verdict types and the spreadsheet cell encoding

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-participant, per-contest classification of outcome.
///
/// Exactly one verdict is produced per (contest, participant) pair per run.
/// `Unknown` is deliberately distinct from `NotParticipated` and from
/// `Solved(0)`-style outcomes: it means the evidence could not be retrieved,
/// not that the participant did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// No in-window submissions for any contest problem
    NotParticipated,
    /// At least one in-window submission, none accepted
    ParticipatedUnsolved,
    /// Count of distinct problems with an accepted in-window submission
    Solved(u32),
    /// The identifier does not correspond to any real account
    InvalidParticipant,
    /// Evidence retrieval failed after exhausting retries
    Unknown,
}

impl Verdict {
    /// Spreadsheet cell encoding for this verdict
    pub fn cell(&self) -> String {
        match self {
            Self::NotParticipated => "N/A".to_string(),
            Self::ParticipatedUnsolved => "0".to_string(),
            Self::Solved(n) => n.to_string(),
            Self::InvalidParticipant => "INVALID".to_string(),
            Self::Unknown => "ERROR".to_string(),
        }
    }

    /// Short code used in logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotParticipated => "NOT_PARTICIPATED",
            Self::ParticipatedUnsolved => "PARTICIPATED_UNSOLVED",
            Self::Solved(_) => "SOLVED",
            Self::InvalidParticipant => "INVALID_PARTICIPANT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solved(n) => write!(f, "SOLVED({})", n),
            other => f.write_str(other.code()),
        }
    }
}

/// Counts by verdict kind for one completed scoring run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictSummary {
    pub not_participated: u32,
    pub unsolved: u32,
    pub invalid: u32,
    pub unknown: u32,
    /// Distribution of solved counts: problems solved -> participants
    pub solved: BTreeMap<u32, u32>,
}

impl VerdictSummary {
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::NotParticipated => self.not_participated += 1,
            Verdict::ParticipatedUnsolved => self.unsolved += 1,
            Verdict::InvalidParticipant => self.invalid += 1,
            Verdict::Unknown => self.unknown += 1,
            Verdict::Solved(n) => *self.solved.entry(n).or_insert(0) += 1,
        }
    }

    /// Total participants this summary covers
    pub fn total(&self) -> u32 {
        self.not_participated
            + self.unsolved
            + self.invalid
            + self.unknown
            + self.solved.values().sum::<u32>()
    }

    /// Whether any participant's evidence could not be retrieved
    pub fn has_unknowns(&self) -> bool {
        self.unknown > 0
    }
}

impl fmt::Display for VerdictSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} n/a={} unsolved={} invalid={} unknown={}",
            self.total(),
            self.not_participated,
            self.unsolved,
            self.invalid,
            self.unknown
        )?;
        for (count, participants) in &self.solved {
            write!(f, " solved[{}]={}", count, participants)?;
        }
        Ok(())
    }
}
