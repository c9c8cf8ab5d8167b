//! Contest window model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::CONTEST_DURATION_SECS;

/// Contest duration class, derived from the slug naming convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestKind {
    Weekly,
    Biweekly,
    /// Slug does not follow a recognized naming convention; no duration
    /// class is enforced
    Other,
}

impl ContestKind {
    /// Classify a contest slug (e.g. `"weekly-contest-478"`)
    pub fn from_slug(slug: &str) -> Self {
        if slug.starts_with("weekly-contest-") {
            Self::Weekly
        } else if slug.starts_with("biweekly-contest-") {
            Self::Biweekly
        } else {
            Self::Other
        }
    }

    /// Slug prefix for contests of this kind, if the kind has one
    pub fn slug_prefix(&self) -> Option<&'static str> {
        match self {
            Self::Weekly => Some("weekly-contest-"),
            Self::Biweekly => Some("biweekly-contest-"),
            Self::Other => None,
        }
    }

    /// Fixed duration of contests of this kind, if the kind has one
    pub fn expected_duration(&self) -> Option<Duration> {
        match self {
            Self::Weekly | Self::Biweekly => Some(Duration::seconds(CONTEST_DURATION_SECS)),
            Self::Other => None,
        }
    }
}

/// A problem as it appears inside one specific contest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRef {
    /// Per-contest stable problem slug
    pub slug: String,
    /// 1-based position within the contest, matching published rank
    pub ordinal: u32,
}

/// A resolved contest: identity, time window, and ordered problem set.
/// Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestWindow {
    pub slug: String,
    pub display_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub problems: Vec<ProblemRef>,
}

impl ContestWindow {
    /// Contest duration class derived from the slug
    pub fn kind(&self) -> ContestKind {
        ContestKind::from_slug(&self.slug)
    }

    /// Whether an instant falls inside the contest window.
    ///
    /// The window is half-open: a submission at exactly `end` does not count.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Whether the contest has already ended at `now`
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end <= now
    }

    /// Whether a problem slug belongs to this contest
    pub fn has_problem(&self, problem_slug: &str) -> bool {
        self.problems.iter().any(|p| p.slug == problem_slug)
    }
}
