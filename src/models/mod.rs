//! Domain models

pub mod contest;
pub mod participant;
pub mod submission;
pub mod verdict;

pub use contest::{ContestKind, ContestWindow, ProblemRef};
pub use participant::{normalize_identifier, Participant};
pub use submission::{SubmissionOutcome, SubmissionRecord};
pub use verdict::{Verdict, VerdictSummary};
