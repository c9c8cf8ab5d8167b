//! Business logic

pub mod detector;
pub mod evaluator;
pub mod pipeline;
pub mod resolver;
pub mod roster;
pub mod scorer;
pub mod stats;

pub use pipeline::{Pipeline, RunOutcome};
pub use scorer::{BatchScorer, ParticipantResult};
pub use stats::{StatsOutcome, StatsRefresher};
