//! Contest detector
//!
//! Finds the most recently ended contest of a kind by probing contest
//! numbers downward from a configured starting point. Probes that hit a
//! missing contest keep scanning; transient probe failures are skipped too,
//! because a neighbor number usually still resolves.

use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};
use crate::models::ContestKind;
use crate::sources::{ContestMetadata, ContestMetadataSource, MetadataError};

/// Probe bounds for one contest kind
#[derive(Debug, Clone, Copy)]
pub struct ProbeRange {
    /// Highest contest number to try (scanned downward)
    pub start: u32,
    /// How many numbers to scan before giving up
    pub lookback: u32,
}

/// Find the latest contest of `kind` whose end instant is before `now`.
pub async fn latest_ended(
    metadata_source: &dyn ContestMetadataSource,
    kind: ContestKind,
    range: ProbeRange,
    now: DateTime<Utc>,
) -> AppResult<ContestMetadata> {
    let prefix = kind.slug_prefix().ok_or_else(|| {
        AppError::Validation("cannot probe contests of an unrecognized kind".to_string())
    })?;

    let floor = range.start.saturating_sub(range.lookback);
    for number in (floor..=range.start).rev() {
        let slug = format!("{}{}", prefix, number);
        match metadata_source.fetch(&slug).await {
            Ok(metadata) => {
                if metadata.end() <= now {
                    tracing::info!(slug, end = %metadata.end(), "Detected latest ended contest");
                    return Ok(metadata);
                }
                tracing::debug!(slug, "Contest has not ended, continuing scan");
            }
            Err(MetadataError::NotFound(_)) => {
                tracing::debug!(slug, "No such contest, continuing scan");
            }
            Err(MetadataError::Transient(msg)) => {
                tracing::warn!(slug, "Probe failed ({}), continuing scan", msg);
            }
        }
    }

    Err(AppError::NotFound(format!(
        "no ended {}N contest found in the last {} numbers",
        prefix, range.lookback
    )))
}
