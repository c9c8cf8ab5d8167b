//! Contest window resolver
//!
//! Turns a contest slug into a validated [`ContestWindow`]. Evaluating a
//! contest that has not ended is a caller error and is rejected here, never
//! silently tolerated.

use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};
use crate::models::{ContestWindow, ProblemRef};
use crate::sources::ContestMetadataSource;
use crate::utils::time::format_duration;

/// Resolve `slug` into a contest window, validating it against `now`.
///
/// Fails with `NotFound` for a slug that is not a real contest,
/// `TransientFetch` when the metadata source is unreachable (caller may
/// retry), `Validation` for a contest still in progress, and
/// `Configuration` for a window that cannot be evaluated (no problems, or a
/// recognized contest kind published with the wrong duration).
pub async fn resolve(
    metadata_source: &dyn ContestMetadataSource,
    slug: &str,
    now: DateTime<Utc>,
) -> AppResult<ContestWindow> {
    let metadata = metadata_source.fetch(slug).await?;
    let end = metadata.end();

    let window = ContestWindow {
        slug: metadata.slug,
        display_name: metadata.display_name,
        start: metadata.start,
        end,
        // Published order defines the problem ordinals; reordering would
        // break the column-position-to-rank correspondence downstream
        problems: metadata
            .problem_slugs
            .into_iter()
            .enumerate()
            .map(|(idx, slug)| ProblemRef {
                slug,
                ordinal: idx as u32 + 1,
            })
            .collect(),
    };

    if !window.has_ended(now) {
        return Err(AppError::Validation(format!(
            "contest '{}' has not ended yet (ends {})",
            slug, window.end
        )));
    }

    if window.problems.is_empty() {
        return Err(AppError::Configuration(format!(
            "contest '{}' has an empty problem list",
            slug
        )));
    }

    if let Some(expected) = window.kind().expected_duration() {
        let actual = window.end - window.start;
        if actual != expected {
            return Err(AppError::Configuration(format!(
                "contest '{}' published a {}s window, expected {}s for its kind",
                window.slug,
                actual.num_seconds(),
                expected.num_seconds()
            )));
        }
    }

    tracing::info!(
        slug = %window.slug,
        start = %window.start,
        end = %window.end,
        length = %format_duration(window.end - window.start),
        problems = window.problems.len(),
        "Resolved contest window"
    );
    Ok(window)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::sources::{ContestMetadata, MetadataError};

    struct FixedMetadata(ContestMetadata);

    #[async_trait]
    impl ContestMetadataSource for FixedMetadata {
        async fn fetch(&self, _slug: &str) -> Result<ContestMetadata, MetadataError> {
            Ok(self.0.clone())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl ContestMetadataSource for Unreachable {
        async fn fetch(&self, _slug: &str) -> Result<ContestMetadata, MetadataError> {
            Err(MetadataError::Transient("connection refused".to_string()))
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn metadata(start: i64, duration: u64, problems: &[&str]) -> ContestMetadata {
        ContestMetadata {
            slug: "weekly-contest-478".to_string(),
            display_name: "Weekly Contest 478".to_string(),
            start: ts(start),
            duration: Duration::from_secs(duration),
            problem_slugs: problems.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_resolves_ended_contest_with_ordered_problems() {
        let source = FixedMetadata(metadata(1_000_000, 5400, &["p-c", "p-a", "p-b"]));
        let window = resolve(&source, "weekly-contest-478", ts(2_000_000))
            .await
            .unwrap();

        assert_eq!(window.start, ts(1_000_000));
        assert_eq!(window.end, ts(1_005_400));
        let slugs: Vec<&str> = window.problems.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["p-c", "p-a", "p-b"]);
        assert_eq!(window.problems[2].ordinal, 3);
    }

    #[tokio::test]
    async fn test_rejects_contest_still_in_progress() {
        let source = FixedMetadata(metadata(1_000_000, 5400, &["p1"]));
        let err = resolve(&source, "weekly-contest-478", ts(1_002_000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_empty_problem_list() {
        let source = FixedMetadata(metadata(1_000_000, 5400, &[]));
        let err = resolve(&source, "weekly-contest-478", ts(2_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_rejects_wrong_duration_for_recognized_kind() {
        let source = FixedMetadata(metadata(1_000_000, 3600, &["p1"]));
        let err = resolve(&source, "weekly-contest-478", ts(2_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_transient_metadata_failure_propagates() {
        let err = resolve(&Unreachable, "weekly-contest-478", ts(2_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TransientFetch(_)));
        assert!(err.is_retry_safe());
    }
}
