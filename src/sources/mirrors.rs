//! Submission evidence and profile stats client over round-robin mirrors
//!
//! A participant's full submission history lives at `{mirror}/{id}/submission`,
//! their lifetime solved count at `{mirror}/{id}/solved`, and their contest
//! rating at `{mirror}/{id}/contest`. Requests rotate across the configured
//! mirrors to spread load; rate-limit responses surface the server's
//! `Retry-After` hint so callers can honor it.
//!
//! Invalid identifiers are detected two ways: an HTTP 404, or a body the
//! mirrors answer for accounts that do not exist. For the submission endpoint
//! that is the minimal `{"count":0,"submission":[]}` payload (a real account
//! with no submissions carries extra fields); the stats endpoints answer
//! `{"status":"error"}` instead.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{EvidenceError, EvidenceSource, ProfileStats, ProfileStatsSource};
use crate::models::{SubmissionOutcome, SubmissionRecord};
use crate::utils::time::from_unix_seconds;

#[derive(Debug, Deserialize)]
struct SubmissionListResponse {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    submission: Vec<RawSubmission>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawSubmission {
    #[serde(rename = "titleSlug", default)]
    title_slug: String,
    /// Unix seconds; the mirrors serialize this as a string
    #[serde(default)]
    timestamp: serde_json::Value,
    #[serde(rename = "statusDisplay", default)]
    status_display: String,
}

impl RawSubmission {
    fn timestamp_secs(&self) -> Option<i64> {
        match &self.timestamp {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SolvedStatsResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "solvedProblem", default)]
    solved_problem: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ContestStatsResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "contestRating", default)]
    contest_rating: Option<f64>,
}

fn is_error_status(status: &Option<String>) -> bool {
    status.as_deref() == Some("error")
}

/// HTTP implementation of [`EvidenceSource`]
pub struct MirrorClient {
    http: reqwest::Client,
    mirrors: Vec<String>,
    next_mirror: AtomicUsize,
}

impl MirrorClient {
    pub fn new(mirrors: Vec<String>, timeout: Duration) -> Result<Self, EvidenceError> {
        if mirrors.is_empty() {
            return Err(EvidenceError::Transient(
                "no evidence mirrors configured".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EvidenceError::Transient(e.to_string()))?;
        Ok(Self {
            http,
            mirrors: mirrors
                .into_iter()
                .map(|m| m.trim_end_matches('/').to_string())
                .collect(),
            next_mirror: AtomicUsize::new(0),
        })
    }

    fn next_base(&self) -> &str {
        let idx = self.next_mirror.fetch_add(1, Ordering::Relaxed);
        &self.mirrors[idx % self.mirrors.len()]
    }

    /// Issue one GET against the next mirror, mapping the shared status
    /// codes: 404 means the account does not exist, 429 carries the
    /// server's wait hint.
    async fn get_endpoint(
        &self,
        normalized_id: &str,
        leaf: &str,
    ) -> Result<reqwest::Response, EvidenceError> {
        let base = self.next_base();
        let url = format!("{}/{}/{}", base, normalized_id, leaf);
        tracing::debug!(id = normalized_id, %url, "Fetching from evidence mirror");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| EvidenceError::Transient(e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::NOT_FOUND => Err(EvidenceError::UnknownUser),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(EvidenceError::RateLimited { retry_after })
            }
            status => Err(EvidenceError::Transient(format!(
                "evidence mirror returned {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl EvidenceSource for MirrorClient {
    async fn fetch_submissions(
        &self,
        normalized_id: &str,
    ) -> Result<Vec<SubmissionRecord>, EvidenceError> {
        let response = self.get_endpoint(normalized_id, "submission").await?;

        let body: SubmissionListResponse = response
            .json()
            .await
            .map_err(|e| EvidenceError::Transient(e.to_string()))?;

        if body.count == 0 && body.submission.is_empty() && body.extra.is_empty() {
            return Err(EvidenceError::UnknownUser);
        }

        let records = body
            .submission
            .into_iter()
            .filter_map(|raw| {
                let secs = raw.timestamp_secs()?;
                let submitted_at = from_unix_seconds(secs)?;
                Some(SubmissionRecord {
                    problem_slug: raw.title_slug,
                    submitted_at,
                    outcome: SubmissionOutcome::from_status(&raw.status_display),
                })
            })
            .collect();

        Ok(records)
    }
}

#[async_trait]
impl ProfileStatsSource for MirrorClient {
    async fn fetch_profile(&self, normalized_id: &str) -> Result<ProfileStats, EvidenceError> {
        let solved: SolvedStatsResponse = self
            .get_endpoint(normalized_id, "solved")
            .await?
            .json()
            .await
            .map_err(|e| EvidenceError::Transient(e.to_string()))?;
        if is_error_status(&solved.status) {
            return Err(EvidenceError::UnknownUser);
        }

        let contest: ContestStatsResponse = self
            .get_endpoint(normalized_id, "contest")
            .await?
            .json()
            .await
            .map_err(|e| EvidenceError::Transient(e.to_string()))?;
        if is_error_status(&contest.status) {
            return Err(EvidenceError::UnknownUser);
        }

        Ok(ProfileStats {
            solved_count: solved.solved_problem.unwrap_or(0),
            contest_rating: contest.contest_rating.unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submission_list() {
        let raw = r#"{
            "count": 2,
            "submission": [
                {"titleSlug": "p-one", "timestamp": "1700001000", "statusDisplay": "Accepted", "lang": "rust"},
                {"titleSlug": "p-two", "timestamp": 1700002000, "statusDisplay": "Wrong Answer", "lang": "cpp"}
            ]
        }"#;
        let parsed: SubmissionListResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.count, 2);
        assert_eq!(parsed.submission[0].timestamp_secs(), Some(1700001000));
        assert_eq!(parsed.submission[1].timestamp_secs(), Some(1700002000));
    }

    #[test]
    fn test_minimal_body_signals_unknown_user() {
        let parsed: SubmissionListResponse =
            serde_json::from_str(r#"{"count":0,"submission":[]}"#).unwrap();
        assert_eq!(parsed.count, 0);
        assert!(parsed.submission.is_empty());
        assert!(parsed.extra.is_empty());
    }

    #[test]
    fn test_empty_history_with_extra_fields_is_a_real_user() {
        let parsed: SubmissionListResponse =
            serde_json::from_str(r#"{"count":0,"submission":[],"status":"ok"}"#).unwrap();
        assert!(!parsed.extra.is_empty());
    }

    #[test]
    fn test_parse_solved_stats() {
        let raw = r#"{"solvedProblem": 350, "easySolved": 120, "mediumSolved": 180, "hardSolved": 50}"#;
        let parsed: SolvedStatsResponse = serde_json::from_str(raw).unwrap();
        assert!(!is_error_status(&parsed.status));
        assert_eq!(parsed.solved_problem, Some(350));
    }

    #[test]
    fn test_parse_contest_stats() {
        let raw = r#"{"contestAttend": 12, "contestRating": 1576.51, "contestGlobalRanking": 90210}"#;
        let parsed: ContestStatsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.contest_rating, Some(1576.51));
    }

    #[test]
    fn test_error_status_body_signals_unknown_user() {
        let raw = r#"{"status": "error", "message": "user does not exist"}"#;
        let parsed: SolvedStatsResponse = serde_json::from_str(raw).unwrap();
        assert!(is_error_status(&parsed.status));
        assert_eq!(parsed.solved_problem, None);
    }

    #[test]
    fn test_never_competed_account_has_no_rating() {
        // A real account without contest history answers without the field
        let parsed: ContestStatsResponse =
            serde_json::from_str(r#"{"contestAttend": 0}"#).unwrap();
        assert!(!is_error_status(&parsed.status));
        assert_eq!(parsed.contest_rating, None);
    }

    #[test]
    fn test_mirror_rotation() {
        let client = MirrorClient::new(
            vec!["https://a.example".to_string(), "https://b.example".to_string()],
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(client.next_base(), "https://a.example");
        assert_eq!(client.next_base(), "https://b.example");
        assert_eq!(client.next_base(), "https://a.example");
    }
}
