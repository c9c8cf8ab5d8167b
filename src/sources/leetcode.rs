//! Contest metadata HTTP client
//!
//! Talks to the contest info API at `{base}/{slug}/`. The payload nests the
//! window under `contest` and lists problems at the root:
//!
//! ```json
//! {
//!   "contest": { "title": "...", "start_time": 1700000000, "duration": 5400 },
//!   "questions": [ { "title_slug": "two-sum" }, ... ]
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{ContestMetadata, ContestMetadataSource, MetadataError};
use crate::utils::time::from_unix_seconds;

#[derive(Debug, Deserialize)]
struct ContestInfoResponse {
    contest: Option<ContestInfo>,
    #[serde(default)]
    questions: Vec<QuestionInfo>,
}

#[derive(Debug, Deserialize)]
struct ContestInfo {
    #[serde(default)]
    title: String,
    start_time: Option<i64>,
    duration: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct QuestionInfo {
    title_slug: Option<String>,
}

/// HTTP implementation of [`ContestMetadataSource`]
pub struct LeetCodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl LeetCodeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MetadataError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataError::Transient(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ContestMetadataSource for LeetCodeClient {
    async fn fetch(&self, slug: &str) -> Result<ContestMetadata, MetadataError> {
        let url = format!("{}/{}/", self.base_url, slug);
        tracing::debug!(slug, %url, "Fetching contest metadata");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::Transient(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(MetadataError::NotFound(slug.to_string())),
            status => {
                return Err(MetadataError::Transient(format!(
                    "metadata API returned {} for {}",
                    status, slug
                )));
            }
        }

        let body: ContestInfoResponse = response
            .json()
            .await
            .map_err(|e| MetadataError::Transient(e.to_string()))?;

        // The API answers 200 with an empty contest object for slugs that
        // do not correspond to a real contest
        let contest = body
            .contest
            .ok_or_else(|| MetadataError::NotFound(slug.to_string()))?;
        let (Some(start_time), Some(duration)) = (contest.start_time, contest.duration) else {
            return Err(MetadataError::NotFound(slug.to_string()));
        };

        let start = from_unix_seconds(start_time).ok_or_else(|| {
            MetadataError::Transient(format!("invalid start_time {} for {}", start_time, slug))
        })?;
        if duration < 0 {
            return Err(MetadataError::Transient(format!(
                "negative duration {} for {}",
                duration, slug
            )));
        }

        let problem_slugs: Vec<String> = body
            .questions
            .into_iter()
            .filter_map(|q| q.title_slug)
            .collect();

        Ok(ContestMetadata {
            slug: slug.to_string(),
            display_name: if contest.title.is_empty() {
                slug.to_string()
            } else {
                contest.title
            },
            start,
            duration: Duration::from_secs(duration as u64),
            problem_slugs,
        })
    }
}
