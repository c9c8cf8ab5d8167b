//! Batch scorer
//!
//! Drives evidence retrieval and the evaluator across the roster for one
//! contest. Each participant is isolated: a failure that survives the retry
//! budget becomes an `UNKNOWN` verdict and the batch moves on. Requests are
//! paced to stay under the evidence source's rate budget, and an explicit
//! rate-limit wait hint from the server is honored before the next attempt.

use std::time::Duration;

use crate::models::{ContestWindow, Participant, Verdict, VerdictSummary};
use crate::retry::RetryPolicy;
use crate::services::evaluator;
use crate::sources::{EvidenceError, EvidenceSource};

/// One scored roster entry
#[derive(Debug, Clone)]
pub struct ParticipantResult {
    pub participant: Participant,
    pub verdict: Verdict,
}

/// Scores a full roster against one contest window
pub struct BatchScorer {
    retry: RetryPolicy,
    pacing: Duration,
}

impl BatchScorer {
    pub fn new(retry: RetryPolicy, pacing: Duration) -> Self {
        Self { retry, pacing }
    }

    /// Score every roster entry, in roster order. Never fails as a whole:
    /// per-participant trouble is contained in the returned verdicts.
    pub async fn score(
        &self,
        window: &ContestWindow,
        roster: &[Participant],
        evidence: &dyn EvidenceSource,
    ) -> Vec<ParticipantResult> {
        let mut results = Vec::with_capacity(roster.len());

        for (idx, participant) in roster.iter().enumerate() {
            tracing::info!(
                "[{}/{}] Scoring {} ({})",
                idx + 1,
                roster.len(),
                participant.display_name,
                participant.raw_id.trim()
            );

            let verdict = self.verdict_for(window, participant, evidence).await;
            tracing::info!(verdict = %verdict, id = %participant.normalized_id, "Scored");
            results.push(ParticipantResult {
                participant: participant.clone(),
                verdict,
            });

            if idx + 1 < roster.len() && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        results
    }

    async fn verdict_for(
        &self,
        window: &ContestWindow,
        participant: &Participant,
        evidence: &dyn EvidenceSource,
    ) -> Verdict {
        let mut attempt: u32 = 1;

        loop {
            match evidence.fetch_submissions(&participant.normalized_id).await {
                Ok(submissions) => return evaluator::evaluate(window, &submissions),
                Err(EvidenceError::UnknownUser) => {
                    // Confirmed non-existent account. Not retried, and the
                    // evaluator is never invoked.
                    tracing::warn!(
                        raw_id = %participant.raw_id,
                        "Identifier does not correspond to any account"
                    );
                    return Verdict::InvalidParticipant;
                }
                Err(EvidenceError::RateLimited { retry_after }) => {
                    let Some(backoff) = self.retry.backoff_with_jitter(attempt) else {
                        tracing::error!(
                            id = %participant.normalized_id,
                            attempts = attempt,
                            "Rate limited on every attempt, recording UNKNOWN"
                        );
                        return Verdict::Unknown;
                    };
                    let wait = retry_after.map_or(backoff, |hint| hint.max(backoff));
                    tracing::warn!(
                        id = %participant.normalized_id,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(EvidenceError::Transient(msg)) => {
                    let Some(backoff) = self.retry.backoff_with_jitter(attempt) else {
                        tracing::error!(
                            id = %participant.normalized_id,
                            attempts = attempt,
                            "Evidence fetch failed after all retries: {}",
                            msg
                        );
                        return Verdict::Unknown;
                    };
                    tracing::warn!(
                        id = %participant.normalized_id,
                        attempt,
                        "Evidence fetch failed ({}), retrying",
                        msg
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
            attempt += 1;
        }
    }
}

/// Tally verdict counts for a completed batch
pub fn summarize(results: &[ParticipantResult]) -> VerdictSummary {
    let mut summary = VerdictSummary::default();
    for result in results {
        summary.record(result.verdict);
    }
    summary
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::models::{ProblemRef, SubmissionOutcome, SubmissionRecord};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn window() -> ContestWindow {
        ContestWindow {
            slug: "weekly-contest-478".to_string(),
            display_name: "Weekly Contest 478".to_string(),
            start: ts(1000),
            end: ts(10000),
            problems: vec![ProblemRef { slug: "p1".to_string(), ordinal: 1 }],
        }
    }

    fn participant(id: &str) -> Participant {
        Participant::from_roster_entry(id, id, 2).unwrap()
    }

    fn accepted(problem: &str, secs: i64) -> SubmissionRecord {
        SubmissionRecord {
            problem_slug: problem.to_string(),
            submitted_at: ts(secs),
            outcome: SubmissionOutcome::Accepted,
        }
    }

    /// Evidence source that replays a per-identifier script of responses,
    /// repeating the last entry once the script runs out.
    struct ScriptedEvidence {
        scripts: Mutex<HashMap<String, Vec<Result<Vec<SubmissionRecord>, EvidenceError>>>>,
        calls: AtomicU32,
    }

    impl ScriptedEvidence {
        fn new() -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                calls: AtomicU32::new(0),
            }
        }

        fn script(
            self,
            id: &str,
            responses: Vec<Result<Vec<SubmissionRecord>, EvidenceError>>,
        ) -> Self {
            self.scripts.lock().unwrap().insert(id.to_string(), responses);
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EvidenceSource for ScriptedEvidence {
        async fn fetch_submissions(
            &self,
            normalized_id: &str,
        ) -> Result<Vec<SubmissionRecord>, EvidenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts
                .get_mut(normalized_id)
                .unwrap_or_else(|| panic!("no script for {}", normalized_id));
            if script.len() > 1 {
                script.remove(0)
            } else {
                match &script[0] {
                    Ok(subs) => Ok(subs.clone()),
                    Err(EvidenceError::UnknownUser) => Err(EvidenceError::UnknownUser),
                    Err(EvidenceError::RateLimited { retry_after }) => {
                        Err(EvidenceError::RateLimited { retry_after: *retry_after })
                    }
                    Err(EvidenceError::Transient(m)) => Err(EvidenceError::Transient(m.clone())),
                }
            }
        }
    }

    fn scorer() -> BatchScorer {
        BatchScorer::new(
            RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(100)),
            Duration::from_millis(5),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_participant_becomes_unknown_without_aborting() {
        let evidence = ScriptedEvidence::new()
            .script("good", vec![Ok(vec![accepted("p1", 2000)])])
            .script(
                "limited",
                vec![Err(EvidenceError::RateLimited { retry_after: None })],
            );
        let roster = vec![participant("limited"), participant("good")];

        let results = scorer().score(&window(), &roster, &evidence).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].verdict, Verdict::Unknown);
        assert_eq!(results[1].verdict, Verdict::Solved(1));
        // 3 attempts for the limited participant, 1 for the good one
        assert_eq!(evidence.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_user_is_invalid_without_retry() {
        let evidence =
            ScriptedEvidence::new().script("ghost", vec![Err(EvidenceError::UnknownUser)]);
        let roster = vec![participant("ghost")];

        let results = scorer().score(&window(), &roster, &evidence).await;

        assert_eq!(results[0].verdict, Verdict::InvalidParticipant);
        assert_eq!(evidence.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers_within_budget() {
        let evidence = ScriptedEvidence::new().script(
            "flaky",
            vec![
                Err(EvidenceError::Transient("timeout".to_string())),
                Err(EvidenceError::Transient("timeout".to_string())),
                Ok(vec![accepted("p1", 2000)]),
            ],
        );
        let roster = vec![participant("flaky")];

        let results = scorer().score(&window(), &roster, &evidence).await;

        assert_eq!(results[0].verdict, Verdict::Solved(1));
        assert_eq!(evidence.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_roster_order() {
        let evidence = ScriptedEvidence::new()
            .script("a", vec![Ok(vec![])])
            .script("b", vec![Ok(vec![accepted("p1", 2000)])])
            .script("c", vec![Err(EvidenceError::UnknownUser)]);
        let roster = vec![participant("a"), participant("b"), participant("c")];

        let results = scorer().score(&window(), &roster, &evidence).await;

        let verdicts: Vec<Verdict> = results.iter().map(|r| r.verdict).collect();
        assert_eq!(
            verdicts,
            vec![
                Verdict::NotParticipated,
                Verdict::Solved(1),
                Verdict::InvalidParticipant
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_summarize_counts_by_kind() {
        let evidence = ScriptedEvidence::new()
            .script("a", vec![Ok(vec![])])
            .script("b", vec![Ok(vec![accepted("p1", 2000)])]);
        let roster = vec![participant("a"), participant("b")];

        let results = scorer().score(&window(), &roster, &evidence).await;
        let summary = summarize(&results);

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.not_participated, 1);
        assert_eq!(summary.solved.get(&1), Some(&1));
    }
}
