//! Submission evaluator
//!
//! Pure verdict computation: given a contest window and one participant's
//! submission history, classify the participant's outcome. Identical inputs
//! always yield an identical verdict, so the whole decision is replayable in
//! tests without network access.
//!
//! Identifier validity is resolved upstream: a non-existent account is
//! substituted with `INVALID_PARTICIPANT` by the scorer and never reaches
//! this function.

use std::collections::HashSet;

use crate::models::{ContestWindow, SubmissionOutcome, SubmissionRecord, Verdict};

/// Classify one participant's history against the contest window.
///
/// Only submissions inside the half-open `[start, end)` window that target a
/// contest problem count. Among those, the verdict is the number of distinct
/// problems with at least one accepted submission; resubmitting an
/// already-accepted problem never raises the count.
pub fn evaluate(window: &ContestWindow, submissions: &[SubmissionRecord]) -> Verdict {
    let mut participated = false;
    let mut solved: HashSet<&str> = HashSet::new();

    for submission in submissions {
        if !window.contains(submission.submitted_at) {
            continue;
        }
        if !window.has_problem(&submission.problem_slug) {
            continue;
        }

        participated = true;
        if submission.outcome == SubmissionOutcome::Accepted {
            solved.insert(submission.problem_slug.as_str());
        }
    }

    if !participated {
        Verdict::NotParticipated
    } else if solved.is_empty() {
        Verdict::ParticipatedUnsolved
    } else {
        Verdict::Solved(solved.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::models::{ProblemRef, SubmissionOutcome};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn window() -> ContestWindow {
        ContestWindow {
            slug: "weekly-contest-478".to_string(),
            display_name: "Weekly Contest 478".to_string(),
            start: ts(1000),
            end: ts(10000),
            problems: vec![
                ProblemRef { slug: "p1".to_string(), ordinal: 1 },
                ProblemRef { slug: "p2".to_string(), ordinal: 2 },
            ],
        }
    }

    fn sub(problem: &str, secs: i64, outcome: SubmissionOutcome) -> SubmissionRecord {
        SubmissionRecord {
            problem_slug: problem.to_string(),
            submitted_at: ts(secs),
            outcome,
        }
    }

    #[test]
    fn test_no_submissions_is_not_participated() {
        assert_eq!(evaluate(&window(), &[]), Verdict::NotParticipated);
    }

    #[test]
    fn test_pre_window_accept_does_not_count() {
        // One accept before the window, one inside: only the in-window one counts
        let subs = vec![
            sub("p1", 500, SubmissionOutcome::Accepted),
            sub("p1", 2000, SubmissionOutcome::Accepted),
        ];
        assert_eq!(evaluate(&window(), &subs), Verdict::Solved(1));
    }

    #[test]
    fn test_non_contest_problem_is_not_participation() {
        let subs = vec![sub("p3", 2000, SubmissionOutcome::Accepted)];
        assert_eq!(evaluate(&window(), &subs), Verdict::NotParticipated);
    }

    #[test]
    fn test_rejected_only_is_unsolved() {
        let subs = vec![sub("p1", 2000, SubmissionOutcome::Rejected)];
        assert_eq!(evaluate(&window(), &subs), Verdict::ParticipatedUnsolved);
    }

    #[test]
    fn test_submission_at_exact_end_is_excluded() {
        let subs = vec![sub("p1", 10000, SubmissionOutcome::Accepted)];
        assert_eq!(evaluate(&window(), &subs), Verdict::NotParticipated);

        let boundary = vec![
            sub("p1", 9999, SubmissionOutcome::Accepted),
            sub("p2", 10000, SubmissionOutcome::Accepted),
        ];
        assert_eq!(evaluate(&window(), &boundary), Verdict::Solved(1));
    }

    #[test]
    fn test_submission_at_start_is_included() {
        let subs = vec![sub("p1", 1000, SubmissionOutcome::Accepted)];
        assert_eq!(evaluate(&window(), &subs), Verdict::Solved(1));
    }

    #[test]
    fn test_resubmission_of_solved_problem_is_monotone() {
        let base = vec![
            sub("p1", 2000, SubmissionOutcome::Accepted),
            sub("p2", 3000, SubmissionOutcome::Accepted),
        ];
        assert_eq!(evaluate(&window(), &base), Verdict::Solved(2));

        let mut with_resubmits = base.clone();
        with_resubmits.push(sub("p1", 4000, SubmissionOutcome::Accepted));
        with_resubmits.push(sub("p1", 5000, SubmissionOutcome::Rejected));
        assert_eq!(evaluate(&window(), &with_resubmits), Verdict::Solved(2));
    }

    #[test]
    fn test_order_independence() {
        let mut subs = vec![
            sub("p2", 9000, SubmissionOutcome::Accepted),
            sub("p1", 2000, SubmissionOutcome::Rejected),
            sub("p1", 3000, SubmissionOutcome::Accepted),
        ];
        let forward = evaluate(&window(), &subs);
        subs.reverse();
        assert_eq!(forward, evaluate(&window(), &subs));
        assert_eq!(forward, Verdict::Solved(2));
    }

    #[test]
    fn test_other_outcome_counts_as_participation_only() {
        let subs = vec![sub("p1", 2000, SubmissionOutcome::Other)];
        assert_eq!(evaluate(&window(), &subs), Verdict::ParticipatedUnsolved);
    }
}
