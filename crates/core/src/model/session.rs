use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::curriculum::{Grade, Subject};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("correct answers ({correct}) exceed questions seen ({total})")]
    CountMismatch { correct: u32, total: u32 },
}

/// Outcome of one completed quiz session, as shown on the completion screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    grade: Grade,
    subject: Subject,
    total_questions: u32,
    correct_answers: u32,
    stars_earned: u32,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Build a validated summary.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `SessionSummaryError::CountMismatch` if more answers were correct than questions seen.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        grade: Grade,
        subject: Subject,
        total_questions: u32,
        correct_answers: u32,
        stars_earned: u32,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        if correct_answers > total_questions {
            return Err(SessionSummaryError::CountMismatch {
                correct: correct_answers,
                total: total_questions,
            });
        }

        Ok(Self {
            grade,
            subject,
            total_questions,
            correct_answers,
            stars_earned,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn grade(&self) -> Grade {
        self.grade
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn stars_earned(&self) -> u32 {
        self.stars_earned
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Time spent between subject selection and completion.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.completed_at - self.started_at
    }

    /// Share of correct answers in percent, rounded down. Zero for an empty session.
    #[must_use]
    pub fn score_percent(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        self.correct_answers.saturating_mul(100) / self.total_questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{fixed_clock, fixed_now};

    #[test]
    fn summary_rejects_more_correct_than_seen() {
        let now = fixed_now();
        let err =
            SessionSummary::new(Grade::KINDERGARTEN, Subject::Math, 2, 3, 3, now, now).unwrap_err();
        assert_eq!(err, SessionSummaryError::CountMismatch { correct: 3, total: 2 });
    }

    #[test]
    fn summary_rejects_inverted_time_range() {
        let now = fixed_now();
        let earlier = now - chrono::Duration::minutes(1);
        let err =
            SessionSummary::new(Grade::KINDERGARTEN, Subject::Math, 1, 1, 1, now, earlier).unwrap_err();
        assert_eq!(err, SessionSummaryError::InvalidTimeRange);
    }

    #[test]
    fn duration_spans_start_to_completion() {
        let mut clock = fixed_clock();
        let started = clock.now();
        clock.advance(Duration::seconds(95));
        let summary =
            SessionSummary::new(Grade::new(2), Subject::Math, 5, 4, 6, started, clock.now()).unwrap();
        assert_eq!(summary.duration(), Duration::seconds(95));
    }

    #[test]
    fn score_percent() {
        let now = fixed_now();
        let summary = SessionSummary::new(Grade::new(1), Subject::Reading, 3, 2, 4, now, now).unwrap();
        assert_eq!(summary.score_percent(), 66);
        let empty = SessionSummary::new(Grade::new(1), Subject::Reading, 0, 0, 0, now, now).unwrap();
        assert_eq!(empty.score_percent(), 0);
    }
}
