use chrono::{DateTime, Utc};
use std::sync::Arc;

use stars_core::model::{Grade, SessionSummary, Subject, UserProgress};
use storage::repository::{
    InMemoryRepository, ProgressRepository, SessionSummaryRepository, SessionSummaryRow,
};

use crate::error::ProgressError;

/// Storage identifier for a persisted session summary.
///
/// NOTE: This is `i64` to match `SQLite` row IDs.
pub type SessionSummaryId = i64;

/// Presentation-agnostic history entry for a completed session.
///
/// The UI formats timestamps and percentages itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHistoryItem {
    pub id: SessionSummaryId,
    pub completed_at: DateTime<Utc>,
    pub grade: Grade,
    pub subject: Subject,

    pub total_questions: u32,
    pub correct_answers: u32,
    pub stars_earned: u32,
}

impl SessionHistoryItem {
    #[must_use]
    pub fn from_row(row: &SessionSummaryRow) -> Self {
        let summary = &row.summary;
        Self {
            id: row.id,
            completed_at: summary.completed_at(),
            grade: summary.grade(),
            subject: summary.subject(),
            total_questions: summary.total_questions(),
            correct_answers: summary.correct_answers(),
            stars_earned: summary.stars_earned(),
        }
    }
}

/// Loads and stores the learner's progress and session history.
#[derive(Clone)]
pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
    summaries: Arc<dyn SessionSummaryRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        summaries: Arc<dyn SessionSummaryRepository>,
    ) -> Self {
        Self {
            progress,
            summaries,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self::new(Arc::new(repo.clone()), Arc::new(repo))
    }

    /// Stored progress, or a fresh learner if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn load(&self) -> Result<UserProgress, ProgressError> {
        let progress = self.progress.load_progress().await?;
        if progress.is_none() {
            tracing::debug!("no stored progress; starting fresh");
        }
        Ok(progress.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn save(&self, progress: &UserProgress) -> Result<(), ProgressError> {
        self.progress.save_progress(progress).await?;
        Ok(())
    }

    /// Persist the progress after a completed session and append its summary.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn record_completion(
        &self,
        progress: &UserProgress,
        summary: &SessionSummary,
    ) -> Result<SessionSummaryId, ProgressError> {
        self.progress.save_progress(progress).await?;
        let id = self.summaries.append_summary(summary).await?;
        tracing::info!(
            id,
            stars = summary.stars_earned(),
            total_stars = progress.total_stars(),
            "session recorded"
        );
        Ok(id)
    }

    /// Most recent sessions first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn recent_sessions(
        &self,
        limit: u32,
    ) -> Result<Vec<SessionHistoryItem>, ProgressError> {
        let rows = self.summaries.list_summaries(limit).await?;
        Ok(rows.iter().map(SessionHistoryItem::from_row).collect())
    }
}
