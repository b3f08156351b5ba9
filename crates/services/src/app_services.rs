use std::collections::BTreeSet;
use std::sync::Arc;

use stars_core::model::{Badge, SessionSummary};
use stars_core::ContentProvider;
use storage::repository::Storage;

use crate::error::{AppServicesError, SessionError};
use crate::progress_service::{ProgressService, SessionSummaryId};
use crate::sessions::SessionService;
use crate::Clock;

/// What `AppServices::finish_session` hands back to the completion screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub summary: SessionSummary,
    pub summary_id: SessionSummaryId,
    pub total_stars: u32,
    /// Badges that became earned with this session.
    pub new_badges: Vec<Badge>,
}

/// Assembles the catalog, clock and storage behind app-facing operations.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<dyn ContentProvider>,
    clock: Clock,
    progress: Arc<ProgressService>,
}

impl AppServices {
    #[must_use]
    pub fn new(catalog: Arc<dyn ContentProvider>, clock: Clock, storage: &Storage) -> Self {
        let progress = Arc::new(ProgressService::new(
            Arc::clone(&storage.progress),
            Arc::clone(&storage.session_summaries),
        ));
        Self {
            catalog,
            clock,
            progress,
        }
    }

    #[must_use]
    pub fn in_memory(catalog: Arc<dyn ContentProvider>, clock: Clock) -> Self {
        Self::new(catalog, clock, &Storage::in_memory())
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        catalog: Arc<dyn ContentProvider>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(catalog, clock, &storage))
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<dyn ContentProvider> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    /// A session controller seeded with the stored progress.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Progress` if the progress cannot be loaded.
    pub async fn start_session(&self) -> Result<SessionService, AppServicesError> {
        let progress = self.progress.load().await?;
        tracing::debug!(
            grade = %progress.grade(),
            total_stars = progress.total_stars(),
            "starting session"
        );
        Ok(SessionService::new(Arc::clone(&self.catalog), self.clock).with_progress(progress))
    }

    /// Complete the session, persist the result and report newly earned badges.
    ///
    /// Nothing changes in the session when persisting fails, so the call can be
    /// repeated.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session was already finished,
    /// or storage errors while persisting.
    pub async fn finish_session(
        &self,
        session: &mut SessionService,
    ) -> Result<CompletionReport, AppServicesError> {
        if session.summary().is_some() {
            return Err(SessionError::Completed.into());
        }

        let before: BTreeSet<String> = self
            .catalog
            .earned_badges(&session.state().user)
            .into_iter()
            .map(|badge| badge.id)
            .collect();

        // Persist before the session commits to the completion.
        let pending = session.prepare_completion()?;
        let summary_id = self
            .progress
            .record_completion(pending.progress(), pending.summary())
            .await?;
        let summary = session.apply_completion(pending);
        let progress = &session.state().user;

        let new_badges: Vec<Badge> = self
            .catalog
            .earned_badges(progress)
            .into_iter()
            .filter(|badge| !before.contains(&badge.id))
            .collect();
        if !new_badges.is_empty() {
            tracing::info!(count = new_badges.len(), "badges earned");
        }

        Ok(CompletionReport {
            summary,
            summary_id,
            total_stars: progress.total_stars(),
            new_badges,
        })
    }

    /// Persist the session's current progress, e.g. after grade or avatar selection.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Progress` on repository failures.
    pub async fn save_progress(&self, session: &SessionService) -> Result<(), AppServicesError> {
        self.progress.save(&session.state().user).await?;
        Ok(())
    }

    /// Reset the session and overwrite the stored progress with a fresh learner.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Progress` on repository failures.
    pub async fn reset(&self, session: &mut SessionService) -> Result<(), AppServicesError> {
        session.reset_session();
        self.save_progress(session).await
    }
}
