use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use stars_core::model::{Avatar, Grade, Question, QuestionId, SessionSummary, Subject, UserProgress};
use stars_core::{Clock, ContentProvider};

use super::observer::{ObserverId, Observers, SessionObserver};
use super::progress::SessionProgress;
use super::state::{Advance, AnswerOutcome, QuizPhase, SessionState};
use crate::error::SessionError;

/// Progress and summary of a completion that has not been applied yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingCompletion {
    progress: UserProgress,
    summary: SessionSummary,
}

impl PendingCompletion {
    pub(crate) fn progress(&self) -> &UserProgress {
        &self.progress
    }

    pub(crate) fn summary(&self) -> &SessionSummary {
        &self.summary
    }
}

/// Screen the last transition routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Home,
    AvatarSelect,
    SubjectSelect,
    Quiz,
    Completed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Session controller: the only owner of the quiz state.
///
/// Every public transition runs to completion synchronously and, when it changed
/// anything, notifies subscribed observers with the new snapshot.
pub struct SessionService {
    catalog: Arc<dyn ContentProvider>,
    clock: Clock,
    state: SessionState,
    /// Active question pool; empty until a grade or subject is chosen.
    questions: Vec<Question>,
    /// Submitted answers of the running session, in order.
    answers: Vec<(QuestionId, bool)>,
    stage: Stage,
    started_at: DateTime<Utc>,
    summary: Option<SessionSummary>,
    observers: Observers,
}

impl SessionService {
    #[must_use]
    pub fn new(catalog: Arc<dyn ContentProvider>, clock: Clock) -> Self {
        Self {
            catalog,
            clock,
            state: SessionState::default(),
            questions: Vec::new(),
            answers: Vec::new(),
            stage: Stage::Home,
            started_at: clock.now(),
            summary: None,
            observers: Observers::default(),
        }
    }

    /// Seed the controller with previously stored progress.
    #[must_use]
    pub fn with_progress(mut self, progress: UserProgress) -> Self {
        self.state.user = progress;
        self
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn ContentProvider> {
        &self.catalog
    }

    /// Summary of the completed session, once `complete_session` ran.
    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        match self.stage {
            Stage::Home => QuizPhase::Home,
            Stage::AvatarSelect => QuizPhase::AvatarSelect,
            Stage::SubjectSelect => QuizPhase::SubjectSelect,
            Stage::Completed => QuizPhase::Completed,
            Stage::Quiz => match self.state.current_question {
                None => QuizPhase::NoQuestions,
                Some(_) if !self.state.is_answer_submitted => QuizPhase::Answering,
                Some(_) if self.state.has_next_question() => QuizPhase::Submitted,
                Some(_) => QuizPhase::Finished,
            },
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.state.total_questions;
        let answered = self.answers.len();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.summary.is_some(),
        }
    }

    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Pick a grade: starts a fresh session over the grade's full question pool.
    ///
    /// Grades without catalog content leave the topics empty and no current question.
    pub fn initialize_grade(&mut self, grade: impl Into<Grade>) {
        let grade = grade.into();
        let topics = self.catalog.topics_for_grade(grade);
        tracing::debug!(%grade, subjects = topics.len(), "initialize grade");

        self.state.user.set_grade(grade);
        self.state.current_topics = topics;
        self.questions.clear();
        self.begin_session();
        self.stage = Stage::AvatarSelect;
        self.load_question();
        self.notify();
    }

    /// Unknown avatars are accepted verbatim.
    pub fn select_avatar(&mut self, avatar: Avatar) {
        if !avatar.is_known() {
            tracing::debug!(%avatar, "avatar outside the fixed set");
        }
        self.state.user.set_avatar(avatar);
        self.stage = Stage::SubjectSelect;
        self.notify();
    }

    /// Restrict the session to one subject of the current grade and load its first question.
    pub fn select_subject(&mut self, subject: Subject) {
        let grade = self.state.user.grade();
        self.state.selected_subject = subject;
        self.questions = self.catalog.questions_for_grade_and_subject(grade, subject);
        tracing::debug!(%grade, %subject, pool = self.questions.len(), "select subject");

        self.begin_session();
        self.state.total_questions = self.questions.len();
        self.stage = Stage::Quiz;
        self.load_question();
        self.notify();
    }

    /// Load the question at `question_index`.
    ///
    /// An empty pool falls back to every question of the grade. Past the end of the
    /// pool the current question is left unchanged. Ignored once the session completed.
    pub fn load_next_question(&mut self) {
        if self.ignore_after_completion("load_next_question") {
            return;
        }
        if self.load_question() {
            self.notify();
        }
    }

    /// Record the chosen option. Ignored once the answer was submitted.
    ///
    /// The index is not checked against the option count; an out-of-range
    /// selection is simply graded as wrong.
    pub fn select_answer(&mut self, index: usize) {
        if self.ignore_after_completion("select_answer") {
            return;
        }
        if self.state.is_answer_submitted {
            tracing::debug!(index, "answer already submitted; selection ignored");
            return;
        }
        self.state.user_answer = Some(index);
        self.notify();
    }

    /// Grade the selected answer.
    ///
    /// Returns `None` without touching the state when there is no current question,
    /// no selected answer, the answer was already submitted, or the session completed.
    pub fn submit_answer(&mut self) -> Option<AnswerOutcome> {
        if self.ignore_after_completion("submit_answer") {
            return None;
        }
        if self.state.is_answer_submitted {
            tracing::debug!("answer already submitted; ignoring resubmission");
            return None;
        }
        let question = self.state.current_question.clone()?;
        let selected = self.state.user_answer?;

        let is_correct = question.is_correct(selected);
        let stars_awarded = if is_correct { question.stars() } else { 0 };

        if is_correct {
            self.state.correct_answers_count += 1;
            self.state.session_stars = self.state.session_stars.saturating_add(stars_awarded);
            self.state.current_streak += 1;
            self.state.best_streak = self.state.best_streak.max(self.state.current_streak);
        } else {
            self.state.current_streak = 0;
        }
        self.state.is_answer_submitted = true;
        self.answers.push((question.id().clone(), is_correct));

        tracing::debug!(
            question = %question.id(),
            selected,
            is_correct,
            session_stars = self.state.session_stars,
            "answer submitted"
        );
        self.notify();

        Some(AnswerOutcome {
            question_id: question.id().clone(),
            selected,
            correct_option: question.correct(),
            is_correct,
            stars_awarded,
            explanation: question.explanation().to_string(),
        })
    }

    /// Move past a submitted question: load the next one, or report that the
    /// session is ready for `complete_session`. A completed session is always `Finished`.
    pub fn advance(&mut self) -> Advance {
        if self.ignore_after_completion("advance") || !self.state.has_next_question() {
            return Advance::Finished;
        }
        if self.load_question() {
            self.notify();
            Advance::Next
        } else {
            Advance::Finished
        }
    }

    /// Fold the session into the learner's progress.
    ///
    /// Adds `session_stars` to the total and marks every topic of the grade as
    /// completed. Applies once per session; later calls return the same summary.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Summary` if the session timestamps are inconsistent.
    pub fn complete_session(&mut self) -> Result<SessionSummary, SessionError> {
        if let Some(summary) = &self.summary {
            tracing::debug!("session already completed");
            return Ok(summary.clone());
        }
        let pending = self.prepare_completion()?;
        Ok(self.apply_completion(pending))
    }

    /// Compute the completed progress and summary without touching the session,
    /// so they can be stored before the session commits to them.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session already completed, or
    /// `SessionError::Summary` if the session timestamps are inconsistent.
    pub(crate) fn prepare_completion(&self) -> Result<PendingCompletion, SessionError> {
        if self.summary.is_some() {
            return Err(SessionError::Completed);
        }

        let total_questions = u32::try_from(self.state.total_questions).unwrap_or(u32::MAX);
        let summary = SessionSummary::new(
            self.state.user.grade(),
            self.state.selected_subject,
            total_questions,
            self.state.correct_answers_count,
            self.state.session_stars,
            self.started_at,
            self.clock.now(),
        )?;

        let mut progress = self.state.user.clone();
        progress.award_stars(self.state.session_stars);
        progress.mark_topics_completed(
            self.state
                .current_topics
                .values()
                .flatten()
                .map(|topic| topic.id.clone()),
        );
        for (question, correct) in &self.answers {
            progress.record_answer(question.clone(), *correct);
        }
        progress.record_streak(self.state.best_streak);

        Ok(PendingCompletion { progress, summary })
    }

    /// Commit a completion produced by `prepare_completion` on this session.
    pub(crate) fn apply_completion(&mut self, pending: PendingCompletion) -> SessionSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }
        let PendingCompletion { progress, summary } = pending;
        self.state.user = progress;

        tracing::info!(
            session_stars = self.state.session_stars,
            total_stars = self.state.user.total_stars(),
            correct = self.state.correct_answers_count,
            total = summary.total_questions(),
            "session completed"
        );

        self.stage = Stage::Completed;
        self.summary = Some(summary.clone());
        self.notify();
        summary
    }

    /// Navigate back to the home screen. Progress and the finished session's
    /// counters are kept until the next grade or subject selection.
    ///
    /// The completion screen leaves through here rather than `reset_session`, so
    /// finishing a quiz never wipes the learner's stars. Wiping progress is the
    /// separate, explicit `reset_session`.
    pub fn return_home(&mut self) {
        if self.stage == Stage::Home {
            return;
        }
        self.stage = Stage::Home;
        self.notify();
    }

    /// Return to the home screen, discarding the session and all progress.
    pub fn reset_session(&mut self) {
        tracing::info!(
            total_stars = self.state.user.total_stars(),
            "resetting session and progress"
        );
        self.state = SessionState::default();
        self.questions.clear();
        self.answers.clear();
        self.summary = None;
        self.stage = Stage::Home;
        self.started_at = self.clock.now();
        self.notify();
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn ignore_after_completion(&self, transition: &'static str) -> bool {
        if self.summary.is_some() {
            tracing::debug!(transition, "session already completed; ignored");
            return true;
        }
        false
    }

    fn begin_session(&mut self) {
        self.state.current_question = None;
        self.state.question_index = 0;
        self.state.total_questions = 0;
        self.state.user_answer = None;
        self.state.is_answer_submitted = false;
        self.state.correct_answers_count = 0;
        self.state.session_stars = 0;
        self.state.current_streak = 0;
        self.state.best_streak = 0;
        self.answers.clear();
        self.summary = None;
        self.started_at = self.clock.now();
    }

    /// Returns true if the state changed.
    fn load_question(&mut self) -> bool {
        if self.questions.is_empty() {
            let grade = self.state.user.grade();
            self.questions = self.catalog.questions_for_grade(grade);
            if self.questions.is_empty() {
                tracing::debug!(%grade, "no questions for grade");
                return self.state.current_question.take().is_some();
            }
            tracing::debug!(%grade, pool = self.questions.len(), "using full grade pool");
        }

        let index = self.state.question_index;
        let Some(question) = self.questions.get(index) else {
            tracing::debug!(index, pool = self.questions.len(), "no question left to load");
            return false;
        };

        self.state.current_question = Some(question.clone());
        self.state.question_index = index + 1;
        self.state.total_questions = self.questions.len();
        self.state.user_answer = None;
        self.state.is_answer_submitted = false;
        true
    }

    fn notify(&self) {
        self.observers.notify(&self.state);
    }
}

impl fmt::Debug for SessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionService")
            .field("stage", &self.stage)
            .field("grade", &self.state.user.grade())
            .field("subject", &self.state.selected_subject)
            .field("pool_len", &self.questions.len())
            .field("question_index", &self.state.question_index)
            .field("answers_len", &self.answers.len())
            .field("started_at", &self.started_at)
            .field("completed", &self.summary.is_some())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
