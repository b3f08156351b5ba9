use stars_core::TopicMap;
use stars_core::model::{Question, QuestionId, Subject, UserProgress};

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Read-only snapshot of the session, handed to the presentation layer after
/// every transition.
///
/// Only `SessionService` produces these, so the counters always satisfy
/// `correct_answers_count <= question_index <= total_questions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: UserProgress,
    pub current_question: Option<Question>,
    pub current_topics: TopicMap,
    pub selected_subject: Subject,
    /// Number of questions loaded so far; the current question sits at `question_index - 1`.
    pub question_index: usize,
    pub total_questions: usize,
    pub user_answer: Option<usize>,
    pub is_answer_submitted: bool,
    pub correct_answers_count: u32,
    pub session_stars: u32,
    pub current_streak: u32,
    pub best_streak: u32,
}

impl SessionState {
    /// Whether another question is waiting after the current one.
    #[must_use]
    pub fn has_next_question(&self) -> bool {
        self.question_index < self.total_questions
    }

    /// Whether the selected option is the correct one. `None` until an answer is submitted.
    #[must_use]
    pub fn answered_correctly(&self) -> Option<bool> {
        if !self.is_answer_submitted {
            return None;
        }
        let question = self.current_question.as_ref()?;
        self.user_answer.map(|answer| question.is_correct(answer))
    }
}

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where the learner is in `Home -> AvatarSelect -> SubjectSelect -> Quiz -> Completion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Home,
    AvatarSelect,
    SubjectSelect,
    /// A question is shown and has not been submitted.
    Answering,
    /// The current answer was submitted and more questions remain.
    Submitted,
    /// The last question was submitted; the session is ready to complete.
    Finished,
    /// The quiz screen has nothing to show for the chosen grade.
    NoQuestions,
    Completed,
}

//
// ─── TRANSITION RESULTS ────────────────────────────────────────────────────────
//

/// Feedback for one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub selected: usize,
    pub correct_option: usize,
    pub is_correct: bool,
    pub stars_awarded: u32,
    pub explanation: String,
}

/// Result of moving past a submitted question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The next question was loaded.
    Next,
    /// No questions remain; route to completion.
    Finished,
}
