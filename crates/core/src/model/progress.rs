use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::model::curriculum::Grade;
use crate::model::ids::{QuestionId, TopicId};

//
// ─── AVATAR ────────────────────────────────────────────────────────────────────
//

/// The fixed avatar set offered on the avatar picker.
pub const AVATARS: [&str; 16] = [
    "🐶", "🐱", "🦊", "🐻", "🐼", "🦁", "🐯", "🐸", "🦄", "🐉", "🦖", "🦕", "🚀", "⭐", "🌈", "🎨",
];

/// Emoji avatar chosen by the learner.
///
/// Values outside [`AVATARS`] are accepted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Avatar(String);

impl Avatar {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the avatar is part of the fixed set.
    #[must_use]
    pub fn is_known(&self) -> bool {
        AVATARS.contains(&self.0.as_str())
    }
}

impl Default for Avatar {
    fn default() -> Self {
        Self(AVATARS[0].to_string())
    }
}

impl fmt::Display for Avatar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── USER PROGRESS ─────────────────────────────────────────────────────────────
//

/// Cumulative progress of the single learner.
///
/// Stars and completed topics only ever grow through the methods below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    grade: Grade,
    avatar: Avatar,
    total_stars: u32,
    completed_topics: BTreeSet<TopicId>,
    answered_questions: BTreeMap<QuestionId, bool>,
    best_streak: u32,
}

impl UserProgress {
    /// Rehydrate progress from persisted storage.
    #[must_use]
    pub fn from_persisted(
        grade: Grade,
        avatar: Avatar,
        total_stars: u32,
        completed_topics: BTreeSet<TopicId>,
        answered_questions: BTreeMap<QuestionId, bool>,
        best_streak: u32,
    ) -> Self {
        Self {
            grade,
            avatar,
            total_stars,
            completed_topics,
            answered_questions,
            best_streak,
        }
    }

    #[must_use]
    pub fn grade(&self) -> Grade {
        self.grade
    }

    #[must_use]
    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    #[must_use]
    pub fn total_stars(&self) -> u32 {
        self.total_stars
    }

    #[must_use]
    pub fn completed_topics(&self) -> &BTreeSet<TopicId> {
        &self.completed_topics
    }

    /// Whether each question was answered correctly the last time it was submitted.
    #[must_use]
    pub fn answered_questions(&self) -> &BTreeMap<QuestionId, bool> {
        &self.answered_questions
    }

    /// Longest run of consecutive correct answers in any completed session.
    #[must_use]
    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    #[must_use]
    pub fn has_completed(&self, topic: &TopicId) -> bool {
        self.completed_topics.contains(topic)
    }

    pub fn set_grade(&mut self, grade: Grade) {
        self.grade = grade;
    }

    pub fn set_avatar(&mut self, avatar: Avatar) {
        self.avatar = avatar;
    }

    /// Add stars to the cumulative total, saturating at `u32::MAX`.
    pub fn award_stars(&mut self, stars: u32) {
        self.total_stars = self.total_stars.saturating_add(stars);
    }

    pub fn mark_topics_completed<I>(&mut self, topics: I)
    where
        I: IntoIterator<Item = TopicId>,
    {
        self.completed_topics.extend(topics);
    }

    pub fn record_answer(&mut self, question: QuestionId, correct: bool) {
        self.answered_questions.insert(question, correct);
    }

    /// Keep the larger of the stored and the given streak.
    pub fn record_streak(&mut self, streak: u32) {
        self.best_streak = self.best_streak.max(streak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fresh_profile() {
        let progress = UserProgress::default();
        assert_eq!(progress.grade(), Grade::KINDERGARTEN);
        assert_eq!(progress.avatar().as_str(), "🐶");
        assert_eq!(progress.total_stars(), 0);
        assert!(progress.completed_topics().is_empty());
        assert!(progress.answered_questions().is_empty());
    }

    #[test]
    fn stars_saturate() {
        let mut progress = UserProgress::default();
        progress.award_stars(u32::MAX - 1);
        progress.award_stars(5);
        assert_eq!(progress.total_stars(), u32::MAX);
    }

    #[test]
    fn completed_topics_only_grow() {
        let mut progress = UserProgress::default();
        progress.mark_topics_completed([TopicId::new("a"), TopicId::new("b")]);
        progress.mark_topics_completed([TopicId::new("a")]);
        assert_eq!(progress.completed_topics().len(), 2);
        assert!(progress.has_completed(&TopicId::new("b")));
    }

    #[test]
    fn streak_keeps_maximum() {
        let mut progress = UserProgress::default();
        progress.record_streak(4);
        progress.record_streak(2);
        assert_eq!(progress.best_streak(), 4);
    }

    #[test]
    fn unknown_avatar_is_accepted_verbatim() {
        let avatar = Avatar::new("🐙");
        assert!(!avatar.is_known());
        assert_eq!(avatar.to_string(), "🐙");
        assert!(Avatar::new("🦄").is_known());
    }
}
