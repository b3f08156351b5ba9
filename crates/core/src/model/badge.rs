use serde::{Deserialize, Serialize};

use crate::model::progress::UserProgress;

/// What a learner must reach to earn a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BadgeRequirement {
    /// Cumulative stars.
    Stars(u32),
    /// Distinct questions answered at least once.
    Questions(u32),
    /// Consecutive correct answers within one session.
    Streak(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub emoji: String,
    pub requirement: BadgeRequirement,
}

impl Badge {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        emoji: impl Into<String>,
        requirement: BadgeRequirement,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            emoji: emoji.into(),
            requirement,
        }
    }

    #[must_use]
    pub fn is_earned(&self, progress: &UserProgress) -> bool {
        match self.requirement {
            BadgeRequirement::Stars(n) => progress.total_stars() >= n,
            BadgeRequirement::Questions(n) => {
                u32::try_from(progress.answered_questions().len()).unwrap_or(u32::MAX) >= n
            }
            BadgeRequirement::Streak(n) => progress.best_streak() >= n,
        }
    }
}
