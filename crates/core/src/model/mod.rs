mod badge;
mod curriculum;
mod ids;
mod progress;
mod question;
mod session;

pub use ids::{ParseIdError, QuestionId, TopicId};

pub use badge::{Badge, BadgeRequirement};
pub use curriculum::{Grade, Subject, SubjectError, Topic};
pub use progress::{AVATARS, Avatar, UserProgress};
pub use question::{Question, QuestionDraft, QuestionError};
pub use session::{SessionSummary, SessionSummaryError};
