use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::curriculum::{Grade, Subject};
use crate::model::ids::{QuestionId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: String },

    #[error("question {id} has no answer options")]
    NoOptions { id: String },

    #[error("question {id}: correct option {correct} is out of range for {options} options")]
    CorrectOutOfRange {
        id: String,
        correct: usize,
        options: usize,
    },

    #[error("question {id} must reward at least one star")]
    ZeroStars { id: String },
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Unvalidated question as it appears in a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: String,
    pub subject: Subject,
    pub grade: Grade,
    pub topic_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct: usize,
    pub explanation: String,
    pub stars: u32,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the id or prompt is blank, there are no options,
    /// `correct` does not index into `options`, or `stars` is zero.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(QuestionError::EmptyId);
        }
        if self.question.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt { id: id.to_string() });
        }
        if self.options.is_empty() {
            return Err(QuestionError::NoOptions { id: id.to_string() });
        }
        if self.correct >= self.options.len() {
            return Err(QuestionError::CorrectOutOfRange {
                id: id.to_string(),
                correct: self.correct,
                options: self.options.len(),
            });
        }
        if self.stars == 0 {
            return Err(QuestionError::ZeroStars { id: id.to_string() });
        }

        Ok(Question {
            id: QuestionId::new(id),
            subject: self.subject,
            grade: self.grade,
            topic_id: TopicId::new(self.topic_id.trim()),
            prompt: self.question,
            options: self.options,
            correct: self.correct,
            explanation: self.explanation,
            stars: self.stars,
        })
    }
}

/// A multiple-choice question. Always holds a valid `correct` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft", into = "QuestionDraft")]
pub struct Question {
    id: QuestionId,
    subject: Subject,
    grade: Grade,
    topic_id: TopicId,
    prompt: String,
    options: Vec<String>,
    correct: usize,
    explanation: String,
    stars: u32,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// See [`QuestionDraft::validate`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        subject: Subject,
        grade: Grade,
        topic_id: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct: usize,
        explanation: impl Into<String>,
        stars: u32,
    ) -> Result<Self, QuestionError> {
        QuestionDraft {
            id: id.into(),
            subject,
            grade,
            topic_id: topic_id.into(),
            question: prompt.into(),
            options,
            correct,
            explanation: explanation.into(),
            stars,
        }
        .validate()
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn grade(&self) -> Grade {
        self.grade
    }

    #[must_use]
    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// 0-based index of the correct option.
    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Stars awarded for a correct answer.
    #[must_use]
    pub fn stars(&self) -> u32 {
        self.stars
    }

    #[must_use]
    pub fn is_correct(&self, answer: usize) -> bool {
        answer == self.correct
    }
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<Question> for QuestionDraft {
    fn from(q: Question) -> Self {
        Self {
            id: q.id.as_str().to_string(),
            subject: q.subject,
            grade: q.grade,
            topic_id: q.topic_id.as_str().to_string(),
            question: q.prompt,
            options: q.options,
            correct: q.correct,
            explanation: q.explanation,
            stars: q.stars,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn valid_question_builds() {
        let q = Question::new(
            "k_a1",
            Subject::Math,
            Grade::KINDERGARTEN,
            "k_addition",
            "1 + 1 = ?",
            options(&["1", "2", "3", "4"]),
            1,
            "1 plus 1 equals 2!",
            1,
        )
        .unwrap();

        assert_eq!(q.id().as_str(), "k_a1");
        assert!(q.is_correct(1));
        assert!(!q.is_correct(0));
        assert!(!q.is_correct(7));
    }

    #[test]
    fn correct_index_must_be_in_range() {
        let err = Question::new(
            "bad",
            Subject::Math,
            Grade::KINDERGARTEN,
            "k_addition",
            "?",
            options(&["a", "b"]),
            2,
            "",
            1,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            QuestionError::CorrectOutOfRange { correct: 2, options: 2, .. }
        ));
    }

    #[test]
    fn zero_stars_rejected() {
        let err = Question::new(
            "bad",
            Subject::Reading,
            Grade::KINDERGARTEN,
            "k_letters",
            "Which letter?",
            options(&["A"]),
            0,
            "",
            0,
        )
        .unwrap_err();
        assert!(matches!(err, QuestionError::ZeroStars { .. }));
    }

    #[test]
    fn deserialization_validates() {
        let json = r#"{
            "id": "x1", "subject": "science", "grade": 1, "topicId": "1_matter",
            "question": "Is ice solid?", "options": ["Yes", "No"], "correct": 5,
            "explanation": "", "stars": 1
        }"#;
        let parsed: Result<Question, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }
}
