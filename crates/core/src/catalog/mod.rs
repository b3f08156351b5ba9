//! Read-only content provider: topics, questions, badges and avatars.

use rand::RngCore;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::model::{AVATARS, Avatar, Badge, Grade, Question, Subject, Topic, TopicId, UserProgress};

/// Catalog shipped with the app.
const SAMPLE_CATALOG: &str = include_str!("sample.json");

/// Subject to ordered topic list for one grade.
pub type TopicMap = BTreeMap<Subject, Vec<Topic>>;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("invalid catalog document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate question id: {0}")]
    DuplicateQuestion(String),

    #[error("duplicate topic id {topic} in grade {grade} {subject}")]
    DuplicateTopic {
        grade: Grade,
        subject: Subject,
        topic: String,
    },

    #[error("question {question} references unknown topic {topic} in grade {grade} {subject}")]
    UnknownTopic {
        question: String,
        grade: Grade,
        subject: Subject,
        topic: String,
    },
}

//
// ─── PROVIDER CONTRACT ─────────────────────────────────────────────────────────
//

/// Lookups over a static catalog. Unknown grades or topics yield empty results.
pub trait ContentProvider: Send + Sync {
    fn topics_for_grade(&self, grade: Grade) -> TopicMap;

    fn questions_for_grade(&self, grade: Grade) -> Vec<Question>;

    fn questions_for_topic(&self, topic: &TopicId) -> Vec<Question>;

    fn avatars(&self) -> &[Avatar];

    fn badges(&self) -> &[Badge];

    fn questions_for_grade_and_subject(&self, grade: Grade, subject: Subject) -> Vec<Question> {
        self.questions_for_grade(grade)
            .into_iter()
            .filter(|q| q.subject() == subject)
            .collect()
    }

    /// Pick uniformly from the grade pool, optionally narrowed to one subject.
    fn random_question_with(
        &self,
        grade: Grade,
        subject: Option<Subject>,
        rng: &mut dyn RngCore,
    ) -> Option<Question> {
        let pool = match subject {
            Some(subject) => self.questions_for_grade_and_subject(grade, subject),
            None => self.questions_for_grade(grade),
        };
        pool.choose(rng).cloned()
    }

    fn random_question(&self, grade: Grade, subject: Option<Subject>) -> Option<Question> {
        self.random_question_with(grade, subject, &mut rand::rng())
    }

    /// Badges whose requirement the given progress satisfies, in catalog order.
    fn earned_badges(&self, progress: &UserProgress) -> Vec<Badge> {
        self.badges()
            .iter()
            .filter(|badge| badge.is_earned(progress))
            .cloned()
            .collect()
    }
}

//
// ─── STATIC CATALOG ────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    topics: BTreeMap<Grade, TopicMap>,
    questions: Vec<Question>,
    #[serde(default)]
    badges: Vec<Badge>,
    #[serde(default)]
    avatars: Vec<Avatar>,
}

/// Immutable in-memory catalog, built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    topics: BTreeMap<Grade, TopicMap>,
    questions: Vec<Question>,
    badges: Vec<Badge>,
    avatars: Vec<Avatar>,
}

impl StaticCatalog {
    /// Build a catalog, checking cross references.
    ///
    /// An empty `avatars` list falls back to the fixed avatar set.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on duplicate question ids, duplicate topic ids within a
    /// grade/subject, or a question whose topic is not listed under its grade and subject.
    pub fn new(
        topics: BTreeMap<Grade, TopicMap>,
        questions: Vec<Question>,
        badges: Vec<Badge>,
        avatars: Vec<Avatar>,
    ) -> Result<Self, CatalogError> {
        for (grade, by_subject) in &topics {
            for (subject, list) in by_subject {
                let mut seen = HashSet::new();
                for topic in list {
                    if !seen.insert(&topic.id) {
                        return Err(CatalogError::DuplicateTopic {
                            grade: *grade,
                            subject: *subject,
                            topic: topic.id.to_string(),
                        });
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(CatalogError::DuplicateQuestion(question.id().to_string()));
            }
            let listed = topics
                .get(&question.grade())
                .and_then(|by_subject| by_subject.get(&question.subject()))
                .is_some_and(|list| list.iter().any(|t| &t.id == question.topic_id()));
            if !listed {
                return Err(CatalogError::UnknownTopic {
                    question: question.id().to_string(),
                    grade: question.grade(),
                    subject: question.subject(),
                    topic: question.topic_id().to_string(),
                });
            }
        }

        let avatars = if avatars.is_empty() {
            AVATARS.iter().map(|a| Avatar::new(*a)).collect()
        } else {
            avatars
        };

        Ok(Self {
            topics,
            questions,
            badges,
            avatars,
        })
    }

    /// Parse and validate a JSON catalog document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON or invalid questions, and the
    /// cross-reference errors of [`StaticCatalog::new`].
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        Self::new(doc.topics, doc.questions, doc.badges, doc.avatars)
    }

    /// The catalog bundled with the app (grades K-5, kindergarten question bank).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the bundled document fails validation.
    pub fn sample() -> Result<Self, CatalogError> {
        Self::from_json(SAMPLE_CATALOG)
    }

    /// Total number of questions across all grades.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

impl ContentProvider for StaticCatalog {
    fn topics_for_grade(&self, grade: Grade) -> TopicMap {
        self.topics.get(&grade).cloned().unwrap_or_default()
    }

    fn questions_for_grade(&self, grade: Grade) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| q.grade() == grade)
            .cloned()
            .collect()
    }

    fn questions_for_topic(&self, topic: &TopicId) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| q.topic_id() == topic)
            .cloned()
            .collect()
    }

    fn avatars(&self) -> &[Avatar] {
        &self.avatars
    }

    fn badges(&self) -> &[Badge] {
        &self.badges
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample() -> StaticCatalog {
        StaticCatalog::sample().unwrap()
    }

    #[test]
    fn sample_catalog_loads() {
        let catalog = sample();
        assert_eq!(catalog.question_count(), 25);
        assert_eq!(catalog.badges().len(), 6);
        assert_eq!(catalog.avatars().len(), 16);
        assert_eq!(catalog.avatars()[0], Avatar::default());
    }

    #[test]
    fn topics_for_each_grade_come_from_that_grade_only() {
        let catalog = sample();
        for grade in Grade::ALL {
            let topics = catalog.topics_for_grade(grade);
            assert_eq!(topics, catalog.topics[&grade]);
            assert_eq!(topics.len(), 3, "grade {grade} should cover every subject");
        }
        let k_math: Vec<_> = catalog.topics_for_grade(Grade::KINDERGARTEN)[&Subject::Math]
            .iter()
            .map(|t| t.id.as_str().to_string())
            .collect();
        assert_eq!(k_math, ["k_counting", "k_addition", "k_shapes"]);
    }

    #[test]
    fn unknown_grade_is_empty() {
        let catalog = sample();
        assert!(catalog.topics_for_grade(Grade::new(99)).is_empty());
        assert!(catalog.questions_for_grade(Grade::new(99)).is_empty());
        assert!(catalog.random_question(Grade::new(99), None).is_none());
    }

    #[test]
    fn every_question_has_valid_correct_index() {
        let catalog = sample();
        for q in &catalog.questions {
            assert!(q.correct() < q.options().len(), "{}", q.id());
            assert!(q.stars() > 0);
        }
    }

    #[test]
    fn kindergarten_math_pool() {
        let catalog = sample();
        let math = catalog.questions_for_grade_and_subject(Grade::KINDERGARTEN, Subject::Math);
        assert_eq!(math.len(), 20);
        assert_eq!(math.iter().map(Question::stars).sum::<u32>(), 29);
        assert_eq!(
            catalog
                .questions_for_grade_and_subject(Grade::KINDERGARTEN, Subject::Science)
                .len(),
            0
        );
    }

    #[test]
    fn questions_for_topic_filters_by_topic() {
        let catalog = sample();
        let shapes = catalog.questions_for_topic(&TopicId::new("k_shapes"));
        assert_eq!(shapes.len(), 5);
        assert!(shapes.iter().all(|q| q.topic_id().as_str() == "k_shapes"));
        assert!(catalog.questions_for_topic(&TopicId::new("nope")).is_empty());
    }

    #[test]
    fn random_question_respects_filters() {
        let catalog = sample();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let q = catalog
                .random_question_with(Grade::KINDERGARTEN, Some(Subject::Reading), &mut rng)
                .unwrap();
            assert_eq!(q.subject(), Subject::Reading);
        }
        assert!(
            catalog
                .random_question_with(Grade::new(1), Some(Subject::Math), &mut rng)
                .is_none()
        );
    }

    #[test]
    fn duplicate_question_ids_rejected() {
        let json = r#"{
            "topics": { "0": { "math": [ { "id": "t", "name": "T", "standard": "S" } ] } },
            "questions": [
                { "id": "q", "subject": "math", "grade": 0, "topicId": "t", "question": "?",
                  "options": ["a"], "correct": 0, "explanation": "", "stars": 1 },
                { "id": "q", "subject": "math", "grade": 0, "topicId": "t", "question": "?",
                  "options": ["a"], "correct": 0, "explanation": "", "stars": 1 }
            ]
        }"#;
        let err = StaticCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateQuestion(id) if id == "q"));
    }

    #[test]
    fn question_topic_must_exist_under_its_subject() {
        let json = r#"{
            "topics": { "0": { "reading": [ { "id": "t", "name": "T", "standard": "S" } ] } },
            "questions": [
                { "id": "q", "subject": "math", "grade": 0, "topicId": "t", "question": "?",
                  "options": ["a"], "correct": 0, "explanation": "", "stars": 1 }
            ]
        }"#;
        let err = StaticCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownTopic { .. }));
    }

    #[test]
    fn earned_badges_follow_progress() {
        let catalog = sample();
        let mut progress = UserProgress::default();
        assert!(catalog.earned_badges(&progress).is_empty());
        progress.award_stars(1);
        let earned: Vec<_> = catalog
            .earned_badges(&progress)
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(earned, ["first_star"]);
    }
}
