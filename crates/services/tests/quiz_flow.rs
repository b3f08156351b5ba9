use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use services::{Advance, AppServices, AppServicesError, Clock, ProgressError, QuizPhase};
use stars_core::model::{
    Avatar, Badge, BadgeRequirement, Grade, Question, Subject, Topic, TopicId, UserProgress,
};
use stars_core::time::fixed_now;
use stars_core::{ContentProvider, StaticCatalog, TopicMap};
use storage::repository::{InMemoryRepository, ProgressRepository, Storage, StorageError};

/// Hand-built provider with one science question per grade.
struct OneQuestionCatalog {
    badges: Vec<Badge>,
    avatars: Vec<Avatar>,
}

impl OneQuestionCatalog {
    fn new() -> Self {
        Self {
            badges: vec![Badge::new(
                "hot_streak",
                "Hot Streak",
                "One in a row",
                "🔥",
                BadgeRequirement::Streak(1),
            )],
            avatars: vec![Avatar::new("🦉")],
        }
    }

    fn question(grade: Grade) -> Question {
        Question::new(
            format!("sci_{}", grade.value()),
            Subject::Science,
            grade,
            format!("plants_{}", grade.value()),
            "What do plants need?",
            vec!["Sunlight".into(), "Candy".into()],
            0,
            "Plants make food from sunlight.",
            4,
        )
        .unwrap()
    }
}

impl ContentProvider for OneQuestionCatalog {
    fn topics_for_grade(&self, grade: Grade) -> TopicMap {
        let topic = Topic::new(format!("plants_{}", grade.value()), "Plants", "SC.1.L.14.1");
        BTreeMap::from([(Subject::Science, vec![topic])])
    }

    fn questions_for_grade(&self, grade: Grade) -> Vec<Question> {
        vec![Self::question(grade)]
    }

    fn questions_for_topic(&self, topic: &TopicId) -> Vec<Question> {
        Grade::ALL
            .into_iter()
            .map(Self::question)
            .filter(|q| q.topic_id() == topic)
            .collect()
    }

    fn avatars(&self) -> &[Avatar] {
        &self.avatars
    }

    fn badges(&self) -> &[Badge] {
        &self.badges
    }
}

/// Progress repository whose first write fails.
#[derive(Default)]
struct FlakyProgress {
    failed_once: AtomicBool,
    inner: InMemoryRepository,
}

#[async_trait]
impl ProgressRepository for FlakyProgress {
    async fn load_progress(&self) -> Result<Option<UserProgress>, StorageError> {
        self.inner.load_progress().await
    }

    async fn save_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(StorageError::Connection("database is locked".into()));
        }
        self.inner.save_progress(progress).await
    }
}

#[tokio::test]
async fn substituted_catalog_drives_the_same_flow() {
    let services = AppServices::in_memory(
        Arc::new(OneQuestionCatalog::new()),
        Clock::fixed(fixed_now()),
    );
    let mut session = services.start_session().await.unwrap();

    session.initialize_grade(Grade::new(2));
    session.select_avatar(Avatar::new("🦉"));
    // Reading has no questions here, so the grade pool is used.
    session.select_subject(Subject::Reading);
    assert_eq!(session.phase(), QuizPhase::Answering);
    assert_eq!(session.state().total_questions, 1);

    session.select_answer(0);
    let outcome = session.submit_answer().unwrap();
    assert!(outcome.is_correct);
    assert_eq!(session.phase(), QuizPhase::Finished);
    assert_eq!(session.advance(), Advance::Finished);

    let report = services.finish_session(&mut session).await.unwrap();
    assert_eq!(report.total_stars, 4);
    assert_eq!(report.new_badges.len(), 1);
    assert_eq!(report.new_badges[0].id, "hot_streak");
    assert!(session.state().user.has_completed(&TopicId::new("plants_2")));
}

#[tokio::test]
async fn sqlite_backed_sessions_accumulate() {
    let catalog = Arc::new(StaticCatalog::sample().unwrap());
    let services = AppServices::new_sqlite(
        "sqlite:file:memdb_quiz_flow?mode=memory&cache=shared",
        catalog,
        Clock::fixed(fixed_now()),
    )
    .await
    .unwrap();

    for subject in [Subject::Math, Subject::Reading] {
        let mut session = services.start_session().await.unwrap();
        session.initialize_grade(Grade::KINDERGARTEN);
        session.select_subject(subject);
        loop {
            let correct = session.state().current_question.as_ref().unwrap().correct();
            session.select_answer(correct);
            session.submit_answer().unwrap();
            if session.advance() == Advance::Finished {
                break;
            }
        }
        services.finish_session(&mut session).await.unwrap();
    }

    let stored = services.progress().load().await.unwrap();
    assert_eq!(stored.total_stars(), 29 + 7);
    assert_eq!(stored.answered_questions().len(), 25);
    assert_eq!(stored.completed_topics().len(), 7);

    let history = services.progress().recent_sessions(10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().any(|item| item.subject == Subject::Reading && item.stars_earned == 7));
}

#[tokio::test]
async fn failed_finish_can_be_retried() {
    let storage = Storage {
        progress: Arc::new(FlakyProgress::default()),
        session_summaries: Arc::new(InMemoryRepository::new()),
    };
    let services = AppServices::new(
        Arc::new(StaticCatalog::sample().unwrap()),
        Clock::fixed(fixed_now()),
        &storage,
    );

    let mut session = services.start_session().await.unwrap();
    session.initialize_grade(Grade::KINDERGARTEN);
    session.select_subject(Subject::Math);
    let correct = session.state().current_question.as_ref().unwrap().correct();
    session.select_answer(correct);
    session.submit_answer().unwrap();

    let err = services.finish_session(&mut session).await.unwrap_err();
    assert!(matches!(
        err,
        AppServicesError::Progress(ProgressError::Storage(StorageError::Connection(_)))
    ));
    assert!(!session.progress().is_complete);
    assert_eq!(session.state().user.total_stars(), 0);

    let report = services.finish_session(&mut session).await.unwrap();
    assert_eq!(report.total_stars, 1);
    assert_eq!(report.new_badges[0].id, "first_star");
    assert!(session.progress().is_complete);

    let stored = services.progress().load().await.unwrap();
    assert_eq!(stored.total_stars(), 1);
    let history = services.progress().recent_sessions(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, report.summary_id);
}
