use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::collections::{BTreeMap, BTreeSet};

use stars_core::model::{Avatar, QuestionId, TopicId, UserProgress};

use super::SqliteRepository;
use super::mapping::{conn, grade_from_i64, ser, u32_from_i64};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self) -> Result<Option<UserProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT grade, avatar, total_stars, best_streak
            FROM user_progress
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let grade = grade_from_i64(row.try_get::<i64, _>("grade").map_err(ser)?)?;
        let avatar: String = row.try_get("avatar").map_err(ser)?;
        let total_stars =
            u32_from_i64("total_stars", row.try_get::<i64, _>("total_stars").map_err(ser)?)?;
        let best_streak =
            u32_from_i64("best_streak", row.try_get::<i64, _>("best_streak").map_err(ser)?)?;

        let topic_rows = sqlx::query("SELECT topic_id FROM completed_topics")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        let mut completed_topics = BTreeSet::new();
        for row in topic_rows {
            let id: String = row.try_get("topic_id").map_err(ser)?;
            completed_topics.insert(TopicId::new(id));
        }

        let answer_rows = sqlx::query("SELECT question_id, correct FROM answered_questions")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        let mut answered_questions = BTreeMap::new();
        for row in answer_rows {
            let id: String = row.try_get("question_id").map_err(ser)?;
            let correct: bool = row.try_get("correct").map_err(ser)?;
            answered_questions.insert(QuestionId::new(id), correct);
        }

        Ok(Some(UserProgress::from_persisted(
            grade,
            Avatar::new(avatar),
            total_stars,
            completed_topics,
            answered_questions,
            best_streak,
        )))
    }

    async fn save_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO user_progress (id, grade, avatar, total_stars, best_streak, updated_at)
            VALUES (1, ?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                grade = excluded.grade,
                avatar = excluded.avatar,
                total_stars = excluded.total_stars,
                best_streak = excluded.best_streak,
                updated_at = excluded.updated_at
            ",
        )
        .bind(i64::from(progress.grade().value()))
        .bind(progress.avatar().as_str())
        .bind(i64::from(progress.total_stars()))
        .bind(i64::from(progress.best_streak()))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM completed_topics")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        for topic in progress.completed_topics() {
            sqlx::query("INSERT INTO completed_topics (topic_id) VALUES (?1)")
                .bind(topic.as_str())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }

        sqlx::query("DELETE FROM answered_questions")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        for (question, correct) in progress.answered_questions() {
            sqlx::query("INSERT INTO answered_questions (question_id, correct) VALUES (?1, ?2)")
                .bind(question.as_str())
                .bind(*correct)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(
            total_stars = progress.total_stars(),
            completed_topics = progress.completed_topics().len(),
            "saved progress"
        );
        Ok(())
    }
}
