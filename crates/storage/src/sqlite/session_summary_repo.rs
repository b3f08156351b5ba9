use sqlx::Row;

use stars_core::model::SessionSummary;

use super::SqliteRepository;
use super::mapping::{conn, grade_from_i64, parse_subject, ser, u32_from_i64};
use crate::repository::{SessionSummaryRepository, SessionSummaryRow, StorageError};

fn map_summary_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionSummary, StorageError> {
    let grade = grade_from_i64(row.try_get::<i64, _>("grade").map_err(ser)?)?;
    let subject = parse_subject(&row.try_get::<String, _>("subject").map_err(ser)?)?;
    let total_questions = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let correct_answers = u32_from_i64(
        "correct_answers",
        row.try_get::<i64, _>("correct_answers").map_err(ser)?,
    )?;
    let stars_earned = u32_from_i64(
        "stars_earned",
        row.try_get::<i64, _>("stars_earned").map_err(ser)?,
    )?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    SessionSummary::new(
        grade,
        subject,
        total_questions,
        correct_answers,
        stars_earned,
        started_at,
        completed_at,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl SessionSummaryRepository for SqliteRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO session_summaries (
                    grade, subject, total_questions, correct_answers,
                    stars_earned, started_at, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(i64::from(summary.grade().value()))
        .bind(summary.subject().as_str())
        .bind(i64::from(summary.total_questions()))
        .bind(i64::from(summary.correct_answers()))
        .bind(i64::from(summary.stars_earned()))
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    grade, subject, total_questions, correct_answers,
                    stars_earned, started_at, completed_at
                FROM session_summaries
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_summary_row(&row)
    }

    async fn list_summaries(&self, limit: u32) -> Result<Vec<SessionSummaryRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, grade, subject, total_questions, correct_answers,
                    stars_earned, started_at, completed_at
                FROM session_summaries
                ORDER BY completed_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            out.push(SessionSummaryRow::new(id, map_summary_row(&row)?));
        }
        Ok(out)
    }
}
