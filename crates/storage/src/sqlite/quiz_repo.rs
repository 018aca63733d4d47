use exam_core::model::{QuizAttemptResult, QuizSummary, StudentId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    db_err, id_i64, question_id_from_i64, scope_from_columns, scope_to_columns, ser,
    student_id_from_i64, u32_from_i64,
};
use crate::repository::{QuizRepository, QuizSummaryRow, StorageError};

const SUMMARY_COLUMNS: &str = r"
    id, student_id, scope_kind, scope_id, started_at, completed_at, total_questions,
    correct, incorrect, unanswered, score, points_earned, points_possible, time_spent_secs
";

fn count(row: &SqliteRow, field: &'static str) -> Result<u32, StorageError> {
    u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

fn map_summary_row(row: &SqliteRow) -> Result<QuizSummary, StorageError> {
    let scope_kind: String = row.try_get("scope_kind").map_err(ser)?;
    let scope = scope_from_columns(&scope_kind, row.try_get("scope_id").map_err(ser)?)?;
    let score = u8::try_from(row.try_get::<i64, _>("score").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("invalid score".into()))?;

    QuizSummary::from_persisted(
        student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        scope,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        count(row, "total_questions")?,
        count(row, "correct")?,
        count(row, "incorrect")?,
        count(row, "unanswered")?,
        score,
        count(row, "points_earned")?,
        count(row, "points_possible")?,
        count(row, "time_spent_secs")?,
    )
    .map_err(ser)
}

fn map_summary_row_with_id(row: &SqliteRow) -> Result<QuizSummaryRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    Ok(QuizSummaryRow::new(id, map_summary_row(row)?))
}

fn map_result_row(row: &SqliteRow) -> Result<QuizAttemptResult, StorageError> {
    let selected = row
        .try_get::<Option<i64>, _>("selected_index")
        .map_err(ser)?
        .map(|v| {
            usize::try_from(v)
                .map_err(|_| StorageError::Serialization(format!("invalid selected_index: {v}")))
        })
        .transpose()?;

    Ok(QuizAttemptResult::from_persisted(
        question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        selected,
        row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
        count(row, "time_spent_secs")?,
    ))
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn append_quiz(
        &self,
        summary: &QuizSummary,
        results: &[QuizAttemptResult],
    ) -> Result<i64, StorageError> {
        let (scope_kind, scope_id) = scope_to_columns(summary.scope())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r"
                INSERT INTO quiz_summaries (
                    student_id, scope_kind, scope_id, started_at, completed_at, total_questions,
                    correct, incorrect, unanswered, score, points_earned, points_possible,
                    time_spent_secs
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
        )
        .bind(id_i64("student_id", summary.student_id().value())?)
        .bind(scope_kind)
        .bind(scope_id)
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .bind(i64::from(summary.total_questions()))
        .bind(i64::from(summary.correct()))
        .bind(i64::from(summary.incorrect()))
        .bind(i64::from(summary.unanswered()))
        .bind(i64::from(summary.score()))
        .bind(i64::from(summary.points_earned()))
        .bind(i64::from(summary.points_possible()))
        .bind(i64::from(summary.time_spent_secs()))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        let summary_id = res.last_insert_rowid();

        for (position, result) in results.iter().enumerate() {
            let selected = result
                .selected()
                .map(i64::try_from)
                .transpose()
                .map_err(|_| StorageError::Serialization("selected_index overflow".into()))?;
            sqlx::query(
                r"
                    INSERT INTO quiz_results (
                        summary_id, position, question_id, selected_index, is_correct, time_spent_secs
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(summary_id)
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(id_i64("question_id", result.question_id().value())?)
            .bind(selected)
            .bind(i64::from(result.is_correct()))
            .bind(i64::from(result.time_spent_secs()))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(summary_id)
    }

    async fn get_quiz(&self, id: i64) -> Result<QuizSummaryRow, StorageError> {
        let sql = format!("SELECT {SUMMARY_COLUMNS} FROM quiz_summaries WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(StorageError::NotFound)?;

        map_summary_row_with_id(&row)
    }

    async fn get_quiz_results(&self, id: i64) -> Result<Vec<QuizAttemptResult>, StorageError> {
        sqlx::query("SELECT 1 FROM quiz_summaries WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(StorageError::NotFound)?;

        let rows = sqlx::query(
            r"
                SELECT question_id, selected_index, is_correct, time_spent_secs
                FROM quiz_results
                WHERE summary_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_result_row).collect()
    }

    async fn list_student_quizzes(
        &self,
        student_id: StudentId,
        limit: u32,
    ) -> Result<Vec<QuizSummaryRow>, StorageError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM quiz_summaries
             WHERE student_id = ?1
             ORDER BY completed_at DESC, id DESC
             LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("student_id", student_id.value())?)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(map_summary_row_with_id).collect()
    }

    async fn list_all_quizzes(&self) -> Result<Vec<QuizSummary>, StorageError> {
        let sql = format!("SELECT {SUMMARY_COLUMNS} FROM quiz_summaries ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(map_summary_row).collect()
    }
}
