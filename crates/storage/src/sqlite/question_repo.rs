use exam_core::model::{NoteId, Question, QuestionId, StudentId, SubjectId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    db_err, from_json, id_i64, note_id_from_i64, parse_difficulty, question_id_from_i64, ser,
    subject_id_from_i64, to_json, u32_from_i64,
};
use crate::repository::{QuestionRepository, StorageError};

const QUESTION_COLUMNS: &str = r"
    id, prompt, options, correct_index, explanation, note_id, subject_id, difficulty,
    points, time_limit_secs, assigned_students, created_at
";

fn question_from_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let options: Vec<String> =
        from_json("options", &row.try_get::<String, _>("options").map_err(ser)?)?;
    let assigned: Vec<StudentId> = from_json(
        "assigned_students",
        &row.try_get::<String, _>("assigned_students").map_err(ser)?,
    )?;
    let correct_index = usize::try_from(row.try_get::<i64, _>("correct_index").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("invalid correct_index".into()))?;
    let time_limit = row
        .try_get::<Option<i64>, _>("time_limit_secs")
        .map_err(ser)?
        .map(|v| u32_from_i64("time_limit_secs", v))
        .transpose()?;

    Question::from_persisted(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("prompt").map_err(ser)?,
        options,
        correct_index,
        row.try_get("explanation").map_err(ser)?,
        note_id_from_i64(row.try_get::<i64, _>("note_id").map_err(ser)?)?,
        subject_id_from_i64(row.try_get::<i64, _>("subject_id").map_err(ser)?)?,
        parse_difficulty(&row.try_get::<String, _>("difficulty").map_err(ser)?)?,
        u32_from_i64("points", row.try_get::<i64, _>("points").map_err(ser)?)?,
        time_limit,
        assigned,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

struct QuestionColumns {
    options: String,
    assigned: String,
    correct_index: i64,
    note_id: i64,
    subject_id: i64,
}

impl QuestionColumns {
    fn from_question(q: &Question) -> Result<Self, StorageError> {
        Ok(Self {
            options: to_json(q.options())?,
            assigned: to_json(q.assigned_students())?,
            correct_index: i64::try_from(q.correct_index())
                .map_err(|_| StorageError::Serialization("correct_index overflow".into()))?,
            note_id: id_i64("note_id", q.note_id().value())?,
            subject_id: id_i64("subject_id", q.subject_id().value())?,
        })
    }
}

impl SqliteRepository {
    async fn select_questions(
        &self,
        filter: &str,
        bind: Option<i64>,
    ) -> Result<Vec<Question>, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions {filter} ORDER BY id ASC");
        let mut query = sqlx::query(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(question_from_row).collect()
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_new_questions(
        &self,
        questions: &[Question],
    ) -> Result<Vec<QuestionId>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut ids = Vec::with_capacity(questions.len());

        for q in questions {
            let cols = QuestionColumns::from_question(q)?;
            let res = sqlx::query(
                r"
                INSERT INTO questions (
                    prompt, options, correct_index, explanation, note_id, subject_id,
                    difficulty, points, time_limit_secs, assigned_students, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ",
            )
            .bind(q.prompt())
            .bind(cols.options)
            .bind(cols.correct_index)
            .bind(q.explanation())
            .bind(cols.note_id)
            .bind(cols.subject_id)
            .bind(q.difficulty().as_str())
            .bind(i64::from(q.points()))
            .bind(q.time_limit_secs().map(i64::from))
            .bind(cols.assigned)
            .bind(q.created_at())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            ids.push(question_id_from_i64(res.last_insert_rowid())?);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(ids)
    }

    async fn upsert_question(&self, q: &Question) -> Result<(), StorageError> {
        let cols = QuestionColumns::from_question(q)?;
        sqlx::query(
            r"
            INSERT INTO questions (
                id, prompt, options, correct_index, explanation, note_id, subject_id,
                difficulty, points, time_limit_secs, assigned_students, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                prompt = excluded.prompt,
                options = excluded.options,
                correct_index = excluded.correct_index,
                explanation = excluded.explanation,
                note_id = excluded.note_id,
                subject_id = excluded.subject_id,
                difficulty = excluded.difficulty,
                points = excluded.points,
                time_limit_secs = excluded.time_limit_secs,
                assigned_students = excluded.assigned_students
            ",
        )
        .bind(id_i64("question_id", q.id().value())?)
        .bind(q.prompt())
        .bind(cols.options)
        .bind(cols.correct_index)
        .bind(q.explanation())
        .bind(cols.note_id)
        .bind(cols.subject_id)
        .bind(q.difficulty().as_str())
        .bind(i64::from(q.points()))
        .bind(q.time_limit_secs().map(i64::from))
        .bind(cols.assigned)
        .bind(q.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let mut found = self
            .select_questions("WHERE id = ?1", Some(id_i64("question_id", id.value())?))
            .await?;
        Ok(found.pop())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        self.select_questions("", None).await
    }

    async fn list_questions_by_note(&self, note_id: NoteId) -> Result<Vec<Question>, StorageError> {
        self.select_questions("WHERE note_id = ?1", Some(id_i64("note_id", note_id.value())?))
            .await
    }

    async fn list_questions_by_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<Question>, StorageError> {
        self.select_questions(
            "WHERE subject_id = ?1",
            Some(id_i64("subject_id", subject_id.value())?),
        )
        .await
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM questions WHERE id = ?1")
            .bind(id_i64("question_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
