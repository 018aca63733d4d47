use exam_core::model::{Note, NoteId, NotePage, StudentId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    category_id_from_i64, db_err, from_json, id_i64, note_id_from_i64, parse_difficulty, ser,
    subject_id_from_i64, to_json, u32_from_i64,
};
use crate::repository::{NoteRepository, StorageError};

const NOTE_COLUMNS: &str = r"
    id, title, title_en, title_si, subject_id, category_id, pages, difficulty,
    estimated_read_time, tags, assigned_students, created_by, created_at, updated_at
";

fn note_from_row(row: &SqliteRow) -> Result<Note, StorageError> {
    let pages: Vec<NotePage> = from_json("pages", &row.try_get::<String, _>("pages").map_err(ser)?)?;
    let tags: Vec<String> = from_json("tags", &row.try_get::<String, _>("tags").map_err(ser)?)?;
    let assigned: Vec<StudentId> = from_json(
        "assigned_students",
        &row.try_get::<String, _>("assigned_students").map_err(ser)?,
    )?;

    Note::from_persisted(
        note_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("title").map_err(ser)?,
        row.try_get("title_en").map_err(ser)?,
        row.try_get("title_si").map_err(ser)?,
        subject_id_from_i64(row.try_get::<i64, _>("subject_id").map_err(ser)?)?,
        category_id_from_i64(row.try_get::<i64, _>("category_id").map_err(ser)?)?,
        pages,
        parse_difficulty(&row.try_get::<String, _>("difficulty").map_err(ser)?)?,
        u32_from_i64(
            "estimated_read_time",
            row.try_get::<i64, _>("estimated_read_time").map_err(ser)?,
        )?,
        tags,
        assigned,
        row.try_get("created_by").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

/// Column values shared by insert and upsert.
struct NoteColumns {
    pages: String,
    tags: String,
    assigned: String,
    subject_id: i64,
    category_id: i64,
}

impl NoteColumns {
    fn from_note(note: &Note) -> Result<Self, StorageError> {
        Ok(Self {
            pages: to_json(note.pages())?,
            tags: to_json(note.tags())?,
            assigned: to_json(note.assigned_students())?,
            subject_id: id_i64("subject_id", note.subject_id().value())?,
            category_id: id_i64("category_id", note.category_id().value())?,
        })
    }
}

#[async_trait::async_trait]
impl NoteRepository for SqliteRepository {
    async fn insert_new_notes(&self, notes: &[Note]) -> Result<Vec<NoteId>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut ids = Vec::with_capacity(notes.len());

        for note in notes {
            let cols = NoteColumns::from_note(note)?;
            let res = sqlx::query(
                r"
                INSERT INTO notes (
                    title, title_en, title_si, subject_id, category_id, pages, difficulty,
                    estimated_read_time, tags, assigned_students, created_by, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ",
            )
            .bind(note.title())
            .bind(note.title_en())
            .bind(note.title_si())
            .bind(cols.subject_id)
            .bind(cols.category_id)
            .bind(cols.pages)
            .bind(note.difficulty().as_str())
            .bind(i64::from(note.estimated_read_time()))
            .bind(cols.tags)
            .bind(cols.assigned)
            .bind(note.created_by())
            .bind(note.created_at())
            .bind(note.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            ids.push(note_id_from_i64(res.last_insert_rowid())?);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(ids)
    }

    async fn upsert_note(&self, note: &Note) -> Result<(), StorageError> {
        let cols = NoteColumns::from_note(note)?;
        sqlx::query(
            r"
            INSERT INTO notes (
                id, title, title_en, title_si, subject_id, category_id, pages, difficulty,
                estimated_read_time, tags, assigned_students, created_by, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                title_en = excluded.title_en,
                title_si = excluded.title_si,
                subject_id = excluded.subject_id,
                category_id = excluded.category_id,
                pages = excluded.pages,
                difficulty = excluded.difficulty,
                estimated_read_time = excluded.estimated_read_time,
                tags = excluded.tags,
                assigned_students = excluded.assigned_students,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("note_id", note.id().value())?)
        .bind(note.title())
        .bind(note.title_en())
        .bind(note.title_si())
        .bind(cols.subject_id)
        .bind(cols.category_id)
        .bind(cols.pages)
        .bind(note.difficulty().as_str())
        .bind(i64::from(note.estimated_read_time()))
        .bind(cols.tags)
        .bind(cols.assigned)
        .bind(note.created_by())
        .bind(note.created_at())
        .bind(note.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_note(&self, id: NoteId) -> Result<Option<Note>, StorageError> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("note_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn list_notes(&self) -> Result<Vec<Note>, StorageError> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(note_from_row).collect()
    }

    async fn count_notes(&self) -> Result<u32, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM notes")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        u32_from_i64("note count", row.try_get::<i64, _>("n").map_err(ser)?)
    }

    async fn delete_note(&self, id: NoteId) -> Result<(), StorageError> {
        let id = id_i64("note_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query("DELETE FROM notes WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        for statement in [
            "DELETE FROM questions WHERE note_id = ?1",
            "DELETE FROM bookmarks WHERE note_id = ?1",
            "DELETE FROM highlights WHERE note_id = ?1",
            "DELETE FROM reading_progress WHERE note_id = ?1",
        ] {
            sqlx::query(statement)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
