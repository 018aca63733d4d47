use chrono::Utc;
use exam_core::model::{Highlight, HighlightId, NoteId, ReadingProgress, StudentId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, note_id_from_i64, ser, student_id_from_i64, u32_from_i64};
use crate::repository::{PreferencesRepository, StorageError};

fn highlight_from_row(row: &SqliteRow) -> Result<Highlight, StorageError> {
    let raw_id: String = row.try_get("id").map_err(ser)?;
    let id: HighlightId = raw_id.parse().map_err(ser)?;
    let u32_col = |field: &'static str| -> Result<u32, StorageError> {
        u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
    };

    Highlight::new(
        id,
        student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        note_id_from_i64(row.try_get::<i64, _>("note_id").map_err(ser)?)?,
        u32_col("page_number")?,
        row.try_get::<String, _>("text").map_err(ser)?,
        u32_col("start_offset")?,
        u32_col("end_offset")?,
        row.try_get::<String, _>("color").map_err(ser)?,
        row.try_get::<Option<String>, _>("annotation").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

fn progress_from_row(row: &SqliteRow) -> Result<ReadingProgress, StorageError> {
    let u32_col = |field: &'static str| -> Result<u32, StorageError> {
        u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
    };

    ReadingProgress::new(
        student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        note_id_from_i64(row.try_get::<i64, _>("note_id").map_err(ser)?)?,
        u32_col("current_page")?,
        u32_col("total_pages")?,
        u32_col("reading_time_secs")?,
        u32_col("words_read")?,
        row.try_get("last_read").map_err(ser)?,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl PreferencesRepository for SqliteRepository {
    async fn set_bookmark(
        &self,
        student_id: StudentId,
        note_id: NoteId,
        bookmarked: bool,
    ) -> Result<(), StorageError> {
        let student = id_i64("student_id", student_id.value())?;
        let note = id_i64("note_id", note_id.value())?;

        let query = if bookmarked {
            sqlx::query(
                r"
                INSERT INTO bookmarks (student_id, note_id, created_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(student_id, note_id) DO NOTHING
                ",
            )
            .bind(student)
            .bind(note)
            .bind(Utc::now())
        } else {
            sqlx::query("DELETE FROM bookmarks WHERE student_id = ?1 AND note_id = ?2")
                .bind(student)
                .bind(note)
        };
        query.execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }

    async fn list_bookmarks(&self, student_id: StudentId) -> Result<Vec<NoteId>, StorageError> {
        let rows = sqlx::query(
            "SELECT note_id FROM bookmarks WHERE student_id = ?1 ORDER BY note_id ASC",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| note_id_from_i64(row.try_get::<i64, _>("note_id").map_err(ser)?))
            .collect()
    }

    async fn add_highlight(&self, h: &Highlight) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO highlights (
                id, student_id, note_id, page_number, text, start_offset, end_offset,
                color, annotation, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(h.id().to_string())
        .bind(id_i64("student_id", h.student_id().value())?)
        .bind(id_i64("note_id", h.note_id().value())?)
        .bind(i64::from(h.page_number()))
        .bind(h.text())
        .bind(i64::from(h.start_offset()))
        .bind(i64::from(h.end_offset()))
        .bind(h.color())
        .bind(h.annotation())
        .bind(h.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn list_highlights(
        &self,
        student_id: StudentId,
        note_id: NoteId,
    ) -> Result<Vec<Highlight>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, student_id, note_id, page_number, text, start_offset, end_offset,
                   color, annotation, created_at
            FROM highlights
            WHERE student_id = ?1 AND note_id = ?2
            ORDER BY page_number ASC, start_offset ASC
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .bind(id_i64("note_id", note_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(highlight_from_row).collect()
    }

    async fn delete_highlight(
        &self,
        student_id: StudentId,
        id: HighlightId,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM highlights WHERE id = ?1 AND student_id = ?2")
            .bind(id.to_string())
            .bind(id_i64("student_id", student_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn save_reading_progress(&self, p: &ReadingProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO reading_progress (
                student_id, note_id, current_page, total_pages, reading_time_secs, words_read, last_read
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(student_id, note_id) DO UPDATE SET
                current_page = excluded.current_page,
                total_pages = excluded.total_pages,
                reading_time_secs = excluded.reading_time_secs,
                words_read = excluded.words_read,
                last_read = excluded.last_read
            ",
        )
        .bind(id_i64("student_id", p.student_id().value())?)
        .bind(id_i64("note_id", p.note_id().value())?)
        .bind(i64::from(p.current_page()))
        .bind(i64::from(p.total_pages()))
        .bind(i64::from(p.reading_time_secs()))
        .bind(i64::from(p.words_read()))
        .bind(p.last_read())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_reading_progress(
        &self,
        student_id: StudentId,
        note_id: NoteId,
    ) -> Result<Option<ReadingProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT student_id, note_id, current_page, total_pages, reading_time_secs, words_read, last_read
            FROM reading_progress
            WHERE student_id = ?1 AND note_id = ?2
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .bind(id_i64("note_id", note_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(progress_from_row).transpose()
    }

    async fn list_reading_progress(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ReadingProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT student_id, note_id, current_page, total_pages, reading_time_secs, words_read, last_read
            FROM reading_progress
            WHERE student_id = ?1
            ORDER BY note_id ASC
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(progress_from_row).collect()
    }
}
