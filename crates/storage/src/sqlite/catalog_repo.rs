use exam_core::model::{Category, CategoryId, LocalizedName, Subject, SubjectId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{category_id_from_i64, db_err, id_i64, ser, subject_id_from_i64};
use crate::repository::{CategoryRepository, StorageError, SubjectRepository};

fn names_from_row(row: &SqliteRow) -> Result<LocalizedName, StorageError> {
    LocalizedName::new(
        row.try_get::<String, _>("name").map_err(ser)?,
        Some(row.try_get::<String, _>("name_en").map_err(ser)?),
        Some(row.try_get::<String, _>("name_si").map_err(ser)?),
    )
    .map_err(ser)
}

fn category_from_row(row: &SqliteRow) -> Result<Category, StorageError> {
    Category::new(
        category_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        names_from_row(row)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        row.try_get::<Option<String>, _>("thumbnail").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

fn subject_from_row(row: &SqliteRow) -> Result<Subject, StorageError> {
    Subject::new(
        subject_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        category_id_from_i64(row.try_get::<i64, _>("category_id").map_err(ser)?)?,
        names_from_row(row)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        row.try_get::<Option<String>, _>("thumbnail").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl CategoryRepository for SqliteRepository {
    async fn insert_new_category(&self, category: &Category) -> Result<CategoryId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO categories (name, name_en, name_si, description, thumbnail, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(category.names().name())
        .bind(category.names().name_en())
        .bind(category.names().name_si())
        .bind(category.description())
        .bind(category.thumbnail().map(ToString::to_string))
        .bind(category.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        category_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO categories (id, name, name_en, name_si, description, thumbnail, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                name_en = excluded.name_en,
                name_si = excluded.name_si,
                description = excluded.description,
                thumbnail = excluded.thumbnail
            ",
        )
        .bind(id_i64("category_id", category.id().value())?)
        .bind(category.names().name())
        .bind(category.names().name_en())
        .bind(category.names().name_si())
        .bind(category.description())
        .bind(category.thumbnail().map(ToString::to_string))
        .bind(category.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, name_en, name_si, description, thumbnail, created_at
            FROM categories WHERE id = ?1
            ",
        )
        .bind(id_i64("category_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(category_from_row).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, name_en, name_si, description, thumbnail, created_at
            FROM categories
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(category_from_row).collect()
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id_i64("category_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn insert_new_subject(&self, subject: &Subject) -> Result<SubjectId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO subjects (
                category_id, name, name_en, name_si, description, thumbnail, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_i64("category_id", subject.category_id().value())?)
        .bind(subject.names().name())
        .bind(subject.names().name_en())
        .bind(subject.names().name_si())
        .bind(subject.description())
        .bind(subject.thumbnail().map(ToString::to_string))
        .bind(subject.created_at())
        .bind(subject.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        subject_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO subjects (
                id, category_id, name, name_en, name_si, description, thumbnail, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                category_id = excluded.category_id,
                name = excluded.name,
                name_en = excluded.name_en,
                name_si = excluded.name_si,
                description = excluded.description,
                thumbnail = excluded.thumbnail,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("subject_id", subject.id().value())?)
        .bind(id_i64("category_id", subject.category_id().value())?)
        .bind(subject.names().name())
        .bind(subject.names().name_en())
        .bind(subject.names().name_si())
        .bind(subject.description())
        .bind(subject.thumbnail().map(ToString::to_string))
        .bind(subject.created_at())
        .bind(subject.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, category_id, name, name_en, name_si, description, thumbnail, created_at, updated_at
            FROM subjects WHERE id = ?1
            ",
        )
        .bind(id_i64("subject_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(subject_from_row).transpose()
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, category_id, name, name_en, name_si, description, thumbnail, created_at, updated_at
            FROM subjects
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(subject_from_row).collect()
    }

    async fn list_subjects_by_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Subject>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, category_id, name, name_en, name_si, description, thumbnail, created_at, updated_at
            FROM subjects
            WHERE category_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("category_id", category_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(subject_from_row).collect()
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM subjects WHERE id = ?1")
            .bind(id_i64("subject_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
