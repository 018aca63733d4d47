use exam_core::model::{Student, StudentId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, ser, student_id_from_i64};
use crate::repository::{StorageError, StudentRepository};

fn student_from_row(row: &SqliteRow) -> Result<Student, StorageError> {
    let student = Student::new(
        student_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("email").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)?;
    Ok(student.with_last_login(row.try_get("last_login").map_err(ser)?))
}

#[async_trait::async_trait]
impl StudentRepository for SqliteRepository {
    async fn insert_new_student(&self, student: &Student) -> Result<StudentId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO students (name, email, created_at, last_login)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(student.name())
        .bind(student.email())
        .bind(student.created_at())
        .bind(student.last_login())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        student_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_student(&self, student: &Student) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO students (id, name, email, created_at, last_login)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                last_login = excluded.last_login
            ",
        )
        .bind(id_i64("student_id", student.id().value())?)
        .bind(student.name())
        .bind(student.email())
        .bind(student.created_at())
        .bind(student.last_login())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StorageError> {
        let row = sqlx::query(
            "SELECT id, name, email, created_at, last_login FROM students WHERE id = ?1",
        )
        .bind(id_i64("student_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(student_from_row).transpose()
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StorageError> {
        let row = sqlx::query(
            "SELECT id, name, email, created_at, last_login FROM students WHERE email = ?1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(student_from_row).transpose()
    }

    async fn list_students(&self) -> Result<Vec<Student>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, name, email, created_at, last_login FROM students ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(student_from_row).collect()
    }
}
