use exam_core::model::{
    CategoryId, Difficulty, NoteId, QuestionId, QuizScope, StudentId, SubjectId,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Extended result code for a foreign key refused by a `RESTRICT` action.
const SQLITE_CONSTRAINT_TRIGGER: &str = "1811";

fn is_constraint_conflict(db: &dyn sqlx::error::DatabaseError) -> bool {
    db.is_unique_violation()
        || db.is_foreign_key_violation()
        || db.code().as_deref() == Some(SQLITE_CONSTRAINT_TRIGGER)
}

/// Map a sqlx failure, turning constraint violations into `Conflict`.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if is_constraint_conflict(db.as_ref()) => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn category_id_from_i64(v: i64) -> Result<CategoryId, StorageError> {
    Ok(CategoryId::new(i64_to_u64("category_id", v)?))
}

pub(crate) fn subject_id_from_i64(v: i64) -> Result<SubjectId, StorageError> {
    Ok(SubjectId::new(i64_to_u64("subject_id", v)?))
}

pub(crate) fn note_id_from_i64(v: i64) -> Result<NoteId, StorageError> {
    Ok(NoteId::new(i64_to_u64("note_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn student_id_from_i64(v: i64) -> Result<StudentId, StorageError> {
    Ok(StudentId::new(i64_to_u64("student_id", v)?))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: DeserializeOwned>(field: &'static str, raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("invalid {field}: {e}")))
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    s.parse::<Difficulty>().map_err(ser)
}

/// Scopes are stored as a kind column plus a nullable id column.
pub(crate) fn scope_to_columns(scope: QuizScope) -> Result<(&'static str, Option<i64>), StorageError> {
    Ok(match scope {
        QuizScope::All => ("all", None),
        QuizScope::Note(id) => ("note", Some(id_i64("scope_id", id.value())?)),
        QuizScope::Subject(id) => ("subject", Some(id_i64("scope_id", id.value())?)),
    })
}

pub(crate) fn scope_from_columns(kind: &str, id: Option<i64>) -> Result<QuizScope, StorageError> {
    match (kind, id) {
        ("all", _) => Ok(QuizScope::All),
        ("note", Some(id)) => Ok(QuizScope::Note(note_id_from_i64(id)?)),
        ("subject", Some(id)) => Ok(QuizScope::Subject(subject_id_from_i64(id)?)),
        _ => Err(StorageError::Serialization(format!(
            "invalid quiz scope: {kind}/{id:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_columns_round_trip() {
        for scope in [
            QuizScope::All,
            QuizScope::Note(NoteId::new(4)),
            QuizScope::Subject(SubjectId::new(9)),
        ] {
            let (kind, id) = scope_to_columns(scope).unwrap();
            assert_eq!(scope_from_columns(kind, id).unwrap(), scope);
        }
        assert!(scope_from_columns("note", None).is_err());
        assert!(scope_from_columns("chapter", Some(1)).is_err());
    }

    #[test]
    fn negative_ids_are_rejected() {
        assert!(note_id_from_i64(-1).is_err());
        assert_eq!(student_id_from_i64(7).unwrap(), StudentId::new(7));
    }
}
