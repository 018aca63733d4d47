//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{
    CatalogError, NoteError, PreferenceError, QuestionError, QuizSummaryError, StudentError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error("category still has {subjects} subject(s)")]
    CategoryInUse { subjects: usize },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `NoteService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NoteServiceError {
    #[error(transparent)]
    Note(#[from] NoteError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuestionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionServiceError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StudentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudentServiceError {
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error(transparent)]
    Student(#[from] StudentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ImportService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload must be a JSON array")]
    NotAnArray,
    #[error("payload is empty")]
    Empty,
    #[error("item {index}: {reason}")]
    InvalidItem { index: usize, reason: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by quiz sessions and the quiz loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no questions available")]
    NoQuestions,
    #[error("quiz already completed")]
    Completed,
    #[error("quiz is not complete yet")]
    NotComplete,
    #[error("option {selected} is not valid for a question with {options} options")]
    InvalidOption { selected: usize, options: usize },
    #[error(transparent)]
    Summary(#[from] QuizSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PreferencesService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PreferencesServiceError {
    #[error("note has no page {0}")]
    PageNotFound(u32),
    #[error(transparent)]
    Preference(#[from] PreferenceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
