use thiserror::Error;

use crate::model::{
    CatalogError, NoteError, PreferenceError, QuestionError, QuizSummaryError, StudentError,
};

/// Any validation failure raised by the domain model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Note(#[from] NoteError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Student(#[from] StudentError),
    #[error(transparent)]
    Preference(#[from] PreferenceError),
    #[error(transparent)]
    QuizSummary(#[from] QuizSummaryError),
}
