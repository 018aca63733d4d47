mod attempt;
mod catalog;
mod difficulty;
mod ids;
mod note;
mod preferences;
mod question;
mod student;

pub use ids::{CategoryId, HighlightId, NoteId, ParseIdError, QuestionId, StudentId, SubjectId};

pub use attempt::{QuizAttemptResult, QuizScope, QuizSummary, QuizSummaryError};
pub use catalog::{CatalogError, Category, LocalizedName, Subject};
pub use difficulty::{Difficulty, ParseDifficultyError};
pub use note::{
    ImagePosition, Note, NoteDraft, NoteError, NoteImage, NotePage, NotePageDraft, ValidatedNote,
    WORDS_PER_MINUTE, count_words,
};
pub use preferences::{Highlight, PreferenceError, ReadingProgress};
pub use question::{Question, QuestionDraft, QuestionError, ValidatedQuestion};
pub use student::{Student, StudentError};
