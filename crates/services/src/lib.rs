#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod import;
pub mod note_service;
pub mod preferences_service;
pub mod progress_service;
pub mod question_service;
pub mod quiz;
pub mod render;
pub mod student_service;

pub use exam_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::{CatalogEntryInput, CatalogService};
pub use error::{
    AppServicesError, CatalogServiceError, ImportError, NoteServiceError,
    PreferencesServiceError, ProgressServiceError, QuestionServiceError, QuizError,
    StudentServiceError,
};
pub use import::ImportService;
pub use note_service::{NoteService, RenderedPage};
pub use preferences_service::{HighlightInput, PreferencesService};
pub use progress_service::{ProgressService, QuizDetails};
pub use question_service::QuestionService;
pub use quiz::{
    AnswerFeedback, QuestionSetSelector, QuizAnswerResult, QuizLoopService, QuizPlan,
    QuizProgress, QuizSession,
};
pub use student_service::StudentService;
