use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::import::ImportService;
use crate::note_service::NoteService;
use crate::preferences_service::PreferencesService;
use crate::progress_service::ProgressService;
use crate::question_service::QuestionService;
use crate::quiz::{DEFAULT_QUIZ_SIZE, QuizLoopService};
use crate::student_service::StudentService;

/// Assembles every service over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    notes: Arc<NoteService>,
    questions: Arc<QuestionService>,
    students: Arc<StudentService>,
    import: Arc<ImportService>,
    quiz_loop: Arc<QuizLoopService>,
    progress: Arc<ProgressService>,
    preferences: Arc<PreferencesService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        quiz_size: usize,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        log::debug!("opened storage at {db_url}");
        Ok(Self::from_storage(&storage, clock, quiz_size))
    }

    /// Build services over in-memory storage with the default quiz size.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, DEFAULT_QUIZ_SIZE)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, quiz_size: usize) -> Self {
        let catalog = Arc::new(CatalogService::new(
            clock,
            Arc::clone(&storage.categories),
            Arc::clone(&storage.subjects),
        ));
        let notes = Arc::new(NoteService::new(
            clock,
            Arc::clone(&storage.notes),
            Arc::clone(&storage.preferences),
        ));
        let questions = Arc::new(QuestionService::new(clock, Arc::clone(&storage.questions)));
        let students = Arc::new(StudentService::new(clock, Arc::clone(&storage.students)));
        let import = Arc::new(ImportService::new(
            clock,
            Arc::clone(&storage.notes),
            Arc::clone(&storage.questions),
        ));
        let quiz_loop = Arc::new(
            QuizLoopService::new(
                clock,
                Arc::clone(&storage.questions),
                Arc::clone(&storage.notes),
                Arc::clone(&storage.subjects),
                Arc::clone(&storage.quizzes),
            )
            .with_quiz_size(quiz_size),
        );
        let progress = Arc::new(ProgressService::new(
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.students),
            Arc::clone(&storage.notes),
        ));
        let preferences = Arc::new(PreferencesService::new(
            clock,
            Arc::clone(&storage.notes),
            Arc::clone(&storage.preferences),
        ));

        Self {
            catalog,
            notes,
            questions,
            students,
            import,
            quiz_loop,
            progress,
            preferences,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn notes(&self) -> Arc<NoteService> {
        Arc::clone(&self.notes)
    }

    #[must_use]
    pub fn questions(&self) -> Arc<QuestionService> {
        Arc::clone(&self.questions)
    }

    #[must_use]
    pub fn students(&self) -> Arc<StudentService> {
        Arc::clone(&self.students)
    }

    #[must_use]
    pub fn import(&self) -> Arc<ImportService> {
        Arc::clone(&self.import)
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn preferences(&self) -> Arc<PreferencesService> {
        Arc::clone(&self.preferences)
    }
}
