use async_trait::async_trait;
use exam_core::model::{
    Category, CategoryId, Highlight, HighlightId, Note, NoteId, Question, QuestionId,
    QuizAttemptResult, QuizSummary, ReadingProgress, Student, StudentId, Subject, SubjectId,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A stored quiz summary together with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSummaryRow {
    pub id: i64,
    pub summary: QuizSummary,
}

impl QuizSummaryRow {
    #[must_use]
    pub fn new(id: i64, summary: QuizSummary) -> Self {
        Self { id, summary }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert a new category; the id on `category` is ignored and a fresh one returned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the category cannot be stored.
    async fn insert_new_category(&self, category: &Category) -> Result<CategoryId, StorageError>;

    /// Persist or update a category under its own id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the category cannot be stored.
    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing row is `Ok(None)`.
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the category does not exist.
    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError>;
}

/// Repository contract for subjects.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Insert a new subject; the id on `subject` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn insert_new_subject(&self, subject: &Subject) -> Result<SubjectId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing row is `Ok(None)`.
    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_subjects_by_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Subject>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject does not exist.
    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError>;
}

/// Repository contract for notes.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert notes in one batch; ids on the inputs are ignored.
    ///
    /// Either every note is stored or none is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any note cannot be stored.
    async fn insert_new_notes(&self, notes: &[Note]) -> Result<Vec<NoteId>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the note cannot be stored.
    async fn upsert_note(&self, note: &Note) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing row is `Ok(None)`.
    async fn get_note(&self, id: NoteId) -> Result<Option<Note>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_notes(&self) -> Result<Vec<Note>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_notes(&self) -> Result<u32, StorageError>;

    /// Delete a note along with its questions and every student's bookmarks,
    /// highlights, and reading progress on it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the note does not exist.
    async fn delete_note(&self, id: NoteId) -> Result<(), StorageError>;
}

/// Repository contract for quiz questions.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert questions in one batch; ids on the inputs are ignored.
    ///
    /// Either every question is stored or none is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any question cannot be stored.
    async fn insert_new_questions(
        &self,
        questions: &[Question],
    ) -> Result<Vec<QuestionId>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing row is `Ok(None)`.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions_by_note(&self, note_id: NoteId) -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions_by_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError>;
}

/// Repository contract for student records.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Insert a new student; the id on `student` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already taken.
    async fn insert_new_student(&self, student: &Student) -> Result<StudentId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email belongs to another student.
    async fn upsert_student(&self, student: &Student) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing row is `Ok(None)`.
    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StorageError>;

    /// Look up a student by normalized (lowercase) email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_students(&self) -> Result<Vec<Student>, StorageError>;
}

/// Repository contract for completed quizzes.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Store a summary and its per-question results atomically. Returns the summary id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if persistence fails.
    async fn append_quiz(
        &self,
        summary: &QuizSummary,
        results: &[QuizAttemptResult],
    ) -> Result<i64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_quiz(&self, id: i64) -> Result<QuizSummaryRow, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the summary is missing.
    async fn get_quiz_results(&self, id: i64) -> Result<Vec<QuizAttemptResult>, StorageError>;

    /// Most recent first, at most `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_student_quizzes(
        &self,
        student_id: StudentId,
        limit: u32,
    ) -> Result<Vec<QuizSummaryRow>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_all_quizzes(&self) -> Result<Vec<QuizSummary>, StorageError>;
}

/// Repository contract for per-student reading state.
#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn set_bookmark(
        &self,
        student_id: StudentId,
        note_id: NoteId,
        bookmarked: bool,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_bookmarks(&self, student_id: StudentId) -> Result<Vec<NoteId>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the highlight id already exists.
    async fn add_highlight(&self, highlight: &Highlight) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_highlights(
        &self,
        student_id: StudentId,
        note_id: NoteId,
    ) -> Result<Vec<Highlight>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the student has no such highlight.
    async fn delete_highlight(
        &self,
        student_id: StudentId,
        id: HighlightId,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn save_reading_progress(&self, progress: &ReadingProgress) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_reading_progress(
        &self,
        student_id: StudentId,
        note_id: NoteId,
    ) -> Result<Option<ReadingProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_reading_progress(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ReadingProgress>, StorageError>;
}

//
// ─── IN MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct QuizStore {
    next_id: i64,
    summaries: BTreeMap<i64, QuizSummary>,
    results: HashMap<i64, Vec<QuizAttemptResult>>,
}

#[derive(Default)]
struct PreferenceStore {
    bookmarks: HashMap<StudentId, BTreeSet<NoteId>>,
    highlights: Vec<Highlight>,
    reading: HashMap<(StudentId, NoteId), ReadingProgress>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    categories: Arc<Mutex<BTreeMap<CategoryId, Category>>>,
    subjects: Arc<Mutex<BTreeMap<SubjectId, Subject>>>,
    notes: Arc<Mutex<BTreeMap<NoteId, Note>>>,
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    students: Arc<Mutex<BTreeMap<StudentId, Student>>>,
    quizzes: Arc<Mutex<QuizStore>>,
    preferences: Arc<Mutex<PreferenceStore>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

fn next_key<K, V>(map: &BTreeMap<K, V>, value: impl Fn(&K) -> u64) -> u64 {
    map.keys().next_back().map_or(1, |k| value(k) + 1)
}

#[async_trait]
impl CategoryRepository for InMemoryRepository {
    async fn insert_new_category(&self, category: &Category) -> Result<CategoryId, StorageError> {
        let mut guard = lock(&self.categories)?;
        let id = CategoryId::new(next_key(&guard, CategoryId::value));
        guard.insert(id, category.clone().with_id(id));
        Ok(id)
    }

    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError> {
        lock(&self.categories)?.insert(category.id(), category.clone());
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StorageError> {
        Ok(lock(&self.categories)?.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        Ok(lock(&self.categories)?.values().cloned().collect())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError> {
        if lock(&self.subjects)?
            .values()
            .any(|s| s.category_id() == id)
        {
            return Err(StorageError::Conflict);
        }
        lock(&self.categories)?
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn insert_new_subject(&self, subject: &Subject) -> Result<SubjectId, StorageError> {
        let mut guard = lock(&self.subjects)?;
        let id = SubjectId::new(next_key(&guard, SubjectId::value));
        guard.insert(id, subject.clone().with_id(id));
        Ok(id)
    }

    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        lock(&self.subjects)?.insert(subject.id(), subject.clone());
        Ok(())
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        Ok(lock(&self.subjects)?.get(&id).cloned())
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        Ok(lock(&self.subjects)?.values().cloned().collect())
    }

    async fn list_subjects_by_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Subject>, StorageError> {
        Ok(lock(&self.subjects)?
            .values()
            .filter(|s| s.category_id() == category_id)
            .cloned()
            .collect())
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        lock(&self.subjects)?
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl NoteRepository for InMemoryRepository {
    async fn insert_new_notes(&self, notes: &[Note]) -> Result<Vec<NoteId>, StorageError> {
        let mut guard = lock(&self.notes)?;
        let mut ids = Vec::with_capacity(notes.len());
        for note in notes {
            let id = NoteId::new(next_key(&guard, NoteId::value));
            guard.insert(id, note.clone().with_id(id));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn upsert_note(&self, note: &Note) -> Result<(), StorageError> {
        lock(&self.notes)?.insert(note.id(), note.clone());
        Ok(())
    }

    async fn get_note(&self, id: NoteId) -> Result<Option<Note>, StorageError> {
        Ok(lock(&self.notes)?.get(&id).cloned())
    }

    async fn list_notes(&self) -> Result<Vec<Note>, StorageError> {
        Ok(lock(&self.notes)?.values().cloned().collect())
    }

    async fn count_notes(&self) -> Result<u32, StorageError> {
        let len = lock(&self.notes)?.len();
        u32::try_from(len).map_err(|_| StorageError::Serialization("note count overflow".into()))
    }

    async fn delete_note(&self, id: NoteId) -> Result<(), StorageError> {
        let mut notes = lock(&self.notes)?;
        let mut questions = lock(&self.questions)?;
        let mut preferences = lock(&self.preferences)?;
        notes.remove(&id).ok_or(StorageError::NotFound)?;

        questions.retain(|_, q| q.note_id() != id);
        for set in preferences.bookmarks.values_mut() {
            set.remove(&id);
        }
        preferences.highlights.retain(|h| h.note_id() != id);
        preferences.reading.retain(|(_, note), _| *note != id);
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_new_questions(
        &self,
        questions: &[Question],
    ) -> Result<Vec<QuestionId>, StorageError> {
        let mut guard = lock(&self.questions)?;
        let mut ids = Vec::with_capacity(questions.len());
        for question in questions {
            let id = QuestionId::new(next_key(&guard, QuestionId::value));
            guard.insert(id, question.clone().with_id(id));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        lock(&self.questions)?.insert(question.id(), question.clone());
        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        Ok(lock(&self.questions)?.get(&id).cloned())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        Ok(lock(&self.questions)?.values().cloned().collect())
    }

    async fn list_questions_by_note(&self, note_id: NoteId) -> Result<Vec<Question>, StorageError> {
        Ok(lock(&self.questions)?
            .values()
            .filter(|q| q.note_id() == note_id)
            .cloned()
            .collect())
    }

    async fn list_questions_by_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<Question>, StorageError> {
        Ok(lock(&self.questions)?
            .values()
            .filter(|q| q.subject_id() == subject_id)
            .cloned()
            .collect())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        lock(&self.questions)?
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl StudentRepository for InMemoryRepository {
    async fn insert_new_student(&self, student: &Student) -> Result<StudentId, StorageError> {
        let mut guard = lock(&self.students)?;
        if guard.values().any(|s| s.email() == student.email()) {
            return Err(StorageError::Conflict);
        }
        let id = StudentId::new(next_key(&guard, StudentId::value));
        guard.insert(id, student.clone().with_id(id));
        Ok(id)
    }

    async fn upsert_student(&self, student: &Student) -> Result<(), StorageError> {
        let mut guard = lock(&self.students)?;
        if guard
            .values()
            .any(|s| s.email() == student.email() && s.id() != student.id())
        {
            return Err(StorageError::Conflict);
        }
        guard.insert(student.id(), student.clone());
        Ok(())
    }

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StorageError> {
        Ok(lock(&self.students)?.get(&id).cloned())
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StorageError> {
        let email = email.trim().to_lowercase();
        Ok(lock(&self.students)?
            .values()
            .find(|s| s.email() == email)
            .cloned())
    }

    async fn list_students(&self) -> Result<Vec<Student>, StorageError> {
        Ok(lock(&self.students)?.values().cloned().collect())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn append_quiz(
        &self,
        summary: &QuizSummary,
        results: &[QuizAttemptResult],
    ) -> Result<i64, StorageError> {
        let mut guard = lock(&self.quizzes)?;
        guard.next_id += 1;
        let id = guard.next_id;
        guard.summaries.insert(id, summary.clone());
        guard.results.insert(id, results.to_vec());
        Ok(id)
    }

    async fn get_quiz(&self, id: i64) -> Result<QuizSummaryRow, StorageError> {
        let guard = lock(&self.quizzes)?;
        guard
            .summaries
            .get(&id)
            .map(|s| QuizSummaryRow::new(id, s.clone()))
            .ok_or(StorageError::NotFound)
    }

    async fn get_quiz_results(&self, id: i64) -> Result<Vec<QuizAttemptResult>, StorageError> {
        let guard = lock(&self.quizzes)?;
        guard.results.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_student_quizzes(
        &self,
        student_id: StudentId,
        limit: u32,
    ) -> Result<Vec<QuizSummaryRow>, StorageError> {
        let guard = lock(&self.quizzes)?;
        let mut rows: Vec<QuizSummaryRow> = guard
            .summaries
            .iter()
            .filter(|(_, s)| s.student_id() == student_id)
            .map(|(id, s)| QuizSummaryRow::new(*id, s.clone()))
            .collect();
        rows.sort_by(|a, b| {
            b.summary
                .completed_at()
                .cmp(&a.summary.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn list_all_quizzes(&self) -> Result<Vec<QuizSummary>, StorageError> {
        Ok(lock(&self.quizzes)?.summaries.values().cloned().collect())
    }
}

#[async_trait]
impl PreferencesRepository for InMemoryRepository {
    async fn set_bookmark(
        &self,
        student_id: StudentId,
        note_id: NoteId,
        bookmarked: bool,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.preferences)?;
        let set = guard.bookmarks.entry(student_id).or_default();
        if bookmarked {
            set.insert(note_id);
        } else {
            set.remove(&note_id);
        }
        Ok(())
    }

    async fn list_bookmarks(&self, student_id: StudentId) -> Result<Vec<NoteId>, StorageError> {
        let guard = lock(&self.preferences)?;
        Ok(guard
            .bookmarks
            .get(&student_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn add_highlight(&self, highlight: &Highlight) -> Result<(), StorageError> {
        let mut guard = lock(&self.preferences)?;
        if guard.highlights.iter().any(|h| h.id() == highlight.id()) {
            return Err(StorageError::Conflict);
        }
        guard.highlights.push(highlight.clone());
        Ok(())
    }

    async fn list_highlights(
        &self,
        student_id: StudentId,
        note_id: NoteId,
    ) -> Result<Vec<Highlight>, StorageError> {
        let guard = lock(&self.preferences)?;
        let mut out: Vec<Highlight> = guard
            .highlights
            .iter()
            .filter(|h| h.student_id() == student_id && h.note_id() == note_id)
            .cloned()
            .collect();
        out.sort_by_key(|h| (h.page_number(), h.start_offset()));
        Ok(out)
    }

    async fn delete_highlight(
        &self,
        student_id: StudentId,
        id: HighlightId,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.preferences)?;
        let before = guard.highlights.len();
        guard
            .highlights
            .retain(|h| !(h.id() == id && h.student_id() == student_id));
        if guard.highlights.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn save_reading_progress(&self, progress: &ReadingProgress) -> Result<(), StorageError> {
        lock(&self.preferences)?
            .reading
            .insert((progress.student_id(), progress.note_id()), progress.clone());
        Ok(())
    }

    async fn get_reading_progress(
        &self,
        student_id: StudentId,
        note_id: NoteId,
    ) -> Result<Option<ReadingProgress>, StorageError> {
        Ok(lock(&self.preferences)?
            .reading
            .get(&(student_id, note_id))
            .cloned())
    }

    async fn list_reading_progress(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ReadingProgress>, StorageError> {
        let guard = lock(&self.preferences)?;
        let mut out: Vec<ReadingProgress> = guard
            .reading
            .values()
            .filter(|p| p.student_id() == student_id)
            .cloned()
            .collect();
        out.sort_by_key(ReadingProgress::note_id);
        Ok(out)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub categories: Arc<dyn CategoryRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub preferences: Arc<dyn PreferencesRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Use one repository value for every contract.
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CategoryRepository
            + SubjectRepository
            + NoteRepository
            + QuestionRepository
            + StudentRepository
            + QuizRepository
            + PreferencesRepository
            + Clone
            + 'static,
    {
        Self {
            categories: Arc::new(repo.clone()),
            subjects: Arc::new(repo.clone()),
            notes: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            students: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            preferences: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{
        LocalizedName, NoteDraft, NotePageDraft, QuestionDraft, QuizScope,
    };
    use exam_core::time::fixed_now;

    fn build_question(note: u64, subject: u64) -> Question {
        QuestionDraft::new(
            "What is 2 + 2?",
            vec!["3".into(), "4".into()],
            1,
            NoteId::new(note),
            SubjectId::new(subject),
        )
        .validate(fixed_now())
        .unwrap()
        .assign_id(QuestionId::new(1))
    }

    fn build_note() -> Note {
        NoteDraft::new(
            "Motion",
            SubjectId::new(1),
            CategoryId::new(1),
            vec![NotePageDraft::text("Velocity is speed with direction.")],
        )
        .validate(fixed_now())
        .unwrap()
        .assign_id(NoteId::new(1))
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let repo = InMemoryRepository::new();
        let ids = repo
            .insert_new_questions(&[build_question(1, 1), build_question(1, 2)])
            .await
            .unwrap();
        assert_eq!(ids, [QuestionId::new(1), QuestionId::new(2)]);

        let by_subject = repo.list_questions_by_subject(SubjectId::new(2)).await.unwrap();
        assert_eq!(by_subject.len(), 1);
        assert_eq!(by_subject[0].id(), QuestionId::new(2));
    }

    #[tokio::test]
    async fn deleting_note_removes_its_questions() {
        let repo = InMemoryRepository::new();
        let note_ids = repo.insert_new_notes(&[build_note()]).await.unwrap();
        repo.insert_new_questions(&[build_question(note_ids[0].value(), 1), build_question(99, 1)])
            .await
            .unwrap();

        repo.delete_note(note_ids[0]).await.unwrap();
        let left = repo.list_questions().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].note_id(), NoteId::new(99));
        assert!(matches!(
            repo.delete_note(note_ids[0]).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deleting_note_clears_reading_state() {
        let repo = InMemoryRepository::new();
        let note_ids = repo.insert_new_notes(&[build_note()]).await.unwrap();
        let note = note_ids[0];
        let student = StudentId::new(1);

        repo.set_bookmark(student, note, true).await.unwrap();
        repo.set_bookmark(student, NoteId::new(7), true).await.unwrap();
        let highlight = Highlight::new(
            HighlightId::random(),
            student,
            note,
            1,
            "Velocity",
            0,
            8,
            "yellow",
            None,
            fixed_now(),
        )
        .unwrap();
        repo.add_highlight(&highlight).await.unwrap();
        let progress = ReadingProgress::new(student, note, 0, 1, 60, 200, fixed_now()).unwrap();
        repo.save_reading_progress(&progress).await.unwrap();

        repo.delete_note(note).await.unwrap();
        assert_eq!(repo.list_bookmarks(student).await.unwrap(), [NoteId::new(7)]);
        assert!(repo.list_highlights(student, note).await.unwrap().is_empty());
        assert!(repo.get_reading_progress(student, note).await.unwrap().is_none());
        assert!(repo.list_reading_progress(student).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn category_with_subjects_cannot_be_deleted() {
        let repo = InMemoryRepository::new();
        let category = Category::new(
            CategoryId::new(1),
            LocalizedName::new("Science", None, None).unwrap(),
            "",
            None,
            fixed_now(),
        )
        .unwrap();
        let cat_id = repo.insert_new_category(&category).await.unwrap();
        let subject = Subject::new(
            SubjectId::new(1),
            cat_id,
            LocalizedName::new("Physics", None, None).unwrap(),
            "",
            None,
            fixed_now(),
            fixed_now(),
        )
        .unwrap();
        let subject_id = repo.insert_new_subject(&subject).await.unwrap();

        assert!(matches!(
            repo.delete_category(cat_id).await,
            Err(StorageError::Conflict)
        ));
        repo.delete_subject(subject_id).await.unwrap();
        repo.delete_category(cat_id).await.unwrap();
        assert!(repo.get_category(cat_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_student_email_conflicts() {
        let repo = InMemoryRepository::new();
        let student =
            Student::new(StudentId::new(1), "Student", "student@elms.lk", fixed_now()).unwrap();
        repo.insert_new_student(&student).await.unwrap();
        assert!(matches!(
            repo.insert_new_student(&student).await,
            Err(StorageError::Conflict)
        ));
        let found = repo.find_student_by_email("STUDENT@elms.lk").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn quizzes_list_newest_first() {
        let repo = InMemoryRepository::new();
        let student = StudentId::new(4);
        for minutes in [0_i64, 30, 10] {
            let started = fixed_now() + chrono::Duration::minutes(minutes);
            let summary = QuizSummary::from_persisted(
                student,
                QuizScope::All,
                started,
                started,
                1,
                1,
                0,
                0,
                100,
                1,
                1,
                0,
            )
            .unwrap();
            repo.append_quiz(&summary, &[]).await.unwrap();
        }
        let rows = repo.list_student_quizzes(student, 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 2);
        assert_eq!(rows[1].id, 3);
        assert!(repo.get_quiz_results(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bookmarks_toggle_per_student() {
        let repo = InMemoryRepository::new();
        let s = StudentId::new(1);
        repo.set_bookmark(s, NoteId::new(3), true).await.unwrap();
        repo.set_bookmark(s, NoteId::new(1), true).await.unwrap();
        repo.set_bookmark(s, NoteId::new(3), false).await.unwrap();
        assert_eq!(repo.list_bookmarks(s).await.unwrap(), [NoteId::new(1)]);
        assert!(repo.list_bookmarks(StudentId::new(2)).await.unwrap().is_empty());
    }
}
