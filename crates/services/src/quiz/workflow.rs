use std::sync::Arc;

use exam_core::model::{Question, QuizScope, StudentId};
use storage::repository::{
    NoteRepository, QuestionRepository, QuizRepository, SubjectRepository,
};

use super::plan::{DEFAULT_QUIZ_SIZE, QuestionSetSelector};
use super::session::{AnswerFeedback, QuizSession};
use crate::Clock;
use crate::error::QuizError;

/// Result of answering or skipping a question in a persisted quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAnswerResult {
    /// `None` when the timer had already run out and nothing was recorded.
    pub feedback: Option<AnswerFeedback>,
    pub timed_out: bool,
    pub is_complete: bool,
    pub summary_id: Option<i64>,
}

/// Orchestrates quiz start, answering, and summary persistence.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    notes: Arc<dyn NoteRepository>,
    subjects: Arc<dyn SubjectRepository>,
    quizzes: Arc<dyn QuizRepository>,
    quiz_size: usize,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        notes: Arc<dyn NoteRepository>,
        subjects: Arc<dyn SubjectRepository>,
        quizzes: Arc<dyn QuizRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            notes,
            subjects,
            quizzes,
            quiz_size: DEFAULT_QUIZ_SIZE,
        }
    }

    #[must_use]
    pub fn with_quiz_size(mut self, size: usize) -> Self {
        self.quiz_size = size;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn quiz_size(&self) -> usize {
        self.quiz_size
    }

    async fn load_pool(&self, scope: QuizScope) -> Result<Vec<Question>, QuizError> {
        let pool = match scope {
            QuizScope::All => self.questions.list_questions().await?,
            QuizScope::Note(id) => self.questions.list_questions_by_note(id).await?,
            QuizScope::Subject(id) => self.questions.list_questions_by_subject(id).await?,
        };
        Ok(pool)
    }

    async fn title_for(&self, scope: QuizScope) -> Result<String, QuizError> {
        let title = match scope {
            QuizScope::All => "Random Quiz".to_owned(),
            QuizScope::Note(id) => match self.notes.get_note(id).await? {
                Some(note) => format!("{} Quiz", note.title()),
                None => "Quiz".to_owned(),
            },
            QuizScope::Subject(id) => match self.subjects.get_subject(id).await? {
                Some(subject) => format!("{} Quiz", subject.name()),
                None => "Quiz".to_owned(),
            },
        };
        Ok(title)
    }

    /// Start a quiz for `student` drawn from `scope`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` if nothing in the scope is visible to the student.
    /// Returns `QuizError::Storage` if the pool cannot be loaded.
    pub async fn start_quiz(
        &self,
        student: StudentId,
        scope: QuizScope,
    ) -> Result<QuizSession, QuizError> {
        let pool = self.load_pool(scope).await?;
        let plan = QuestionSetSelector::new(scope)
            .with_limit(self.quiz_size)
            .for_student(student)
            .select(pool);
        if plan.is_empty() {
            log::info!("no questions available for student {student} in {scope:?}");
            return Err(QuizError::NoQuestions);
        }

        let title = self.title_for(scope).await?;
        log::info!(
            "student {student} started \"{title}\" with {} questions",
            plan.total()
        );
        QuizSession::new(student, scope, title, plan.questions, self.clock.now())
    }

    /// Answer the current question and persist the quiz once it completes.
    ///
    /// If the timer has run out the answer is discarded and the quiz is closed instead.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for session or persistence failures.
    pub async fn answer_current(
        &self,
        session: &mut QuizSession,
        selected: usize,
    ) -> Result<QuizAnswerResult, QuizError> {
        self.step(session, Some(selected)).await
    }

    /// Skip the current question; it is stored as unanswered.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for session or persistence failures.
    pub async fn skip_current(
        &self,
        session: &mut QuizSession,
    ) -> Result<QuizAnswerResult, QuizError> {
        self.step(session, None).await
    }

    async fn step(
        &self,
        session: &mut QuizSession,
        selected: Option<usize>,
    ) -> Result<QuizAnswerResult, QuizError> {
        let now = self.clock.now();
        if session.is_expired(now) {
            let summary_id = self.time_up(session).await?;
            return Ok(QuizAnswerResult {
                feedback: None,
                timed_out: true,
                is_complete: true,
                summary_id: Some(summary_id),
            });
        }

        let feedback = match selected {
            Some(option) => session.answer_current(option, now)?,
            None => session.skip_current(now)?,
        };
        if session.is_complete() {
            self.finalize_summary(session).await?;
        }

        Ok(QuizAnswerResult {
            feedback: Some(feedback),
            timed_out: false,
            is_complete: session.is_complete(),
            summary_id: session.summary_id(),
        })
    }

    /// Close the quiz because time ran out and persist it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Completed` if the quiz already finished.
    /// Returns `QuizError::Storage` if persistence fails.
    pub async fn time_up(&self, session: &mut QuizSession) -> Result<i64, QuizError> {
        session.time_up(self.clock.now())?;
        log::info!(
            "time up for student {} after {} of {} questions",
            session.student_id(),
            session.progress().answered,
            session.progress().total
        );
        self.finalize_summary(session).await
    }

    /// Persist the summary and per-question results of a completed quiz.
    ///
    /// Safe to call again after a failed append; an already stored quiz returns its id.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotComplete` if questions are still pending.
    /// Returns `QuizError::Storage` if persistence fails.
    pub async fn finalize_summary(&self, session: &mut QuizSession) -> Result<i64, QuizError> {
        if let Some(id) = session.summary_id() {
            return Ok(id);
        }
        let summary = session.build_summary()?;
        let id = self.quizzes.append_quiz(&summary, session.results()).await?;
        session.set_summary_id(id);
        log::info!(
            "student {} completed quiz {id}: {}% ({}/{})",
            summary.student_id(),
            summary.score(),
            summary.correct(),
            summary.total_questions()
        );
        Ok(id)
    }

    /// Reshuffle the same questions and start the timer again.
    pub fn restart(&self, session: &mut QuizSession) {
        session.restart(self.clock.now());
        log::debug!("student {} restarted \"{}\"", session.student_id(), session.title());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use exam_core::model::{
        NoteId, QuestionDraft, QuestionId, QuizAttemptResult, QuizSummary, SubjectId,
    };
    use exam_core::time::fixed_now;
    use std::sync::Mutex;
    use storage::repository::{InMemoryRepository, QuizSummaryRow, StorageError};

    async fn seed(repo: &InMemoryRepository, count: u64) {
        let questions: Vec<Question> = (1..=count)
            .map(|i| {
                QuestionDraft::new(
                    format!("Q{i}"),
                    vec!["a".into(), "b".into()],
                    0,
                    NoteId::new(1),
                    SubjectId::new(1),
                )
                .validate(fixed_now())
                .unwrap()
                .assign_id(QuestionId::new(i))
            })
            .collect();
        repo.insert_new_questions(&questions).await.unwrap();
    }

    fn service(repo: &InMemoryRepository, clock: Clock) -> QuizLoopService {
        let repo = Arc::new(repo.clone());
        QuizLoopService::new(clock, repo.clone(), repo.clone(), repo.clone(), repo)
    }

    #[tokio::test]
    async fn empty_pool_reports_no_questions() {
        let repo = InMemoryRepository::new();
        let service = service(&repo, Clock::Fixed(fixed_now()));
        let err = service
            .start_quiz(StudentId::new(1), QuizScope::All)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::NoQuestions));
    }

    #[tokio::test]
    async fn completing_quiz_persists_summary_once() {
        let repo = InMemoryRepository::new();
        seed(&repo, 3).await;
        let service = service(&repo, Clock::Fixed(fixed_now()));

        let mut quiz = service
            .start_quiz(StudentId::new(1), QuizScope::Note(NoteId::new(1)))
            .await
            .unwrap();
        assert_eq!(quiz.title(), "Quiz");

        let first = service.answer_current(&mut quiz, 0).await.unwrap();
        assert!(first.feedback.unwrap().is_correct);
        assert_eq!(first.summary_id, None);
        service.skip_current(&mut quiz).await.unwrap();
        let last = service.answer_current(&mut quiz, 1).await.unwrap();
        assert!(last.is_complete);
        let id = last.summary_id.unwrap();

        assert_eq!(service.finalize_summary(&mut quiz).await.unwrap(), id);
        let stored = repo.get_quiz(id).await.unwrap();
        assert_eq!(stored.summary.correct(), 1);
        assert_eq!(stored.summary.incorrect(), 1);
        assert_eq!(stored.summary.unanswered(), 1);
        assert_eq!(stored.summary.score(), 33);
        assert_eq!(repo.get_quiz_results(id).await.unwrap().len(), 3);
        assert_eq!(repo.list_all_quizzes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn answering_after_deadline_closes_the_quiz() {
        let repo = InMemoryRepository::new();
        seed(&repo, 4).await;
        let start = service(&repo, Clock::Fixed(fixed_now()));
        let mut quiz = start
            .start_quiz(StudentId::new(1), QuizScope::All)
            .await
            .unwrap();
        assert_eq!(quiz.title(), "Random Quiz");
        start.answer_current(&mut quiz, 0).await.unwrap();

        let late = start.with_clock(Clock::Fixed(fixed_now() + Duration::seconds(301)));
        let result = late.answer_current(&mut quiz, 0).await.unwrap();
        assert!(result.timed_out);
        assert!(result.feedback.is_none());

        let stored = repo.get_quiz(result.summary_id.unwrap()).await.unwrap();
        assert_eq!(stored.summary.correct(), 1);
        assert_eq!(stored.summary.unanswered(), 3);
        assert_eq!(stored.summary.time_spent_secs(), 300);
    }

    #[tokio::test]
    async fn quiz_size_limits_selection() {
        let repo = InMemoryRepository::new();
        seed(&repo, 15).await;
        let service = service(&repo, Clock::Fixed(fixed_now()));
        let quiz = service
            .start_quiz(StudentId::new(1), QuizScope::All)
            .await
            .unwrap();
        assert_eq!(quiz.questions().len(), 10);

        let quiz = service
            .with_quiz_size(5)
            .start_quiz(StudentId::new(1), QuizScope::Subject(SubjectId::new(1)))
            .await
            .unwrap();
        assert_eq!(quiz.questions().len(), 5);
    }

    struct FlakyQuizzes {
        inner: InMemoryRepository,
        fail_next: Mutex<bool>,
    }

    #[async_trait]
    impl QuizRepository for FlakyQuizzes {
        async fn append_quiz(
            &self,
            summary: &QuizSummary,
            results: &[QuizAttemptResult],
        ) -> Result<i64, StorageError> {
            let fail = std::mem::replace(&mut *self.fail_next.lock().unwrap(), false);
            if fail {
                return Err(StorageError::Connection("offline".into()));
            }
            self.inner.append_quiz(summary, results).await
        }

        async fn get_quiz(&self, id: i64) -> Result<QuizSummaryRow, StorageError> {
            self.inner.get_quiz(id).await
        }

        async fn get_quiz_results(&self, id: i64) -> Result<Vec<QuizAttemptResult>, StorageError> {
            self.inner.get_quiz_results(id).await
        }

        async fn list_student_quizzes(
            &self,
            student_id: StudentId,
            limit: u32,
        ) -> Result<Vec<QuizSummaryRow>, StorageError> {
            self.inner.list_student_quizzes(student_id, limit).await
        }

        async fn list_all_quizzes(&self) -> Result<Vec<QuizSummary>, StorageError> {
            self.inner.list_all_quizzes().await
        }
    }

    #[tokio::test]
    async fn finalize_retries_after_failed_append() {
        let repo = InMemoryRepository::new();
        seed(&repo, 1).await;
        let shared = Arc::new(repo.clone());
        let flaky = Arc::new(FlakyQuizzes {
            inner: repo.clone(),
            fail_next: Mutex::new(true),
        });
        let service = QuizLoopService::new(
            Clock::Fixed(fixed_now()),
            shared.clone(),
            shared.clone(),
            shared,
            flaky,
        );

        let mut quiz = service
            .start_quiz(StudentId::new(1), QuizScope::All)
            .await
            .unwrap();
        let err = service.answer_current(&mut quiz, 0).await.unwrap_err();
        assert!(matches!(err, QuizError::Storage(StorageError::Connection(_))));
        assert!(quiz.is_complete());
        assert_eq!(quiz.summary_id(), None);

        let id = service.finalize_summary(&mut quiz).await.unwrap();
        assert_eq!(repo.get_quiz(id).await.unwrap().summary.score(), 100);
    }
}
