use std::sync::Arc;

use exam_core::model::{QuizAttemptResult, QuizScope, StudentId};
use exam_core::progress::{PerformanceOverview, ProgressSummary};
use storage::repository::{NoteRepository, QuizRepository, QuizSummaryRow, StudentRepository};

use crate::error::ProgressServiceError;

/// A stored quiz with its per-question outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDetails {
    pub quiz: QuizSummaryRow,
    pub results: Vec<QuizAttemptResult>,
}

/// Read-only views over quiz history.
#[derive(Clone)]
pub struct ProgressService {
    quizzes: Arc<dyn QuizRepository>,
    students: Arc<dyn StudentRepository>,
    notes: Arc<dyn NoteRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        students: Arc<dyn StudentRepository>,
        notes: Arc<dyn NoteRepository>,
    ) -> Self {
        Self {
            quizzes,
            students,
            notes,
        }
    }

    /// Aggregate a student's history, optionally narrowed to a note or subject.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn student_progress(
        &self,
        student: StudentId,
        scope: QuizScope,
    ) -> Result<ProgressSummary, ProgressServiceError> {
        let summaries: Vec<_> = self
            .quizzes
            .list_student_quizzes(student, u32::MAX)
            .await?
            .into_iter()
            .map(|row| row.summary)
            .collect();
        Ok(ProgressSummary::from_summaries(&summaries, scope))
    }

    /// Most recent quizzes first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn recent_quizzes(
        &self,
        student: StudentId,
        limit: u32,
    ) -> Result<Vec<QuizSummaryRow>, ProgressServiceError> {
        Ok(self.quizzes.list_student_quizzes(student, limit).await?)
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` with `NotFound` if the quiz is missing.
    pub async fn quiz_details(&self, id: i64) -> Result<QuizDetails, ProgressServiceError> {
        let quiz = self.quizzes.get_quiz(id).await?;
        let results = self.quizzes.get_quiz_results(id).await?;
        Ok(QuizDetails { quiz, results })
    }

    /// Class-wide statistics for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn overview(&self) -> Result<PerformanceOverview, ProgressServiceError> {
        let students = self.students.list_students().await?;
        let total_notes = self.notes.count_notes().await?;
        let summaries = self.quizzes.list_all_quizzes().await?;
        Ok(PerformanceOverview::build(&students, total_notes, &summaries))
    }
}
