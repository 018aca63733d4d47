use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{NoteId, QuestionId, StudentId, SubjectId};
use crate::model::question::Question;
use crate::scoring::ScoreReport;

//
// ─── SCOPE ─────────────────────────────────────────────────────────────────────
//

/// Which part of the question pool a quiz draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum QuizScope {
    /// Random questions from every subject.
    #[default]
    All,
    Note(NoteId),
    Subject(SubjectId),
}

impl QuizScope {
    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        match self {
            QuizScope::All => true,
            QuizScope::Note(id) => question.note_id() == *id,
            QuizScope::Subject(id) => question.subject_id() == *id,
        }
    }

    /// True when a summary taken under `self` counts toward a `filter` scope.
    ///
    /// `All` as a filter accepts everything; otherwise scopes must be equal.
    #[must_use]
    pub fn within(&self, filter: QuizScope) -> bool {
        filter == QuizScope::All || *self == filter
    }

    #[must_use]
    pub fn note_id(&self) -> Option<NoteId> {
        match self {
            QuizScope::Note(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn subject_id(&self) -> Option<SubjectId> {
        match self {
            QuizScope::Subject(id) => Some(*id),
            _ => None,
        }
    }
}

//
// ─── PER-QUESTION RESULT ───────────────────────────────────────────────────────
//

/// Outcome of one submitted question. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttemptResult {
    question_id: QuestionId,
    selected: Option<usize>,
    is_correct: bool,
    time_spent_secs: u32,
}

impl QuizAttemptResult {
    /// Grade `selected` against `question`. `None` means unanswered.
    #[must_use]
    pub fn grade(question: &Question, selected: Option<usize>, time_spent_secs: u32) -> Self {
        Self {
            question_id: question.id(),
            selected,
            is_correct: selected.is_some_and(|idx| question.is_correct(idx)),
            time_spent_secs,
        }
    }

    /// Rehydrate a stored result.
    #[must_use]
    pub fn from_persisted(
        question_id: QuestionId,
        selected: Option<usize>,
        is_correct: bool,
        time_spent_secs: u32,
    ) -> Self {
        Self {
            question_id,
            selected,
            is_correct: is_correct && selected.is_some(),
            time_spent_secs,
        }
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.selected.is_some()
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.time_spent_secs
    }
}

//
// ─── QUIZ SUMMARY ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("total questions ({total}) does not match outcome counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },

    #[error("score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(u8),

    #[error("points earned ({earned}) exceed points possible ({possible})")]
    PointsOverflow { earned: u32, possible: u32 },
}

/// Persisted record of one completed quiz for a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSummary {
    student_id: StudentId,
    scope: QuizScope,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_questions: u32,
    correct: u32,
    incorrect: u32,
    unanswered: u32,
    score: u8,
    points_earned: u32,
    points_possible: u32,
    time_spent_secs: u32,
}

impl QuizSummary {
    /// Rehydrate a quiz summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizSummaryError` if counts, score, or times do not line up.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        student_id: StudentId,
        scope: QuizScope,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_questions: u32,
        correct: u32,
        incorrect: u32,
        unanswered: u32,
        score: u8,
        points_earned: u32,
        points_possible: u32,
        time_spent_secs: u32,
    ) -> Result<Self, QuizSummaryError> {
        if completed_at < started_at {
            return Err(QuizSummaryError::InvalidTimeRange);
        }
        let sum = correct
            .saturating_add(incorrect)
            .saturating_add(unanswered);
        if sum != total_questions {
            return Err(QuizSummaryError::CountMismatch {
                total: total_questions,
                sum,
            });
        }
        if score > 100 {
            return Err(QuizSummaryError::ScoreOutOfRange(score));
        }
        if points_earned > points_possible {
            return Err(QuizSummaryError::PointsOverflow {
                earned: points_earned,
                possible: points_possible,
            });
        }

        Ok(Self {
            student_id,
            scope,
            started_at,
            completed_at,
            total_questions,
            correct,
            incorrect,
            unanswered,
            score,
            points_earned,
            points_possible,
            time_spent_secs,
        })
    }

    /// Build a summary from a scored quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    pub fn from_report(
        student_id: StudentId,
        scope: QuizScope,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        report: &ScoreReport,
        time_spent_secs: u32,
    ) -> Result<Self, QuizSummaryError> {
        Self::from_persisted(
            student_id,
            scope,
            started_at,
            completed_at,
            report.total,
            report.correct,
            report.incorrect,
            report.unanswered,
            report.score,
            report.points_earned,
            report.points_possible,
            time_spent_secs,
        )
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn scope(&self) -> QuizScope {
        self.scope
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn unanswered(&self) -> u32 {
        self.unanswered
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn points_earned(&self) -> u32 {
        self.points_earned
    }

    #[must_use]
    pub fn points_possible(&self) -> u32 {
        self.points_possible
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.time_spent_secs
    }
}
