use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::difficulty::Difficulty;
use crate::model::ids::{NoteId, QuestionId, StudentId, SubjectId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyPrompt,

    #[error("at least 2 non-empty options are required, got {count}")]
    TooFewOptions { count: usize },

    #[error("correct answer index {index} is out of range")]
    CorrectAnswerOutOfRange { index: usize },

    #[error("point value must be > 0")]
    InvalidPoints,

    #[error("time limit must be > 0 seconds when set")]
    InvalidTimeLimit,
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question input, as typed into the editor or read from an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
    pub note_id: NoteId,
    pub subject_id: SubjectId,
    pub difficulty: Difficulty,
    pub points: u32,
    pub time_limit_secs: Option<u32>,
    pub assigned_students: Vec<StudentId>,
}

impl QuestionDraft {
    /// A draft with the editor defaults: medium difficulty, one point, no time limit.
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        note_id: NoteId,
        subject_id: SubjectId,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            options,
            correct_index,
            explanation: String::new(),
            note_id,
            subject_id,
            difficulty: Difficulty::Medium,
            points: 1,
            time_limit_secs: None,
            assigned_students: Vec::new(),
        }
    }

    /// Validate the draft.
    ///
    /// Blank options are dropped and `correct_index` is remapped onto the
    /// remaining options. A correct index that points at a blank option is
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when any field is invalid.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedQuestion, QuestionError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        let mut options = Vec::with_capacity(self.options.len());
        let mut correct_index = None;
        for (idx, option) in self.options.iter().enumerate() {
            let trimmed = option.trim();
            if trimmed.is_empty() {
                continue;
            }
            if idx == self.correct_index {
                correct_index = Some(options.len());
            }
            options.push(trimmed.to_owned());
        }

        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                count: options.len(),
            });
        }
        let correct_index = correct_index.ok_or(QuestionError::CorrectAnswerOutOfRange {
            index: self.correct_index,
        })?;

        if self.points == 0 {
            return Err(QuestionError::InvalidPoints);
        }
        if self.time_limit_secs == Some(0) {
            return Err(QuestionError::InvalidTimeLimit);
        }

        let mut assigned_students = self.assigned_students;
        assigned_students.sort_unstable();
        assigned_students.dedup();

        Ok(ValidatedQuestion {
            prompt: prompt.to_owned(),
            options,
            correct_index,
            explanation: self.explanation.trim().to_owned(),
            note_id: self.note_id,
            subject_id: self.subject_id,
            difficulty: self.difficulty,
            points: self.points,
            time_limit_secs: self.time_limit_secs,
            assigned_students,
            created_at: now,
        })
    }
}

/// Question content that passed validation but has no storage id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
    note_id: NoteId,
    subject_id: SubjectId,
    difficulty: Difficulty,
    points: u32,
    time_limit_secs: Option<u32>,
    assigned_students: Vec<StudentId>,
    created_at: DateTime<Utc>,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            prompt: self.prompt,
            options: self.options,
            correct_index: self.correct_index,
            explanation: self.explanation,
            note_id: self.note_id,
            subject_id: self.subject_id,
            difficulty: self.difficulty,
            points: self.points,
            time_limit_secs: self.time_limit_secs,
            assigned_students: self.assigned_students,
            created_at: self.created_at,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question tied to a note and a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
    note_id: NoteId,
    subject_id: SubjectId,
    difficulty: Difficulty,
    points: u32,
    time_limit_secs: Option<u32>,
    assigned_students: Vec<StudentId>,
    created_at: DateTime<Utc>,
}

impl Question {
    /// Rehydrate a question from persisted storage, re-running validation.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the persisted row no longer validates.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuestionId,
        prompt: String,
        options: Vec<String>,
        correct_index: usize,
        explanation: String,
        note_id: NoteId,
        subject_id: SubjectId,
        difficulty: Difficulty,
        points: u32,
        time_limit_secs: Option<u32>,
        assigned_students: Vec<StudentId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        let draft = QuestionDraft {
            prompt,
            options,
            correct_index,
            explanation,
            note_id,
            subject_id,
            difficulty,
            points,
            time_limit_secs,
            assigned_students,
        };
        Ok(draft.validate(created_at)?.assign_id(id))
    }

    /// Replace the editable content, keeping id and creation time.
    #[must_use]
    pub fn with_content(self, validated: ValidatedQuestion) -> Self {
        let created_at = self.created_at;
        let mut updated = validated.assign_id(self.id);
        updated.created_at = created_at;
        updated
    }

    #[must_use]
    pub fn with_id(mut self, id: QuestionId) -> Self {
        self.id = id;
        self
    }

    /// Returns true when `selected` is the correct option.
    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_index
    }

    /// Notes and questions with no assigned students are visible to everyone.
    #[must_use]
    pub fn is_visible_to(&self, student: StudentId) -> bool {
        self.assigned_students.is_empty() || self.assigned_students.contains(&student)
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            prompt: self.prompt.clone(),
            options: self.options.clone(),
            correct_index: self.correct_index,
            explanation: self.explanation.clone(),
            note_id: self.note_id,
            subject_id: self.subject_id,
            difficulty: self.difficulty,
            points: self.points,
            time_limit_secs: self.time_limit_secs,
            assigned_students: self.assigned_students.clone(),
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn assigned_students(&self) -> &[StudentId] {
        &self.assigned_students
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
