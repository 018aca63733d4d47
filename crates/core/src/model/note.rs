use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::difficulty::Difficulty;
use crate::model::ids::{CategoryId, NoteId, StudentId, SubjectId};

/// Reading speed used to estimate read time when none is given.
pub const WORDS_PER_MINUTE: usize = 200;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NoteError {
    #[error("note title cannot be empty")]
    EmptyTitle,

    #[error("note must have at least one page")]
    NoPages,

    #[error("page {page_number} has no content")]
    EmptyPage { page_number: u32 },

    #[error("invalid image URL: {0}")]
    InvalidImageUrl(String),

    #[error("too many pages: {count}")]
    TooManyPages { count: usize },
}

//
// ─── PAGES ─────────────────────────────────────────────────────────────────────
//

/// Where an image sits relative to the page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePosition {
    Top,
    Middle,
    Bottom,
    #[default]
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteImage {
    pub url: Url,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default)]
    pub position: ImagePosition,
}

impl NoteImage {
    /// # Errors
    ///
    /// Returns `NoteError::InvalidImageUrl` if `url` does not parse.
    pub fn new(
        url: &str,
        alt: impl Into<String>,
        caption: Option<String>,
        position: ImagePosition,
    ) -> Result<Self, NoteError> {
        let url = Url::parse(url.trim()).map_err(|_| NoteError::InvalidImageUrl(url.to_owned()))?;
        Ok(Self {
            url,
            alt: alt.into(),
            caption: caption.filter(|c| !c.trim().is_empty()),
            position,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePageDraft {
    pub content: String,
    pub images: Vec<NoteImage>,
}

impl NotePageDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            images: Vec::new(),
        }
    }
}

/// One page of a note. Page numbers start at 1 and follow page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePage {
    pub page_number: u32,
    pub content: String,
    #[serde(default)]
    pub images: Vec<NoteImage>,
}

impl NotePage {
    #[must_use]
    pub fn word_count(&self) -> usize {
        count_words(&self.content)
    }
}

/// Number of whitespace-separated words in `text`.
#[must_use]
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub title_en: Option<String>,
    pub title_si: Option<String>,
    pub subject_id: SubjectId,
    pub category_id: CategoryId,
    pub pages: Vec<NotePageDraft>,
    pub difficulty: Difficulty,
    /// Minutes; `0` means derive from the word count.
    pub estimated_read_time: u32,
    pub tags: Vec<String>,
    pub assigned_students: Vec<StudentId>,
    pub created_by: String,
}

impl NoteDraft {
    pub fn new(
        title: impl Into<String>,
        subject_id: SubjectId,
        category_id: CategoryId,
        pages: Vec<NotePageDraft>,
    ) -> Self {
        Self {
            title: title.into(),
            title_en: None,
            title_si: None,
            subject_id,
            category_id,
            pages,
            difficulty: Difficulty::Medium,
            estimated_read_time: 0,
            tags: Vec::new(),
            assigned_students: Vec::new(),
            created_by: "admin".to_owned(),
        }
    }

    /// # Errors
    ///
    /// Returns `NoteError` if the title is blank, there are no pages, or a
    /// page has no text.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedNote, NoteError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(NoteError::EmptyTitle);
        }
        if self.pages.is_empty() {
            return Err(NoteError::NoPages);
        }

        let mut pages = Vec::with_capacity(self.pages.len());
        for (idx, page) in self.pages.into_iter().enumerate() {
            let page_number = u32::try_from(idx + 1)
                .map_err(|_| NoteError::TooManyPages { count: idx + 1 })?;
            if page.content.trim().is_empty() {
                return Err(NoteError::EmptyPage { page_number });
            }
            pages.push(NotePage {
                page_number,
                content: page.content,
                images: page.images,
            });
        }

        let estimated_read_time = if self.estimated_read_time == 0 {
            let words: usize = pages.iter().map(NotePage::word_count).sum();
            u32::try_from(words.div_ceil(WORDS_PER_MINUTE).max(1)).unwrap_or(u32::MAX)
        } else {
            self.estimated_read_time
        };

        let mut tags: Vec<String> = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();
        tags.dedup();

        let mut assigned_students = self.assigned_students;
        assigned_students.sort_unstable();
        assigned_students.dedup();

        let title_en = self
            .title_en
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title.clone());
        let title_si = self
            .title_si
            .map(|t| t.trim().to_owned())
            .unwrap_or_default();

        Ok(ValidatedNote {
            title,
            title_en,
            title_si,
            subject_id: self.subject_id,
            category_id: self.category_id,
            pages,
            difficulty: self.difficulty,
            estimated_read_time,
            tags,
            assigned_students,
            created_by: self.created_by,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedNote {
    title: String,
    title_en: String,
    title_si: String,
    subject_id: SubjectId,
    category_id: CategoryId,
    pages: Vec<NotePage>,
    difficulty: Difficulty,
    estimated_read_time: u32,
    tags: Vec<String>,
    assigned_students: Vec<StudentId>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl ValidatedNote {
    #[must_use]
    pub fn assign_id(self, id: NoteId) -> Note {
        Note {
            id,
            title: self.title,
            title_en: self.title_en,
            title_si: self.title_si,
            subject_id: self.subject_id,
            category_id: self.category_id,
            pages: self.pages,
            difficulty: self.difficulty,
            estimated_read_time: self.estimated_read_time,
            tags: self.tags,
            assigned_students: self.assigned_students,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

//
// ─── NOTE ──────────────────────────────────────────────────────────────────────
//

/// A study document made of ordered pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    id: NoteId,
    title: String,
    title_en: String,
    title_si: String,
    subject_id: SubjectId,
    category_id: CategoryId,
    pages: Vec<NotePage>,
    difficulty: Difficulty,
    estimated_read_time: u32,
    tags: Vec<String>,
    assigned_students: Vec<StudentId>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Note {
    /// Rehydrate a note from storage.
    ///
    /// # Errors
    ///
    /// Returns `NoteError` if the persisted pages no longer validate.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: NoteId,
        title: String,
        title_en: String,
        title_si: String,
        subject_id: SubjectId,
        category_id: CategoryId,
        pages: Vec<NotePage>,
        difficulty: Difficulty,
        estimated_read_time: u32,
        tags: Vec<String>,
        assigned_students: Vec<StudentId>,
        created_by: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, NoteError> {
        let mut pages = pages;
        pages.sort_by_key(|p| p.page_number);
        let draft = NoteDraft {
            title,
            title_en: Some(title_en),
            title_si: Some(title_si),
            subject_id,
            category_id,
            pages: pages
                .into_iter()
                .map(|p| NotePageDraft {
                    content: p.content,
                    images: p.images,
                })
                .collect(),
            difficulty,
            estimated_read_time,
            tags,
            assigned_students,
            created_by,
        };
        let mut note = draft.validate(created_at)?.assign_id(id);
        note.updated_at = updated_at;
        Ok(note)
    }

    /// Replace the editable content, keeping id, author, and creation time.
    #[must_use]
    pub fn with_content(self, validated: ValidatedNote, updated_at: DateTime<Utc>) -> Self {
        let mut note = validated.assign_id(self.id);
        note.created_by = self.created_by;
        note.created_at = self.created_at;
        note.updated_at = updated_at;
        note
    }

    #[must_use]
    pub fn with_id(mut self, id: NoteId) -> Self {
        self.id = id;
        self
    }

    /// Notes with no assigned students are visible to everyone.
    #[must_use]
    pub fn is_visible_to(&self, student: StudentId) -> bool {
        self.assigned_students.is_empty() || self.assigned_students.contains(&student)
    }

    #[must_use]
    pub fn page(&self, page_number: u32) -> Option<&NotePage> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.pages.iter().map(NotePage::word_count).sum()
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> NoteId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn title_en(&self) -> &str {
        &self.title_en
    }

    #[must_use]
    pub fn title_si(&self) -> &str {
        &self.title_si
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    #[must_use]
    pub fn pages(&self) -> &[NotePage] {
        &self.pages
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn estimated_read_time(&self) -> u32 {
        self.estimated_read_time
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn assigned_students(&self) -> &[StudentId] {
        &self.assigned_students
    }

    #[must_use]
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
