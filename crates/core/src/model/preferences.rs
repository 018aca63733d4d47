use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{HighlightId, NoteId, StudentId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PreferenceError {
    #[error("highlight text cannot be empty")]
    EmptyHighlight,

    #[error("highlight range is empty or reversed ({start}..{end})")]
    InvalidRange { start: u32, end: u32 },

    #[error("highlight color cannot be empty")]
    EmptyColor,

    #[error("note has no pages")]
    NoPages,

    #[error("page {page} is out of range for {total} pages")]
    PageOutOfRange { page: u32, total: u32 },
}

//
// ─── HIGHLIGHT ─────────────────────────────────────────────────────────────────
//

/// A text range a student marked on a note page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    id: HighlightId,
    student_id: StudentId,
    note_id: NoteId,
    page_number: u32,
    text: String,
    start_offset: u32,
    end_offset: u32,
    color: String,
    annotation: Option<String>,
    created_at: DateTime<Utc>,
}

impl Highlight {
    /// # Errors
    ///
    /// Returns `PreferenceError` for blank text or color, or an empty range.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: HighlightId,
        student_id: StudentId,
        note_id: NoteId,
        page_number: u32,
        text: impl Into<String>,
        start_offset: u32,
        end_offset: u32,
        color: impl Into<String>,
        annotation: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PreferenceError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PreferenceError::EmptyHighlight);
        }
        if start_offset >= end_offset {
            return Err(PreferenceError::InvalidRange {
                start: start_offset,
                end: end_offset,
            });
        }
        let color = color.into().trim().to_owned();
        if color.is_empty() {
            return Err(PreferenceError::EmptyColor);
        }
        let annotation = annotation
            .map(|a| a.trim().to_owned())
            .filter(|a| !a.is_empty());

        Ok(Self {
            id,
            student_id,
            note_id,
            page_number,
            text,
            start_offset,
            end_offset,
            color,
            annotation,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> HighlightId {
        self.id
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    #[must_use]
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn start_offset(&self) -> u32 {
        self.start_offset
    }

    #[must_use]
    pub fn end_offset(&self) -> u32 {
        self.end_offset
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    #[must_use]
    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── READING PROGRESS ──────────────────────────────────────────────────────────
//

/// Where a student is in a note and how long they have read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingProgress {
    student_id: StudentId,
    note_id: NoteId,
    current_page: u32,
    total_pages: u32,
    reading_time_secs: u32,
    words_read: u32,
    last_read: DateTime<Utc>,
}

impl ReadingProgress {
    /// `current_page` is 0-based.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError` if `total_pages` is 0 or `current_page` is past the end.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        student_id: StudentId,
        note_id: NoteId,
        current_page: u32,
        total_pages: u32,
        reading_time_secs: u32,
        words_read: u32,
        last_read: DateTime<Utc>,
    ) -> Result<Self, PreferenceError> {
        if total_pages == 0 {
            return Err(PreferenceError::NoPages);
        }
        if current_page >= total_pages {
            return Err(PreferenceError::PageOutOfRange {
                page: current_page,
                total: total_pages,
            });
        }
        Ok(Self {
            student_id,
            note_id,
            current_page,
            total_pages,
            reading_time_secs,
            words_read,
            last_read,
        })
    }

    /// Percent of pages reached, counting the current page as read.
    #[must_use]
    pub fn percent(&self) -> u8 {
        let reached = u64::from(self.current_page) + 1;
        let total = u64::from(self.total_pages);
        let pct = (reached * 200 + total) / (total * 2);
        u8::try_from(pct.min(100)).unwrap_or(100)
    }

    #[must_use]
    pub fn pages_read(&self) -> u32 {
        self.current_page + 1
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    #[must_use]
    pub fn reading_time_secs(&self) -> u32 {
        self.reading_time_secs
    }

    #[must_use]
    pub fn words_read(&self) -> u32 {
        self.words_read
    }

    #[must_use]
    pub fn last_read(&self) -> DateTime<Utc> {
        self.last_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn highlight_rejects_empty_range() {
        let err = Highlight::new(
            HighlightId::random(),
            StudentId::new(1),
            NoteId::new(1),
            1,
            "velocity",
            10,
            10,
            "yellow",
            None,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, PreferenceError::InvalidRange { start: 10, end: 10 });
    }

    #[test]
    fn highlight_drops_blank_annotation() {
        let h = Highlight::new(
            HighlightId::random(),
            StudentId::new(1),
            NoteId::new(1),
            2,
            "velocity",
            3,
            11,
            " #fde047 ",
            Some("   ".into()),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(h.color(), "#fde047");
        assert_eq!(h.annotation(), None);
    }

    #[test]
    fn percent_counts_current_page() {
        let p = ReadingProgress::new(StudentId::new(1), NoteId::new(1), 0, 3, 0, 0, fixed_now())
            .unwrap();
        assert_eq!(p.percent(), 33);
        let p = ReadingProgress::new(StudentId::new(1), NoteId::new(1), 1, 3, 0, 0, fixed_now())
            .unwrap();
        assert_eq!(p.percent(), 67);
        let p = ReadingProgress::new(StudentId::new(1), NoteId::new(1), 2, 3, 0, 0, fixed_now())
            .unwrap();
        assert_eq!(p.percent(), 100);
    }

    #[test]
    fn rejects_page_past_end() {
        let err = ReadingProgress::new(StudentId::new(1), NoteId::new(1), 3, 3, 0, 0, fixed_now())
            .unwrap_err();
        assert_eq!(err, PreferenceError::PageOutOfRange { page: 3, total: 3 });
    }
}
