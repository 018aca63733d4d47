use std::sync::Arc;

use exam_core::model::{
    Highlight, HighlightId, NoteId, ReadingProgress, StudentId, WORDS_PER_MINUTE,
};
use exam_core::progress::ReadingTotals;
use storage::repository::{NoteRepository, PreferencesRepository, StorageError};

use crate::Clock;
use crate::error::PreferencesServiceError;

/// A highlight as submitted by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightInput {
    pub note_id: NoteId,
    pub page_number: u32,
    pub text: String,
    pub start_offset: u32,
    pub end_offset: u32,
    pub color: String,
    pub annotation: Option<String>,
}

/// Per-student reading state: bookmarks, highlights, and progress.
#[derive(Clone)]
pub struct PreferencesService {
    clock: Clock,
    notes: Arc<dyn NoteRepository>,
    preferences: Arc<dyn PreferencesRepository>,
}

impl PreferencesService {
    #[must_use]
    pub fn new(
        clock: Clock,
        notes: Arc<dyn NoteRepository>,
        preferences: Arc<dyn PreferencesRepository>,
    ) -> Self {
        Self {
            clock,
            notes,
            preferences,
        }
    }

    /// Flip the bookmark on a note. Returns whether it is now bookmarked.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError::Storage` with `NotFound` if the note is missing.
    pub async fn toggle_bookmark(
        &self,
        student: StudentId,
        note: NoteId,
    ) -> Result<bool, PreferencesServiceError> {
        if self.notes.get_note(note).await?.is_none() {
            return Err(StorageError::NotFound.into());
        }
        let bookmarked = self.preferences.list_bookmarks(student).await?.contains(&note);
        self.preferences
            .set_bookmark(student, note, !bookmarked)
            .await?;
        Ok(!bookmarked)
    }

    /// # Errors
    ///
    /// Returns `PreferencesServiceError::Storage` if repository access fails.
    pub async fn bookmarks(&self, student: StudentId) -> Result<Vec<NoteId>, PreferencesServiceError> {
        Ok(self.preferences.list_bookmarks(student).await?)
    }

    /// # Errors
    ///
    /// Returns `PreferencesServiceError::PageNotFound` if the note has no such page.
    /// Returns `PreferencesServiceError::Preference` for an empty text or range.
    pub async fn add_highlight(
        &self,
        student: StudentId,
        input: HighlightInput,
    ) -> Result<Highlight, PreferencesServiceError> {
        let note = self
            .notes
            .get_note(input.note_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        if note.page(input.page_number).is_none() {
            return Err(PreferencesServiceError::PageNotFound(input.page_number));
        }

        let highlight = Highlight::new(
            HighlightId::random(),
            student,
            input.note_id,
            input.page_number,
            input.text,
            input.start_offset,
            input.end_offset,
            input.color,
            input.annotation,
            self.clock.now(),
        )?;
        self.preferences.add_highlight(&highlight).await?;
        Ok(highlight)
    }

    /// # Errors
    ///
    /// Returns `PreferencesServiceError::Storage` if repository access fails.
    pub async fn highlights(
        &self,
        student: StudentId,
        note: NoteId,
    ) -> Result<Vec<Highlight>, PreferencesServiceError> {
        Ok(self.preferences.list_highlights(student, note).await?)
    }

    /// # Errors
    ///
    /// Returns `PreferencesServiceError::Storage` with `NotFound` if the student has no such highlight.
    pub async fn remove_highlight(
        &self,
        student: StudentId,
        id: HighlightId,
    ) -> Result<(), PreferencesServiceError> {
        self.preferences.delete_highlight(student, id).await?;
        Ok(())
    }

    /// Record that the student is on `current_page` (0-based) after reading for
    /// `seconds_read` more seconds.
    ///
    /// Reading time accumulates across calls. Words read grow at the nominal
    /// reading speed.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError::Preference` if the page is past the end of the note.
    /// Returns `PreferencesServiceError::Storage` with `NotFound` if the note is missing.
    pub async fn update_reading_progress(
        &self,
        student: StudentId,
        note_id: NoteId,
        current_page: u32,
        seconds_read: u32,
    ) -> Result<ReadingProgress, PreferencesServiceError> {
        let note = self
            .notes
            .get_note(note_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let previous = self.preferences.get_reading_progress(student, note_id).await?;
        let (time, words) = previous
            .map(|p| (p.reading_time_secs(), p.words_read()))
            .unwrap_or_default();

        let wpm = u64::try_from(WORDS_PER_MINUTE).unwrap_or(u64::MAX);
        let new_words = u64::from(seconds_read).saturating_mul(wpm) / 60;
        let progress = ReadingProgress::new(
            student,
            note_id,
            current_page,
            note.total_pages(),
            time.saturating_add(seconds_read),
            words.saturating_add(u32::try_from(new_words).unwrap_or(u32::MAX)),
            self.clock.now(),
        )?;
        self.preferences.save_reading_progress(&progress).await?;
        Ok(progress)
    }

    /// # Errors
    ///
    /// Returns `PreferencesServiceError::Storage` if repository access fails.
    pub async fn reading_progress(
        &self,
        student: StudentId,
        note: NoteId,
    ) -> Result<Option<ReadingProgress>, PreferencesServiceError> {
        Ok(self.preferences.get_reading_progress(student, note).await?)
    }

    /// Totals across every note the student has opened.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError::Storage` if repository access fails.
    pub async fn reading_totals(
        &self,
        student: StudentId,
    ) -> Result<ReadingTotals, PreferencesServiceError> {
        let records = self.preferences.list_reading_progress(student).await?;
        Ok(ReadingTotals::from_progress(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{CategoryId, NoteDraft, NotePageDraft, PreferenceError, SubjectId};
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    async fn setup() -> (PreferencesService, NoteId) {
        let (service, _, note) = setup_with_repo().await;
        (service, note)
    }

    async fn setup_with_repo() -> (PreferencesService, InMemoryRepository, NoteId) {
        let repo = InMemoryRepository::new();
        let note = NoteDraft::new(
            "Electricity",
            SubjectId::new(1),
            CategoryId::new(1),
            vec![
                NotePageDraft::text("Current is the flow of charge."),
                NotePageDraft::text("Voltage drives current."),
            ],
        )
        .validate(fixed_now())
        .unwrap()
        .assign_id(NoteId::new(1));
        let ids = repo.insert_new_notes(&[note]).await.unwrap();
        let shared = Arc::new(repo.clone());
        (
            PreferencesService::new(Clock::Fixed(fixed_now()), shared.clone(), shared),
            repo,
            ids[0],
        )
    }

    fn input(note: NoteId, page: u32) -> HighlightInput {
        HighlightInput {
            note_id: note,
            page_number: page,
            text: "flow of charge".into(),
            start_offset: 15,
            end_offset: 29,
            color: "yellow".into(),
            annotation: Some("definition".into()),
        }
    }

    #[tokio::test]
    async fn toggle_bookmark_flips_state() {
        let (service, note) = setup().await;
        let student = StudentId::new(1);
        assert!(service.toggle_bookmark(student, note).await.unwrap());
        assert_eq!(service.bookmarks(student).await.unwrap(), vec![note]);
        assert!(!service.toggle_bookmark(student, note).await.unwrap());
        assert!(service.bookmarks(student).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bookmarking_missing_note_is_not_found() {
        let (service, _) = setup().await;
        let err = service
            .toggle_bookmark(StudentId::new(1), NoteId::new(999))
            .await
            .unwrap_err();
        assert!(matches!(err, PreferencesServiceError::Storage(StorageError::NotFound)));
        assert!(service.bookmarks(StudentId::new(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleted_note_drops_out_of_bookmarks_and_totals() {
        let (service, repo, note) = setup_with_repo().await;
        let student = StudentId::new(1);
        service.toggle_bookmark(student, note).await.unwrap();
        service.update_reading_progress(student, note, 1, 60).await.unwrap();
        service.add_highlight(student, input(note, 1)).await.unwrap();

        repo.delete_note(note).await.unwrap();
        assert!(service.bookmarks(student).await.unwrap().is_empty());
        assert!(service.highlights(student, note).await.unwrap().is_empty());
        assert!(service.reading_progress(student, note).await.unwrap().is_none());
        let totals = service.reading_totals(student).await.unwrap();
        assert_eq!(totals.notes_started, 0);
        assert_eq!(totals.reading_time_secs, 0);
        assert_eq!(totals.words_read, 0);
    }

    #[tokio::test]
    async fn highlights_are_scoped_to_student() {
        let (service, note) = setup().await;
        let h = service
            .add_highlight(StudentId::new(1), input(note, 1))
            .await
            .unwrap();
        assert_eq!(h.annotation(), Some("definition"));
        assert_eq!(service.highlights(StudentId::new(1), note).await.unwrap().len(), 1);
        assert!(service.highlights(StudentId::new(2), note).await.unwrap().is_empty());

        let err = service
            .remove_highlight(StudentId::new(2), h.id())
            .await
            .unwrap_err();
        assert!(matches!(err, PreferencesServiceError::Storage(StorageError::NotFound)));
        service.remove_highlight(StudentId::new(1), h.id()).await.unwrap();
    }

    #[tokio::test]
    async fn highlight_on_missing_page_is_rejected() {
        let (service, note) = setup().await;
        let err = service
            .add_highlight(StudentId::new(1), input(note, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, PreferencesServiceError::PageNotFound(3)));
    }

    #[tokio::test]
    async fn reading_progress_accumulates() {
        let (service, note) = setup().await;
        let student = StudentId::new(1);
        service.update_reading_progress(student, note, 0, 30).await.unwrap();
        let p = service.update_reading_progress(student, note, 1, 60).await.unwrap();
        assert_eq!(p.reading_time_secs(), 90);
        assert_eq!(p.words_read(), 300);
        assert_eq!(p.percent(), 100);

        let totals = service.reading_totals(student).await.unwrap();
        assert_eq!(totals.notes_started, 1);
        assert_eq!(totals.notes_completed, 1);
        assert_eq!(totals.reading_minutes(), 1);

        let err = service.update_reading_progress(student, note, 2, 5).await.unwrap_err();
        assert!(matches!(
            err,
            PreferencesServiceError::Preference(PreferenceError::PageOutOfRange { page: 2, total: 2 })
        ));
    }
}
