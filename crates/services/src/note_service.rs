use std::collections::HashMap;
use std::sync::Arc;

use exam_core::browse::{NoteFilter, NoteSort, browse_notes};
use exam_core::model::{Note, NoteDraft, NoteId, StudentId};
use storage::repository::{NoteRepository, PreferencesRepository, StorageError};

use crate::Clock;
use crate::error::NoteServiceError;
use crate::render::render_page;

/// A note page rendered for reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub note_id: NoteId,
    pub page_number: u32,
    pub total_pages: u32,
    pub html: String,
}

/// Orchestrates note editing, listing, and reading.
#[derive(Clone)]
pub struct NoteService {
    clock: Clock,
    notes: Arc<dyn NoteRepository>,
    preferences: Arc<dyn PreferencesRepository>,
}

impl NoteService {
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

    /// Validate and persist a new note.
    ///
    /// # Errors
    ///
    /// Returns `NoteServiceError::Note` for validation failures.
    /// Returns `NoteServiceError::Storage` if persistence fails.
    pub async fn create_note(&self, draft: NoteDraft) -> Result<NoteId, NoteServiceError> {
        let note = draft.validate(self.clock.now())?.assign_id(NoteId::new(1));
        let ids = self.notes.insert_new_notes(std::slice::from_ref(&note)).await?;
        let id = ids.first().copied().ok_or(StorageError::NotFound)?;
        log::debug!("created note {id} ({} pages)", note.total_pages());
        Ok(id)
    }

    /// Replace a note's content, keeping its author and creation time.
    ///
    /// # Errors
    ///
    /// Returns `NoteServiceError::Storage` with `NotFound` if the note is missing.
    pub async fn update_note(&self, id: NoteId, draft: NoteDraft) -> Result<(), NoteServiceError> {
        let existing = self.notes.get_note(id).await?.ok_or(StorageError::NotFound)?;
        let now = self.clock.now();
        let updated = existing.with_content(draft.validate(now)?, now);
        self.notes.upsert_note(&updated).await?;
        Ok(())
    }

    /// Delete a note together with its questions.
    ///
    /// # Errors
    ///
    /// Returns `NoteServiceError::Storage` with `NotFound` if nothing was deleted.
    pub async fn delete_note(&self, id: NoteId) -> Result<(), NoteServiceError> {
        self.notes.delete_note(id).await?;
        log::info!("deleted note {id}");
        Ok(())
    }

    /// Returns `Ok(None)` when the note does not exist.
    ///
    /// # Errors
    ///
    /// Returns `NoteServiceError::Storage` if repository access fails.
    pub async fn get_note(&self, id: NoteId) -> Result<Option<Note>, NoteServiceError> {
        Ok(self.notes.get_note(id).await?)
    }

    /// # Errors
    ///
    /// Returns `NoteServiceError::Storage` if repository access fails.
    pub async fn list_notes(&self) -> Result<Vec<Note>, NoteServiceError> {
        Ok(self.notes.list_notes().await?)
    }

    /// Notes that are unassigned or assigned to `student`.
    ///
    /// # Errors
    ///
    /// Returns `NoteServiceError::Storage` if repository access fails.
    pub async fn list_visible_notes(
        &self,
        student: StudentId,
    ) -> Result<Vec<Note>, NoteServiceError> {
        let notes = self.notes.list_notes().await?;
        Ok(notes
            .into_iter()
            .filter(|n| n.is_visible_to(student))
            .collect())
    }

    /// Filter and sort notes for a student's dashboard, using their reading progress.
    ///
    /// # Errors
    ///
    /// Returns `NoteServiceError::Storage` if repository access fails.
    pub async fn browse(
        &self,
        student: StudentId,
        filter: NoteFilter,
        sort: NoteSort,
    ) -> Result<Vec<Note>, NoteServiceError> {
        let notes = self.notes.list_notes().await?;
        let progress: HashMap<NoteId, u8> = self
            .preferences
            .list_reading_progress(student)
            .await?
            .iter()
            .map(|p| (p.note_id(), p.percent()))
            .collect();

        let filter = NoteFilter {
            visible_to: Some(student),
            ..filter
        };
        Ok(browse_notes(&notes, &filter, sort, &progress)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Render one page of a note to sanitized HTML.
    ///
    /// # Errors
    ///
    /// Returns `NoteServiceError::Storage` with `NotFound` if the note or page is missing.
    pub async fn render_page(
        &self,
        id: NoteId,
        page_number: u32,
    ) -> Result<RenderedPage, NoteServiceError> {
        let note = self.notes.get_note(id).await?.ok_or(StorageError::NotFound)?;
        let page = note.page(page_number).ok_or(StorageError::NotFound)?;
        Ok(RenderedPage {
            note_id: id,
            page_number,
            total_pages: note.total_pages(),
            html: render_page(page),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{CategoryId, Difficulty, NoteError, NotePageDraft, SubjectId};
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> NoteService {
        NoteService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn draft(title: &str) -> NoteDraft {
        NoteDraft::new(
            title,
            SubjectId::new(1),
            CategoryId::new(1),
            vec![
                NotePageDraft::text("# Motion\n\nVelocity is **speed** with direction."),
                NotePageDraft::text("Acceleration changes velocity."),
            ],
        )
    }

    #[tokio::test]
    async fn create_then_update_keeps_created_at() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let id = service.create_note(draft("Kinematics")).await.unwrap();

        let mut edited = draft("Kinematics II");
        edited.difficulty = Difficulty::Hard;
        service.update_note(id, edited).await.unwrap();

        let note = service.get_note(id).await.unwrap().unwrap();
        assert_eq!(note.title(), "Kinematics II");
        assert_eq!(note.difficulty(), Difficulty::Hard);
        assert_eq!(note.created_at(), fixed_now());
    }

    #[tokio::test]
    async fn create_rejects_note_without_pages() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let err = service
            .create_note(NoteDraft::new("Empty", SubjectId::new(1), CategoryId::new(1), vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, NoteServiceError::Note(NoteError::NoPages)));
    }

    #[tokio::test]
    async fn visibility_respects_assignment() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        service.create_note(draft("Open")).await.unwrap();
        let mut assigned = draft("Assigned");
        assigned.assigned_students = vec![StudentId::new(2)];
        service.create_note(assigned).await.unwrap();

        assert_eq!(service.list_visible_notes(StudentId::new(1)).await.unwrap().len(), 1);
        assert_eq!(service.list_visible_notes(StudentId::new(2)).await.unwrap().len(), 2);

        let browsed = service
            .browse(StudentId::new(1), NoteFilter::default(), NoteSort::Title)
            .await
            .unwrap();
        assert_eq!(browsed.len(), 1);
        assert_eq!(browsed[0].title(), "Open");
    }

    #[tokio::test]
    async fn renders_requested_page() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let id = service.create_note(draft("Kinematics")).await.unwrap();

        let page = service.render_page(id, 1).await.unwrap();
        assert_eq!(page.total_pages, 2);
        assert!(page.html.contains("<h1>Motion</h1>"));
        assert!(page.html.contains("<strong>speed</strong>"));

        let err = service.render_page(id, 5).await.unwrap_err();
        assert!(matches!(err, NoteServiceError::Storage(StorageError::NotFound)));
    }
}
