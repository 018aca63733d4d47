use std::sync::Arc;

use exam_core::model::{NoteId, Question, QuestionDraft, QuestionId, SubjectId};
use storage::repository::{QuestionRepository, StorageError};

use crate::Clock;
use crate::error::QuestionServiceError;

/// Orchestrates question editing and lookup.
#[derive(Clone)]
pub struct QuestionService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
}

impl QuestionService {
    #[must_use]
    pub fn new(clock: Clock, questions: Arc<dyn QuestionRepository>) -> Self {
        Self { clock, questions }
    }

    /// Validate and persist a new question. Blank options are dropped first.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Question` for validation failures.
    /// Returns `QuestionServiceError::Storage` if persistence fails.
    pub async fn create_question(
        &self,
        draft: QuestionDraft,
    ) -> Result<QuestionId, QuestionServiceError> {
        let question = draft
            .validate(self.clock.now())?
            .assign_id(QuestionId::new(1));
        let ids = self
            .questions
            .insert_new_questions(std::slice::from_ref(&question))
            .await?;
        let id = ids.first().copied().ok_or(StorageError::NotFound)?;
        Ok(id)
    }

    /// Replace a question's content, keeping its id and creation time.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` with `NotFound` if the question is missing.
    pub async fn update_question(
        &self,
        id: QuestionId,
        draft: QuestionDraft,
    ) -> Result<(), QuestionServiceError> {
        let existing = self
            .questions
            .get_question(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let updated = existing.with_content(draft.validate(self.clock.now())?);
        self.questions.upsert_question(&updated).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` with `NotFound` if nothing was deleted.
    pub async fn delete_question(&self, id: QuestionId) -> Result<(), QuestionServiceError> {
        self.questions.delete_question(id).await?;
        Ok(())
    }

    /// Returns `Ok(None)` when the question does not exist.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access fails.
    pub async fn get_question(
        &self,
        id: QuestionId,
    ) -> Result<Option<Question>, QuestionServiceError> {
        Ok(self.questions.get_question(id).await?)
    }

    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access fails.
    pub async fn list_questions(&self) -> Result<Vec<Question>, QuestionServiceError> {
        Ok(self.questions.list_questions().await?)
    }

    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access fails.
    pub async fn list_for_note(&self, note: NoteId) -> Result<Vec<Question>, QuestionServiceError> {
        Ok(self.questions.list_questions_by_note(note).await?)
    }

    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access fails.
    pub async fn list_for_subject(
        &self,
        subject: SubjectId,
    ) -> Result<Vec<Question>, QuestionServiceError> {
        Ok(self.questions.list_questions_by_subject(subject).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::QuestionError;
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service() -> QuestionService {
        QuestionService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(InMemoryRepository::new()),
        )
    }

    fn draft(note: u64, subject: u64) -> QuestionDraft {
        QuestionDraft::new(
            "Unit of force?",
            vec!["Newton".into(), "".into(), "Joule".into()],
            2,
            NoteId::new(note),
            SubjectId::new(subject),
        )
    }

    #[tokio::test]
    async fn blank_options_are_dropped_on_create() {
        let service = service();
        let id = service.create_question(draft(1, 1)).await.unwrap();
        let q = service.get_question(id).await.unwrap().unwrap();
        assert_eq!(q.options(), ["Newton", "Joule"]);
        assert_eq!(q.correct_option(), "Joule");
    }

    #[tokio::test]
    async fn update_rejects_single_option() {
        let service = service();
        let id = service.create_question(draft(1, 1)).await.unwrap();
        let mut edit = draft(1, 1);
        edit.options = vec!["Newton".into(), " ".into()];
        edit.correct_index = 0;
        let err = service.update_question(id, edit).await.unwrap_err();
        assert!(matches!(
            err,
            QuestionServiceError::Question(QuestionError::TooFewOptions { count: 1 })
        ));
    }

    #[tokio::test]
    async fn lists_by_note_and_subject() {
        let service = service();
        service.create_question(draft(1, 1)).await.unwrap();
        service.create_question(draft(1, 2)).await.unwrap();
        service.create_question(draft(2, 2)).await.unwrap();

        assert_eq!(service.list_for_note(NoteId::new(1)).await.unwrap().len(), 2);
        assert_eq!(service.list_for_subject(SubjectId::new(2)).await.unwrap().len(), 2);
        assert_eq!(service.list_questions().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let service = service();
        let err = service.delete_question(QuestionId::new(42)).await.unwrap_err();
        assert!(matches!(
            err,
            QuestionServiceError::Storage(StorageError::NotFound)
        ));
    }
}
