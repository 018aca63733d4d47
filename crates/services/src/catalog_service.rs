use std::sync::Arc;

use exam_core::model::{Category, CategoryId, LocalizedName, Subject, SubjectId};
use storage::repository::{CategoryRepository, StorageError, SubjectRepository};

use crate::Clock;
use crate::error::CatalogServiceError;

/// Display fields shared by category and subject edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEntryInput {
    pub name: String,
    pub name_en: Option<String>,
    pub name_si: Option<String>,
    pub description: String,
    pub thumbnail: Option<String>,
}

impl CatalogEntryInput {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn names(&self) -> Result<LocalizedName, CatalogServiceError> {
        Ok(LocalizedName::new(
            self.name.clone(),
            self.name_en.clone(),
            self.name_si.clone(),
        )?)
    }
}

/// Manages categories and the subjects filed under them.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    categories: Arc<dyn CategoryRepository>,
    subjects: Arc<dyn SubjectRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        categories: Arc<dyn CategoryRepository>,
        subjects: Arc<dyn SubjectRepository>,
    ) -> Self {
        Self {
            clock,
            categories,
            subjects,
        }
    }

    // ─── CATEGORIES ────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Catalog` for validation failures.
    /// Returns `CatalogServiceError::Storage` if persistence fails.
    pub async fn create_category(
        &self,
        input: CatalogEntryInput,
    ) -> Result<CategoryId, CatalogServiceError> {
        let category = Category::new(
            CategoryId::new(1),
            input.names()?,
            input.description,
            input.thumbnail,
            self.clock.now(),
        )?;
        let id = self.categories.insert_new_category(&category).await?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogServiceError> {
        Ok(self.categories.list_categories().await?)
    }

    /// Returns `Ok(None)` when the category does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get_category(
        &self,
        id: CategoryId,
    ) -> Result<Option<Category>, CatalogServiceError> {
        Ok(self.categories.get_category(id).await?)
    }

    /// Replace the display fields of a category, keeping its creation time.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` with `NotFound` if the category is missing.
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: CatalogEntryInput,
    ) -> Result<(), CatalogServiceError> {
        let existing = self
            .categories
            .get_category(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let updated = Category::new(
            id,
            input.names()?,
            input.description,
            input.thumbnail,
            existing.created_at(),
        )?;
        self.categories.upsert_category(&updated).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::CategoryInUse` while subjects still reference it.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogServiceError> {
        let subjects = self.subjects.list_subjects_by_category(id).await?;
        if !subjects.is_empty() {
            return Err(CatalogServiceError::CategoryInUse {
                subjects: subjects.len(),
            });
        }
        self.categories.delete_category(id).await?;
        Ok(())
    }

    // ─── SUBJECTS ──────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` with `NotFound` if the category is missing.
    pub async fn create_subject(
        &self,
        category_id: CategoryId,
        input: CatalogEntryInput,
    ) -> Result<SubjectId, CatalogServiceError> {
        self.categories
            .get_category(category_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let now = self.clock.now();
        let subject = Subject::new(
            SubjectId::new(1),
            category_id,
            input.names()?,
            input.description,
            input.thumbnail,
            now,
            now,
        )?;
        let id = self.subjects.insert_new_subject(&subject).await?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_subjects(&self) -> Result<Vec<Subject>, CatalogServiceError> {
        Ok(self.subjects.list_subjects().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_subjects_in(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Subject>, CatalogServiceError> {
        Ok(self.subjects.list_subjects_by_category(category_id).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, CatalogServiceError> {
        Ok(self.subjects.get_subject(id).await?)
    }

    /// Replace a subject's fields; moving it to another category is allowed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` with `NotFound` if the subject or
    /// target category is missing.
    pub async fn update_subject(
        &self,
        id: SubjectId,
        category_id: CategoryId,
        input: CatalogEntryInput,
    ) -> Result<(), CatalogServiceError> {
        let existing = self
            .subjects
            .get_subject(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        if existing.category_id() != category_id {
            self.categories
                .get_category(category_id)
                .await?
                .ok_or(StorageError::NotFound)?;
        }
        let updated = Subject::new(
            id,
            category_id,
            input.names()?,
            input.description,
            input.thumbnail,
            existing.created_at(),
            self.clock.now(),
        )?;
        self.subjects.upsert_subject(&updated).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` with `NotFound` if nothing was deleted.
    pub async fn delete_subject(&self, id: SubjectId) -> Result<(), CatalogServiceError> {
        self.subjects.delete_subject(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::CatalogError;
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service() -> CatalogService {
        let repo = InMemoryRepository::new();
        CatalogService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        )
    }

    #[tokio::test]
    async fn subject_requires_existing_category() {
        let service = service();
        let err = service
            .create_subject(CategoryId::new(9), CatalogEntryInput::named("Physics"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Storage(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn category_with_subjects_cannot_be_deleted() {
        let service = service();
        let category = service
            .create_category(CatalogEntryInput::named("A/L Science"))
            .await
            .unwrap();
        let subject = service
            .create_subject(category, CatalogEntryInput::named("Physics"))
            .await
            .unwrap();

        let err = service.delete_category(category).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::CategoryInUse { subjects: 1 }
        ));

        service.delete_subject(subject).await.unwrap();
        service.delete_category(category).await.unwrap();
        assert!(service.get_category(category).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_category_keeps_created_at_and_rejects_blank_name() {
        let service = service();
        let id = service
            .create_category(CatalogEntryInput::named("O/L"))
            .await
            .unwrap();

        let mut input = CatalogEntryInput::named("Ordinary Level");
        input.name_si = Some("සාමාන්‍ය පෙළ".into());
        service.update_category(id, input).await.unwrap();

        let category = service.get_category(id).await.unwrap().unwrap();
        assert_eq!(category.name(), "Ordinary Level");
        assert_eq!(category.names().name_en(), "Ordinary Level");
        assert_eq!(category.created_at(), fixed_now());

        let err = service
            .update_category(id, CatalogEntryInput::named("  "))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Catalog(CatalogError::EmptyName)
        ));
    }

    #[tokio::test]
    async fn lists_subjects_by_category() {
        let service = service();
        let science = service
            .create_category(CatalogEntryInput::named("Science"))
            .await
            .unwrap();
        let arts = service
            .create_category(CatalogEntryInput::named("Arts"))
            .await
            .unwrap();
        service
            .create_subject(science, CatalogEntryInput::named("Physics"))
            .await
            .unwrap();
        service
            .create_subject(science, CatalogEntryInput::named("Chemistry"))
            .await
            .unwrap();
        service
            .create_subject(arts, CatalogEntryInput::named("History"))
            .await
            .unwrap();

        assert_eq!(service.list_subjects_in(science).await.unwrap().len(), 2);
        assert_eq!(service.list_subjects().await.unwrap().len(), 3);
    }
}
