use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::model::ids::{CategoryId, SubjectId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("invalid thumbnail URL: {0}")]
    InvalidThumbnail(String),
}

/// Display names shared by categories and subjects.
///
/// `name` is required; the English name falls back to it, the Sinhala name
/// may stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedName {
    name: String,
    name_en: String,
    name_si: String,
}

impl LocalizedName {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyName` if `name` is blank.
    pub fn new(
        name: impl Into<String>,
        name_en: Option<String>,
        name_si: Option<String>,
    ) -> Result<Self, CatalogError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        let name_en = normalize_optional(name_en).unwrap_or_else(|| name.clone());
        let name_si = normalize_optional(name_si).unwrap_or_default();
        Ok(Self {
            name,
            name_en,
            name_si,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn name_en(&self) -> &str {
        &self.name_en
    }

    #[must_use]
    pub fn name_si(&self) -> &str {
        &self.name_si
    }
}

//
// ─── CATEGORY ──────────────────────────────────────────────────────────────────
//

/// Top-level grouping of subjects (e.g. Science, Commerce).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    id: CategoryId,
    names: LocalizedName,
    description: String,
    thumbnail: Option<Url>,
    created_at: DateTime<Utc>,
}

impl Category {
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidThumbnail` if the thumbnail is not a URL.
    pub fn new(
        id: CategoryId,
        names: LocalizedName,
        description: impl Into<String>,
        thumbnail: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            id,
            names,
            description: description.into().trim().to_owned(),
            thumbnail: parse_thumbnail(thumbnail)?,
            created_at,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: CategoryId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn id(&self) -> CategoryId {
        self.id
    }

    #[must_use]
    pub fn names(&self) -> &LocalizedName {
        &self.names
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.names.name()
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn thumbnail(&self) -> Option<&Url> {
        self.thumbnail.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// A subject inside a category (e.g. Physics under Science).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    id: SubjectId,
    category_id: CategoryId,
    names: LocalizedName,
    description: String,
    thumbnail: Option<Url>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Subject {
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidThumbnail` if the thumbnail is not a URL.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SubjectId,
        category_id: CategoryId,
        names: LocalizedName,
        description: impl Into<String>,
        thumbnail: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            id,
            category_id,
            names,
            description: description.into().trim().to_owned(),
            thumbnail: parse_thumbnail(thumbnail)?,
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: SubjectId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    #[must_use]
    pub fn names(&self) -> &LocalizedName {
        &self.names
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.names.name()
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn thumbnail(&self) -> Option<&Url> {
        self.thumbnail.as_ref()
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

fn parse_thumbnail(raw: Option<String>) -> Result<Option<Url>, CatalogError> {
    normalize_optional(raw)
        .map(|s| Url::parse(&s).map_err(|_| CatalogError::InvalidThumbnail(s)))
        .transpose()
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn localized_name_falls_back_to_name() {
        let names = LocalizedName::new("  Physics ", None, Some("  ".into())).unwrap();
        assert_eq!(names.name(), "Physics");
        assert_eq!(names.name_en(), "Physics");
        assert_eq!(names.name_si(), "");
    }

    #[test]
    fn localized_name_rejects_blank() {
        assert_eq!(
            LocalizedName::new(" ", None, None).unwrap_err(),
            CatalogError::EmptyName
        );
    }

    #[test]
    fn category_rejects_bad_thumbnail() {
        let names = LocalizedName::new("Science", None, None).unwrap();
        let err = Category::new(
            CategoryId::new(1),
            names,
            "",
            Some("not a url".into()),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidThumbnail(_)));
    }

    #[test]
    fn subject_keeps_category_and_thumbnail() {
        let names = LocalizedName::new("Chemistry", Some("Chemistry".into()), None).unwrap();
        let subject = Subject::new(
            SubjectId::new(2),
            CategoryId::new(1),
            names,
            " Advanced Level Chemistry ",
            Some("https://example.com/chem.png".into()),
            fixed_now(),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(subject.category_id(), CategoryId::new(1));
        assert_eq!(subject.description(), "Advanced Level Chemistry");
        assert_eq!(
            subject.thumbnail().map(Url::as_str),
            Some("https://example.com/chem.png")
        );
    }
}
