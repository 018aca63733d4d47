use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::StudentId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudentError {
    #[error("student name cannot be empty")]
    EmptyName,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// A student record managed by admins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    id: StudentId,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl Student {
    /// Creates a new Student. The email is trimmed and lowercased.
    ///
    /// # Errors
    ///
    /// Returns `StudentError` if the name is blank or the email is malformed.
    pub fn new(
        id: StudentId,
        name: impl Into<String>,
        email: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, StudentError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(StudentError::EmptyName);
        }
        let email = normalize_email(&email.into())?;
        Ok(Self {
            id,
            name,
            email,
            created_at,
            last_login: None,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: StudentId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_last_login(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_login = at;
        self
    }

    #[must_use]
    pub fn id(&self) -> StudentId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }
}

fn normalize_email(raw: &str) -> Result<String, StudentError> {
    let email = raw.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(StudentError::InvalidEmail(raw.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn normalizes_email() {
        let s = Student::new(StudentId::new(1), " Nimal ", " Student@ELMS.lk ", fixed_now()).unwrap();
        assert_eq!(s.name(), "Nimal");
        assert_eq!(s.email(), "student@elms.lk");
        assert_eq!(s.last_login(), None);
    }

    #[test]
    fn rejects_bad_email_and_blank_name() {
        assert!(matches!(
            Student::new(StudentId::new(1), "A", "nobody", fixed_now()),
            Err(StudentError::InvalidEmail(_))
        ));
        assert!(matches!(
            Student::new(StudentId::new(1), "A", "@elms.lk", fixed_now()),
            Err(StudentError::InvalidEmail(_))
        ));
        assert_eq!(
            Student::new(StudentId::new(1), "  ", "a@b.lk", fixed_now()).unwrap_err(),
            StudentError::EmptyName
        );
    }
}
