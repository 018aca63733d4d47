use std::sync::Arc;

use exam_core::model::{Student, StudentId};
use storage::repository::{StorageError, StudentRepository};

use crate::Clock;
use crate::error::StudentServiceError;

/// Admin-side student records.
#[derive(Clone)]
pub struct StudentService {
    clock: Clock,
    students: Arc<dyn StudentRepository>,
}

impl StudentService {
    #[must_use]
    pub fn new(clock: Clock, students: Arc<dyn StudentRepository>) -> Self {
        Self { clock, students }
    }

    /// # Errors
    ///
    /// Returns `StudentServiceError::EmailTaken` if the email is already registered.
    /// Returns `StudentServiceError::Student` for validation failures.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
    ) -> Result<StudentId, StudentServiceError> {
        let student = Student::new(StudentId::new(1), name, email, self.clock.now())?;
        if self
            .students
            .find_student_by_email(student.email())
            .await?
            .is_some()
        {
            return Err(StudentServiceError::EmailTaken(student.email().to_owned()));
        }
        match self.students.insert_new_student(&student).await {
            Ok(id) => {
                log::info!("registered student {id}");
                Ok(id)
            }
            Err(StorageError::Conflict) => {
                Err(StudentServiceError::EmailTaken(student.email().to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `StudentServiceError::Storage` if repository access fails.
    pub async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StudentServiceError> {
        Ok(self.students.get_student(id).await?)
    }

    /// # Errors
    ///
    /// Returns `StudentServiceError::Storage` if repository access fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Student>, StudentServiceError> {
        let email = email.trim().to_ascii_lowercase();
        Ok(self.students.find_student_by_email(&email).await?)
    }

    /// # Errors
    ///
    /// Returns `StudentServiceError::Storage` if repository access fails.
    pub async fn list_students(&self) -> Result<Vec<Student>, StudentServiceError> {
        Ok(self.students.list_students().await?)
    }

    /// Stamp the student's last login with the clock's current time.
    ///
    /// # Errors
    ///
    /// Returns `StudentServiceError::Storage` with `NotFound` if the student is missing.
    pub async fn record_login(&self, id: StudentId) -> Result<(), StudentServiceError> {
        let student = self
            .students
            .get_student(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let updated = student.with_last_login(Some(self.clock.now()));
        self.students.upsert_student(&updated).await?;
        Ok(())
    }
}
