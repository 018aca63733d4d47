//! Bulk JSON import of notes and questions.
//!
//! Payloads are arrays of camelCase objects. Every item is validated before
//! anything is written, so a bad item leaves storage untouched.

use std::sync::Arc;

use serde::Deserialize;

use exam_core::model::{
    CategoryId, Difficulty, ImagePosition, Note, NoteDraft, NoteId, NoteImage, NotePageDraft,
    Question, QuestionDraft, QuestionId, StudentId, SubjectId,
};
use storage::repository::{NoteRepository, QuestionRepository};

use crate::Clock;
use crate::error::ImportError;

/// Ids arrive as numbers or as numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn parse(&self, field: &str) -> Result<u64, String> {
        match self {
            RawId::Number(n) => Ok(*n),
            RawId::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("{field} must be a numeric id, got {s:?}")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    question: Option<String>,
    options: Option<Vec<String>>,
    correct_answer: Option<i64>,
    #[serde(default)]
    explanation: String,
    note_id: Option<RawId>,
    subject_id: Option<RawId>,
    difficulty: Option<String>,
    points: Option<u32>,
    time_limit: Option<u32>,
    #[serde(default)]
    assigned_students: Vec<RawId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImage {
    url: String,
    #[serde(default)]
    alt: String,
    caption: Option<String>,
    #[serde(default)]
    position: ImagePosition,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    page_number: Option<u32>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    images: Vec<RawImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNote {
    title: Option<String>,
    title_en: Option<String>,
    title_si: Option<String>,
    content: Option<String>,
    #[serde(default)]
    pages: Vec<RawPage>,
    subject_id: Option<RawId>,
    category_id: Option<RawId>,
    difficulty: Option<String>,
    estimated_read_time: Option<u32>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    assigned_students: Vec<RawId>,
    created_by: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("missing {field}"))
}

fn difficulty(raw: Option<&str>) -> Result<Difficulty, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Difficulty::Medium),
        Some(s) => s.parse().map_err(|e| format!("{e}")),
    }
}

fn students(raw: &[RawId]) -> Result<Vec<StudentId>, String> {
    raw.iter()
        .map(|id| id.parse("assignedStudents").map(StudentId::new))
        .collect()
}

impl RawQuestion {
    fn into_draft(self) -> Result<QuestionDraft, String> {
        let prompt = required(self.question, "question")?;
        if prompt.trim().is_empty() {
            return Err("question cannot be empty".into());
        }
        let options = required(self.options, "options")?;
        if options.len() < 2 {
            return Err(format!("need at least 2 options, got {}", options.len()));
        }
        let correct = required(self.correct_answer, "correctAnswer")?;
        let correct = usize::try_from(correct)
            .ok()
            .filter(|c| *c < options.len())
            .ok_or_else(|| format!("correctAnswer {correct} is out of range"))?;
        let note_id = required(self.note_id, "noteId")?.parse("noteId")?;
        let subject_id = required(self.subject_id, "subjectId")?.parse("subjectId")?;

        let mut draft = QuestionDraft::new(
            prompt,
            options,
            correct,
            NoteId::new(note_id),
            SubjectId::new(subject_id),
        );
        draft.explanation = self.explanation;
        draft.difficulty = difficulty(self.difficulty.as_deref())?;
        draft.points = self.points.unwrap_or(1);
        draft.time_limit_secs = self.time_limit;
        draft.assigned_students = students(&self.assigned_students)?;
        Ok(draft)
    }
}

impl RawNote {
    fn into_draft(self) -> Result<NoteDraft, String> {
        let title = required(self.title, "title")?;
        let subject_id = required(self.subject_id, "subjectId")?.parse("subjectId")?;
        let category_id = required(self.category_id, "categoryId")?.parse("categoryId")?;

        let pages = if self.pages.is_empty() {
            match self.content {
                Some(content) if !content.trim().is_empty() => vec![NotePageDraft::text(content)],
                _ => return Err("note needs non-empty content or pages".into()),
            }
        } else {
            let mut raw_pages: Vec<(u32, RawPage)> = self
                .pages
                .into_iter()
                .enumerate()
                .map(|(idx, p)| {
                    let fallback = u32::try_from(idx + 1).unwrap_or(u32::MAX);
                    (p.page_number.unwrap_or(fallback), p)
                })
                .collect();
            raw_pages.sort_by_key(|(n, _)| *n);
            raw_pages
                .into_iter()
                .map(|(n, p)| {
                    if p.content.trim().is_empty() {
                        return Err(format!("page {n} has no content"));
                    }
                    let images = p
                        .images
                        .into_iter()
                        .map(|i| {
                            NoteImage::new(&i.url, i.alt, i.caption, i.position)
                                .map_err(|e| format!("{e}"))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(NotePageDraft {
                        content: p.content,
                        images,
                    })
                })
                .collect::<Result<Vec<_>, String>>()?
        };

        let mut draft = NoteDraft::new(
            title,
            SubjectId::new(subject_id),
            CategoryId::new(category_id),
            pages,
        );
        draft.title_en = self.title_en;
        draft.title_si = self.title_si;
        draft.difficulty = difficulty(self.difficulty.as_deref())?;
        draft.estimated_read_time = self.estimated_read_time.unwrap_or(0);
        draft.tags = self.tags;
        draft.assigned_students = students(&self.assigned_students)?;
        if let Some(author) = self.created_by.filter(|a| !a.trim().is_empty()) {
            draft.created_by = author;
        }
        Ok(draft)
    }
}

fn parse_items<T: for<'de> Deserialize<'de>>(json: &str) -> Result<Vec<T>, ImportError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Array(items) = value else {
        return Err(ImportError::NotAnArray);
    };
    if items.is_empty() {
        return Err(ImportError::Empty);
    }
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| ImportError::InvalidItem {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Validates and stores uploaded JSON batches.
#[derive(Clone)]
pub struct ImportService {
    clock: Clock,
    notes: Arc<dyn NoteRepository>,
    questions: Arc<dyn QuestionRepository>,
}

impl ImportService {
    #[must_use]
    pub fn new(
        clock: Clock,
        notes: Arc<dyn NoteRepository>,
        questions: Arc<dyn QuestionRepository>,
    ) -> Self {
        Self {
            clock,
            notes,
            questions,
        }
    }

    /// Import an array of questions. Returns the new ids in payload order.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` if the payload is malformed or any item is
    /// invalid; nothing is stored in that case.
    pub async fn import_questions(&self, json: &str) -> Result<Vec<QuestionId>, ImportError> {
        let now = self.clock.now();
        let questions = parse_items::<RawQuestion>(json)?
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                raw.into_draft()
                    .and_then(|d| d.validate(now).map_err(|e| e.to_string()))
                    .map(|v| v.assign_id(QuestionId::new(1)))
                    .map_err(|reason| ImportError::InvalidItem { index, reason })
            })
            .collect::<Result<Vec<Question>, _>>()?;

        let ids = self.questions.insert_new_questions(&questions).await?;
        log::info!("imported {} questions", ids.len());
        Ok(ids)
    }

    /// Import an array of notes. Returns the new ids in payload order.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` if the payload is malformed or any item is
    /// invalid; nothing is stored in that case.
    pub async fn import_notes(&self, json: &str) -> Result<Vec<NoteId>, ImportError> {
        let now = self.clock.now();
        let notes = parse_items::<RawNote>(json)?
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                raw.into_draft()
                    .and_then(|d| d.validate(now).map_err(|e| e.to_string()))
                    .map(|v| v.assign_id(NoteId::new(1)))
                    .map_err(|reason| ImportError::InvalidItem { index, reason })
            })
            .collect::<Result<Vec<Note>, _>>()?;

        let ids = self.notes.insert_new_notes(&notes).await?;
        log::info!("imported {} notes", ids.len());
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> ImportService {
        ImportService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn imports_questions_with_defaults() {
        let repo = InMemoryRepository::new();
        let json = r#"[
            {"question": "Unit of force?", "options": ["Newton", "Joule"], "correctAnswer": 0,
             "noteId": "3", "subjectId": 2},
            {"question": "Unit of energy?", "options": ["Newton", "Joule", "Watt"], "correctAnswer": 1,
             "noteId": 3, "subjectId": "2", "difficulty": "hard", "explanation": "Work done."}
        ]"#;
        let ids = service(&repo).import_questions(json).await.unwrap();
        assert_eq!(ids.len(), 2);

        let first = repo.get_question(ids[0]).await.unwrap().unwrap();
        assert_eq!(first.difficulty(), Difficulty::Medium);
        assert_eq!(first.points(), 1);
        assert_eq!(first.explanation(), "");
        assert_eq!(first.note_id(), NoteId::new(3));

        let second = repo.get_question(ids[1]).await.unwrap().unwrap();
        assert_eq!(second.difficulty(), Difficulty::Hard);
        assert_eq!(second.correct_option(), "Joule");
    }

    #[tokio::test]
    async fn one_bad_question_rejects_the_batch() {
        let repo = InMemoryRepository::new();
        let json = r#"[
            {"question": "ok?", "options": ["a", "b"], "correctAnswer": 1, "noteId": 1, "subjectId": 1},
            {"question": "bad?", "options": ["a", "b"], "correctAnswer": 2, "noteId": 1, "subjectId": 1}
        ]"#;
        let err = service(&repo).import_questions(json).await.unwrap_err();
        assert!(matches!(err, ImportError::InvalidItem { index: 1, .. }));
        assert!(repo.list_questions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_non_array_and_bad_json() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        assert!(matches!(
            service.import_notes(r#"{"title": "x"}"#).await,
            Err(ImportError::NotAnArray)
        ));
        assert!(matches!(
            service.import_notes("[").await,
            Err(ImportError::Json(_))
        ));
        assert!(matches!(
            service.import_notes("[]").await,
            Err(ImportError::Empty)
        ));
    }

    #[tokio::test]
    async fn legacy_content_becomes_first_page() {
        let repo = InMemoryRepository::new();
        let json = r#"[
            {"title": "Waves", "subjectId": "1", "categoryId": "1", "content": "Waves carry energy."},
            {"title": "Optics", "subjectId": 1, "categoryId": 1, "titleSi": "ප්‍රකාශ විද්‍යාව",
             "pages": [
                {"pageNumber": 2, "content": "Refraction bends light."},
                {"pageNumber": 1, "content": "Reflection obeys the law of reflection."}
             ]}
        ]"#;
        let ids = service(&repo).import_notes(json).await.unwrap();

        let waves = repo.get_note(ids[0]).await.unwrap().unwrap();
        assert_eq!(waves.total_pages(), 1);
        assert_eq!(waves.title_en(), "Waves");

        let optics = repo.get_note(ids[1]).await.unwrap().unwrap();
        assert_eq!(optics.total_pages(), 2);
        assert!(optics.page(1).unwrap().content.starts_with("Reflection"));
    }

    #[tokio::test]
    async fn note_without_content_or_pages_is_invalid() {
        let repo = InMemoryRepository::new();
        let json = r#"[{"title": "Empty", "subjectId": 1, "categoryId": 1, "content": "  "}]"#;
        let err = service(&repo).import_notes(json).await.unwrap_err();
        assert!(matches!(err, ImportError::InvalidItem { index: 0, .. }));
    }
}
