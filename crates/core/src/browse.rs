//! Filtering and ordering notes for a student's dashboard.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, Note, NoteId, StudentId, SubjectId};

/// Criteria a note must satisfy to be listed. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    /// Case-insensitive substring of any title or tag.
    pub search: Option<String>,
    pub subject: Option<SubjectId>,
    pub difficulty: Option<Difficulty>,
    /// Only notes visible to this student.
    pub visible_to: Option<StudentId>,
}

impl NoteFilter {
    #[must_use]
    pub fn matches(&self, note: &Note) -> bool {
        if self.visible_to.is_some_and(|s| !note.is_visible_to(s)) {
            return false;
        }
        if self.subject.is_some_and(|s| s != note.subject_id()) {
            return false;
        }
        if self.difficulty.is_some_and(|d| d != note.difficulty()) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [note.title(), note.title_en(), note.title_si()]
                    .into_iter()
                    .chain(note.tags().iter().map(String::as_str))
                    .any(|field| field.to_lowercase().contains(&term))
            }
        }
    }
}

/// Dashboard ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteSort {
    /// Most recently updated first.
    #[default]
    Recent,
    Title,
    /// Easy before medium before hard.
    Difficulty,
    /// Highest reading progress first.
    Progress,
}

impl FromStr for NoteSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recent" => Ok(NoteSort::Recent),
            "title" => Ok(NoteSort::Title),
            "difficulty" => Ok(NoteSort::Difficulty),
            "progress" => Ok(NoteSort::Progress),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Filter then sort `notes`.
///
/// `progress` maps note ids to reading percent; notes without an entry sort as 0.
/// Ties fall back to note id so the order is stable across calls.
#[must_use]
pub fn browse_notes<'a>(
    notes: &'a [Note],
    filter: &NoteFilter,
    sort: NoteSort,
    progress: &HashMap<NoteId, u8>,
) -> Vec<&'a Note> {
    let mut out: Vec<&Note> = notes.iter().filter(|n| filter.matches(n)).collect();
    let pct = |n: &Note| progress.get(&n.id()).copied().unwrap_or(0);

    out.sort_by(|a, b| {
        let primary = match sort {
            NoteSort::Recent => b.updated_at().cmp(&a.updated_at()),
            NoteSort::Title => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
            NoteSort::Difficulty => a.difficulty().rank().cmp(&b.difficulty().rank()),
            NoteSort::Progress => pct(b).cmp(&pct(a)),
        };
        if primary == Ordering::Equal {
            a.id().cmp(&b.id())
        } else {
            primary
        }
    });
    out
}
