//! Folding quiz history into per-student and class-wide statistics.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{QuizScope, QuizSummary, ReadingProgress, Student, StudentId};

/// Rounded mean of a set of 0..=100 scores; 0 when empty.
fn mean_score(sum: u64, count: u64) -> u8 {
    if count == 0 {
        return 0;
    }
    let avg = (sum * 2 + count) / (count * 2);
    u8::try_from(avg.min(100)).unwrap_or(100)
}

//
// ─── PER STUDENT ───────────────────────────────────────────────────────────────
//

/// Aggregate statistics for one student's quiz history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_attempts: u32,
    pub average_score: u8,
    pub best_score: u8,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub questions_attempted: u32,
    pub questions_correct: u32,
}

impl ProgressSummary {
    /// Fold `summaries` that fall within `scope`.
    ///
    /// Scopes match on how the quiz was started, not on where its questions
    /// came from: a `Subject` filter only counts subject-scoped quizzes, never
    /// note-scoped or random ones built from that subject's questions.
    /// `QuizScope::All` counts everything.
    ///
    /// Summaries are expected to belong to a single student; no check is made.
    #[must_use]
    pub fn from_summaries(summaries: &[QuizSummary], scope: QuizScope) -> Self {
        let mut out = Self::default();
        let mut score_sum: u64 = 0;

        for summary in summaries.iter().filter(|s| s.scope().within(scope)) {
            out.total_attempts = out.total_attempts.saturating_add(1);
            score_sum += u64::from(summary.score());
            out.best_score = out.best_score.max(summary.score());
            out.questions_attempted = out
                .questions_attempted
                .saturating_add(summary.total_questions());
            out.questions_correct = out.questions_correct.saturating_add(summary.correct());
            out.last_attempt_at = match out.last_attempt_at {
                Some(prev) if prev >= summary.completed_at() => Some(prev),
                _ => Some(summary.completed_at()),
            };
        }

        out.average_score = mean_score(score_sum, u64::from(out.total_attempts));
        out
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_attempts == 0
    }

    /// Share of attempted questions answered correctly, as a rounded percent.
    #[must_use]
    pub fn accuracy(&self) -> u8 {
        crate::scoring::percentage(self.questions_correct, self.questions_attempted)
    }
}

//
// ─── CLASS OVERVIEW ────────────────────────────────────────────────────────────
//

/// One row of the class performance table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPerformance {
    pub student_id: StudentId,
    pub name: String,
    pub email: String,
    pub progress: ProgressSummary,
}

/// Class-wide performance view for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerformanceOverview {
    pub total_students: u32,
    pub total_notes: u32,
    pub total_attempts: u32,
    pub average_score: u8,
    /// Ordered by average score, best first; ties by name.
    pub students: Vec<StudentPerformance>,
}

impl PerformanceOverview {
    /// Build the overview from every student and every stored summary.
    ///
    /// Summaries for unknown students still count toward the totals.
    #[must_use]
    pub fn build(students: &[Student], total_notes: u32, summaries: &[QuizSummary]) -> Self {
        let mut by_student: HashMap<StudentId, Vec<QuizSummary>> = HashMap::new();
        let mut score_sum: u64 = 0;
        for summary in summaries {
            score_sum += u64::from(summary.score());
            by_student
                .entry(summary.student_id())
                .or_default()
                .push(summary.clone());
        }

        let mut rows: Vec<StudentPerformance> = students
            .iter()
            .map(|student| {
                let history = by_student
                    .get(&student.id())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                StudentPerformance {
                    student_id: student.id(),
                    name: student.name().to_owned(),
                    email: student.email().to_owned(),
                    progress: ProgressSummary::from_summaries(history, QuizScope::All),
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.progress
                .average_score
                .cmp(&a.progress.average_score)
                .then_with(|| a.name.cmp(&b.name))
        });

        let total_attempts = u32::try_from(summaries.len()).unwrap_or(u32::MAX);
        Self {
            total_students: u32::try_from(students.len()).unwrap_or(u32::MAX),
            total_notes,
            total_attempts,
            average_score: mean_score(score_sum, u64::from(total_attempts)),
            students: rows,
        }
    }
}

//
// ─── READING ───────────────────────────────────────────────────────────────────
//

/// Totals across a student's reading progress records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadingTotals {
    pub notes_started: u32,
    pub notes_completed: u32,
    pub reading_time_secs: u64,
    pub words_read: u64,
}

impl ReadingTotals {
    #[must_use]
    pub fn from_progress(records: &[ReadingProgress]) -> Self {
        records.iter().fold(Self::default(), |mut acc, p| {
            acc.notes_started = acc.notes_started.saturating_add(1);
            if p.percent() >= 100 {
                acc.notes_completed = acc.notes_completed.saturating_add(1);
            }
            acc.reading_time_secs += u64::from(p.reading_time_secs());
            acc.words_read += u64::from(p.words_read());
            acc
        })
    }

    /// Whole minutes spent reading, rounded down.
    #[must_use]
    pub fn reading_minutes(&self) -> u64 {
        self.reading_time_secs / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NoteId, SubjectId};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn summary(student: u64, scope: QuizScope, correct: u32, total: u32, offset_min: i64) -> QuizSummary {
        let started = fixed_now() + Duration::minutes(offset_min);
        QuizSummary::from_persisted(
            StudentId::new(student),
            scope,
            started,
            started + Duration::minutes(5),
            total,
            correct,
            total - correct,
            0,
            crate::scoring::percentage(correct, total),
            correct,
            total,
            300,
        )
        .unwrap()
    }

    fn student(id: u64, name: &str) -> Student {
        Student::new(
            StudentId::new(id),
            name,
            format!("{}@elms.lk", name.to_lowercase()),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn empty_history_is_all_zero() {
        let progress = ProgressSummary::from_summaries(&[], QuizScope::All);
        assert_eq!(progress.total_attempts, 0);
        assert_eq!(progress.average_score, 0);
        assert_eq!(progress.best_score, 0);
        assert!(progress.last_attempt_at.is_none());
        assert!(progress.is_empty());
        assert_eq!(progress.accuracy(), 0);
    }

    #[test]
    fn folds_scores_counts_and_latest_time() {
        let history = vec![
            summary(1, QuizScope::All, 8, 10, 0),
            summary(1, QuizScope::All, 5, 10, 60),
            summary(1, QuizScope::All, 10, 10, 30),
        ];
        let progress = ProgressSummary::from_summaries(&history, QuizScope::All);
        assert_eq!(progress.total_attempts, 3);
        // (80 + 50 + 100) / 3 = 76.67
        assert_eq!(progress.average_score, 77);
        assert_eq!(progress.best_score, 100);
        assert_eq!(progress.questions_attempted, 30);
        assert_eq!(progress.questions_correct, 23);
        assert_eq!(
            progress.last_attempt_at,
            Some(fixed_now() + Duration::minutes(65))
        );
    }

    #[test]
    fn scope_filter_keeps_matching_summaries() {
        let physics = QuizScope::Subject(SubjectId::new(1));
        let history = vec![
            summary(1, physics, 4, 4, 0),
            summary(1, QuizScope::Note(NoteId::new(3)), 0, 4, 10),
            summary(1, QuizScope::All, 2, 4, 20),
        ];
        let scoped = ProgressSummary::from_summaries(&history, physics);
        assert_eq!(scoped.total_attempts, 1);
        assert_eq!(scoped.average_score, 100);

        let all = ProgressSummary::from_summaries(&history, QuizScope::All);
        assert_eq!(all.total_attempts, 3);
    }

    #[test]
    fn overview_ranks_students_and_counts_everything() {
        let students = vec![student(1, "Amal"), student(2, "Nimal"), student(3, "Kamal")];
        let summaries = vec![
            summary(1, QuizScope::All, 6, 10, 0),
            summary(2, QuizScope::All, 9, 10, 0),
            summary(2, QuizScope::All, 7, 10, 10),
        ];
        let overview = PerformanceOverview::build(&students, 12, &summaries);
        assert_eq!(overview.total_students, 3);
        assert_eq!(overview.total_notes, 12);
        assert_eq!(overview.total_attempts, 3);
        // (60 + 90 + 70) / 3 = 73.33
        assert_eq!(overview.average_score, 73);

        let names: Vec<_> = overview.students.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Nimal", "Amal", "Kamal"]);
        assert_eq!(overview.students[0].progress.average_score, 80);
        assert_eq!(overview.students[2].progress.total_attempts, 0);
    }

    #[test]
    fn overview_of_nothing_is_default() {
        let overview = PerformanceOverview::build(&[], 0, &[]);
        assert_eq!(overview, PerformanceOverview::default());
    }

    #[test]
    fn reading_totals_sum_records() {
        let records = vec![
            ReadingProgress::new(StudentId::new(1), NoteId::new(1), 2, 3, 120, 400, fixed_now()).unwrap(),
            ReadingProgress::new(StudentId::new(1), NoteId::new(2), 0, 4, 90, 150, fixed_now()).unwrap(),
        ];
        let totals = ReadingTotals::from_progress(&records);
        assert_eq!(totals.notes_started, 2);
        assert_eq!(totals.notes_completed, 1);
        assert_eq!(totals.reading_time_secs, 210);
        assert_eq!(totals.words_read, 550);
        assert_eq!(totals.reading_minutes(), 3);
    }
}
