use rand::seq::SliceRandom;
use rand::{Rng, rng};
use std::collections::HashSet;

use exam_core::model::{Question, QuizScope, StudentId};

/// Questions per quiz when no limit is configured.
pub const DEFAULT_QUIZ_SIZE: usize = 10;

/// Selection result for a quiz build.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizPlan {
    pub scope: QuizScope,
    pub questions: Vec<Question>,
    /// Distinct questions that matched the scope before truncation.
    pub eligible: usize,
}

impl QuizPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when no questions matched; callers report "no questions available".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Picks a random, scope-filtered subset of a question pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionSetSelector {
    scope: QuizScope,
    limit: usize,
    student: Option<StudentId>,
}

impl QuestionSetSelector {
    #[must_use]
    pub fn new(scope: QuizScope) -> Self {
        Self {
            scope,
            limit: DEFAULT_QUIZ_SIZE,
            student: None,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Drop questions assigned to other students.
    #[must_use]
    pub fn for_student(mut self, student: StudentId) -> Self {
        self.student = Some(student);
        self
    }

    #[must_use]
    pub fn scope(&self) -> QuizScope {
        self.scope
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Select using the thread-local random source.
    pub fn select(&self, pool: impl IntoIterator<Item = Question>) -> QuizPlan {
        self.select_with(pool, &mut rng())
    }

    /// Filter by scope and visibility, collapse repeated ids, shuffle, then truncate.
    pub fn select_with<R: Rng + ?Sized>(
        &self,
        pool: impl IntoIterator<Item = Question>,
        rng: &mut R,
    ) -> QuizPlan {
        let mut seen = HashSet::new();
        let mut candidates: Vec<Question> = pool
            .into_iter()
            .filter(|q| self.scope.matches(q))
            .filter(|q| self.student.is_none_or(|s| q.is_visible_to(s)))
            .filter(|q| seen.insert(q.id()))
            .collect();
        let eligible = candidates.len();

        candidates.as_mut_slice().shuffle(rng);
        candidates.truncate(self.limit);

        log::debug!(
            "selected {} of {eligible} questions for {:?}",
            candidates.len(),
            self.scope
        );
        QuizPlan {
            scope: self.scope,
            questions: candidates,
            eligible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{NoteId, QuestionDraft, QuestionId, SubjectId};
    use exam_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn question(id: u64, note: u64, subject: u64) -> Question {
        QuestionDraft::new(
            format!("Question {id}"),
            vec!["a".into(), "b".into()],
            0,
            NoteId::new(note),
            SubjectId::new(subject),
        )
        .validate(fixed_now())
        .unwrap()
        .assign_id(QuestionId::new(id))
    }

    fn pool(n: u64) -> Vec<Question> {
        (1..=n).map(|id| question(id, id % 3, id % 2)).collect()
    }

    #[test]
    fn truncates_to_default_size() {
        let plan = QuestionSetSelector::new(QuizScope::All)
            .select_with(pool(25), &mut StdRng::seed_from_u64(7));
        assert_eq!(plan.total(), DEFAULT_QUIZ_SIZE);
        assert_eq!(plan.eligible, 25);
    }

    #[test]
    fn smaller_pool_is_returned_whole_without_duplicates() {
        let mut questions = pool(4);
        questions.push(question(2, 2, 0));
        questions.push(question(3, 0, 1));
        let plan = QuestionSetSelector::new(QuizScope::All)
            .select_with(questions, &mut StdRng::seed_from_u64(1));
        assert_eq!(plan.total(), 4);
        let ids: HashSet<_> = plan.questions.iter().map(Question::id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn filters_by_note_and_subject() {
        let plan = QuestionSetSelector::new(QuizScope::Note(NoteId::new(1)))
            .select_with(pool(12), &mut StdRng::seed_from_u64(3));
        assert_eq!(plan.total(), 4);
        assert!(plan.questions.iter().all(|q| q.note_id() == NoteId::new(1)));

        let plan = QuestionSetSelector::new(QuizScope::Subject(SubjectId::new(0)))
            .with_limit(3)
            .select_with(pool(12), &mut StdRng::seed_from_u64(3));
        assert_eq!(plan.total(), 3);
        assert_eq!(plan.eligible, 6);
        assert!(plan.questions.iter().all(|q| q.subject_id() == SubjectId::new(0)));
    }

    #[test]
    fn empty_scope_yields_empty_plan() {
        let plan = QuestionSetSelector::new(QuizScope::Note(NoteId::new(99))).select(pool(5));
        assert!(plan.is_empty());
        assert_eq!(plan.eligible, 0);
    }

    #[test]
    fn same_seed_gives_same_order() {
        let selector = QuestionSetSelector::new(QuizScope::All).with_limit(5);
        let a = selector.select_with(pool(20), &mut StdRng::seed_from_u64(42));
        let b = selector.select_with(pool(20), &mut StdRng::seed_from_u64(42));
        let ids = |p: &QuizPlan| p.questions.iter().map(Question::id).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn student_filter_hides_questions_assigned_elsewhere() {
        let mut assigned = QuestionDraft::new(
            "Private",
            vec!["a".into(), "b".into()],
            0,
            NoteId::new(1),
            SubjectId::new(1),
        );
        assigned.assigned_students = vec![StudentId::new(2)];
        let assigned = assigned
            .validate(fixed_now())
            .unwrap()
            .assign_id(QuestionId::new(100));

        let mut questions = pool(3);
        questions.push(assigned);

        let plan = QuestionSetSelector::new(QuizScope::All)
            .for_student(StudentId::new(1))
            .select_with(questions.clone(), &mut StdRng::seed_from_u64(5));
        assert_eq!(plan.total(), 3);

        let plan = QuestionSetSelector::new(QuizScope::All)
            .for_student(StudentId::new(2))
            .select_with(questions, &mut StdRng::seed_from_u64(5));
        assert_eq!(plan.total(), 4);
    }
}
