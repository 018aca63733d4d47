use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, rng};

use exam_core::model::{Question, QuestionId, QuizAttemptResult, QuizScope, QuizSummary, StudentId};
use exam_core::scoring::{ScoreReport, score_answers};
use exam_core::time::seconds_between;

use crate::error::QuizError;

/// Overall time allowed for one quiz.
pub const QUIZ_TIME_LIMIT_SECS: u32 = 300;

//
// ─── FEEDBACK ──────────────────────────────────────────────────────────────────
//

/// What the student sees right after submitting a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub selected: Option<usize>,
    pub is_correct: bool,
    pub correct_index: usize,
    /// Only set for wrong or skipped answers with a non-empty explanation.
    pub explanation: Option<String>,
    pub time_spent_secs: u32,
}

/// Snapshot of how far a quiz has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory quiz for one student.
///
/// Steps through the selected questions in order. Every question gets exactly
/// one `QuizAttemptResult`, either from an answer, a skip, or time running out.
#[derive(Debug, Clone)]
pub struct QuizSession {
    student_id: StudentId,
    scope: QuizScope,
    title: String,
    questions: Vec<Question>,
    results: Vec<QuizAttemptResult>,
    time_limit_secs: u32,
    started_at: DateTime<Utc>,
    question_started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    summary_id: Option<i64>,
}

impl QuizSession {
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` if `questions` is empty.
    pub fn new(
        student_id: StudentId,
        scope: QuizScope,
        title: impl Into<String>,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        Ok(Self {
            student_id,
            scope,
            title: title.into(),
            questions,
            results: Vec::new(),
            time_limit_secs: QUIZ_TIME_LIMIT_SECS,
            started_at,
            question_started_at: started_at,
            completed_at: None,
            summary_id: None,
        })
    }

    #[must_use]
    pub fn with_time_limit(mut self, secs: u32) -> Self {
        self.time_limit_secs = secs;
        self
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn scope(&self) -> QuizScope {
        self.scope
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn results(&self) -> &[QuizAttemptResult] {
        &self.results
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn summary_id(&self) -> Option<i64> {
        self.summary_id
    }

    pub(crate) fn set_summary_id(&mut self, id: i64) {
        self.summary_id = Some(id);
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_complete() {
            return None;
        }
        self.questions.get(self.results.len())
    }

    /// Zero-based position of the current question.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        QuizProgress {
            total: self.questions.len(),
            answered: self.results.iter().filter(|r| r.is_answered()).count(),
            remaining: self.questions.len().saturating_sub(self.results.len()),
            is_complete: self.is_complete(),
        }
    }

    /// Seconds left on the overall timer at `now`.
    #[must_use]
    pub fn time_remaining(&self, now: DateTime<Utc>) -> u32 {
        let end = self.completed_at.unwrap_or(now);
        self.time_limit_secs
            .saturating_sub(seconds_between(self.started_at, end))
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_complete() && self.time_remaining(now) == 0
    }

    /// Submit an option for the current question and advance.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Completed` once every question has a result.
    /// Returns `QuizError::InvalidOption` if `selected` is not one of the options.
    pub fn answer_current(
        &mut self,
        selected: usize,
        at: DateTime<Utc>,
    ) -> Result<AnswerFeedback, QuizError> {
        let question = self.current_question().ok_or(QuizError::Completed)?;
        let options = question.options().len();
        if selected >= options {
            return Err(QuizError::InvalidOption { selected, options });
        }
        Ok(self.record(Some(selected), at))
    }

    /// Move on without answering; the question counts as unanswered.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Completed` once every question has a result.
    pub fn skip_current(&mut self, at: DateTime<Utc>) -> Result<AnswerFeedback, QuizError> {
        if self.current_question().is_none() {
            return Err(QuizError::Completed);
        }
        Ok(self.record(None, at))
    }

    /// Stop the quiz because the timer ran out.
    ///
    /// The current question keeps the time spent on it; every later question
    /// is recorded as unanswered with no time.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Completed` if the quiz already finished.
    pub fn time_up(&mut self, at: DateTime<Utc>) -> Result<(), QuizError> {
        if self.is_complete() {
            return Err(QuizError::Completed);
        }
        let mut spent = seconds_between(self.question_started_at, at);
        while let Some(question) = self.questions.get(self.results.len()) {
            self.results
                .push(QuizAttemptResult::grade(question, None, spent));
            spent = 0;
        }
        self.completed_at = Some(at);
        Ok(())
    }

    fn record(&mut self, selected: Option<usize>, at: DateTime<Utc>) -> AnswerFeedback {
        let index = self.results.len();
        let question = &self.questions[index];
        let spent = seconds_between(self.question_started_at, at);
        let result = QuizAttemptResult::grade(question, selected, spent);

        let explanation = (!result.is_correct() && !question.explanation().is_empty())
            .then(|| question.explanation().to_owned());
        let feedback = AnswerFeedback {
            question_id: question.id(),
            selected,
            is_correct: result.is_correct(),
            correct_index: question.correct_index(),
            explanation,
            time_spent_secs: spent,
        };

        self.results.push(result);
        self.question_started_at = at;
        if self.results.len() == self.questions.len() {
            self.completed_at = Some(at);
        }
        feedback
    }

    /// Start over with the same questions in a new random order.
    pub fn restart(&mut self, at: DateTime<Utc>) {
        self.restart_with(at, &mut rng());
    }

    pub fn restart_with<R: Rng + ?Sized>(&mut self, at: DateTime<Utc>, rng: &mut R) {
        self.questions.as_mut_slice().shuffle(rng);
        self.results.clear();
        self.started_at = at;
        self.question_started_at = at;
        self.completed_at = None;
        self.summary_id = None;
    }

    /// Score what has been recorded so far; questions without a result count as unanswered.
    #[must_use]
    pub fn report(&self) -> ScoreReport {
        let answers: Vec<Option<usize>> = self
            .results
            .iter()
            .map(QuizAttemptResult::selected)
            .collect();
        score_answers(&self.questions, &answers)
    }

    /// Total seconds the quiz ran, capped at the time limit.
    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        let end = self.completed_at.unwrap_or(self.question_started_at);
        seconds_between(self.started_at, end).min(self.time_limit_secs)
    }

    /// Build the persisted summary for a completed quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotComplete` before the last question is recorded.
    pub fn build_summary(&self) -> Result<QuizSummary, QuizError> {
        let completed_at = self.completed_at.ok_or(QuizError::NotComplete)?;
        Ok(QuizSummary::from_report(
            self.student_id,
            self.scope,
            self.started_at,
            completed_at,
            &self.report(),
            self.time_spent_secs(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::{NoteId, QuestionDraft, SubjectId};
    use exam_core::scoring::ScoreBand;
    use exam_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn question(id: u64, correct: usize) -> Question {
        let mut draft = QuestionDraft::new(
            format!("Q{id}"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
            NoteId::new(1),
            SubjectId::new(1),
        );
        draft.explanation = format!("Because {id}");
        draft
            .validate(fixed_now())
            .unwrap()
            .assign_id(QuestionId::new(id))
    }

    fn session() -> QuizSession {
        let questions = vec![question(1, 0), question(2, 1), question(3, 2), question(4, 0)];
        QuizSession::new(StudentId::new(1), QuizScope::All, "Random Quiz", questions, fixed_now())
            .unwrap()
    }

    #[test]
    fn empty_question_list_is_rejected() {
        let err = QuizSession::new(StudentId::new(1), QuizScope::All, "x", vec![], fixed_now())
            .unwrap_err();
        assert!(matches!(err, QuizError::NoQuestions));
    }

    #[test]
    fn three_of_four_scores_seventy_five() {
        let mut s = session();
        let t0 = fixed_now();
        s.answer_current(0, t0 + Duration::seconds(5)).unwrap();
        s.answer_current(1, t0 + Duration::seconds(9)).unwrap();
        let wrong = s.answer_current(3, t0 + Duration::seconds(20)).unwrap();
        assert!(!wrong.is_correct);
        assert_eq!(wrong.correct_index, 2);
        assert_eq!(wrong.explanation.as_deref(), Some("Because 3"));
        assert_eq!(wrong.time_spent_secs, 11);
        let last = s.answer_current(0, t0 + Duration::seconds(30)).unwrap();
        assert!(last.is_correct);
        assert_eq!(last.explanation, None);

        assert!(s.is_complete());
        let report = s.report();
        assert_eq!(report.correct, 3);
        assert_eq!(report.incorrect, 1);
        assert_eq!(report.score, 75);
        assert_eq!(report.band(), ScoreBand::Good);

        let summary = s.build_summary().unwrap();
        assert_eq!(summary.score(), 75);
        assert_eq!(summary.time_spent_secs(), 30);
        assert!(matches!(
            s.answer_current(0, t0 + Duration::seconds(31)),
            Err(QuizError::Completed)
        ));
    }

    #[test]
    fn time_up_marks_current_and_remaining_unanswered() {
        let mut s = session();
        let t0 = fixed_now();
        s.answer_current(0, t0 + Duration::seconds(100)).unwrap();
        s.time_up(t0 + Duration::seconds(300)).unwrap();

        let results = s.results();
        assert_eq!(results.len(), 4);
        assert_eq!(results[1].time_spent_secs(), 200);
        assert!(results[1..].iter().all(|r| !r.is_answered()));
        assert!(results[2..].iter().all(|r| r.time_spent_secs() == 0));

        let report = s.report();
        assert_eq!(report.correct, 1);
        assert_eq!(report.unanswered, 3);
        assert_eq!(report.score, 25);
        assert_eq!(s.time_remaining(t0 + Duration::seconds(400)), 0);
        assert!(matches!(s.time_up(t0), Err(QuizError::Completed)));
    }

    #[test]
    fn skip_counts_as_unanswered_and_shows_explanation() {
        let mut s = session();
        let feedback = s.skip_current(fixed_now()).unwrap();
        assert_eq!(feedback.selected, None);
        assert_eq!(feedback.explanation.as_deref(), Some("Because 1"));
        assert_eq!(s.progress().answered, 0);
        assert_eq!(s.progress().remaining, 3);
    }

    #[test]
    fn out_of_range_option_is_rejected_without_advancing() {
        let mut s = session();
        let err = s.answer_current(4, fixed_now()).unwrap_err();
        assert!(matches!(err, QuizError::InvalidOption { selected: 4, options: 4 }));
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn summary_requires_completion() {
        let s = session();
        assert!(matches!(s.build_summary(), Err(QuizError::NotComplete)));
    }

    #[test]
    fn restart_resets_and_keeps_question_set() {
        let mut s = session();
        s.answer_current(0, fixed_now()).unwrap();
        s.set_summary_id(9);
        let later = fixed_now() + Duration::seconds(60);
        s.restart_with(later, &mut StdRng::seed_from_u64(11));

        assert!(s.results().is_empty());
        assert_eq!(s.summary_id(), None);
        assert_eq!(s.started_at(), later);
        assert_eq!(s.time_remaining(later), QUIZ_TIME_LIMIT_SECS);
        let mut ids: Vec<u64> = s.questions().iter().map(|q| q.id().value()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
