//! Quiz scoring: compare submitted answers with the correct ones.
//!
//! Scoring never fails. An empty quiz scores 0, a missing answer counts as
//! unanswered, and an index outside the option list counts as incorrect.

use serde::{Deserialize, Serialize};

use crate::model::{Question, QuizAttemptResult};

/// Counts and percentage for one scored quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreReport {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
    /// `round(100 * correct / total)`, 0 for an empty quiz.
    pub score: u8,
    pub points_earned: u32,
    pub points_possible: u32,
}

impl ScoreReport {
    #[must_use]
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.correct + self.incorrect
    }
}

/// Score `answers` against `questions`, position by position.
///
/// `answers[i]` is the option picked for `questions[i]`, `None` when skipped.
/// Answers past the end of `questions` are ignored; questions past the end of
/// `answers` are unanswered.
#[must_use]
pub fn score_answers(questions: &[Question], answers: &[Option<usize>]) -> ScoreReport {
    let mut report = ScoreReport::default();

    for (idx, question) in questions.iter().enumerate() {
        report.total = report.total.saturating_add(1);
        report.points_possible = report.points_possible.saturating_add(question.points());

        match answers.get(idx).copied().flatten() {
            None => report.unanswered += 1,
            Some(selected) if question.is_correct(selected) => {
                report.correct += 1;
                report.points_earned = report.points_earned.saturating_add(question.points());
            }
            Some(_) => report.incorrect += 1,
        }
    }

    report.score = percentage(report.correct, report.total);
    report
}

/// Score already-graded results. Points are not known here, so each result
/// is worth one point.
#[must_use]
pub fn score_results(results: &[QuizAttemptResult]) -> ScoreReport {
    let mut report = ScoreReport::default();
    for result in results {
        report.total = report.total.saturating_add(1);
        if !result.is_answered() {
            report.unanswered += 1;
        } else if result.is_correct() {
            report.correct += 1;
        } else {
            report.incorrect += 1;
        }
    }
    report.points_possible = report.total;
    report.points_earned = report.correct;
    report.score = percentage(report.correct, report.total);
    report
}

/// `round(100 * part / whole)` with half-up rounding, clamped to 0..=100.
///
/// Returns 0 when `whole` is 0.
#[must_use]
pub fn percentage(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = u64::from(part.min(whole));
    let whole = u64::from(whole);
    let pct = (part * 200 + whole) / (whole * 2);
    u8::try_from(pct).unwrap_or(100)
}

//
// ─── FEEDBACK BANDS ────────────────────────────────────────────────────────────
//

/// Coarse feedback level for a percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Great,
    Good,
    Fair,
    NeedsWork,
}

impl ScoreBand {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => ScoreBand::Excellent,
            80..=89 => ScoreBand::Great,
            70..=79 => ScoreBand::Good,
            60..=69 => ScoreBand::Fair,
            _ => ScoreBand::NeedsWork,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent! Outstanding performance!",
            ScoreBand::Great => "Great job! You're doing well!",
            ScoreBand::Good => "Good work! Keep it up!",
            ScoreBand::Fair => "Not bad! Room for improvement.",
            ScoreBand::NeedsWork => "Keep studying! You'll get better!",
        }
    }

    /// Whether the score counts as a pass (60 and above).
    #[must_use]
    pub fn is_passing(self) -> bool {
        !matches!(self, ScoreBand::NeedsWork)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NoteId, QuestionDraft, QuestionId, SubjectId};
    use crate::time::fixed_now;

    fn question(id: u64, correct: usize, points: u32) -> Question {
        let mut draft = QuestionDraft::new(
            format!("Q{id}"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
            NoteId::new(1),
            SubjectId::new(1),
        );
        draft.points = points;
        draft
            .validate(fixed_now())
            .unwrap()
            .assign_id(QuestionId::new(id))
    }

    fn pool(correct: &[usize]) -> Vec<Question> {
        correct
            .iter()
            .enumerate()
            .map(|(i, c)| question(i as u64 + 1, *c, 1))
            .collect()
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let report = score_answers(&[], &[]);
        assert_eq!(report, ScoreReport::default());
        assert_eq!(report.score, 0);
    }

    #[test]
    fn worked_example_scores_75() {
        let questions = pool(&[0, 1, 2, 0]);
        let report = score_answers(&questions, &[Some(0), Some(1), Some(3), Some(0)]);
        assert_eq!(report.correct, 3);
        assert_eq!(report.incorrect, 1);
        assert_eq!(report.unanswered, 0);
        assert_eq!(report.score, 75);
        assert_eq!(report.band(), ScoreBand::Good);
    }

    #[test]
    fn all_correct_is_100_and_none_correct_is_0() {
        let questions = pool(&[0, 1, 2]);
        assert_eq!(score_answers(&questions, &[Some(0), Some(1), Some(2)]).score, 100);
        assert_eq!(score_answers(&questions, &[Some(1), Some(2), Some(0)]).score, 0);
    }

    #[test]
    fn missing_and_out_of_range_answers() {
        let questions = pool(&[0, 1, 2]);
        let report = score_answers(&questions, &[Some(9), None]);
        assert_eq!(report.incorrect, 1);
        assert_eq!(report.unanswered, 2);
        assert_eq!(report.correct, 0);
        assert_eq!(report.total, 3);
    }

    #[test]
    fn extra_answers_are_ignored() {
        let questions = pool(&[1]);
        let report = score_answers(&questions, &[Some(1), Some(0), Some(3)]);
        assert_eq!(report.total, 1);
        assert_eq!(report.score, 100);
    }

    #[test]
    fn score_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(7, 5), 100);
    }

    #[test]
    fn score_stays_in_bounds() {
        for total in 1..=12_u32 {
            for correct in 0..=total {
                let pct = percentage(correct, total);
                assert!(pct <= 100, "{correct}/{total} -> {pct}");
            }
        }
    }

    #[test]
    fn points_follow_question_values() {
        let questions = vec![question(1, 0, 3), question(2, 1, 2)];
        let report = score_answers(&questions, &[Some(0), Some(0)]);
        assert_eq!(report.points_possible, 5);
        assert_eq!(report.points_earned, 3);
    }

    #[test]
    fn graded_results_score_the_same() {
        let questions = pool(&[0, 1, 2, 0]);
        let answers = [Some(0), Some(1), Some(3), None];
        let results: Vec<_> = questions
            .iter()
            .zip(answers)
            .map(|(q, a)| QuizAttemptResult::grade(q, a, 5))
            .collect();
        let from_results = score_results(&results);
        let from_answers = score_answers(&questions, &answers);
        assert_eq!(from_results.correct, from_answers.correct);
        assert_eq!(from_results.unanswered, 1);
        assert_eq!(from_results.score, 50);
    }

    #[test]
    fn bands_match_thresholds() {
        assert_eq!(ScoreBand::from_score(100), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(90), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(89), ScoreBand::Great);
        assert_eq!(ScoreBand::from_score(70), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(60), ScoreBand::Fair);
        assert_eq!(ScoreBand::from_score(59), ScoreBand::NeedsWork);
        assert!(!ScoreBand::NeedsWork.is_passing());
        assert_eq!(ScoreBand::Fair.message(), "Not bad! Room for improvement.");
    }
}
