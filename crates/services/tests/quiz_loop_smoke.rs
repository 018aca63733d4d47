use exam_core::model::{NoteId, QuizScope, StudentId};
use exam_core::time::fixed_now;
use services::{AppServices, Clock};

const QUESTIONS: &str = r#"[
    {"question": "SI unit of force?", "options": ["Newton", "Pascal"], "correctAnswer": 0, "noteId": 1, "subjectId": 1},
    {"question": "SI unit of pressure?", "options": ["Newton", "Pascal"], "correctAnswer": 1, "noteId": 1, "subjectId": 1},
    {"question": "SI unit of power?", "options": ["Watt", "Joule"], "correctAnswer": 0, "noteId": 1, "subjectId": 1},
    {"question": "Symbol for sodium?", "options": ["So", "Na"], "correctAnswer": 1, "noteId": 2, "subjectId": 2}
]"#;

#[tokio::test]
async fn quiz_loop_persists_summary_and_progress() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    app.import().import_questions(QUESTIONS).await.unwrap();

    let quiz_loop = app.quiz_loop();
    let student = StudentId::new(1);
    let mut quiz = quiz_loop
        .start_quiz(student, QuizScope::Note(NoteId::new(1)))
        .await
        .unwrap();
    assert_eq!(quiz.questions().len(), 3);

    while let Some(question) = quiz.current_question() {
        let correct = question.correct_index();
        let _ = quiz_loop.answer_current(&mut quiz, correct).await.unwrap();
    }

    let summary_id = quiz.summary_id().expect("summary persisted");
    let details = app.progress().quiz_details(summary_id).await.unwrap();
    assert_eq!(details.quiz.summary.score(), 100);
    assert_eq!(details.results.len(), 3);
    assert!(details.results.iter().all(|r| r.is_correct()));

    let progress = app
        .progress()
        .student_progress(student, QuizScope::All)
        .await
        .unwrap();
    assert_eq!(progress.total_attempts, 1);
    assert_eq!(progress.best_score, 100);
    assert_eq!(progress.questions_attempted, 3);
}
