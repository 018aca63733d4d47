use exam_core::model::{QuizScope, StudentId};
use exam_core::time::fixed_now;
use services::{AppServices, CatalogEntryInput, Clock, QuizError};

#[tokio::test]
async fn admin_flow_catalog_import_quiz_overview() {
    let app = AppServices::new_sqlite(
        "sqlite:file:memdb_admin_flow?mode=memory&cache=shared",
        Clock::fixed(fixed_now()),
        5,
    )
    .await
    .expect("connect sqlite");

    let catalog = app.catalog();
    let category = catalog
        .create_category(CatalogEntryInput::named("A/L Science"))
        .await
        .expect("create category");
    let subject = catalog
        .create_subject(category, CatalogEntryInput::named("Chemistry"))
        .await
        .expect("create subject");

    let notes = format!(
        r#"[{{"title": "Periodic Table", "subjectId": {s}, "categoryId": {c},
             "pages": [{{"pageNumber": 1, "content": "Groups run **down**."}},
                       {{"pageNumber": 2, "content": "Periods run across."}}]}}]"#,
        s = subject.value(),
        c = category.value()
    );
    let note_ids = app.import().import_notes(&notes).await.expect("import notes");
    let note = note_ids[0];

    let questions = format!(
        r#"[{{"question": "Groups run?", "options": ["down", "across"], "correctAnswer": 0,
              "noteId": {n}, "subjectId": {s}}},
            {{"question": "Periods run?", "options": ["down", "across"], "correctAnswer": 1,
              "noteId": {n}, "subjectId": {s}}}]"#,
        n = note.value(),
        s = subject.value()
    );
    app.import()
        .import_questions(&questions)
        .await
        .expect("import questions");

    let student = app
        .students()
        .register("Student User", "student@elms.lk")
        .await
        .expect("register student");

    let page = app.notes().render_page(note, 1).await.expect("render page");
    assert!(page.html.contains("<strong>down</strong>"));

    let quiz_loop = app.quiz_loop();
    let mut quiz = quiz_loop
        .start_quiz(student, QuizScope::Subject(subject))
        .await
        .expect("start quiz");
    assert_eq!(quiz.title(), "Chemistry Quiz");
    let first = quiz.current_question().expect("question").correct_index();
    quiz_loop.answer_current(&mut quiz, first).await.expect("answer");
    let result = quiz_loop.skip_current(&mut quiz).await.expect("skip");
    assert!(result.is_complete);

    let overview = app.progress().overview().await.expect("overview");
    assert_eq!(overview.total_students, 1);
    assert_eq!(overview.total_notes, 1);
    assert_eq!(overview.total_attempts, 1);
    assert_eq!(overview.average_score, 50);

    let empty = quiz_loop
        .start_quiz(StudentId::new(99), QuizScope::Note(exam_core::model::NoteId::new(999)))
        .await;
    assert!(matches!(empty, Err(QuizError::NoQuestions)));

    app.notes().delete_note(note).await.expect("delete note");
    assert!(app.questions().list_for_note(note).await.unwrap().is_empty());
}
