use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            name_en TEXT NOT NULL,
            name_si TEXT NOT NULL,
            description TEXT NOT NULL,
            thumbnail TEXT,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS subjects (
            id INTEGER PRIMARY KEY,
            category_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            name_en TEXT NOT NULL,
            name_si TEXT NOT NULL,
            description TEXT NOT NULL,
            thumbnail TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (category_id) REFERENCES categories(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS notes (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            title_en TEXT NOT NULL,
            title_si TEXT NOT NULL,
            subject_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            pages TEXT NOT NULL,
            difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
            estimated_read_time INTEGER NOT NULL CHECK (estimated_read_time >= 0),
            tags TEXT NOT NULL,
            assigned_students TEXT NOT NULL,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            prompt TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_index INTEGER NOT NULL CHECK (correct_index >= 0),
            explanation TEXT NOT NULL,
            note_id INTEGER NOT NULL,
            subject_id INTEGER NOT NULL,
            difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
            points INTEGER NOT NULL CHECK (points > 0),
            time_limit_secs INTEGER CHECK (time_limit_secs IS NULL OR time_limit_secs > 0),
            assigned_students TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            last_login TEXT
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_summaries (
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            scope_kind TEXT NOT NULL CHECK (scope_kind IN ('all', 'note', 'subject')),
            scope_id INTEGER,
            started_at TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
            correct INTEGER NOT NULL CHECK (correct >= 0),
            incorrect INTEGER NOT NULL CHECK (incorrect >= 0),
            unanswered INTEGER NOT NULL CHECK (unanswered >= 0),
            score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
            points_earned INTEGER NOT NULL CHECK (points_earned >= 0),
            points_possible INTEGER NOT NULL CHECK (points_possible >= 0),
            time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_results (
            summary_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            question_id INTEGER NOT NULL,
            selected_index INTEGER,
            is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
            time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0),
            PRIMARY KEY (summary_id, position),
            FOREIGN KEY (summary_id) REFERENCES quiz_summaries(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS bookmarks (
            student_id INTEGER NOT NULL,
            note_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (student_id, note_id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS highlights (
            id TEXT PRIMARY KEY,
            student_id INTEGER NOT NULL,
            note_id INTEGER NOT NULL,
            page_number INTEGER NOT NULL,
            text TEXT NOT NULL,
            start_offset INTEGER NOT NULL,
            end_offset INTEGER NOT NULL,
            color TEXT NOT NULL,
            annotation TEXT,
            created_at TEXT NOT NULL,
            CHECK (start_offset < end_offset)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS reading_progress (
            student_id INTEGER NOT NULL,
            note_id INTEGER NOT NULL,
            current_page INTEGER NOT NULL CHECK (current_page >= 0),
            total_pages INTEGER NOT NULL CHECK (total_pages > 0),
            reading_time_secs INTEGER NOT NULL CHECK (reading_time_secs >= 0),
            words_read INTEGER NOT NULL CHECK (words_read >= 0),
            last_read TEXT NOT NULL,
            PRIMARY KEY (student_id, note_id)
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_subjects_category ON subjects (category_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_note ON questions (note_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_subject ON questions (subject_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_summaries_student_completed
            ON quiz_summaries (student_id, completed_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_highlights_student_note
            ON highlights (student_id, note_id, page_number);
    ",
];

async fn apply(pool: &SqlitePool, version: i64, statements: &[&str]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for statement in statements {
        sqlx::query(*statement).execute(&mut *tx).await?;
    }

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(version)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Bring the schema up to date. Each version runs in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: catalog, content, quiz history, and reading preferences.
    if !is_applied(pool, 1).await? {
        apply(pool, 1, SCHEMA_V1)
            .await
            .map_err(|source| SqliteInitError::Migration { version: 1, source })?;
    }

    Ok(())
}

pub async fn current_version(pool: &SqlitePool) -> Result<i64, SqliteInitError> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}
