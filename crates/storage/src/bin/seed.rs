use std::fmt;

use chrono::{DateTime, Duration, Utc};
use exam_core::model::{
    Category, CategoryId, Difficulty, LocalizedName, NoteDraft, NoteId, NotePageDraft,
    QuestionDraft, QuestionId, QuizScope, QuizSummary, Student, StudentId, Subject, SubjectId,
};
use exam_core::scoring::percentage;
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    quizzes: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizzes { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizzes { raw } => write!(f, "invalid --quizzes value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("EXAM_DB_URL").unwrap_or_else(|_| "sqlite:exam.sqlite3".into());
        let mut quizzes = std::env::var("EXAM_SEED_QUIZZES")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--quizzes" => {
                    let value = require_value(&mut args, "--quizzes")?;
                    quizzes = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidQuizzes { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            quizzes,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:exam.sqlite3)");
    eprintln!("  --quizzes <n>             Sample quiz summaries for the demo student (default: 3)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  EXAM_DB_URL, EXAM_SEED_QUIZZES");
}

fn names(name: &str, name_si: &str) -> Result<LocalizedName, Box<dyn std::error::Error>> {
    Ok(LocalizedName::new(name, None, Some(name_si.to_owned()))?)
}

const MECHANICS_P1: &str = "# Introduction to Mechanics

Mechanics is a branch of physics that deals with the motion of objects and the forces that cause this motion.

## What is Mechanics?

- **Kinematics**: the study of motion without considering forces
- **Dynamics**: the study of forces and their effects on motion";

const MECHANICS_P2: &str = "## Key Concepts in Kinematics

**Velocity-Time Relationship:** v = u + at

**Displacement-Time Relationship:** s = ut + ½at²

**Velocity-Displacement Relationship:** v² = u² + 2as";

const ORGANIC_P1: &str = "# Organic Chemistry Basics

Organic chemistry is the study of carbon-containing compounds.

Carbon can form four covalent bonds, create long chains and rings, and form single, double, and triple bonds.";

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let categories = [
        ("Science", "විද්‍යාව", "Science subjects for A/L students"),
        ("Mathematics", "ගණිතය", "Mathematics subjects"),
        ("Commerce", "වාණිජ්‍යය", "Commerce subjects"),
    ];
    let mut category_ids = Vec::with_capacity(categories.len());
    for (name, name_si, description) in categories {
        let category = Category::new(CategoryId::new(1), names(name, name_si)?, description, None, now)?;
        category_ids.push(storage.categories.insert_new_category(&category).await?);
    }

    let subjects = [
        ("Physics", "භෞතික විද්‍යාව", "Advanced Level Physics", 0),
        ("Chemistry", "රසායන විද්‍යාව", "Advanced Level Chemistry", 0),
        ("Biology", "ජීව විද්‍යාව", "Advanced Level Biology", 0),
        ("Combined Mathematics", "සංයුක්ත ගණිතය", "Advanced Level Combined Mathematics", 1),
    ];
    let mut subject_ids: Vec<SubjectId> = Vec::with_capacity(subjects.len());
    for (name, name_si, description, category_idx) in subjects {
        let subject = Subject::new(
            SubjectId::new(1),
            category_ids[category_idx],
            names(name, name_si)?,
            description,
            None,
            now,
            now,
        )?;
        subject_ids.push(storage.subjects.insert_new_subject(&subject).await?);
    }

    let student = Student::new(StudentId::new(1), "Student User", "student@elms.lk", now)?;
    let student_id = match storage.students.find_student_by_email(student.email()).await? {
        Some(existing) => existing.id(),
        None => storage.students.insert_new_student(&student).await?,
    };

    let mut mechanics = NoteDraft::new(
        "Introduction to Mechanics",
        subject_ids[0],
        category_ids[0],
        vec![NotePageDraft::text(MECHANICS_P1), NotePageDraft::text(MECHANICS_P2)],
    );
    mechanics.title_si = Some("යාන්ත්‍රික විද්‍යාවට හැඳින්වීම".into());
    mechanics.tags = vec!["mechanics".into(), "kinematics".into()];

    let mut organic = NoteDraft::new(
        "Organic Chemistry Basics",
        subject_ids[1],
        category_ids[0],
        vec![NotePageDraft::text(ORGANIC_P1)],
    );
    organic.title_si = Some("කාබනික රසායන විද්‍යාවේ මූලික කරුණු".into());
    organic.difficulty = Difficulty::Easy;

    let notes = vec![
        mechanics.validate(now)?.assign_id(NoteId::new(1)),
        organic.validate(now)?.assign_id(NoteId::new(1)),
    ];
    let note_ids = storage.notes.insert_new_notes(&notes).await?;

    let question_rows: [(&str, [&str; 4], usize, usize); 3] = [
        (
            "Which equation relates final velocity, initial velocity, acceleration and time?",
            ["v = u + at", "s = ut", "v² = 2as", "F = ma"],
            0,
            0,
        ),
        (
            "What does kinematics study?",
            [
                "Forces on bodies",
                "Motion without considering forces",
                "Heat transfer",
                "Electric fields",
            ],
            1,
            0,
        ),
        (
            "How many covalent bonds can a carbon atom form?",
            ["Two", "Three", "Four", "Six"],
            2,
            1,
        ),
    ];
    let mut questions = Vec::with_capacity(question_rows.len());
    for (prompt, options, correct, note_idx) in question_rows {
        let draft = QuestionDraft::new(
            prompt,
            options.iter().map(|o| (*o).to_owned()).collect(),
            correct,
            note_ids[note_idx],
            notes[note_idx].subject_id(),
        );
        questions.push(draft.validate(now)?.assign_id(QuestionId::new(1)));
    }
    let question_ids = storage.questions.insert_new_questions(&questions).await?;

    let total = u32::try_from(question_ids.len())?;
    for i in 0..args.quizzes {
        let days_ago = i64::from(i) * 2;
        let started_at = now - Duration::days(days_ago) - Duration::minutes(10);
        let completed_at = started_at + Duration::minutes(4);
        let correct = total - (i % (total + 1));

        let summary = QuizSummary::from_persisted(
            student_id,
            QuizScope::All,
            started_at,
            completed_at,
            total,
            correct,
            total - correct,
            0,
            percentage(correct, total),
            correct,
            total,
            240,
        )?;
        let _ = storage.quizzes.append_quiz(&summary, &[]).await?;
    }

    println!(
        "Seeded {} categories, {} subjects, {} notes, {} questions and {} quiz summaries into {}",
        category_ids.len(),
        subject_ids.len(),
        note_ids.len(),
        question_ids.len(),
        args.quizzes,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
