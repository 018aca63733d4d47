use std::fmt;
use std::io::{BufRead, Write};

use exam_core::model::{NoteId, QuizScope, StudentId, SubjectId};
use exam_core::scoring::ScoreBand;
use services::{AppServices, Clock, QuizError, QuizSession};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingArg(&'static str),
    InvalidId { flag: &'static str, raw: String },
    InvalidSize { raw: String },
    InvalidDbUrl { raw: String },
    InvalidImportKind(String),
    ConflictingScope,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingArg(name) => write!(f, "missing {name}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidSize { raw } => write!(f, "invalid --size value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidImportKind(kind) => {
                write!(f, "import expects `notes` or `questions`, got: {kind}")
            }
            ArgsError::ConflictingScope => write!(f, "--note and --subject cannot be combined"),
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

fn parse_id(value: &str, flag: &'static str) -> Result<u64, ArgsError> {
    value.trim().parse().map_err(|_| ArgsError::InvalidId {
        flag,
        raw: value.to_owned(),
    })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- import notes|questions <file.json> [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- quiz     [--student <id>] [--note <id> | --subject <id>] [--size <n>]");
    eprintln!("  cargo run -p app -- progress [--student <id>] [--note <id> | --subject <id>]");
    eprintln!("  cargo run -p app -- overview");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:exam.sqlite3");
    eprintln!("  --student 1");
    eprintln!("  --size 10");
    eprintln!();
    eprintln!("Environment (.env is loaded when present):");
    eprintln!("  EXAM_DB_URL, EXAM_STUDENT_ID, EXAM_QUIZ_SIZE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportKind {
    Notes,
    Questions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Import { kind: ImportKind, path: String },
    Quiz,
    Progress,
    Overview,
}

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    student: StudentId,
    quiz_size: usize,
    scope: QuizScope,
}

impl Args {
    fn from_env() -> Self {
        let db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:exam.sqlite3".into()), normalize_sqlite_url);
        let student = std::env::var("EXAM_STUDENT_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| StudentId::new(1), StudentId::new);
        let quiz_size = std::env::var("EXAM_QUIZ_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(services::quiz::DEFAULT_QUIZ_SIZE);
        Self {
            db_url,
            student,
            quiz_size,
            scope: QuizScope::All,
        }
    }

    /// Apply flags on top of the environment; returns the positional arguments.
    fn apply_flags(
        &mut self,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Vec<String>, ArgsError> {
        let mut positional = Vec::new();
        let mut scoped = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    self.db_url = normalize_sqlite_url(value);
                }
                "--student" => {
                    let value = require_value(args, "--student")?;
                    self.student = StudentId::new(parse_id(&value, "--student")?);
                }
                "--size" => {
                    let value = require_value(args, "--size")?;
                    self.quiz_size = value
                        .parse::<usize>()
                        .ok()
                        .filter(|size| *size > 0)
                        .ok_or(ArgsError::InvalidSize { raw: value.clone() })?;
                }
                "--note" | "--subject" => {
                    if scoped {
                        return Err(ArgsError::ConflictingScope);
                    }
                    scoped = true;
                    self.scope = if arg == "--note" {
                        let value = require_value(args, "--note")?;
                        QuizScope::Note(NoteId::new(parse_id(&value, "--note")?))
                    } else {
                        let value = require_value(args, "--subject")?;
                        QuizScope::Subject(SubjectId::new(parse_id(&value, "--subject")?))
                    };
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }
        Ok(positional)
    }
}

fn parse_command(
    name: &str,
    positional: Vec<String>,
) -> Result<Command, ArgsError> {
    let mut positional = positional.into_iter();
    let command = match name {
        "import" => {
            let kind = match positional.next().as_deref() {
                Some("notes") => ImportKind::Notes,
                Some("questions") => ImportKind::Questions,
                Some(other) => return Err(ArgsError::InvalidImportKind(other.to_owned())),
                None => return Err(ArgsError::MissingArg("import kind")),
            };
            let path = positional.next().ok_or(ArgsError::MissingArg("file path"))?;
            Command::Import { kind, path }
        }
        "quiz" => Command::Quiz,
        "progress" => Command::Progress,
        "overview" => Command::Overview,
        other => return Err(ArgsError::UnknownArg(other.to_owned())),
    };
    match positional.next() {
        Some(extra) => Err(ArgsError::UnknownArg(extra)),
        None => Ok(command),
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn run_import(
    app: &AppServices,
    kind: ImportKind,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    let created = match kind {
        ImportKind::Notes => app.import().import_notes(&json).await?.len(),
        ImportKind::Questions => app.import().import_questions(&json).await?.len(),
    };
    let label = match kind {
        ImportKind::Notes => "notes",
        ImportKind::Questions => "questions",
    };
    println!("{created} {label} uploaded successfully");
    Ok(())
}

enum Reply {
    Option(usize),
    Skip,
    Quit,
}

fn read_reply(input: &mut impl BufRead, options: usize) -> std::io::Result<Reply> {
    loop {
        print!("answer [1-{options}, s=skip, q=quit]: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(Reply::Quit);
        }
        match line.trim() {
            "s" | "" => return Ok(Reply::Skip),
            "q" => return Ok(Reply::Quit),
            raw => match raw.parse::<usize>() {
                Ok(n) if (1..=options).contains(&n) => return Ok(Reply::Option(n - 1)),
                _ => println!("please enter a number between 1 and {options}"),
            },
        }
    }
}

fn print_question(quiz: &QuizSession) {
    let Some(question) = quiz.current_question() else {
        return;
    };
    let progress = quiz.progress();
    println!();
    println!(
        "Question {} of {}  ({}s left)",
        quiz.current_index() + 1,
        progress.total,
        quiz.time_remaining(Clock::default_clock().now())
    );
    println!("{}", question.prompt());
    for (idx, option) in question.options().iter().enumerate() {
        println!("  {}. {option}", idx + 1);
    }
}

async fn run_quiz(app: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let quiz_loop = app.quiz_loop();
    let mut quiz = match quiz_loop.start_quiz(args.student, args.scope).await {
        Ok(quiz) => quiz,
        Err(QuizError::NoQuestions) => {
            println!("No questions available for this quiz.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    println!("{}", quiz.title());

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    while !quiz.is_complete() {
        print_question(&quiz);
        let options = quiz.current_question().map_or(0, |q| q.options().len());
        let result = match read_reply(&mut input, options)? {
            Reply::Option(idx) => quiz_loop.answer_current(&mut quiz, idx).await?,
            Reply::Skip => quiz_loop.skip_current(&mut quiz).await?,
            Reply::Quit => {
                quiz_loop.time_up(&mut quiz).await?;
                break;
            }
        };
        if result.timed_out {
            println!("Time's up!");
        }
        if let Some(feedback) = result.feedback {
            if feedback.is_correct {
                println!("Correct!");
            } else {
                let question = quiz
                    .questions()
                    .iter()
                    .find(|q| q.id() == feedback.question_id);
                let answer = question.map_or("", |q| q.correct_option());
                println!("Incorrect. The answer is: {answer}");
                if let Some(explanation) = feedback.explanation {
                    println!("{explanation}");
                }
            }
        }
    }

    let report = quiz.report();
    let band: ScoreBand = report.band();
    println!();
    println!("Score: {}%", report.score);
    println!(
        "{} correct, {} incorrect, {} unanswered",
        report.correct, report.incorrect, report.unanswered
    );
    println!("{}", band.message());
    if let Some(id) = quiz.summary_id() {
        log::debug!("quiz stored as {id}");
    }
    Ok(())
}

async fn run_progress(app: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let progress = app.progress();
    let summary = progress.student_progress(args.student, args.scope).await?;
    println!("Quizzes taken:  {}", summary.total_attempts);
    println!("Average score:  {}%", summary.average_score);
    println!("Best score:     {}%", summary.best_score);
    println!("Accuracy:       {}%", summary.accuracy());
    match summary.last_attempt_at {
        Some(at) => println!("Last attempt:   {}", at.to_rfc3339()),
        None => println!("Last attempt:   never"),
    }

    let recent = progress.recent_quizzes(args.student, 5).await?;
    if !recent.is_empty() {
        println!();
        println!("Recent quizzes:");
        for row in recent {
            let s = &row.summary;
            println!(
                "  #{:<4} {}  {:>3}%  ({}/{})",
                row.id,
                s.completed_at().format("%Y-%m-%d %H:%M"),
                s.score(),
                s.correct(),
                s.total_questions()
            );
        }
    }
    Ok(())
}

async fn run_overview(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let overview = app.progress().overview().await?;
    println!("Students:       {}", overview.total_students);
    println!("Notes:          {}", overview.total_notes);
    println!("Quiz attempts:  {}", overview.total_attempts);
    println!("Average score:  {}%", overview.average_score);
    println!();
    for row in &overview.students {
        println!(
            "  {:<24} {:<28} {:>3} quizzes  {:>3}%",
            row.name, row.email, row.progress.total_attempts, row.progress.average_score
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let name = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => first,
    };

    let mut args = Args::from_env();
    let parsed = args
        .apply_flags(&mut argv)
        .and_then(|positional| parse_command(&name, positional));
    let command = parsed.map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(&args.db_url, Clock::default_clock(), args.quiz_size).await?;

    match command {
        Command::Import { kind, path } => run_import(&app, kind, &path).await,
        Command::Quiz => run_quiz(&app, &args).await,
        Command::Progress => run_progress(&app, &args).await,
        Command::Overview => run_overview(&app).await,
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
