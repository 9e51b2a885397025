use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use course_core::FlatLessonSequence;
use course_core::model::{CurriculumDocument, LessonId, ViewerId};
use services::{AppServices, CourseProgress};
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://course.sqlite3";
const DEFAULT_VIEWER: &str = "local";
const DEFAULT_STEP_SECS: f64 = 15.0;
const DEFAULT_DURATION_SECS: f64 = 600.0;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug)]
enum LookupError {
    LessonNotFound(LessonId),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::LessonNotFound(id) => write!(f, "lesson {id} is not in the curriculum"),
        }
    }
}

impl std::error::Error for LookupError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number(raw: String, flag: &'static str) -> Result<f64, ArgsError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(ArgsError::InvalidNumber { flag, raw }),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app outline   --curriculum <file>");
    eprintln!("  app neighbors --curriculum <file> --lesson <id>");
    eprintln!("  app resume    --lesson <id> [--db <sqlite_url>] [--viewer <id>]");
    eprintln!(
        "  app play      --curriculum <file> --lesson <id> [--db <sqlite_url>] [--viewer <id>]"
    );
    eprintln!("                [--step <secs>] [--duration <secs>] [--threshold <percent>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --viewer {DEFAULT_VIEWER}");
    eprintln!("  --step {DEFAULT_STEP_SECS}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_VIEWER, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Outline,
    Neighbors,
    Resume,
    Play,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "outline" => Some(Self::Outline),
            "neighbors" => Some(Self::Neighbors),
            "resume" => Some(Self::Resume),
            "play" => Some(Self::Play),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    curriculum: Option<PathBuf>,
    lesson: Option<LessonId>,
    db_url: String,
    viewer: ViewerId,
    step_secs: f64,
    duration_secs: Option<f64>,
    threshold: Option<f64>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("COURSE_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut viewer = std::env::var("COURSE_VIEWER")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| ViewerId::new(DEFAULT_VIEWER), ViewerId::new);
        let mut curriculum = None;
        let mut lesson = None;
        let mut step_secs = DEFAULT_STEP_SECS;
        let mut duration_secs = None;
        let mut threshold = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--curriculum" => {
                    curriculum = Some(PathBuf::from(require_value(args, "--curriculum")?));
                }
                "--lesson" => lesson = Some(LessonId::new(require_value(args, "--lesson")?)),
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--viewer" => viewer = ViewerId::new(require_value(args, "--viewer")?),
                "--step" => step_secs = parse_number(require_value(args, "--step")?, "--step")?,
                "--duration" => {
                    duration_secs =
                        Some(parse_number(require_value(args, "--duration")?, "--duration")?);
                }
                "--threshold" => {
                    threshold =
                        Some(parse_number(require_value(args, "--threshold")?, "--threshold")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            curriculum,
            lesson,
            db_url,
            viewer,
            step_secs,
            duration_secs,
            threshold,
        })
    }

    fn curriculum(&self) -> Result<&Path, ArgsError> {
        self.curriculum
            .as_deref()
            .ok_or(ArgsError::MissingFlag {
                flag: "--curriculum",
            })
    }

    fn lesson(&self) -> Result<&LessonId, ArgsError> {
        self.lesson
            .as_ref()
            .ok_or(ArgsError::MissingFlag { flag: "--lesson" })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// `SQLite` will not create a missing database file on its own.
fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
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

fn load_sequence(path: &Path) -> Result<FlatLessonSequence, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let document = CurriculumDocument::from_json(&text)?;
    let sequence = course_core::build(&document);
    tracing::info!(
        path = %path.display(),
        lessons = sequence.len(),
        issues = sequence.diagnostics().len(),
        "curriculum loaded"
    );
    Ok(sequence)
}

fn print_outline(sequence: &FlatLessonSequence) {
    if sequence.is_empty() {
        println!("no lessons available");
    }
    let mut heading: Option<(usize, usize)> = None;
    for (position, entry) in sequence.iter().enumerate() {
        let here = (entry.week_index(), entry.section_index());
        if heading != Some(here) {
            println!("{} / {}", entry.week_title(), entry.section_title());
            heading = Some(here);
        }
        let lesson = entry.lesson();
        match lesson.duration {
            Some(secs) => println!("  {:>3}. [{}] {} ({secs:.0}s)", position + 1, lesson.id, lesson.title),
            None => println!("  {:>3}. [{}] {}", position + 1, lesson.id, lesson.title),
        }
    }
    for diagnostic in sequence.diagnostics() {
        println!("warning: {diagnostic}");
    }
}

fn print_neighbors(sequence: &FlatLessonSequence, lesson: &LessonId) {
    let neighbors = sequence.neighbors(lesson);
    if neighbors.is_empty() {
        println!("no navigation available for {lesson}");
        return;
    }
    match neighbors.previous {
        Some(previous) => println!("previous: [{}] {}", previous.id, previous.title),
        None => println!("previous: -"),
    }
    match neighbors.next {
        Some(next) => println!("next:     [{}] {}", next.id, next.title),
        None => println!("next:     -"),
    }
}

async fn open_services(args: &Args) -> Result<AppServices, Box<dyn std::error::Error>> {
    prepare_sqlite_file(&args.db_url)?;
    let mut services = AppServices::sqlite(&args.db_url).await?;
    if let Some(threshold) = args.threshold {
        services = services.with_completion_threshold(threshold)?;
    }
    Ok(services)
}

async fn play(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let sequence = load_sequence(args.curriculum()?)?;
    let lesson_id = args.lesson()?;
    let index = sequence
        .position(lesson_id)
        .ok_or_else(|| LookupError::LessonNotFound(lesson_id.clone()))?;
    let lesson = sequence
        .get(index)
        .map(|entry| entry.lesson().clone())
        .ok_or_else(|| LookupError::LessonNotFound(lesson_id.clone()))?;
    let duration = args
        .duration_secs
        .or(lesson.duration)
        .unwrap_or(DEFAULT_DURATION_SECS);

    let services = open_services(args).await?;
    let sink = |id: &LessonId, at: DateTime<Utc>| {
        println!("completed {id} at {}", at.to_rfc3339());
    };
    let mut tracker = services.tracker(args.viewer.clone(), Arc::new(sink));

    let mut position = tracker.resume(lesson_id).unwrap_or(0.0);
    println!(
        "{} playing [{}] {} from {position:.0}s of {duration:.0}s",
        tracker.viewer(),
        lesson.id,
        lesson.title
    );
    loop {
        position = (position + args.step_secs).min(duration);
        let update = tracker.report_position(lesson_id, position, duration);
        println!(
            "  {:>6.0}s  {:>5.1}%",
            update.position_secs.unwrap_or(position),
            update.percent_complete
        );
        if position >= duration {
            break;
        }
    }
    services.flush().await?;

    let progress = CourseProgress::summarize(&sequence, &tracker);
    println!(
        "course: {}/{} lessons completed in this session",
        progress.completed, progress.total
    );
    if let Some(next) = sequence.neighbors(lesson_id).next {
        println!("up next: [{}] {}", next.id, next.title);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match cmd {
        Command::Outline => {
            let sequence = load_sequence(args.curriculum()?)?;
            print_outline(&sequence);
            Ok(())
        }
        Command::Neighbors => {
            let sequence = load_sequence(args.curriculum()?)?;
            print_neighbors(&sequence, args.lesson()?);
            Ok(())
        }
        Command::Resume => {
            let lesson = args.lesson()?;
            let services = open_services(&args).await?;
            let tracker = services.tracker(args.viewer.clone(), Arc::new(|_: &LessonId, _: DateTime<Utc>| {}));
            match tracker.resume(lesson) {
                Some(secs) => println!("{lesson}: resume at {secs}s"),
                None => println!("{lesson}: start from the beginning"),
            }
            Ok(())
        }
        Command::Play => play(&args).await,
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
