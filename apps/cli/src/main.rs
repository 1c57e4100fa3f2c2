use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quizden_domain::{load_quiz_file, DifficultyFilter, SessionConfig};
use quizden_services::{MemoryStore, QuizRepository, QuizService, ServiceConfig, SqliteStore};
use quizden_session::QuizSession;
use rand::rngs::StdRng;
use rand::SeedableRng;
use time::OffsetDateTime;
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Take quizzes and track your progress")]
struct Cli {
    /// SQLite URL, or `memory` for a throwaway in-process store
    #[arg(long, env = "QUIZDEN_DATABASE_URL", default_value = "sqlite://quizden.db")]
    database_url: String,

    #[arg(long, env = "QUIZDEN_USER", default_value = "local")]
    user: String,

    /// Extra attempts when a stats update races another writer
    #[arg(long, default_value_t = ServiceConfig::default().max_write_retries)]
    max_write_retries: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a quiz interactively and record the result
    Take {
        /// Quiz document (.json, .yaml or .yml)
        file: PathBuf,
        #[arg(short = 'n', long, default_value_t = 10)]
        count: u32,
        /// easy, medium, hard or unspecified
        #[arg(short, long, default_value = "unspecified")]
        difficulty: DifficultyFilter,
        /// Fixed seed for a reproducible question order
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print category stats, streak and trends as JSON
    Stats,
    /// Rebuild one category's stats from its attempt history
    Reconcile { category: String },
    /// Validate a quiz document without running it
    Check { file: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let rt = Runtime::new()?;
    rt.block_on(run(cli))
}

async fn open_store(url: &str) -> Result<Arc<dyn QuizRepository>> {
    if url == "memory" {
        warn!("using the in-memory store, nothing will be kept");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = SqliteStore::connect(url)
        .await
        .with_context(|| format!("opening {url}"))?;
    Ok(Arc::new(store))
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Check { file } = &cli.command {
        return check(file);
    }

    let repo = open_store(&cli.database_url).await?;
    let service = QuizService::new(
        repo,
        ServiceConfig {
            max_write_retries: cli.max_write_retries,
            ..ServiceConfig::default()
        },
    );

    match cli.command {
        Command::Take {
            file,
            count,
            difficulty,
            seed,
        } => take(&service, &cli.user, &file, count, difficulty, seed).await,
        Command::Stats => {
            let stats = service.user_stats(&cli.user, OffsetDateTime::now_utc()).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::Reconcile { category } => {
            let outcome = service
                .reconcile(&cli.user, &category, OffsetDateTime::now_utc())
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Command::Check { .. } => Ok(()),
    }
}

fn check(file: &Path) -> Result<()> {
    let quiz = load_quiz_file(file).with_context(|| format!("loading {}", file.display()))?;
    info!(quiz_id = %quiz.id, questions = quiz.questions.len(), "quiz is valid");
    println!(
        "{}: '{}' in category {} with {} questions",
        quiz.id,
        quiz.title,
        quiz.category_id,
        quiz.questions.len()
    );
    Ok(())
}

async fn take(
    service: &QuizService,
    user: &str,
    file: &Path,
    count: u32,
    difficulty: DifficultyFilter,
    seed: Option<u64>,
) -> Result<()> {
    let quiz = load_quiz_file(file).with_context(|| format!("loading {}", file.display()))?;
    let config = SessionConfig::new(count, difficulty)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut session = QuizSession::start(&quiz, config, OffsetDateTime::now_utc(), &mut rng)?;
    println!("{} ({} questions)", quiz.title, session.questions().len());

    let stdin = io::stdin();
    let stdout = io::stdout();
    if !play(&mut session, stdin.lock(), stdout.lock())? {
        println!("Nothing answered, no attempt recorded.");
        return Ok(());
    }

    let submission = session.finish(OffsetDateTime::now_utc())?;
    let outcome = service.finish_session(user, &submission).await?;
    println!(
        "Score: {}% ({}/{}) {}",
        outcome.score.percentage,
        outcome.score.correct,
        outcome.score.total,
        outcome.tier.message()
    );
    if let Some(average) = outcome.stat.average_score {
        println!(
            "Category {}: {} attempts, average {:.1}%",
            outcome.stat.category_id, outcome.stat.attempts, average
        );
    }
    Ok(())
}

/// Drives the session from line input. Returns false when the user quit
/// without answering anything.
///
/// A number picks an option, `p`/`n` move between questions, `q` finishes.
fn play<R: BufRead, W: Write>(session: &mut QuizSession, input: R, mut out: W) -> Result<bool> {
    let mut lines = input.lines();
    loop {
        let Some(question) = session.current_question().cloned() else {
            break;
        };
        writeln!(
            out,
            "\n[{}/{}] {}  ({}% done)",
            session.current_index() + 1,
            session.questions().len(),
            question.text,
            session.current_progress()
        )?;
        for (i, option) in question.options.iter().enumerate() {
            writeln!(out, "  {}) {}", i + 1, option.text)?;
        }
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        match line.trim() {
            "q" => break,
            "p" => {
                let previous = session.current_index().saturating_sub(1);
                session.go_to(previous)?;
            }
            "n" | "" => {
                if !session.advance() {
                    break;
                }
            }
            choice => {
                let picked = choice
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| question.options.get(i));
                let Some(option) = picked else {
                    writeln!(out, "pick 1-{}", question.options.len())?;
                    continue;
                };
                let response = session.record_answer(&question.id, &option.id)?;
                let verdict = if response.is_correct { "correct" } else { "wrong" };
                writeln!(out, "{verdict}")?;
                if let Some(explanation) = &question.explanation {
                    writeln!(out, "  {explanation}")?;
                }
                if session.is_last() {
                    break;
                }
                session.advance();
            }
        }
    }
    Ok(!session.responses().is_empty())
}
