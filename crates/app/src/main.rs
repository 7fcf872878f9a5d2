use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use drill_core::model::{ItemRecord, Scope, SessionReport};
use drill_core::session::{Direction, GradedRound, Prompt};
use drill_core::time::{DEFAULT_TIME_LIMIT_SECS, TimeLimit};
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::{
    DailyFileTranscript, DirectoryVocabulary, DrillConfig, DrillService, Prompter, QuizLoop,
    STATS_BATCH_SIZE, StatsService, format_batch,
};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "vocab-drill",
    about = "Timed vocabulary drill that favours the words you miss",
    version
)]
struct Cli {
    /// SQLite database holding per-word statistics
    #[arg(
        long,
        global = true,
        env = "DRILL_DB_URL",
        default_value = "sqlite://vocab_stats.sqlite3"
    )]
    db: String,

    /// Directory of chapter_<n>.txt vocabulary files
    #[arg(long, global = true, env = "DRILL_VOCAB_DIR", default_value = "textbook_vocab")]
    vocab_dir: String,

    /// Directory for the daily session transcripts
    #[arg(
        long,
        global = true,
        env = "DRILL_TRANSCRIPT_DIR",
        default_value = "player_statistics"
    )]
    transcript_dir: String,

    /// Chapter to drill (0 = all chapters)
    #[arg(short, long, default_value_t = 0)]
    chapter: u32,

    /// Session length in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIME_LIMIT_SECS)]
    time_limit: u64,

    /// Play until you quit
    #[arg(short, long)]
    unlimited: bool,

    /// Prompt with Spanish words and answer in English
    #[arg(short, long)]
    english: bool,

    /// Print the weight of every word before each prompt
    #[arg(long)]
    show_weights: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show correct/wrong counts and current weight per word
    Stats {
        /// Chapter to report (0 = all chapters)
        #[arg(short, long, default_value_t = 0)]
        chapter: u32,

        /// Emit one JSON object per word instead of tables
        #[arg(long)]
        json: bool,
    },
}

//
// ─── TERMINAL PROMPTER ─────────────────────────────────────────────────────────
//

/// Reads answers line by line and writes prompts and feedback.
///
/// End of input counts as a quit.
struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn welcome(&mut self, config: &DrillConfig, scope: Scope) -> io::Result<()> {
        writeln!(self.output, "Welcome to the vocabulary drill!")?;
        match scope {
            Scope::All => writeln!(self.output, "Drilling words from every chapter.")?,
            Scope::Chapter(chapter) => writeln!(self.output, "Drilling chapter {chapter}.")?,
        }
        if config.time_limit == TimeLimit::Unlimited {
            writeln!(self.output, "No time limit.")?;
        } else {
            writeln!(self.output, "You have {} seconds.", config.time_limit.as_secs())?;
        }
        writeln!(self.output, "Type 'q', 'quit' or 'exit' to stop early.")?;
        writeln!(self.output)
    }

    fn summary(&mut self, report: &SessionReport) -> io::Result<()> {
        let elapsed = (report.ended_at - report.started_at).num_seconds().max(0);
        writeln!(self.output)?;
        writeln!(
            self.output,
            "You got {} correct and {} wrong in {elapsed} seconds.",
            report.num_correct, report.num_wrong
        )?;
        if !report.incorrect.is_empty() {
            writeln!(self.output, "Words to review: {}", report.incorrect.join(", "))?;
        }
        Ok(())
    }

    /// Ask a yes/no question. Anything but `y`/`yes` (or end of input) is no.
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        writeln!(self.output, "{question}")?;
        self.output.flush()?;
        Ok(self
            .read_line()?
            .is_some_and(|answer| matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")))
    }
}

/// One row per item: terms, counters, weight and its share of the total.
fn weight_table(items: &[ItemRecord], weights: &[f64]) -> String {
    let total: f64 = weights.iter().sum();
    let mut table = String::new();
    for (item, weight) in items.iter().zip(weights) {
        let _ = writeln!(
            table,
            "  {:<24} {:<24} {:>4} {:>4} {:>7.3} ({:>5.1}%)",
            item.source_term(),
            item.target_term(),
            item.correct_count(),
            item.incorrect_count(),
            weight,
            100.0 * weight / total
        );
    }
    table
}

fn language_of(direction: Direction) -> &'static str {
    match direction {
        Direction::TargetToSource => "Spanish",
        Direction::SourceToTarget => "English",
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn ask(&mut self, prompt: &Prompt, direction: Direction) -> io::Result<String> {
        writeln!(
            self.output,
            "What is the {} translation of '{}'?",
            language_of(direction),
            prompt.prompt
        )?;
        self.output.flush()?;
        Ok(self.read_line()?.unwrap_or_else(|| "q".to_string()))
    }

    fn feedback(&mut self, round: &GradedRound) {
        let line = if round.outcome.is_correct() {
            "Correct!".to_string()
        } else {
            format!("Incorrect. The answer is '{}'.", round.expected)
        };
        if let Err(e) = writeln!(self.output, "{line}") {
            tracing::warn!(error = %e, "failed to write feedback");
        }
    }

    fn show_weights(&mut self, items: &[ItemRecord], weights: &[f64]) {
        if let Err(e) = write!(self.output, "{}", weight_table(items, weights)) {
            tracing::warn!(error = %e, "failed to write weight table");
        }
    }
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn play(cli: &Cli, storage: Storage) -> Result<(), Box<dyn std::error::Error>> {
    let vocabulary = DirectoryVocabulary::open(&cli.vocab_dir)?;
    let config =
        DrillConfig::from_flags(cli.time_limit, cli.unlimited, cli.english, cli.show_weights);
    let service =
        DrillService::new(Arc::clone(&storage.items), Arc::new(vocabulary)).with_config(config);
    let scope = service.resolve_scope(cli.chapter)?;
    let transcript = DailyFileTranscript::new(&cli.transcript_dir);
    let mut rng = StdRng::from_os_rng();

    let stdin = io::stdin();
    let mut prompter = TerminalPrompter::new(stdin.lock(), io::stdout());
    prompter.welcome(&config, scope)?;

    loop {
        // Reloaded every round of play so counters reflect the last session.
        let mut session = service.start_session(scope).await?;
        let report = QuizLoop::new(&service)
            .with_transcript(&transcript)
            .run(&mut session, &mut prompter, &mut rng)
            .await?;
        prompter.summary(&report)?;

        if !prompter.confirm("Do you want to play again? (y/n)")? {
            break;
        }
    }

    Ok(())
}

async fn stats(
    storage: Storage,
    chapter: u32,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let rows = StatsService::new(Arc::clone(&storage.items))
        .item_stats(Scope::from_number(chapter))
        .await?;

    let mut out = io::stdout().lock();
    if rows.is_empty() {
        writeln!(out, "No statistics recorded yet.")?;
        return Ok(());
    }

    if json {
        for row in &rows {
            writeln!(out, "{}", serde_json::to_string(row)?)?;
        }
        return Ok(());
    }

    for (n, batch) in rows.chunks(STATS_BATCH_SIZE).enumerate() {
        if n > 0 {
            writeln!(out)?;
        }
        write!(out, "{}", format_batch(batch, n * STATS_BATCH_SIZE, rows.len()))?;
    }
    Ok(())
}

//
// ─── GLUE ──────────────────────────────────────────────────────────────────────
//

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DRILL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
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
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| format!("invalid --db value: {db_url}"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(format!("invalid --db value: {db_url}").into());
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    let db_url = normalize_sqlite_url(&cli.db);
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;

    match &cli.command {
        Some(Command::Stats { chapter, json }) => stats(storage, *chapter, *json).await,
        None => play(&cli, storage).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
