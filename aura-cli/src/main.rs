mod logic;
mod store;

use anyhow::{Context, Result};
use aura_game::{
    ClipboardSink, Clock, EmbeddedScenarios, GameEngine, ProgressStore, SessionConfig,
    SystemClock,
};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{SimulationConfig, Strategy, play_run};
use store::FileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "aura-cli", version)]
#[command(about = "Play, inspect and share ±AURA progress from the terminal")]
struct Args {
    /// Save file holding stats, achievements, challenges and power-ups
    #[arg(long, default_value = "aura-save.json")]
    store: PathBuf,

    /// Fixed RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Optional path to write output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Autoplay runs with a built-in strategy
    Play {
        #[arg(long, default_value_t = 1)]
        runs: u32,
        #[arg(long, value_enum, default_value_t = Strategy::Safe)]
        policy: Strategy,
        /// Cash out after this many choices
        #[arg(long, default_value_t = 200)]
        max_decisions: u32,
        /// Virtual milliseconds spent on each scenario before answering
        #[arg(long, default_value_t = 500)]
        think_ms: u64,
        #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
        report: ReportFormat,
    },
    /// Show lifetime stats and achievements
    Stats,
    /// Print the shareable stats summary
    Share,
    /// Show today's daily challenges
    Challenges,
    /// Wipe saved progress
    Reset,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let engine = GameEngine::new(EmbeddedScenarios, FileStore::new(&args.store));
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.command {
        Command::Play {
            runs,
            policy,
            max_decisions,
            think_ms,
            report,
        } => {
            let config = SimulationConfig::default()
                .with_max_decisions(max_decisions)
                .with_think_ms(think_ms);
            run_play(
                &engine,
                &mut output_target,
                args.seed,
                runs,
                policy,
                config,
                report,
            )?;
        }
        Command::Stats => {
            let progress = engine.load_progress(SystemClock.today());
            write_stats(&mut output_target, &progress)?;
        }
        Command::Share => {
            let mut session = engine.create_session(session_config(args.seed))?;
            let mut sink = WriterSink(&mut output_target);
            session.share(&mut sink);
            if let Some(feedback) = session.feedback() {
                eprintln!("{}", feedback.message);
            }
        }
        Command::Challenges => {
            let progress = engine.load_progress(SystemClock.today());
            write_challenges(&mut output_target, &progress)?;
        }
        Command::Reset => {
            let mut progress = engine.load_progress(SystemClock.today());
            progress.reset(SystemClock.today());
            writeln!(
                output_target,
                "Progress reset in {}",
                engine.storage().path().display()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

fn session_config(seed: Option<u64>) -> SessionConfig {
    match seed {
        Some(seed) => SessionConfig::default().with_seed(seed),
        None => SessionConfig::default(),
    }
}

fn announce_banner() {
    println!("{}", "🎮 ±AURA Autoplay".bright_cyan().bold());
    println!("{}", "=================".cyan());
}

fn run_play(
    engine: &GameEngine<EmbeddedScenarios, FileStore>,
    out: &mut OutputTarget,
    seed: Option<u64>,
    runs: u32,
    strategy: Strategy,
    config: SimulationConfig,
    report: ReportFormat,
) -> Result<()> {
    if report == ReportFormat::Console {
        announce_banner();
    }
    let start_time = Instant::now();
    let mut session = engine.create_session(session_config(seed))?;
    let mut policy = strategy.create_policy(seed.unwrap_or_default());
    log::info!("playing {runs} run(s) with the {strategy} policy");

    let mut records = Vec::with_capacity(runs as usize);
    for run in 1..=runs {
        let record = play_run(&mut session, policy.as_mut(), run, config)
            .with_context(|| format!("run {run} failed"))?;
        records.push(record);
    }

    match report {
        ReportFormat::Console => {
            logic::reports::generate_console_report(out, &records, start_time.elapsed())?;
        }
        ReportFormat::Json => logic::reports::generate_json_report(out, &records)?,
        ReportFormat::Markdown => logic::reports::generate_markdown_report(out, &records)?,
    }
    Ok(())
}

fn write_stats(out: &mut dyn Write, progress: &ProgressStore<FileStore>) -> Result<()> {
    let stats = progress.stats();
    writeln!(out, "{}", "📈 Lifetime Stats".bright_cyan().bold())?;
    writeln!(out, "Games played: {}", stats.total_games_played)?;
    writeln!(
        out,
        "Won/Lost: {}/{}",
        stats.games_won.to_string().green(),
        stats.games_lost.to_string().red()
    )?;
    writeln!(out, "Win rate: {:.1}%", stats.win_rate_pct())?;
    writeln!(out, "Decisions: {}", stats.total_decisions)?;
    writeln!(
        out,
        "Safe/Risk/Wild: {}/{}/{}",
        stats.safe_choices, stats.risks_taken, stats.wild_choices
    )?;
    writeln!(out, "Risk success: {:.1}%", stats.risk_success_pct())?;
    writeln!(out, "Timeouts: {}", stats.timeouts)?;
    writeln!(out, "Best streak: {}", stats.highest_streak)?;
    writeln!(
        out,
        "Aura gained/lost: +{}/-{}",
        stats.total_aura_gained, stats.total_aura_lost
    )?;
    writeln!(out, "Play time: {}s", stats.total_play_time)?;
    writeln!(out, "Daily streak: {} days", stats.consecutive_days)?;

    writeln!(out)?;
    writeln!(out, "{}", "🏅 Achievements".bright_yellow().bold())?;
    for achievement in progress.achievements() {
        let Some(def) = achievement.definition() else {
            continue;
        };
        let mark = if achievement.unlocked {
            "✓".green()
        } else {
            "·".dimmed()
        };
        writeln!(out, "{mark} {} {} - {}", def.icon, def.title, def.description)?;
    }

    writeln!(out)?;
    writeln!(out, "{}", "🎒 Power-ups".bright_yellow().bold())?;
    for power_up in progress.power_ups() {
        writeln!(out, "{} {} x{}", power_up.icon, power_up.name, power_up.count)?;
    }
    Ok(())
}

fn write_challenges(out: &mut dyn Write, progress: &ProgressStore<FileStore>) -> Result<()> {
    writeln!(out, "{}", "✅ Daily Challenges".bright_cyan().bold())?;
    for challenge in progress.challenges() {
        let mark = if challenge.completed {
            "✓".green()
        } else {
            "·".dimmed()
        };
        writeln!(
            out,
            "{mark} {} ({}/{}) +{} Aura",
            challenge.description, challenge.progress, challenge.target, challenge.reward
        )?;
    }
    Ok(())
}

/// Clipboard stand-in that prints the shared text.
struct WriterSink<'a>(&'a mut dyn Write);

impl ClipboardSink for WriterSink<'_> {
    type Error = io::Error;

    fn copy_text(&mut self, text: &str) -> Result<(), Self::Error> {
        writeln!(self.0, "{text}")
    }
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_game::{MemoryStore, share_summary};

    #[test]
    fn writer_sink_prints_the_summary() {
        let progress = ProgressStore::load(MemoryStore::new(), SystemClock.today());
        let mut buf = Vec::new();
        WriterSink(&mut buf)
            .copy_text(&share_summary(
                progress.stats(),
                progress.achievements(),
                progress.challenges(),
            ))
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("±AURA STATS"));
        assert!(text.contains("Current Rank: NPC"));
    }

    #[test]
    fn session_config_honours_seed() {
        assert_eq!(session_config(Some(5)).seed, Some(5));
        assert_eq!(session_config(None).seed, None);
    }

    #[test]
    fn output_target_writes_file() {
        let path = std::env::temp_dir().join(format!("aura-output-{}.txt", std::process::id()));
        let mut target = OutputTarget::new(Some(path.clone())).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ok");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn stats_listing_names_achievements() {
        colored::control::set_override(false);
        let path = std::env::temp_dir().join(format!("aura-stats-{}.json", std::process::id()));
        let progress = ProgressStore::load(FileStore::new(&path), SystemClock.today());
        let mut buf = Vec::new();
        write_stats(&mut buf, &progress).unwrap();
        write_challenges(&mut buf, &progress).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Games played: 0"));
        assert!(text.contains("SHIELD x1"));
        assert!(text.contains("Daily Challenges"));
        let _ = std::fs::remove_file(path);
    }
}
