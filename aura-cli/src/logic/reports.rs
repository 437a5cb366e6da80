use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::RunRecord;

/// Totals across a batch of runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub runs: usize,
    pub wins: usize,
    pub losses: usize,
    pub best_aura: i64,
    pub worst_aura: i64,
    pub mean_aura: f64,
    pub decisions: usize,
    pub timeouts: u32,
}

impl BatchSummary {
    #[must_use]
    pub fn from_runs(runs: &[RunRecord]) -> Self {
        let wins = runs.iter().filter(|r| r.outcome.won).count();
        let total: i64 = runs.iter().map(|r| r.outcome.aura).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean_aura = if runs.is_empty() {
            0.0
        } else {
            total as f64 / runs.len() as f64
        };
        Self {
            runs: runs.len(),
            wins,
            losses: runs.len() - wins,
            best_aura: runs.iter().map(|r| r.outcome.aura).max().unwrap_or(0),
            worst_aura: runs.iter().map(|r| r.outcome.aura).min().unwrap_or(0),
            mean_aura,
            decisions: runs.iter().map(|r| r.decisions.len()).sum(),
            timeouts: runs.iter().map(|r| r.timeouts).sum(),
        }
    }

    #[must_use]
    pub fn win_rate_pct(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.wins as f64 / self.runs as f64 * 100.0;
        rate
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: BatchSummary,
    runs: &'a [RunRecord],
}

pub fn generate_console_report<W: Write + ?Sized>(
    writer: &mut W,
    runs: &[RunRecord],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Autoplay Results".bright_cyan().bold())?;
    writeln!(writer, "{}", "===================".cyan())?;

    for record in runs {
        let status = if record.outcome.won {
            "✅ WIN ".green()
        } else {
            "❌ LOSS".red()
        };
        writeln!(
            writer,
            "{} run {} [{}] {} at {} aura ({})",
            status,
            record.run,
            record.policy,
            record.outcome.reason.bold(),
            record.outcome.aura,
            record.rank
        )?;
        writeln!(
            writer,
            "   Decisions: {}  Timeouts: {}  Peak: {} ({})",
            record.decisions.len(),
            record.timeouts,
            record.outcome.max_aura,
            record.peak_rank
        )?;
        if record.rewards != 0 {
            writeln!(writer, "   Challenge rewards: +{}", record.rewards)?;
        }
        if !record.power_ups.is_empty() {
            writeln!(writer, "   Power-ups: {}", record.power_ups.join(", "))?;
        }
        for title in &record.achievements {
            writeln!(writer, "   🏅 {}", title.yellow())?;
        }
    }

    let summary = BatchSummary::from_runs(runs);
    writeln!(writer)?;
    writeln!(writer, "{}", "⚡ Summary".bright_yellow().bold())?;
    writeln!(writer, "{}", "=========".yellow())?;
    writeln!(writer, "Runs: {}", summary.runs)?;
    writeln!(writer, "Wins: {}", summary.wins.to_string().green())?;
    writeln!(writer, "Losses: {}", summary.losses.to_string().red())?;
    writeln!(writer, "Win rate: {:.1}%", summary.win_rate_pct())?;
    writeln!(
        writer,
        "Aura best/mean/worst: {} / {:.0} / {}",
        summary.best_aura, summary.mean_aura, summary.worst_aura
    )?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(writer: &mut W, runs: &[RunRecord]) -> Result<()> {
    let report = JsonReport {
        summary: BatchSummary::from_runs(runs),
        runs,
    };
    let json_output = serde_json::to_string_pretty(&report)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    writer: &mut W,
    runs: &[RunRecord],
) -> Result<()> {
    let summary = BatchSummary::from_runs(runs);
    writeln!(writer, "# ±AURA Autoplay Results\n")?;
    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Runs**: {}", summary.runs)?;
    writeln!(writer, "- **Wins**: {}", summary.wins)?;
    writeln!(writer, "- **Win rate**: {:.1}%", summary.win_rate_pct())?;
    writeln!(writer, "- **Mean aura**: {:.0}\n", summary.mean_aura)?;

    writeln!(writer, "## Runs\n")?;
    writeln!(
        writer,
        "| Run | Policy | Result | Aura | Rank | Decisions | Timeouts |"
    )?;
    writeln!(writer, "|---|---|---|---|---|---|---|")?;
    for record in runs {
        let status = if record.outcome.won { "✅" } else { "❌" };
        writeln!(
            writer,
            "| {} | {} | {} {} | {} | {} | {} | {} |",
            record.run,
            record.policy,
            status,
            record.outcome.reason,
            record.outcome.aura,
            record.rank,
            record.decisions.len(),
            record.timeouts
        )?;
    }
    Ok(())
}
