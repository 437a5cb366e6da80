//! Plain-text stats summary and the clipboard seam it is handed to.
use std::fmt::Write as _;

use crate::catalog::Rank;
use crate::records::{AchievementState, DailyChallenge, GameStats};

pub const COPY_SUCCESS_MESSAGE: &str = "STATS COPIED!";
pub const COPY_FAILURE_MESSAGE: &str = "COPY FAILED";

/// Destination for the share summary, e.g. a system clipboard.
pub trait ClipboardSink {
    type Error: std::error::Error;

    /// Hand `text` to the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the text.
    fn copy_text(&mut self, text: &str) -> Result<(), Self::Error>;
}

/// Lifetime rank shown in the summary, derived from total aura gained.
#[must_use]
pub fn lifetime_rank(stats: &GameStats) -> Rank {
    Rank::for_aura(i64::try_from(stats.total_aura_gained).unwrap_or(i64::MAX))
}

/// Render the shareable stats block.
#[must_use]
pub fn share_summary(
    stats: &GameStats,
    achievements: &[AchievementState],
    challenges: &[DailyChallenge],
) -> String {
    let unlocked = achievements.iter().filter(|a| a.unlocked).count();
    let completed = challenges.iter().filter(|c| c.completed).count();

    let mut out = String::from("±AURA STATS\n━━━━━━━━━━━━━━\n");
    let _ = writeln!(out, "🎮 Games: {}", stats.total_games_played);
    let _ = writeln!(out, "🏆 Win Rate: {:.1}%", stats.win_rate_pct());
    let _ = writeln!(out, "🔥 Best Streak: {}", stats.highest_streak);
    let _ = writeln!(out, "📅 Daily Streak: {} days", stats.consecutive_days);
    let _ = writeln!(out, "⚠️ Risk Success: {:.1}%", stats.risk_success_pct());
    let _ = writeln!(out, "🏅 Achievements: {unlocked}/{}", achievements.len());
    let _ = writeln!(out, "✅ Daily Challenges: {completed}/{}", challenges.len());
    let _ = write!(out, "\nCurrent Rank: {}", lifetime_rank(stats));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::generate_daily_challenges;
    use crate::progress::merge_achievements;
    use chrono::NaiveDate;

    #[test]
    fn summary_lists_every_line() {
        let stats = GameStats {
            total_games_played: 8,
            games_won: 3,
            highest_streak: 11,
            consecutive_days: 4,
            risks_taken: 3,
            risks_won: 1,
            total_aura_gained: 25_000,
            ..GameStats::default()
        };
        let mut achievements = merge_achievements(&[]);
        achievements[0].unlocked = true;
        achievements[2].unlocked = true;
        let mut challenges =
            generate_daily_challenges(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        challenges[1].completed = true;

        let text = share_summary(&stats, &achievements, &challenges);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "±AURA STATS");
        assert!(text.contains("🎮 Games: 8\n"));
        assert!(text.contains("🏆 Win Rate: 37.5%\n"));
        assert!(text.contains("🔥 Best Streak: 11\n"));
        assert!(text.contains("📅 Daily Streak: 4 days\n"));
        assert!(text.contains("⚠️ Risk Success: 33.3%\n"));
        assert!(text.contains(&format!("🏅 Achievements: 2/{}\n", achievements.len())));
        assert!(text.contains("✅ Daily Challenges: 1/3\n"));
        assert_eq!(lines.last(), Some(&"Current Rank: SIGMA"));
    }

    #[test]
    fn empty_history_reports_zero_rates() {
        let text = share_summary(&GameStats::default(), &[], &[]);
        assert!(text.contains("Win Rate: 0.0%"));
        assert!(text.contains("Risk Success: 0.0%"));
        assert!(text.contains("Achievements: 0/0"));
        assert!(text.ends_with("Current Rank: NPC"));
    }
}
