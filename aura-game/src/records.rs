//! Persisted engagement records: cumulative stats, achievement states,
//! daily challenges, and the power-up inventory.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{AchievementDef, achievement_def};

/// Cumulative counters kept across every session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStats {
    pub total_aura_gained: u64,
    pub total_aura_lost: u64,
    pub total_decisions: u64,
    pub risks_taken: u64,
    pub risks_won: u64,
    pub wild_choices: u64,
    pub safe_choices: u64,
    pub timeouts: u64,
    pub highest_streak: u64,
    pub total_games_played: u64,
    pub games_won: u64,
    pub games_lost: u64,
    /// Seconds.
    pub total_play_time: u64,
    pub consecutive_days: u64,
    /// ISO date (`YYYY-MM-DD`), empty when never played.
    pub last_played_date: String,
}

impl GameStats {
    /// Win rate in percent, `0.0` before the first game.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn win_rate_pct(&self) -> f64 {
        if self.total_games_played == 0 {
            return 0.0;
        }
        self.games_won as f64 / self.total_games_played as f64 * 100.0
    }

    /// Risk success rate in percent, `0.0` before the first risk.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn risk_success_pct(&self) -> f64 {
        if self.risks_taken == 0 {
            return 0.0;
        }
        self.risks_won as f64 / self.risks_taken as f64 * 100.0
    }
}

/// Mutable half of an achievement; the predicate lives in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementState {
    pub id: String,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_date: Option<DateTime<Utc>>,
}

impl AchievementState {
    #[must_use]
    pub fn locked(id: &str) -> Self {
        Self {
            id: id.to_string(),
            unlocked: false,
            unlocked_date: None,
        }
    }

    /// Catalog definition for this record, if the id is still known.
    #[must_use]
    pub fn definition(&self) -> Option<&'static AchievementDef> {
        achievement_def(&self.id)
    }
}

/// A calendar-day objective with a one-time reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyChallenge {
    pub id: String,
    pub description: String,
    pub target: u64,
    #[serde(default)]
    pub progress: u64,
    pub reward: i64,
    #[serde(default)]
    pub completed: bool,
    pub date: String,
}

/// Effect tag carried by a power-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpEffect {
    NegateLoss,
    DoubleGain,
    RerollScenario,
}

impl PowerUpEffect {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NegateLoss => "negate_loss",
            Self::DoubleGain => "double_gain",
            Self::RerollScenario => "reroll_scenario",
        }
    }
}

impl fmt::Display for PowerUpEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumable modifier in the persisted inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub count: u32,
    pub effect: PowerUpEffect,
}
