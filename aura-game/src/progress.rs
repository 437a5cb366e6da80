//! Progress tracking: stat counters, achievement unlocks, daily challenges
//! and the consecutive-day streak.
use chrono::{DateTime, NaiveDate, Utc};

use crate::catalog::{ACHIEVEMENTS, AchievementDef, achievement_def};
use crate::data::OptionKind;
use crate::records::{AchievementState, DailyChallenge, GameStats};
use crate::scoring::Resolution;

/// What was resolved, for counter bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Choice(OptionKind),
    Timeout,
}

/// Fold a resolved decision into the cumulative counters.
///
/// A timeout bumps `timeouts` but is not counted as a decision.
#[must_use]
pub fn apply_decision(stats: &GameStats, decision: Decision, resolution: &Resolution) -> GameStats {
    let mut next = stats.clone();
    match decision {
        Decision::Choice(kind) => {
            next.total_decisions += 1;
            match kind {
                OptionKind::Safe => next.safe_choices += 1,
                OptionKind::Risk => {
                    next.risks_taken += 1;
                    if resolution.is_risk_win {
                        next.risks_won += 1;
                    }
                }
                OptionKind::Wild => next.wild_choices += 1,
            }
        }
        Decision::Timeout => next.timeouts += 1,
    }
    next.highest_streak = next.highest_streak.max(u64::from(resolution.new_streak));
    apply_aura_delta(&next, resolution.delta)
}

/// Fold an applied aura delta into the gained/lost totals.
#[must_use]
pub fn apply_aura_delta(stats: &GameStats, delta: i64) -> GameStats {
    let mut next = stats.clone();
    if delta > 0 {
        next.total_aura_gained += delta.unsigned_abs();
    } else if delta < 0 {
        next.total_aura_lost += delta.unsigned_abs();
    }
    next
}

/// Align stored achievement states with the catalog.
///
/// Output is in catalog order. Unknown ids are dropped and catalog entries
/// missing from storage come back locked.
#[must_use]
pub fn merge_achievements(stored: &[AchievementState]) -> Vec<AchievementState> {
    ACHIEVEMENTS
        .iter()
        .map(|def| {
            stored
                .iter()
                .find(|state| state.id == def.id)
                .cloned()
                .unwrap_or_else(|| AchievementState::locked(def.id))
        })
        .collect()
}

/// Evaluate every locked achievement against `stats`.
///
/// Unlocks are monotonic: an unlocked state is never touched again. Newly
/// unlocked definitions come back in the order of `achievements`.
#[must_use]
pub fn check_achievements(
    stats: &GameStats,
    achievements: &[AchievementState],
    now: DateTime<Utc>,
) -> (Vec<AchievementState>, Vec<&'static AchievementDef>) {
    let mut newly_unlocked = Vec::new();
    let updated = achievements
        .iter()
        .map(|state| {
            if state.unlocked {
                return state.clone();
            }
            match achievement_def(&state.id) {
                Some(def) if def.is_met(stats) => {
                    newly_unlocked.push(def);
                    AchievementState {
                        id: state.id.clone(),
                        unlocked: true,
                        unlocked_date: Some(now),
                    }
                }
                _ => state.clone(),
            }
        })
        .collect();
    (updated, newly_unlocked)
}

/// How an amount is folded into challenge progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// `max(progress, amount)`, for streak objectives.
    HighWater,
    /// `progress + amount`, for counting objectives.
    Accumulate,
}

/// A challenge that flipped to completed during an advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedChallenge {
    pub id: String,
    pub description: String,
    pub reward: i64,
}

/// Result of [`advance_challenge`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChallengeAdvance {
    pub challenges: Vec<DailyChallenge>,
    pub completed: Vec<CompletedChallenge>,
}

/// Advance every open challenge whose id starts with `prefix`.
///
/// Progress is clamped to the target and `completed` flips exactly once,
/// when progress first reaches it.
#[must_use]
pub fn advance_challenge(
    challenges: &[DailyChallenge],
    prefix: &str,
    amount: u64,
    mode: ProgressMode,
) -> ChallengeAdvance {
    let mut completed = Vec::new();
    let challenges = challenges
        .iter()
        .map(|challenge| {
            if challenge.completed || !challenge.id.starts_with(prefix) {
                return challenge.clone();
            }
            let raw = match mode {
                ProgressMode::HighWater => challenge.progress.max(amount),
                ProgressMode::Accumulate => challenge.progress.saturating_add(amount),
            };
            let mut next = challenge.clone();
            next.progress = raw.min(challenge.target);
            if next.progress >= challenge.target {
                next.completed = true;
                completed.push(CompletedChallenge {
                    id: challenge.id.clone(),
                    description: challenge.description.clone(),
                    reward: challenge.reward,
                });
            }
            next
        })
        .collect();
    ChallengeAdvance {
        challenges,
        completed,
    }
}

/// Daily play streak after playing on `today`.
///
/// Same day keeps the count, the following day extends it, anything else
/// (including a missing or unreadable date) restarts at one.
#[must_use]
pub fn consecutive_days(last_played: &str, current: u64, today: NaiveDate) -> u64 {
    let Ok(last) = NaiveDate::parse_from_str(last_played, "%Y-%m-%d") else {
        return 1;
    };
    if last == today {
        current
    } else if last.succ_opt() == Some(today) {
        current + 1
    } else {
        1
    }
}
