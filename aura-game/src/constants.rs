//! Centralized balance and tuning constants for ±AURA game logic.
//!
//! These values define the deterministic math for the scoring engine and the
//! session timer. Hosts may override the timing values through
//! [`crate::SessionConfig`]; the scoring values are fixed.

// Storage keys -------------------------------------------------------------
pub const STATS_KEY: &str = "aura_game_stats";
pub const ACHIEVEMENTS_KEY: &str = "aura_achievements";
pub const DAILY_CHALLENGES_KEY: &str = "aura_daily_challenges";
pub const POWERUPS_KEY: &str = "aura_powerups";

// Scoring ------------------------------------------------------------------
pub const TIMEOUT_PENALTY: i64 = -1_000;
pub const STREAK_BONUS_THRESHOLD: u32 = 5;
pub const STREAK_BONUS_CAP: u32 = 20;
/// Streak bonus per streak step, in percent of the base delta.
pub const STREAK_BONUS_PCT_PER_STEP: i64 = 5;
pub const DOUBLE_GAIN_FACTOR: i64 = 2;

// Terminal thresholds ------------------------------------------------------
pub const LOSS_THRESHOLD: i64 = -20_000;
pub const WIN_THRESHOLD: i64 = 5_000;
pub const LOSS_REASON: &str = "CANCELED FOR BEING CRINGE";
pub const CASH_OUT_REASON: &str = "CASHED OUT";

// Countdown ----------------------------------------------------------------
pub const INITIAL_TIME: u32 = 100;
pub const TIMER_DECAY: u32 = 1;
pub const TIMER_TICK_MS: u64 = 100;

// Deferred effects ---------------------------------------------------------
pub const CHOICE_ADVANCE_DELAY_MS: u64 = 800;
pub const TIMEOUT_ADVANCE_DELAY_MS: u64 = 1_000;
pub const FEEDBACK_CLEAR_DELAY_MS: u64 = 800;
pub const SHAKE_CLEAR_DELAY_MS: u64 = 500;
pub const END_CHECK_DELAY_MS: u64 = 500;
pub const CHALLENGE_REWARD_DELAY_MS: u64 = 1_000;
pub const ACHIEVEMENT_POPUP_DELAY_MS: u64 = 1_000;

// Daily challenge template ids ---------------------------------------------
pub const CHALLENGE_SCENARIOS: &str = "daily_scenarios";
pub const CHALLENGE_STREAK: &str = "daily_streak";
pub const CHALLENGE_AURA: &str = "daily_aura";
pub const CHALLENGE_RISKS: &str = "daily_risks";
/// Number of templates rolled into each day's challenge set.
pub const DAILY_CHALLENGE_COUNT: usize = 3;
