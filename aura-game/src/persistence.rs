//! Persistence gateway over an opaque key-value store.
//!
//! Four records are kept, each read and written whole. Reads that fail or
//! hold malformed JSON fall back to defaults; writes that fail are logged and
//! swallowed so the in-memory copy stays authoritative.
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

use crate::catalog::{default_power_ups, generate_daily_challenges, iso_date};
use crate::constants::{ACHIEVEMENTS_KEY, DAILY_CHALLENGES_KEY, POWERUPS_KEY, STATS_KEY};
use crate::progress::{consecutive_days, merge_achievements};
use crate::records::{AchievementState, DailyChallenge, GameStats, PowerUp};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Raw string store the gateway persists through.
pub trait KeyValueStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Delete `key` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    read_only: Rc<RefCell<bool>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write until switched back.
    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.borrow_mut() = read_only;
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = StoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        if *self.read_only.borrow() {
            return Err(StoreError::Unavailable(format!("{key} is read-only")));
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        if *self.read_only.borrow() {
            return Err(StoreError::Unavailable(format!("{key} is read-only")));
        }
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Working copies of every persisted record plus the store they came from.
#[derive(Debug)]
pub struct ProgressStore<S: KeyValueStore> {
    kv: S,
    stats: GameStats,
    achievements: Vec<AchievementState>,
    challenges: Vec<DailyChallenge>,
    power_ups: Vec<PowerUp>,
}

impl<S: KeyValueStore> ProgressStore<S> {
    /// Load every record, regenerating or defaulting where needed, and
    /// roll the consecutive-day streak forward to `today`.
    pub fn load(kv: S, today: NaiveDate) -> Self {
        let stats: GameStats = read_record(&kv, STATS_KEY).unwrap_or_default();
        let achievements = read_record::<Vec<AchievementState>>(&kv, ACHIEVEMENTS_KEY)
            .map(|stored| merge_achievements(&stored))
            .unwrap_or_else(|| merge_achievements(&[]));
        let challenges = load_challenges(&kv, today);
        let power_ups = read_record(&kv, POWERUPS_KEY).unwrap_or_else(default_power_ups);

        let mut store = Self {
            kv,
            stats,
            achievements,
            challenges,
            power_ups,
        };
        store.touch_play_date(today);
        store
    }

    fn touch_play_date(&mut self, today: NaiveDate) {
        let days = consecutive_days(
            &self.stats.last_played_date,
            self.stats.consecutive_days,
            today,
        );
        let date = iso_date(today);
        if days != self.stats.consecutive_days || date != self.stats.last_played_date {
            let mut stats = self.stats.clone();
            stats.consecutive_days = days;
            stats.last_played_date = date;
            self.set_stats(stats);
        }
    }

    /// Regenerate the challenge set when the calendar day has moved on.
    /// Returns `true` when a fresh set was stamped.
    pub fn refresh_challenges(&mut self, today: NaiveDate) -> bool {
        if is_current(&self.challenges, today) {
            return false;
        }
        log::debug!("daily challenges rolled over to {today}");
        self.set_challenges(generate_daily_challenges(today));
        true
    }

    #[must_use]
    pub const fn stats(&self) -> &GameStats {
        &self.stats
    }

    #[must_use]
    pub fn achievements(&self) -> &[AchievementState] {
        &self.achievements
    }

    #[must_use]
    pub fn challenges(&self) -> &[DailyChallenge] {
        &self.challenges
    }

    #[must_use]
    pub fn power_ups(&self) -> &[PowerUp] {
        &self.power_ups
    }

    /// Borrow the underlying key-value store.
    #[must_use]
    pub const fn kv(&self) -> &S {
        &self.kv
    }

    pub fn set_stats(&mut self, stats: GameStats) {
        self.stats = stats;
        write_record(&self.kv, STATS_KEY, &self.stats);
    }

    pub fn set_achievements(&mut self, achievements: Vec<AchievementState>) {
        self.achievements = achievements;
        write_record(&self.kv, ACHIEVEMENTS_KEY, &self.achievements);
    }

    pub fn set_challenges(&mut self, challenges: Vec<DailyChallenge>) {
        self.challenges = challenges;
        write_record(&self.kv, DAILY_CHALLENGES_KEY, &self.challenges);
    }

    pub fn set_power_ups(&mut self, power_ups: Vec<PowerUp>) {
        self.power_ups = power_ups;
        write_record(&self.kv, POWERUPS_KEY, &self.power_ups);
    }

    /// Drop every stored record and start over from defaults.
    pub fn reset(&mut self, today: NaiveDate) {
        for key in [STATS_KEY, ACHIEVEMENTS_KEY, DAILY_CHALLENGES_KEY, POWERUPS_KEY] {
            if let Err(err) = self.kv.remove(key) {
                log::warn!("failed to clear {key}: {err}");
            }
        }
        self.stats = GameStats::default();
        self.achievements = merge_achievements(&[]);
        self.challenges = generate_daily_challenges(today);
        self.power_ups = default_power_ups();
        self.touch_play_date(today);
    }

    /// Consume the gateway, returning the store.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.kv
    }
}

fn is_current(challenges: &[DailyChallenge], today: NaiveDate) -> bool {
    let date = iso_date(today);
    challenges.first().is_some_and(|c| c.date == date)
}

fn load_challenges<S: KeyValueStore>(kv: &S, today: NaiveDate) -> Vec<DailyChallenge> {
    match read_record::<Vec<DailyChallenge>>(kv, DAILY_CHALLENGES_KEY) {
        Some(stored) if is_current(&stored, today) => stored,
        _ => {
            let fresh = generate_daily_challenges(today);
            write_record(kv, DAILY_CHALLENGES_KEY, &fresh);
            fresh
        }
    }
}

fn read_record<T: DeserializeOwned>(kv: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            log::warn!("failed to load {key}: {err}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("discarding malformed {key}: {err}");
            None
        }
    }
}

fn write_record<T: Serialize + ?Sized>(kv: &impl KeyValueStore, key: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(err) => {
            log::warn!("failed to serialize {key}: {err}");
            return;
        }
    };
    if let Err(err) = kv.set(key, &json) {
        log::warn!("failed to save {key}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ACHIEVEMENTS;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn first_load_seeds_defaults() {
        let kv = MemoryStore::new();
        let store = ProgressStore::load(kv.clone(), day(16));
        assert_eq!(store.stats().consecutive_days, 1);
        assert_eq!(store.stats().last_played_date, "2026-10-16");
        assert_eq!(store.achievements().len(), ACHIEVEMENTS.len());
        assert!(store.achievements().iter().all(|a| !a.unlocked));
        assert_eq!(store.power_ups(), default_power_ups().as_slice());
        assert!(store.challenges().iter().all(|c| c.date == "2026-10-16"));
        assert!(kv.raw(STATS_KEY).is_some());
    }

    #[test]
    fn stale_challenges_are_replaced_not_merged() {
        let kv = MemoryStore::new();
        let mut yesterday = generate_daily_challenges(day(15));
        yesterday[0].progress = yesterday[0].target;
        yesterday[0].completed = true;
        kv.set(DAILY_CHALLENGES_KEY, &serde_json::to_string(&yesterday).unwrap())
            .unwrap();

        let store = ProgressStore::load(kv, day(16));
        assert_eq!(store.challenges(), generate_daily_challenges(day(16)).as_slice());
        assert!(store.challenges().iter().all(|c| c.progress == 0 && !c.completed));
    }

    #[test]
    fn todays_challenges_survive_reload() {
        let kv = MemoryStore::new();
        let mut store = ProgressStore::load(kv.clone(), day(16));
        let mut set = store.challenges().to_vec();
        set[0].progress = 2;
        store.set_challenges(set.clone());

        let reloaded = ProgressStore::load(kv, day(16));
        assert_eq!(reloaded.challenges(), set.as_slice());
    }

    #[test]
    fn malformed_records_fall_back_to_defaults() {
        let kv = MemoryStore::new();
        kv.set(STATS_KEY, "{not json").unwrap();
        kv.set(ACHIEVEMENTS_KEY, "42").unwrap();
        kv.set(POWERUPS_KEY, "[{\"id\":1}]").unwrap();
        let store = ProgressStore::load(kv, day(16));
        assert_eq!(store.stats().total_decisions, 0);
        assert_eq!(store.achievements().len(), ACHIEVEMENTS.len());
        assert_eq!(store.power_ups().len(), default_power_ups().len());
    }

    #[test]
    fn consecutive_days_roll_forward_on_load() {
        let kv = MemoryStore::new();
        drop(ProgressStore::load(kv.clone(), day(14)));
        drop(ProgressStore::load(kv.clone(), day(15)));
        let store = ProgressStore::load(kv.clone(), day(15));
        assert_eq!(store.stats().consecutive_days, 2);
        let store = ProgressStore::load(kv, day(17));
        assert_eq!(store.stats().consecutive_days, 1);
    }

    #[test]
    fn write_failures_keep_memory_authoritative() {
        let kv = MemoryStore::new();
        let mut store = ProgressStore::load(kv.clone(), day(16));
        kv.set_read_only(true);
        let stats = GameStats {
            total_decisions: 9,
            ..store.stats().clone()
        };
        store.set_stats(stats);
        assert_eq!(store.stats().total_decisions, 9);

        let persisted: GameStats = serde_json::from_str(&kv.raw(STATS_KEY).unwrap()).unwrap();
        assert_eq!(persisted.total_decisions, 0);

        kv.set_read_only(false);
        store.set_stats(store.stats().clone());
        let persisted: GameStats = serde_json::from_str(&kv.raw(STATS_KEY).unwrap()).unwrap();
        assert_eq!(persisted.total_decisions, 9);
    }

    #[test]
    fn reset_clears_every_record() {
        let kv = MemoryStore::new();
        let mut store = ProgressStore::load(kv.clone(), day(16));
        store.set_power_ups(Vec::new());
        store.set_stats(GameStats {
            games_won: 3,
            ..GameStats::default()
        });
        store.reset(day(16));
        assert_eq!(store.stats().games_won, 0);
        assert_eq!(store.power_ups().len(), default_power_ups().len());
        assert!(kv.raw(POWERUPS_KEY).is_none());
    }
}
