//! ±AURA Game Engine
//!
//! Platform-agnostic core logic for the ±AURA decision game. This crate
//! provides scoring, progress tracking, persistence and the session state
//! machine without UI or platform-specific dependencies; hosts plug in a
//! key-value store and drive virtual time.

pub mod catalog;
pub mod constants;
pub mod data;
pub mod persistence;
pub mod progress;
pub mod records;
pub mod scoring;
pub mod session;
pub mod share;
pub mod timer;

// Re-export commonly used types
pub use catalog::{
    ACHIEVEMENTS, AchievementDef, CHALLENGE_TEMPLATES, ChallengeTemplate, Condition, Rank,
    StatField, achievement_def, default_power_ups, generate_daily_challenges, iso_date,
};
pub use data::{
    DataError, EmbeddedScenarios, OptionKind, Scenario, ScenarioOption, ScenarioPool,
    ScenarioSource,
};
pub use persistence::{KeyValueStore, MemoryStore, ProgressStore, StoreError};
pub use progress::{
    ChallengeAdvance, CompletedChallenge, Decision, ProgressMode, advance_challenge,
    apply_decision, check_achievements, consecutive_days, merge_achievements,
};
pub use records::{AchievementState, DailyChallenge, GameStats, PowerUp, PowerUpEffect};
pub use scoring::{DeltaSource, Resolution, resolve, resolve_reward, resolve_timeout};
pub use session::{
    Clock, Feedback, FeedbackTone, FixedClock, GameEvent, RunOutcome, Session, SessionConfig,
    SessionError, SessionState, Status, SystemClock,
};
pub use share::{ClipboardSink, share_summary};
pub use timer::{Countdown, Scheduler, TaskId};

/// Binds a scenario source to a store and opens sessions over them.
pub struct GameEngine<L, S>
where
    L: ScenarioSource,
    S: KeyValueStore + Clone,
{
    scenarios: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: ScenarioSource,
    S: KeyValueStore + Clone,
{
    /// Create an engine over the provided scenario source and storage
    pub const fn new(scenarios: L, storage: S) -> Self {
        Self { scenarios, storage }
    }

    /// Open a session on the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario pool cannot be loaded.
    pub fn create_session(&self, config: SessionConfig) -> Result<Session<S>, DataError> {
        self.create_session_with_clock(config, SystemClock)
    }

    /// Open a session on a caller-supplied clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario pool cannot be loaded.
    pub fn create_session_with_clock<C: Clock>(
        &self,
        config: SessionConfig,
        clock: C,
    ) -> Result<Session<S, C>, DataError> {
        let pool = self.scenarios.load_scenarios()?;
        log::debug!("loaded {} scenarios", pool.len());
        Ok(Session::with_clock(
            self.storage.clone(),
            pool,
            config,
            clock,
        ))
    }

    /// Load the persisted progress without opening a session.
    pub fn load_progress(&self, today: chrono::NaiveDate) -> ProgressStore<S> {
        ProgressStore::load(self.storage.clone(), today)
    }

    /// Borrow the storage backend.
    pub const fn storage(&self) -> &S {
        &self.storage
    }
}
