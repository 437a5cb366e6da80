//! Session state machine: menu, runs, pause, and game over.
//!
//! A [`Session`] owns the per-run state and the loaded [`ProgressStore`].
//! Hosts drive it with commands (`start`, `choose`, `use_power_up`, ...) and
//! by advancing virtual time with [`Session::advance`]; everything observable
//! comes back as [`GameEvent`]s from [`Session::drain_events`].
use chrono::{DateTime, Local, NaiveDate, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::catalog::{Rank, achievement_def};
use crate::constants::{
    ACHIEVEMENT_POPUP_DELAY_MS, CASH_OUT_REASON, CHALLENGE_AURA, CHALLENGE_REWARD_DELAY_MS,
    CHALLENGE_RISKS, CHALLENGE_SCENARIOS, CHALLENGE_STREAK, CHOICE_ADVANCE_DELAY_MS,
    END_CHECK_DELAY_MS, FEEDBACK_CLEAR_DELAY_MS, INITIAL_TIME, LOSS_REASON, LOSS_THRESHOLD,
    SHAKE_CLEAR_DELAY_MS, STREAK_BONUS_THRESHOLD, TIMEOUT_ADVANCE_DELAY_MS, TIMER_DECAY,
    TIMER_TICK_MS, WIN_THRESHOLD,
};
use crate::data::{OptionKind, Scenario, ScenarioOption, ScenarioPool};
use crate::persistence::{KeyValueStore, ProgressStore};
use crate::progress::{
    Decision, ProgressMode, advance_challenge, apply_aura_delta, apply_decision,
    check_achievements,
};
use crate::records::{AchievementState, DailyChallenge, GameStats, PowerUp, PowerUpEffect};
use crate::scoring::{Resolution, resolve, resolve_reward, resolve_timeout};
use crate::share::{COPY_FAILURE_MESSAGE, COPY_SUCCESS_MESSAGE, ClipboardSink, share_summary};
use crate::timer::{Countdown, Scheduler};

/// Top-level screen the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Menu,
    Playing,
    GameOver,
    Stats,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Menu => "menu",
            Self::Playing => "playing",
            Self::GameOver => "game over",
            Self::Stats => "stats",
        })
    }
}

/// Wall-clock source for calendar dates and unlock timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Local calendar day used for daily challenges and play streaks.
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }

    fn today(&self) -> NaiveDate {
        self.0.date_naive()
    }
}

/// Timing knobs and the RNG seed for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub initial_time: u32,
    pub timer_decay: u32,
    pub timer_tick_ms: u64,
    pub choice_advance_delay_ms: u64,
    pub timeout_advance_delay_ms: u64,
    pub feedback_clear_delay_ms: u64,
    pub shake_clear_delay_ms: u64,
    pub end_check_delay_ms: u64,
    pub challenge_reward_delay_ms: u64,
    pub achievement_popup_delay_ms: u64,
    /// Fixed seed for reproducible runs; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_time: INITIAL_TIME,
            timer_decay: TIMER_DECAY,
            timer_tick_ms: TIMER_TICK_MS,
            choice_advance_delay_ms: CHOICE_ADVANCE_DELAY_MS,
            timeout_advance_delay_ms: TIMEOUT_ADVANCE_DELAY_MS,
            feedback_clear_delay_ms: FEEDBACK_CLEAR_DELAY_MS,
            shake_clear_delay_ms: SHAKE_CLEAR_DELAY_MS,
            end_check_delay_ms: END_CHECK_DELAY_MS,
            challenge_reward_delay_ms: CHALLENGE_REWARD_DELAY_MS,
            achievement_popup_delay_ms: ACHIEVEMENT_POPUP_DELAY_MS,
            seed: None,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Milliseconds a full countdown lasts.
    #[must_use]
    pub fn decision_window_ms(&self) -> u64 {
        let ticks = self.initial_time.div_ceil(self.timer_decay.max(1));
        u64::from(ticks) * self.timer_tick_ms.max(1)
    }
}

/// Per-run state; discarded when returning to the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: Status,
    pub aura: i64,
    pub max_aura: i64,
    pub streak: u32,
    pub scenarios_played: u32,
    /// End-of-run reasons for the current run.
    pub history: Vec<String>,
    /// Best final aura seen by this process.
    pub best_run: i64,
    pub total_games_played: u64,
    pub paused: bool,
    /// Virtual time the current run started at.
    pub run_started_ms: u64,
}

impl SessionState {
    fn baseline(best_run: i64, total_games_played: u64) -> Self {
        Self {
            status: Status::Menu,
            aura: 0,
            max_aura: 0,
            streak: 0,
            scenarios_played: 0,
            history: Vec::new(),
            best_run,
            total_games_played,
            paused: false,
            run_started_ms: 0,
        }
    }

    #[must_use]
    pub const fn rank(&self) -> Rank {
        Rank::for_aura(self.aura)
    }

    #[must_use]
    pub const fn peak_rank(&self) -> Rank {
        Rank::for_aura(self.max_aura)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTone {
    Good,
    Bad,
    Neutral,
}

/// Transient banner shown after an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub message: String,
    pub tone: FeedbackTone,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub reason: String,
    pub aura: i64,
    pub max_aura: i64,
    pub won: bool,
    pub scenarios_played: u32,
    pub play_secs: u64,
}

/// Everything a host can observe, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    StatusChanged(Status),
    ScenarioPresented {
        scenario_id: String,
    },
    ChoiceResolved {
        option_id: String,
        kind: OptionKind,
        resolution: Resolution,
        aura: i64,
    },
    TimedOut {
        resolution: Resolution,
        aura: i64,
    },
    Feedback(Feedback),
    FeedbackCleared,
    Shake,
    ShakeCleared,
    PowerUpUsed {
        id: String,
        effect: PowerUpEffect,
    },
    AchievementUnlocked {
        id: &'static str,
        title: &'static str,
    },
    ChallengeCompleted {
        id: String,
        reward: i64,
    },
    RewardGranted {
        challenge_id: String,
        reward: i64,
        aura: i64,
    },
    Paused,
    Resumed,
    RunEnded(RunOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {action} while in {status}")]
    InvalidState {
        action: &'static str,
        status: Status,
    },
    #[error("cannot {0} while paused")]
    Paused(&'static str),
    #[error("cannot {0} until the last outcome settles")]
    Blocked(&'static str),
    #[error("no scenario is on screen")]
    NoScenario,
    #[error("scenario has no option `{0}`")]
    UnknownOption(String),
    #[error("power-up `{0}` is not available")]
    PowerUpUnavailable(String),
    #[error("a {0} power-up is already armed")]
    ModifierArmed(PowerUpEffect),
}

/// Work deferred onto the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Deferred {
    AdvanceScenario,
    ClearFeedback,
    ClearShake,
    EndCheck,
    /// Carries only the id and amount; applied to live state on firing.
    GrantReward {
        challenge_id: String,
        reward: i64,
    },
    AnnounceAchievement(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Announce {
    Now,
    Later,
}

pub struct Session<S: KeyValueStore, C: Clock = SystemClock> {
    config: SessionConfig,
    pool: ScenarioPool,
    progress: ProgressStore<S>,
    clock: C,
    rng: ChaCha20Rng,
    state: SessionState,
    scenario: Option<Scenario>,
    countdown: Countdown,
    scheduler: Scheduler<Deferred>,
    active_modifier: Option<PowerUpEffect>,
    feedback: Option<Feedback>,
    shaking: bool,
    resume_countdown: bool,
    elapsed_ms: u64,
    last_outcome: Option<RunOutcome>,
    events: Vec<GameEvent>,
}

impl<S: KeyValueStore> Session<S> {
    /// Load progress from `store` and open on the menu.
    #[must_use]
    pub fn new(store: S, pool: ScenarioPool, config: SessionConfig) -> Self {
        Self::with_clock(store, pool, config, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> Session<S, C> {
    #[must_use]
    pub fn with_clock(store: S, pool: ScenarioPool, config: SessionConfig, clock: C) -> Self {
        let progress = ProgressStore::load(store, clock.today());
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().r#gen());
        log::debug!("session seeded with {seed}");
        let countdown = Countdown::new(
            config.initial_time,
            config.timer_decay,
            config.timer_tick_ms,
        );
        let total_games_played = progress.stats().total_games_played;
        Self {
            config,
            pool,
            progress,
            clock,
            rng: ChaCha20Rng::seed_from_u64(seed),
            state: SessionState::baseline(0, total_games_played),
            scenario: None,
            countdown,
            scheduler: Scheduler::new(),
            active_modifier: None,
            feedback: None,
            shaking: false,
            resume_countdown: false,
            elapsed_ms: 0,
            last_outcome: None,
            events: Vec::new(),
        }
    }

    // ----- accessors -----

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.state.status
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }

    /// Countdown units left on the current scenario.
    #[must_use]
    pub const fn time_left(&self) -> u32 {
        self.countdown.remaining()
    }

    #[must_use]
    pub const fn progress(&self) -> &ProgressStore<S> {
        &self.progress
    }

    #[must_use]
    pub const fn stats(&self) -> &GameStats {
        self.progress.stats()
    }

    #[must_use]
    pub fn achievements(&self) -> &[AchievementState] {
        self.progress.achievements()
    }

    #[must_use]
    pub fn challenges(&self) -> &[DailyChallenge] {
        self.progress.challenges()
    }

    #[must_use]
    pub fn power_ups(&self) -> &[PowerUp] {
        self.progress.power_ups()
    }

    #[must_use]
    pub const fn active_modifier(&self) -> Option<PowerUpEffect> {
        self.active_modifier
    }

    #[must_use]
    pub const fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub const fn is_shaking(&self) -> bool {
        self.shaking
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Virtual milliseconds since the session was created, pauses included.
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    #[must_use]
    pub const fn last_outcome(&self) -> Option<&RunOutcome> {
        self.last_outcome.as_ref()
    }

    /// A pending advance, terminal check, or feedback window blocks input.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.feedback.is_some()
            || self
                .scheduler
                .any(|task| matches!(task, Deferred::AdvanceScenario | Deferred::EndCheck))
    }

    /// Take every event raised since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Consume the session, returning the underlying store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.progress.into_inner()
    }

    // ----- time -----

    /// Let `ms` of virtual time pass, firing countdown ticks and deferred
    /// effects in time order. While paused only the play clock moves.
    pub fn advance(&mut self, ms: u64) {
        let mut left = ms;
        loop {
            if self.state.paused {
                self.elapsed_ms = self.elapsed_ms.saturating_add(left);
                return;
            }
            let next = [self.countdown.ms_until_tick(), self.scheduler.ms_until_next()]
                .into_iter()
                .flatten()
                .min();
            match next {
                Some(step) if step <= left => {
                    self.pass(step);
                    left -= step;
                    self.fire_due();
                }
                _ => {
                    self.pass(left);
                    return;
                }
            }
        }
    }

    fn pass(&mut self, ms: u64) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(ms);
        self.scheduler.elapse(ms);
        self.countdown.elapse(ms);
    }

    fn fire_due(&mut self) {
        while let Some(task) = self.scheduler.pop_due() {
            self.run_deferred(task);
        }
        if self.countdown.tick() {
            self.handle_timeout();
        }
    }

    fn run_deferred(&mut self, task: Deferred) {
        match task {
            Deferred::AdvanceScenario => {
                if self.state.status == Status::Playing {
                    self.present_next_scenario();
                }
            }
            Deferred::ClearFeedback => {
                self.feedback = None;
                self.events.push(GameEvent::FeedbackCleared);
            }
            Deferred::ClearShake => {
                self.shaking = false;
                self.events.push(GameEvent::ShakeCleared);
            }
            Deferred::EndCheck => {
                if self.state.status == Status::Playing && self.state.aura <= LOSS_THRESHOLD {
                    self.finish_run(LOSS_REASON);
                }
            }
            Deferred::GrantReward {
                challenge_id,
                reward,
            } => self.grant_reward(&challenge_id, reward),
            Deferred::AnnounceAchievement(id) => self.announce(id),
        }
    }

    // ----- commands -----

    /// Begin a run from the menu or the game-over screen.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] from any other screen.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state.status, Status::Menu | Status::GameOver) {
            return Err(SessionError::InvalidState {
                action: "start a run",
                status: self.state.status,
            });
        }
        self.progress.refresh_challenges(self.clock.today());

        let total_games_played = self.state.total_games_played + 1;
        self.state = SessionState {
            status: Status::Playing,
            run_started_ms: self.elapsed_ms,
            ..SessionState::baseline(self.state.best_run, total_games_played)
        };
        self.clear_transients();

        let mut stats = self.progress.stats().clone();
        stats.total_games_played += 1;
        self.progress.set_stats(stats);

        log::debug!("run {total_games_played} started");
        self.events.push(GameEvent::StatusChanged(Status::Playing));
        self.present_next_scenario();
        Ok(())
    }

    /// Resolve the option with `option_id` on the current scenario.
    ///
    /// # Errors
    ///
    /// Fails when not playing, paused, blocked, or when the option is unknown.
    pub fn choose(&mut self, option_id: &str) -> Result<Resolution, SessionError> {
        self.ensure_interactive("choose")?;
        let option = self
            .scenario
            .as_ref()
            .ok_or(SessionError::NoScenario)?
            .option(option_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownOption(option_id.to_string()))?;

        self.countdown.stop();
        let modifier = self.scoring_modifier();
        let resolution = resolve(&option, modifier, self.state.streak, &mut self.rng);
        self.record_resolution(Decision::Choice(option.kind), &resolution);
        if resolution.is_risk_win {
            self.advance_challenges(CHALLENGE_RISKS, 1, ProgressMode::Accumulate);
        }

        self.events.push(GameEvent::ChoiceResolved {
            option_id: option.id.clone(),
            kind: option.kind,
            resolution,
            aura: self.state.aura,
        });
        let (message, tone) = if resolution.modifier_consumed {
            modifier_feedback(modifier, &resolution)
        } else {
            choice_feedback(&option, &resolution)
        };
        self.set_feedback(message, tone);
        if resolution.delta < 0 {
            self.shake();
        }
        self.scheduler
            .schedule(self.config.choice_advance_delay_ms, Deferred::AdvanceScenario);
        Ok(resolution)
    }

    /// Spend one charge of a power-up.
    ///
    /// # Errors
    ///
    /// Fails when not interactive, when a modifier is already armed, or when
    /// the power-up is unknown or out of charges.
    pub fn use_power_up(&mut self, power_up_id: &str) -> Result<PowerUpEffect, SessionError> {
        self.ensure_interactive("use a power-up")?;
        if let Some(armed) = self.active_modifier {
            return Err(SessionError::ModifierArmed(armed));
        }

        let mut power_ups = self.progress.power_ups().to_vec();
        let Some(power_up) = power_ups
            .iter_mut()
            .find(|p| p.id == power_up_id && p.count > 0)
        else {
            return Err(SessionError::PowerUpUnavailable(power_up_id.to_string()));
        };
        power_up.count -= 1;
        let effect = power_up.effect;
        let name = power_up.name.clone();
        self.progress.set_power_ups(power_ups);

        log::debug!("power-up {power_up_id} used ({effect})");
        self.events.push(GameEvent::PowerUpUsed {
            id: power_up_id.to_string(),
            effect,
        });
        self.active_modifier = Some(effect);
        if effect == PowerUpEffect::RerollScenario {
            self.countdown.stop();
            self.present_next_scenario();
        } else {
            self.set_feedback(format!("{name} ACTIVATED!"), FeedbackTone::Good);
        }
        Ok(effect)
    }

    /// Freeze the countdown and every deferred effect. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] outside a run.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.ensure_playing("pause")?;
        if self.state.paused {
            return Ok(());
        }
        self.state.paused = true;
        self.resume_countdown = self.countdown.is_running();
        self.countdown.stop();
        self.events.push(GameEvent::Paused);
        Ok(())
    }

    /// Continue from where [`Session::pause`] left off. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] outside a run.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.ensure_playing("resume")?;
        if !self.state.paused {
            return Ok(());
        }
        self.state.paused = false;
        if self.resume_countdown {
            self.countdown.start();
        }
        self.events.push(GameEvent::Resumed);
        Ok(())
    }

    /// Flip between paused and running; returns the new paused flag.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] outside a run.
    pub fn toggle_pause(&mut self) -> Result<bool, SessionError> {
        if self.state.paused {
            self.resume()?;
        } else {
            self.pause()?;
        }
        Ok(self.state.paused)
    }

    /// End the run on the player's terms.
    ///
    /// # Errors
    ///
    /// Fails when not playing, paused, or blocked.
    pub fn cash_out(&mut self) -> Result<RunOutcome, SessionError> {
        self.ensure_interactive("cash out")?;
        Ok(self.finish_run(CASH_OUT_REASON))
    }

    /// Abandon the current run or leave the game-over screen.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] from the stats screen.
    pub fn return_to_menu(&mut self) -> Result<(), SessionError> {
        match self.state.status {
            Status::Menu => return Ok(()),
            Status::Stats => {
                return Err(SessionError::InvalidState {
                    action: "return to the menu",
                    status: Status::Stats,
                });
            }
            Status::Playing | Status::GameOver => {}
        }
        self.countdown.stop();
        self.flush_deferred();
        self.clear_transients();
        self.state = SessionState::baseline(self.state.best_run, self.state.total_games_played);
        self.events.push(GameEvent::StatusChanged(Status::Menu));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] unless on the menu.
    pub fn show_stats(&mut self) -> Result<(), SessionError> {
        self.switch_screen(Status::Menu, Status::Stats, "show stats")
    }

    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] unless on the stats screen.
    pub fn hide_stats(&mut self) -> Result<(), SessionError> {
        self.switch_screen(Status::Stats, Status::Menu, "hide stats")
    }

    /// Copy the stats summary to `sink`, reporting the result as feedback.
    pub fn share<K: ClipboardSink>(&mut self, sink: &mut K) -> bool {
        let text = share_summary(
            self.progress.stats(),
            self.progress.achievements(),
            self.progress.challenges(),
        );
        match sink.copy_text(&text) {
            Ok(()) => {
                self.set_feedback(COPY_SUCCESS_MESSAGE.to_string(), FeedbackTone::Good);
                true
            }
            Err(err) => {
                log::warn!("share failed: {err}");
                self.set_feedback(COPY_FAILURE_MESSAGE.to_string(), FeedbackTone::Bad);
                false
            }
        }
    }

    // ----- transitions -----

    fn switch_screen(
        &mut self,
        from: Status,
        to: Status,
        action: &'static str,
    ) -> Result<(), SessionError> {
        if self.state.status != from {
            return Err(SessionError::InvalidState {
                action,
                status: self.state.status,
            });
        }
        self.state.status = to;
        self.events.push(GameEvent::StatusChanged(to));
        Ok(())
    }

    fn ensure_playing(&self, action: &'static str) -> Result<(), SessionError> {
        if self.state.status == Status::Playing {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                action,
                status: self.state.status,
            })
        }
    }

    fn ensure_interactive(&self, action: &'static str) -> Result<(), SessionError> {
        self.ensure_playing(action)?;
        if self.state.paused {
            return Err(SessionError::Paused(action));
        }
        if self.is_blocked() {
            return Err(SessionError::Blocked(action));
        }
        Ok(())
    }

    fn clear_transients(&mut self) {
        self.scheduler.drain();
        self.scenario = None;
        self.active_modifier = None;
        self.feedback = None;
        self.shaking = false;
        self.resume_countdown = false;
        self.countdown.reset();
    }

    /// The armed modifier if it acts on scoring.
    fn scoring_modifier(&self) -> Option<PowerUpEffect> {
        self.active_modifier
            .filter(|effect| *effect != PowerUpEffect::RerollScenario)
    }

    fn present_next_scenario(&mut self) {
        if self.active_modifier == Some(PowerUpEffect::RerollScenario) {
            self.active_modifier = None;
        }
        let scenario = self.pool.draw(&mut self.rng).clone();
        log::debug!("presenting scenario {}", scenario.id);
        self.countdown.reset();
        self.state.scenarios_played += 1;
        self.events.push(GameEvent::ScenarioPresented {
            scenario_id: scenario.id.clone(),
        });
        self.scenario = Some(scenario);
        self.advance_challenges(CHALLENGE_SCENARIOS, 1, ProgressMode::Accumulate);
        self.countdown.start();
    }

    fn handle_timeout(&mut self) {
        let resolution = resolve_timeout(self.scoring_modifier(), self.state.streak);
        log::debug!("countdown expired on scenario {}", self.scenario_id());
        self.record_resolution(Decision::Timeout, &resolution);
        self.events.push(GameEvent::TimedOut {
            resolution,
            aura: self.state.aura,
        });
        if resolution.modifier_consumed {
            self.set_feedback(
                format!("SHIELD BLOCKED {}!", resolution.raw_delta),
                FeedbackTone::Neutral,
            );
        } else {
            self.set_feedback(
                format!("{} Aura (SLOW)", resolution.raw_delta),
                FeedbackTone::Bad,
            );
        }
        self.shake();
        self.scheduler.schedule(
            self.config.timeout_advance_delay_ms,
            Deferred::AdvanceScenario,
        );
    }

    fn scenario_id(&self) -> &str {
        self.scenario.as_ref().map_or("-", |s| s.id.as_str())
    }

    fn record_resolution(&mut self, decision: Decision, resolution: &Resolution) {
        if resolution.modifier_consumed {
            self.active_modifier = None;
        }
        let stats = apply_decision(self.progress.stats(), decision, resolution);
        self.progress.set_stats(stats);
        self.apply_delta(resolution.delta, resolution.new_streak);
        self.evaluate_achievements(Announce::Later);
    }

    fn apply_delta(&mut self, delta: i64, new_streak: u32) {
        self.state.aura = self.state.aura.saturating_add(delta);
        self.state.max_aura = self.state.max_aura.max(self.state.aura);
        self.state.streak = new_streak;

        if delta > 0 {
            self.advance_challenges(
                CHALLENGE_AURA,
                delta.unsigned_abs(),
                ProgressMode::Accumulate,
            );
        }
        if new_streak >= STREAK_BONUS_THRESHOLD {
            self.advance_challenges(
                CHALLENGE_STREAK,
                u64::from(new_streak),
                ProgressMode::HighWater,
            );
        }
        if self.state.aura <= LOSS_THRESHOLD
            && !self
                .scheduler
                .any(|task| matches!(task, Deferred::EndCheck))
        {
            self.scheduler
                .schedule(self.config.end_check_delay_ms, Deferred::EndCheck);
        }
    }

    fn grant_reward(&mut self, challenge_id: &str, reward: i64) {
        let resolution = resolve_reward(reward, self.state.streak);
        let stats = apply_aura_delta(self.progress.stats(), resolution.delta);
        self.progress.set_stats(stats);
        self.apply_delta(resolution.delta, resolution.new_streak);
        log::info!("daily challenge {challenge_id} paid {reward}");
        self.events.push(GameEvent::RewardGranted {
            challenge_id: challenge_id.to_string(),
            reward,
            aura: self.state.aura,
        });
        self.set_feedback(
            format!("Daily Challenge! +{reward} Aura"),
            FeedbackTone::Good,
        );
        self.evaluate_achievements(Announce::Later);
    }

    fn advance_challenges(&mut self, prefix: &str, amount: u64, mode: ProgressMode) {
        let step = advance_challenge(self.progress.challenges(), prefix, amount, mode);
        if step.challenges.as_slice() == self.progress.challenges() {
            return;
        }
        self.progress.set_challenges(step.challenges);
        for done in step.completed {
            log::info!("daily challenge {} completed", done.id);
            self.events.push(GameEvent::ChallengeCompleted {
                id: done.id.clone(),
                reward: done.reward,
            });
            self.scheduler.schedule(
                self.config.challenge_reward_delay_ms,
                Deferred::GrantReward {
                    challenge_id: done.id,
                    reward: done.reward,
                },
            );
        }
    }

    fn evaluate_achievements(&mut self, announce: Announce) {
        let (updated, fresh) = check_achievements(
            self.progress.stats(),
            self.progress.achievements(),
            self.clock.now(),
        );
        let Some(first) = fresh.first() else {
            return;
        };
        self.progress.set_achievements(updated);
        for def in &fresh {
            log::info!("achievement unlocked: {}", def.id);
        }
        match announce {
            Announce::Now => self.announce(first.id),
            Announce::Later => {
                self.scheduler.schedule(
                    self.config.achievement_popup_delay_ms,
                    Deferred::AnnounceAchievement(first.id),
                );
            }
        }
    }

    fn announce(&mut self, id: &'static str) {
        if let Some(def) = achievement_def(id) {
            self.events.push(GameEvent::AchievementUnlocked {
                id: def.id,
                title: def.title,
            });
        }
    }

    fn set_feedback(&mut self, message: String, tone: FeedbackTone) {
        self.scheduler
            .cancel_where(|task| matches!(task, Deferred::ClearFeedback));
        let feedback = Feedback { message, tone };
        self.events.push(GameEvent::Feedback(feedback.clone()));
        self.feedback = Some(feedback);
        self.scheduler
            .schedule(self.config.feedback_clear_delay_ms, Deferred::ClearFeedback);
    }

    fn shake(&mut self) {
        self.scheduler
            .cancel_where(|task| matches!(task, Deferred::ClearShake));
        self.shaking = true;
        self.events.push(GameEvent::Shake);
        self.scheduler
            .schedule(self.config.shake_clear_delay_ms, Deferred::ClearShake);
    }

    /// Apply pending reward grants and announcements right away and drop
    /// every other deferred effect.
    fn flush_deferred(&mut self) {
        loop {
            let pending = self.scheduler.drain();
            if pending.is_empty() {
                break;
            }
            for task in pending {
                match task {
                    Deferred::GrantReward {
                        challenge_id,
                        reward,
                    } => self.grant_reward(&challenge_id, reward),
                    Deferred::AnnounceAchievement(id) => self.announce(id),
                    Deferred::AdvanceScenario
                    | Deferred::ClearFeedback
                    | Deferred::ClearShake
                    | Deferred::EndCheck => {}
                }
            }
        }
        self.feedback = None;
        self.shaking = false;
    }

    fn finish_run(&mut self, reason: &str) -> RunOutcome {
        self.countdown.stop();
        self.flush_deferred();

        let play_secs = self.elapsed_ms.saturating_sub(self.state.run_started_ms) / 1_000;
        let aura = self.state.aura;
        let won = aura >= WIN_THRESHOLD;

        let mut stats = self.progress.stats().clone();
        stats.total_play_time += play_secs;
        stats.highest_streak = stats.highest_streak.max(u64::from(self.state.streak));
        if won {
            stats.games_won += 1;
        } else {
            stats.games_lost += 1;
        }
        self.progress.set_stats(stats);
        self.evaluate_achievements(Announce::Now);

        self.state.history.push(reason.to_string());
        self.state.best_run = self.state.best_run.max(aura);
        self.state.status = Status::GameOver;
        self.state.paused = false;
        self.scenario = None;
        self.active_modifier = None;

        let outcome = RunOutcome {
            reason: reason.to_string(),
            aura,
            max_aura: self.state.max_aura,
            won,
            scenarios_played: self.state.scenarios_played,
            play_secs,
        };
        log::info!(
            "run ended: {reason} at {aura} aura ({})",
            if won { "win" } else { "loss" }
        );
        self.events.push(GameEvent::RunEnded(outcome.clone()));
        self.events.push(GameEvent::StatusChanged(Status::GameOver));
        self.last_outcome = Some(outcome.clone());
        outcome
    }
}

fn choice_feedback(option: &ScenarioOption, resolution: &Resolution) -> (String, FeedbackTone) {
    let raw = resolution.raw_delta;
    match option.kind {
        OptionKind::Safe | OptionKind::Wild => {
            let tone = if raw >= 0 {
                FeedbackTone::Good
            } else {
                FeedbackTone::Bad
            };
            let message = if raw > 0 {
                format!("+{raw}")
            } else {
                raw.to_string()
            };
            (message, tone)
        }
        OptionKind::Risk if resolution.is_risk_win => (format!("W (+{raw})"), FeedbackTone::Good),
        OptionKind::Risk => (format!("COOKED ({raw})"), FeedbackTone::Bad),
    }
}

fn modifier_feedback(
    modifier: Option<PowerUpEffect>,
    resolution: &Resolution,
) -> (String, FeedbackTone) {
    match modifier {
        Some(PowerUpEffect::DoubleGain) => (
            format!("2X MULTIPLIER! +{}", resolution.delta),
            FeedbackTone::Good,
        ),
        _ => (
            format!("SHIELD BLOCKED {}!", resolution.raw_delta),
            FeedbackTone::Neutral,
        ),
    }
}
