use aura_game::{Clock, GameEvent, KeyValueStore, Rank, RunOutcome, Session, SessionError, Status};
use serde::Serialize;

use crate::logic::policy::PlayerPolicy;

/// Step used while waiting out feedback windows and pending advances.
const SETTLE_STEP_MS: u64 = 100;

/// Configuration for an autoplay run.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    /// Cash out once this many choices have been made.
    pub max_decisions: u32,
    /// Virtual time spent reading each scenario before answering.
    pub think_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_decisions: 200,
            think_ms: 500,
        }
    }
}

impl SimulationConfig {
    #[must_use]
    pub fn with_max_decisions(mut self, max_decisions: u32) -> Self {
        self.max_decisions = max_decisions;
        self
    }

    #[must_use]
    pub fn with_think_ms(mut self, think_ms: u64) -> Self {
        self.think_ms = think_ms;
        self
    }
}

/// Snapshot of one resolved choice.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub scenario_id: String,
    pub option_id: String,
    pub delta: i64,
    pub aura: i64,
    pub rationale: Option<String>,
}

/// Everything observed during one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run: u32,
    pub policy: String,
    pub outcome: RunOutcome,
    pub rank: String,
    pub peak_rank: String,
    pub decisions: Vec<DecisionRecord>,
    pub timeouts: u32,
    pub power_ups: Vec<String>,
    pub rewards: i64,
    pub achievements: Vec<String>,
}

#[derive(Debug, Default)]
struct Observed {
    timeouts: u32,
    power_ups: Vec<String>,
    rewards: i64,
    achievements: Vec<String>,
    outcome: Option<RunOutcome>,
}

impl Observed {
    fn absorb(&mut self, events: Vec<GameEvent>) {
        for event in events {
            match event {
                GameEvent::TimedOut { .. } => self.timeouts += 1,
                GameEvent::PowerUpUsed { id, .. } => self.power_ups.push(id),
                GameEvent::RewardGranted { reward, .. } => self.rewards += reward,
                GameEvent::AchievementUnlocked { title, .. } => {
                    self.achievements.push(title.to_string());
                }
                GameEvent::RunEnded(outcome) => self.outcome = Some(outcome),
                _ => {}
            }
        }
    }
}

/// Drive one full run of `session` with `policy`, from start to game over.
///
/// # Errors
///
/// Returns an error if the session rejects a command the harness believed
/// was legal.
pub fn play_run<S, C>(
    session: &mut Session<S, C>,
    policy: &mut dyn PlayerPolicy,
    run: u32,
    config: SimulationConfig,
) -> Result<RunRecord, SessionError>
where
    S: KeyValueStore,
    C: Clock,
{
    session.start()?;
    let mut observed = Observed::default();
    let mut decisions = Vec::new();

    while session.status() == Status::Playing {
        observed.absorb(session.drain_events());
        if session.is_blocked() {
            session.advance(SETTLE_STEP_MS);
            continue;
        }
        if decisions.len() >= config.max_decisions as usize {
            session.cash_out()?;
            continue;
        }
        let Some(scenario) = session.scenario().cloned() else {
            session.advance(SETTLE_STEP_MS);
            continue;
        };

        if session.active_modifier().is_none()
            && let Some(power_up) =
                policy.pick_power_up(session.state(), &scenario, session.power_ups())
        {
            log::debug!("{} arms {power_up} on {}", policy.name(), scenario.id);
            session.use_power_up(&power_up)?;
            continue;
        }

        let decision = policy.pick_option(session.state(), &scenario);
        let played = session.state().scenarios_played;
        session.advance(config.think_ms);
        if session.status() != Status::Playing
            || session.is_blocked()
            || session.state().scenarios_played != played
        {
            // Timed out or ended while thinking.
            continue;
        }

        let resolution = session.choose(&decision.option_id)?;
        decisions.push(DecisionRecord {
            scenario_id: scenario.id,
            option_id: decision.option_id,
            delta: resolution.delta,
            aura: session.state().aura,
            rationale: decision.rationale,
        });
    }
    observed.absorb(session.drain_events());

    let outcome = match observed.outcome.take() {
        Some(outcome) => outcome,
        None => session
            .last_outcome()
            .cloned()
            .ok_or(SessionError::InvalidState {
                action: "summarize a run",
                status: session.status(),
            })?,
    };
    log::info!(
        "run {run} ({}) ended: {} at {} aura",
        policy.name(),
        outcome.reason,
        outcome.aura
    );

    Ok(RunRecord {
        run,
        policy: policy.name().to_string(),
        rank: Rank::for_aura(outcome.aura).to_string(),
        peak_rank: Rank::for_aura(outcome.max_aura).to_string(),
        outcome,
        decisions,
        timeouts: observed.timeouts,
        power_ups: observed.power_ups,
        rewards: observed.rewards,
        achievements: observed.achievements,
    })
}
