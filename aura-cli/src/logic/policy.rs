use std::fmt;

use aura_game::{OptionKind, PowerUp, PowerUpEffect, Scenario, ScenarioOption, SessionState};
use clap::ValueEnum;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    pub option_id: String,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(option_id: &str, rationale: Option<String>) -> Self {
        Self {
            option_id: option_id.to_string(),
            rationale,
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select an option for the scenario on screen.
    fn pick_option(&mut self, state: &SessionState, scenario: &Scenario) -> PolicyDecision;

    /// Power-up to arm before answering, if any.
    fn pick_power_up(
        &mut self,
        _state: &SessionState,
        _scenario: &Scenario,
        _power_ups: &[PowerUp],
    ) -> Option<String> {
        None
    }
}

/// Built-in autoplay strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum Strategy {
    /// Always take the safe option
    Safe,
    /// Always roll the risk option, shielded when possible
    Risk,
    /// Always take the wild option
    Wild,
    /// Pick uniformly at random
    Random,
}

impl Strategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Strategy::Safe => "Safe",
            Strategy::Risk => "Risk",
            Strategy::Wild => "Wild",
            Strategy::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Strategy::Safe => Box::new(KindPolicy::new(OptionKind::Safe)),
            Strategy::Risk => Box::new(KindPolicy::new(OptionKind::Risk)),
            Strategy::Wild => Box::new(KindPolicy::new(OptionKind::Wild)),
            Strategy::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Prefers one option kind; falls back to the best expected value.
struct KindPolicy {
    kind: OptionKind,
}

impl KindPolicy {
    fn new(kind: OptionKind) -> Self {
        Self { kind }
    }
}

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for KindPolicy {
    fn name(&self) -> &'static str {
        match self.kind {
            OptionKind::Safe => "Safe",
            OptionKind::Risk => "Risk",
            OptionKind::Wild => "Wild",
        }
    }

    fn pick_option(&mut self, _state: &SessionState, scenario: &Scenario) -> PolicyDecision {
        if let Some(option) = scenario.options.iter().find(|o| o.kind == self.kind) {
            return PolicyDecision::new(&option.id, Some(format!("prefers {}", self.kind)));
        }
        best_expected(scenario)
    }

    fn pick_power_up(
        &mut self,
        _state: &SessionState,
        scenario: &Scenario,
        power_ups: &[PowerUp],
    ) -> Option<String> {
        let option = scenario.options.iter().find(|o| o.kind == self.kind)?;
        let wanted = if expected_value(option) < 0.0 {
            PowerUpEffect::RerollScenario
        } else if self.kind == OptionKind::Risk {
            PowerUpEffect::NegateLoss
        } else {
            return None;
        };
        power_ups
            .iter()
            .find(|p| p.effect == wanted && p.count > 0)
            .map(|p| p.id.clone())
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_option(&mut self, _state: &SessionState, scenario: &Scenario) -> PolicyDecision {
        if scenario.options.is_empty() {
            return PolicyDecision::new("", Some("no options".to_string()));
        }
        let idx = self.rng.gen_range(0..scenario.options.len());
        PolicyDecision::new(&scenario.options[idx].id, Some(format!("roll {idx}")))
    }
}

fn best_expected(scenario: &Scenario) -> PolicyDecision {
    scenario
        .options
        .iter()
        .max_by(|a, b| expected_value(a).total_cmp(&expected_value(b)))
        .map_or_else(
            || PolicyDecision::new("", Some("no options".to_string())),
            |option| {
                PolicyDecision::new(
                    &option.id,
                    Some(format!("expected {:.0}", expected_value(option))),
                )
            },
        )
}

/// Mean payout of an option, missing fields counted as zero.
#[allow(clippy::cast_precision_loss)]
pub fn expected_value(option: &ScenarioOption) -> f64 {
    match option.kind {
        OptionKind::Safe | OptionKind::Wild => option.base_change.unwrap_or(0) as f64,
        OptionKind::Risk => {
            let rate = option.success_rate.unwrap_or(0.0).clamp(0.0, 1.0);
            rate * option.win_amount.unwrap_or(0) as f64
                + (1.0 - rate) * option.loss_amount.unwrap_or(0) as f64
        }
    }
}
