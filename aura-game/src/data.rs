use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// Bundled scenario pool shipped with the engine.
pub const EMBEDDED_SCENARIOS_JSON: &str = include_str!("../assets/scenarios.json");

/// The three labeled choice families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Safe,
    Risk,
    Wild,
}

impl OptionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Risk => "risk",
            Self::Wild => "wild",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A choice within a scenario.
///
/// Payout fields are optional in the stored form; a missing field resolves
/// to zero rather than failing the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOption {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_change: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_amount: Option<i64>,
}

impl ScenarioOption {
    /// Fixed-payout option (safe or wild).
    #[must_use]
    pub fn fixed(id: &str, kind: OptionKind, base_change: i64) -> Self {
        Self {
            id: id.to_string(),
            text: String::new(),
            kind,
            base_change: Some(base_change),
            success_rate: None,
            win_amount: None,
            loss_amount: None,
        }
    }

    /// Probabilistic risk option.
    #[must_use]
    pub fn risk(id: &str, success_rate: f64, win_amount: i64, loss_amount: i64) -> Self {
        Self {
            id: id.to_string(),
            text: String::new(),
            kind: OptionKind::Risk,
            base_change: None,
            success_rate: Some(success_rate),
            win_amount: Some(win_amount),
            loss_amount: Some(loss_amount),
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

pub type OptionSet = SmallVec<[ScenarioOption; 3]>;

/// A prompt and its ordered set of options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub options: OptionSet,
}

impl Scenario {
    #[must_use]
    pub fn option(&self, option_id: &str) -> Option<&ScenarioOption> {
        self.options.iter().find(|opt| opt.id == option_id)
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("scenario JSON could not be parsed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scenario pool is empty")]
    EmptyPool,
    #[error("scenario {0} has no options")]
    NoOptions(String),
}

/// Immutable pool scenarios are drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScenarioPool {
    pub scenarios: Vec<Scenario>,
}

impl ScenarioPool {
    /// Parse and validate a pool from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, the pool is empty, or any
    /// scenario has no options to choose from.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let pool: Self = serde_json::from_str(json)?;
        pool.validate()?;
        Ok(pool)
    }

    /// Build a pool from already constructed scenarios.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool is empty or a scenario has no options.
    pub fn from_scenarios(scenarios: Vec<Scenario>) -> Result<Self, DataError> {
        let pool = Self { scenarios };
        pool.validate()?;
        Ok(pool)
    }

    fn validate(&self) -> Result<(), DataError> {
        if self.scenarios.is_empty() {
            return Err(DataError::EmptyPool);
        }
        if let Some(empty) = self.scenarios.iter().find(|s| s.options.is_empty()) {
            return Err(DataError::NoOptions(empty.id.clone()));
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Uniform draw, repeats allowed.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &Scenario {
        let idx = rng.gen_range(0..self.scenarios.len());
        &self.scenarios[idx]
    }
}

/// Source of the scenario pool; hosts may load from elsewhere.
pub trait ScenarioSource {
    /// Load the scenario pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be read or fails validation.
    fn load_scenarios(&self) -> Result<ScenarioPool, DataError>;
}

/// Loads the pool bundled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedScenarios;

impl ScenarioSource for EmbeddedScenarios {
    fn load_scenarios(&self) -> Result<ScenarioPool, DataError> {
        ScenarioPool::from_json(EMBEDDED_SCENARIOS_JSON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn embedded_pool_parses() {
        let pool = EmbeddedScenarios.load_scenarios().unwrap();
        assert!(pool.len() >= 10);
        for scenario in &pool.scenarios {
            assert!(!scenario.options.is_empty(), "{} has options", scenario.id);
            for opt in &scenario.options {
                match opt.kind {
                    OptionKind::Risk => {
                        let rate = opt.success_rate.expect("risk has rate");
                        assert!((0.0..=1.0).contains(&rate));
                    }
                    OptionKind::Safe | OptionKind::Wild => assert!(opt.base_change.is_some()),
                }
            }
        }
    }

    #[test]
    fn missing_payout_fields_deserialize_as_none() {
        let json = r#"{
            "scenarios": [
                {
                    "id": "s1",
                    "text": "Someone waves at you",
                    "options": [
                        { "id": "a", "text": "Wave back", "type": "safe" },
                        { "id": "b", "text": "Fake a call", "type": "risk", "winAmount": 400 }
                    ]
                }
            ]
        }"#;
        let pool = ScenarioPool::from_json(json).unwrap();
        let scenario = &pool.scenarios[0];
        assert_eq!(scenario.option("a").unwrap().base_change, None);
        assert_eq!(scenario.option("b").unwrap().success_rate, None);
        assert_eq!(scenario.option("b").unwrap().win_amount, Some(400));
    }

    #[test]
    fn empty_pool_is_rejected() {
        let err = ScenarioPool::from_json(r#"{ "scenarios": [] }"#).unwrap_err();
        assert!(matches!(err, DataError::EmptyPool));
    }

    #[test]
    fn draw_stays_within_pool() {
        let pool = EmbeddedScenarios.load_scenarios().unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..50 {
            let picked = pool.draw(&mut rng);
            assert!(pool.scenarios.iter().any(|s| s.id == picked.id));
        }
    }
}
