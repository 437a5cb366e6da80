//! Turns a raw choice outcome into a final aura delta and updated streak.
use rand::Rng;

use crate::constants::{
    DOUBLE_GAIN_FACTOR, STREAK_BONUS_CAP, STREAK_BONUS_PCT_PER_STEP, STREAK_BONUS_THRESHOLD,
    TIMEOUT_PENALTY,
};
use crate::data::{OptionKind, ScenarioOption};
use crate::records::PowerUpEffect;

/// Where a delta comes from; decides which adjustments apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaSource {
    /// A player choice. Modifiers and the streak bonus apply.
    Decision,
    /// Countdown expiry. Modifiers apply, the streak bonus never does.
    Timeout,
    /// Daily challenge payout. Applied as-is.
    Reward,
}

/// Outcome of one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Delta before modifiers and the streak bonus.
    pub raw_delta: i64,
    pub delta: i64,
    pub new_streak: u32,
    pub is_risk_win: bool,
    pub modifier_consumed: bool,
}

/// Streak bonus in percent of the base delta (100 = no bonus).
#[must_use]
pub fn streak_multiplier_pct(streak: u32) -> i64 {
    if streak < STREAK_BONUS_THRESHOLD {
        return 100;
    }
    100 + i64::from(streak.min(STREAK_BONUS_CAP)) * STREAK_BONUS_PCT_PER_STEP
}

/// Streak after a delta: +1 on gain, reset on loss, held at zero.
#[must_use]
pub const fn next_streak(streak: u32, delta: i64) -> u32 {
    if delta > 0 {
        streak.saturating_add(1)
    } else if delta < 0 {
        0
    } else {
        streak
    }
}

/// Raw payout of an option. Risk options take exactly one draw.
pub fn raw_outcome<R: Rng + ?Sized>(option: &ScenarioOption, rng: &mut R) -> (i64, bool) {
    match option.kind {
        OptionKind::Safe | OptionKind::Wild => (option.base_change.unwrap_or(0), false),
        OptionKind::Risk => {
            let roll = rng.r#gen::<f64>();
            if roll < option.success_rate.unwrap_or(0.0) {
                (option.win_amount.unwrap_or(0), true)
            } else {
                (option.loss_amount.unwrap_or(0), false)
            }
        }
    }
}

/// Apply the armed modifier, then the streak bonus.
///
/// Returns the adjusted delta and whether the modifier was consumed.
#[must_use]
pub fn apply_modifiers(
    raw: i64,
    modifier: Option<PowerUpEffect>,
    streak: u32,
    source: DeltaSource,
) -> (i64, bool) {
    if source == DeltaSource::Reward {
        return (raw, false);
    }

    let mut delta = raw;
    let mut consumed = false;
    match modifier {
        Some(PowerUpEffect::DoubleGain) if raw > 0 => {
            delta = raw.saturating_mul(DOUBLE_GAIN_FACTOR);
            consumed = true;
        }
        Some(PowerUpEffect::NegateLoss) if raw < 0 => {
            delta = 0;
            consumed = true;
        }
        _ => {}
    }

    if source != DeltaSource::Timeout && raw > 0 && streak >= STREAK_BONUS_THRESHOLD {
        // Positive operands, so integer division is the floor.
        delta = delta.saturating_mul(streak_multiplier_pct(streak)) / 100;
    }

    (delta, consumed)
}

/// Score a player choice.
pub fn resolve<R: Rng + ?Sized>(
    option: &ScenarioOption,
    modifier: Option<PowerUpEffect>,
    streak: u32,
    rng: &mut R,
) -> Resolution {
    let (raw_delta, is_risk_win) = raw_outcome(option, rng);
    finish(raw_delta, is_risk_win, modifier, streak, DeltaSource::Decision)
}

/// Score a countdown expiry.
#[must_use]
pub fn resolve_timeout(modifier: Option<PowerUpEffect>, streak: u32) -> Resolution {
    finish(TIMEOUT_PENALTY, false, modifier, streak, DeltaSource::Timeout)
}

/// Score a daily challenge payout. Streak is left as it is.
#[must_use]
pub fn resolve_reward(amount: i64, streak: u32) -> Resolution {
    Resolution {
        raw_delta: amount,
        delta: amount,
        new_streak: streak,
        is_risk_win: false,
        modifier_consumed: false,
    }
}

fn finish(
    raw_delta: i64,
    is_risk_win: bool,
    modifier: Option<PowerUpEffect>,
    streak: u32,
    source: DeltaSource,
) -> Resolution {
    let (delta, modifier_consumed) = apply_modifiers(raw_delta, modifier, streak, source);
    Resolution {
        raw_delta,
        delta,
        new_streak: next_streak(streak, delta),
        is_risk_win,
        modifier_consumed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const DOUBLE: Option<PowerUpEffect> = Some(PowerUpEffect::DoubleGain);
    const SHIELD: Option<PowerUpEffect> = Some(PowerUpEffect::NegateLoss);

    fn safe(delta: i64) -> ScenarioOption {
        ScenarioOption::fixed("safe", OptionKind::Safe, delta)
    }

    #[test]
    fn multiplier_ramp_matches_thresholds() {
        for streak in 0..5 {
            assert_eq!(streak_multiplier_pct(streak), 100, "streak {streak}");
        }
        for streak in 5..=20 {
            assert_eq!(
                streak_multiplier_pct(streak),
                100 + 5 * i64::from(streak),
                "streak {streak}"
            );
        }
        assert_eq!(streak_multiplier_pct(21), 200);
        assert_eq!(streak_multiplier_pct(500), 200);
    }

    #[test]
    fn streak_bonus_floors_the_result() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let res = resolve(&safe(333), None, 5, &mut rng);
        // 333 * 1.25 = 416.25
        assert_eq!(res.delta, 416);
        assert_eq!(res.new_streak, 6);
    }

    #[test]
    fn double_gain_only_touches_gains() {
        let (gain, consumed) = apply_modifiers(300, DOUBLE, 0, DeltaSource::Decision);
        assert_eq!((gain, consumed), (600, true));

        let (loss, consumed) = apply_modifiers(-300, DOUBLE, 0, DeltaSource::Decision);
        assert_eq!((loss, consumed), (-300, false));

        let (zero, consumed) = apply_modifiers(0, DOUBLE, 0, DeltaSource::Decision);
        assert_eq!((zero, consumed), (0, false));
    }

    #[test]
    fn negate_loss_only_touches_losses() {
        let (loss, consumed) = apply_modifiers(-900, SHIELD, 3, DeltaSource::Decision);
        assert_eq!((loss, consumed), (0, true));

        let (gain, consumed) = apply_modifiers(900, SHIELD, 0, DeltaSource::Decision);
        assert_eq!((gain, consumed), (900, false));
    }

    #[test]
    fn double_gain_stacks_with_streak_bonus() {
        let (delta, consumed) = apply_modifiers(100, DOUBLE, 20, DeltaSource::Decision);
        assert!(consumed);
        assert_eq!(delta, 400);
    }

    #[test]
    fn streak_rules_follow_final_delta() {
        assert_eq!(next_streak(4, 10), 5);
        assert_eq!(next_streak(4, -10), 0);
        assert_eq!(next_streak(4, 0), 4);

        // A shielded loss leaves the streak alone.
        let res = resolve_timeout(Some(PowerUpEffect::NegateLoss), 7);
        assert_eq!(res.delta, 0);
        assert!(res.modifier_consumed);
        assert_eq!(res.new_streak, 7);
    }

    #[test]
    fn timeout_is_fixed_and_never_boosted() {
        for streak in [0, 5, 12, 20, 40] {
            let res = resolve_timeout(None, streak);
            assert_eq!(res.delta, TIMEOUT_PENALTY);
            assert_eq!(res.new_streak, 0);
            assert!(!res.modifier_consumed);
        }
        let (delta, consumed) = apply_modifiers(500, None, 20, DeltaSource::Timeout);
        assert_eq!((delta, consumed), (500, false));
    }

    #[test]
    fn risk_extremes_are_deterministic() {
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        let never = ScenarioOption::risk("r", 0.0, 1_000, -2_000);
        let always = ScenarioOption::risk("r", 1.0, 1_000, -2_000);
        for _ in 0..200 {
            let lost = resolve(&never, None, 0, &mut rng);
            assert_eq!(lost.delta, -2_000);
            assert!(!lost.is_risk_win);

            let won = resolve(&always, None, 0, &mut rng);
            assert_eq!(won.delta, 1_000);
            assert!(won.is_risk_win);
        }
    }

    #[test]
    fn missing_payouts_resolve_to_zero() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut option = safe(0);
        option.base_change = None;
        assert_eq!(resolve(&option, None, 2, &mut rng).delta, 0);

        let mut risk = ScenarioOption::risk("r", 1.0, 0, 0);
        risk.win_amount = None;
        let res = resolve(&risk, None, 2, &mut rng);
        assert_eq!(res.delta, 0);
        assert!(res.is_risk_win);
        assert_eq!(res.new_streak, 2);
    }

    #[test]
    fn rewards_bypass_every_adjustment() {
        let res = resolve_reward(1_000, 12);
        assert_eq!(res.delta, 1_000);
        assert_eq!(res.new_streak, 12);
        let (delta, consumed) = apply_modifiers(1_000, DOUBLE, 20, DeltaSource::Reward);
        assert_eq!((delta, consumed), (1_000, false));
    }
}
