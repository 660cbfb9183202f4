//! Randomized click bonuses: lucky bonuses and the fever window.

use std::collections::VecDeque;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::state::EconomyState;

/// Source of uniform samples in `[0, 1)`.
///
/// Every `rand` generator is a source; tests and replays can feed a fixed
/// sequence through [`SequenceSource`].
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Replays a fixed list of samples, cycling when exhausted.
/// An empty sequence always yields `1.0`, which never passes a trial.
#[derive(Clone, Debug, Default)]
pub struct SequenceSource {
    samples: VecDeque<f64>,
}

impl SequenceSource {
    pub fn new(samples: impl IntoIterator<Item = f64>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }
}

impl RandomSource for SequenceSource {
    fn next_unit(&mut self) -> f64 {
        match self.samples.pop_front() {
            Some(sample) => {
                self.samples.push_back(sample);
                sample
            }
            None => 1.0,
        }
    }
}

/// Bernoulli(p) trial.
pub fn bernoulli<R: RandomSource + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.next_unit() < p.clamp(0.0, 1.0)
}

/// Outcome of the two per-click trials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClickRoll {
    pub lucky: bool,
    pub fever: bool,
}

/// Sample both triggers once. Lucky is drawn first, then fever; both draws
/// always happen so a seeded sequence stays aligned.
pub fn roll_click_bonuses<R: RandomSource + ?Sized>(state: &EconomyState, rng: &mut R) -> ClickRoll {
    let lucky = bernoulli(rng, state.lucky_chance);
    let fever = bernoulli(rng, state.fever_chance);
    ClickRoll { lucky, fever }
}

/// Start fever unless it is already running. Returns true if it started.
/// A running window is never extended.
pub fn activate_fever(state: &mut EconomyState, config: &EngineConfig) -> bool {
    if state.fever_active {
        return false;
    }
    state.fever_active = true;
    state.fever_end_ms = state.elapsed_ms.saturating_add(config.fever_duration_ms);
    tracing::info!(
        target: "heart_clicker::bonus",
        ends_at_ms = state.fever_end_ms,
        "fever.started"
    );
    true
}

/// Clear fever once the game clock has passed its end. Returns true if it ended.
pub fn expire_fever(state: &mut EconomyState) -> bool {
    if state.fever_active && state.elapsed_ms > state.fever_end_ms {
        state.fever_active = false;
        tracing::info!(target: "heart_clicker::bonus", at_ms = state.elapsed_ms, "fever.ended");
        return true;
    }
    false
}

/// Reward of a lucky bonus: some seconds of auto income plus some clicks.
pub fn lucky_reward(state: &EconomyState, config: &EngineConfig) -> f64 {
    state.auto_rate * config.lucky_rate_seconds
        + state.click_power as f64 * config.lucky_click_multiplier
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LuckyBonusId(pub u64);

/// A spawned, not yet claimed lucky bonus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LuckyBonus {
    pub id: LuckyBonusId,
    pub spawned_at_ms: u64,
    pub expires_at_ms: u64,
}

impl LuckyBonus {
    pub fn is_claimable(&self, now_ms: u64) -> bool {
        now_ms < self.expires_at_ms
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LuckyClaimError {
    #[error("no live lucky bonus with id {0:?}")]
    Unknown(LuckyBonusId),
    #[error("lucky bonus {0:?} expired before it was claimed")]
    Expired(LuckyBonusId),
}

/// Live lucky bonuses. Transient: never part of a snapshot.
#[derive(Clone, Debug, Default)]
pub struct LuckyBonuses {
    next_id: u64,
    live: Vec<LuckyBonus>,
}

impl LuckyBonuses {
    pub fn spawn(&mut self, now_ms: u64, config: &EngineConfig) -> LuckyBonusId {
        let id = LuckyBonusId(self.next_id);
        self.next_id += 1;
        self.live.push(LuckyBonus {
            id,
            spawned_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(config.lucky_window_ms),
        });
        tracing::debug!(target: "heart_clicker::bonus", id = id.0, "lucky.spawned");
        id
    }

    /// Remove `id` for claiming. An expired bonus is discarded and reported.
    pub fn take(&mut self, id: LuckyBonusId, now_ms: u64) -> Result<LuckyBonus, LuckyClaimError> {
        let idx = self
            .live
            .iter()
            .position(|b| b.id == id)
            .ok_or(LuckyClaimError::Unknown(id))?;
        let bonus = self.live.remove(idx);
        if !bonus.is_claimable(now_ms) {
            return Err(LuckyClaimError::Expired(id));
        }
        Ok(bonus)
    }

    /// Drop bonuses whose window has closed, returning their ids.
    pub fn prune(&mut self, now_ms: u64) -> Vec<LuckyBonusId> {
        let mut expired = Vec::new();
        self.live.retain(|b| {
            let keep = b.is_claimable(now_ms);
            if !keep {
                expired.push(b.id);
            }
            keep
        });
        if !expired.is_empty() {
            tracing::debug!(
                target: "heart_clicker::bonus",
                count = expired.len(),
                "lucky.expired"
            );
        }
        expired
    }

    pub fn live(&self) -> &[LuckyBonus] {
        &self.live
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fresh() -> (EconomyState, EngineConfig) {
        let config = EngineConfig::default();
        (EconomyState::new(&Catalog::builtin(), &config), config)
    }

    #[test]
    fn bernoulli_respects_bounds() {
        let mut rng = SequenceSource::new([0.0, 0.5, 0.999]);
        assert!(!bernoulli(&mut rng, 0.0));
        assert!(!bernoulli(&mut rng, 0.5));
        assert!(bernoulli(&mut rng, 1.0));
    }

    #[test]
    fn empty_sequence_never_triggers() {
        let mut rng = SequenceSource::default();
        assert!(!bernoulli(&mut rng, 0.99));
    }

    #[test]
    fn roll_draws_lucky_then_fever() {
        let (state, _) = fresh();
        // lucky_chance = 0.01, fever_chance = 0.005
        let mut rng = SequenceSource::new([0.001, 0.9]);
        assert_eq!(
            roll_click_bonuses(&state, &mut rng),
            ClickRoll {
                lucky: true,
                fever: false
            }
        );
        let mut rng = SequenceSource::new([0.9, 0.001]);
        assert_eq!(
            roll_click_bonuses(&state, &mut rng),
            ClickRoll {
                lucky: false,
                fever: true
            }
        );
    }

    #[test]
    fn seeded_rng_is_a_source() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..10 {
            let x = a.next_unit();
            assert!((0.0..1.0).contains(&x));
            assert_eq!(x, b.next_unit());
        }
    }

    #[test]
    fn fever_starts_once_and_does_not_extend() {
        let (mut state, config) = fresh();
        state.elapsed_ms = 1_000;
        assert!(activate_fever(&mut state, &config));
        assert_eq!(state.fever_end_ms, 11_000);
        state.elapsed_ms = 5_000;
        assert!(!activate_fever(&mut state, &config));
        assert_eq!(state.fever_end_ms, 11_000);
    }

    #[test]
    fn fever_expires_after_end() {
        let (mut state, config) = fresh();
        activate_fever(&mut state, &config);
        state.elapsed_ms = 10_000;
        assert!(!expire_fever(&mut state));
        assert!(state.fever_active);
        state.elapsed_ms = 10_100;
        assert!(expire_fever(&mut state));
        assert!(!state.fever_active);
        assert!(!expire_fever(&mut state));
    }

    #[test]
    fn lucky_reward_formula() {
        let (mut state, config) = fresh();
        state.auto_rate = 5.0;
        state.click_power = 3;
        assert!((lucky_reward(&state, &config) - 450.0).abs() < 0.001);
    }

    #[test]
    fn lucky_claim_inside_window() {
        let config = EngineConfig::default();
        let mut bonuses = LuckyBonuses::default();
        let id = bonuses.spawn(1_000, &config);
        assert_eq!(bonuses.live().len(), 1);
        let bonus = bonuses.take(id, 5_999).unwrap();
        assert_eq!(bonus.expires_at_ms, 6_000);
        assert!(bonuses.live().is_empty());
        assert_eq!(bonuses.take(id, 5_999), Err(LuckyClaimError::Unknown(id)));
    }

    #[test]
    fn lucky_claim_after_window_is_expired() {
        let config = EngineConfig::default();
        let mut bonuses = LuckyBonuses::default();
        let id = bonuses.spawn(0, &config);
        assert_eq!(bonuses.take(id, 5_000), Err(LuckyClaimError::Expired(id)));
        assert!(bonuses.live().is_empty());
    }

    #[test]
    fn prune_removes_only_expired() {
        let config = EngineConfig::default();
        let mut bonuses = LuckyBonuses::default();
        let old = bonuses.spawn(0, &config);
        let young = bonuses.spawn(3_000, &config);
        assert_eq!(bonuses.prune(5_000), vec![old]);
        assert_eq!(bonuses.live().len(), 1);
        assert_eq!(bonuses.live()[0].id, young);
    }
}
