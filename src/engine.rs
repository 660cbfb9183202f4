//! Command facade over the economy.
//!
//! The engine owns the state and is the only thing that mutates it. A
//! presentation layer issues commands (click, purchase, tick, claim, save,
//! load) one at a time and reads back a [`Readout`]. Each command runs to
//! completion before the next; a multi-threaded host should keep the engine
//! behind a single owner and send it commands.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::bonus::{
    activate_fever, lucky_reward, roll_click_bonuses, LuckyBonus, LuckyBonusId, LuckyBonuses,
    LuckyClaimError, RandomSource,
};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::format::{format_currency, format_eta, format_rate};
use crate::progression::{
    check_level_up, next_level_status, select_viewing_level, LevelUp, NextLevelStatus,
    ProgressionError,
};
use crate::purchase::{self, PurchaseError, Purchased};
use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::EconomyState;
use crate::tick::{run_tick, TickOutcome};

/// Result of a manual click.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClickOutcome {
    pub gained: f64,
    /// A lucky bonus spawned by this click.
    pub lucky: Option<LuckyBonusId>,
    /// Fever started by this click. False if it was already running.
    pub fever_started: bool,
    pub level_up: Option<LevelUp>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LuckyClaimed {
    pub id: LuckyBonusId,
    pub reward: f64,
    pub level_up: Option<LevelUp>,
}

/// Read-only projection for the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Readout {
    pub currency: f64,
    pub currency_display: String,
    pub effective_rate: f64,
    pub rate_display: String,
    pub click_power: u64,
    pub fever_remaining_seconds: Option<f64>,
    pub milestone_level: u32,
    pub viewing_level: u32,
    pub viewing_asset: Option<String>,
    pub next_level: NextLevelStatus,
    /// Formatted time to the next milestone; `None` without automatic income.
    pub eta_display: Option<String>,
    pub completed: bool,
}

pub struct Engine<R = ChaCha8Rng> {
    catalog: Arc<Catalog>,
    config: EngineConfig,
    state: EconomyState,
    lucky: LuckyBonuses,
    rng: R,
}

impl Engine<ChaCha8Rng> {
    /// Engine whose bonus rolls are reproducible from `seed`.
    pub fn seeded(catalog: Arc<Catalog>, config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(catalog, config, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self::with_rng(catalog, config, ChaCha8Rng::from_entropy())
    }
}

impl<R: RandomSource> Engine<R> {
    pub fn with_rng(catalog: Arc<Catalog>, config: EngineConfig, rng: R) -> Self {
        let state = EconomyState::new(&catalog, &config);
        Self {
            catalog,
            config,
            state,
            lucky: LuckyBonuses::default(),
            rng,
        }
    }

    pub fn state(&self) -> &EconomyState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lucky_bonuses(&self) -> &[LuckyBonus] {
        self.lucky.live()
    }

    /// Manual click: income, then the lucky and fever trials, then progression.
    pub fn click(&mut self) -> ClickOutcome {
        let gained = self.state.apply_manual_click();
        let roll = roll_click_bonuses(&self.state, &mut self.rng);

        let lucky = roll
            .lucky
            .then(|| self.lucky.spawn(self.state.elapsed_ms, &self.config));
        let fever_started = roll.fever && activate_fever(&mut self.state, &self.config);
        let level_up = check_level_up(&mut self.state, &self.catalog);

        ClickOutcome {
            gained,
            lucky,
            fever_started,
            level_up,
        }
    }

    pub fn purchase(&mut self, id: &str) -> Result<Purchased, PurchaseError> {
        purchase::purchase(&mut self.state, &self.catalog, &self.config, id)
    }

    pub fn can_afford(&self, id: &str) -> bool {
        purchase::can_afford(&self.state, id)
    }

    pub fn tick(&mut self) -> TickOutcome {
        run_tick(&mut self.state, &self.catalog, &self.config, &mut self.lucky)
    }

    /// Collect a live lucky bonus. The reward is valued at claim time.
    pub fn claim_lucky(&mut self, id: LuckyBonusId) -> Result<LuckyClaimed, LuckyClaimError> {
        self.lucky.take(id, self.state.elapsed_ms)?;
        let reward = lucky_reward(&self.state, &self.config);
        self.state.currency += reward;
        tracing::debug!(target: "heart_clicker::bonus", id = id.0, reward, "lucky.claimed");
        let level_up = check_level_up(&mut self.state, &self.catalog);
        Ok(LuckyClaimed {
            id,
            reward,
            level_up,
        })
    }

    pub fn select_viewing_level(&mut self, level: u32) -> Result<(), ProgressionError> {
        select_viewing_level(&mut self.state, &self.catalog, level)
    }

    pub fn save(&self) -> Snapshot {
        Snapshot::capture(&self.state)
    }

    pub fn save_json(&self) -> Result<String, SnapshotError> {
        self.save().to_json()
    }

    /// Replace the whole state with `snapshot`. On error nothing changes.
    /// Live lucky bonuses are dropped on success.
    pub fn load(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let restored = snapshot
            .restore(&self.catalog, &self.config)
            .inspect_err(|err| {
                tracing::warn!(target: "heart_clicker::snapshot", error = %err, "snapshot.rejected");
            })?;
        self.state = restored;
        self.lucky.clear();
        tracing::info!(
            target: "heart_clicker::snapshot",
            level = self.state.milestone_level,
            "snapshot.loaded"
        );
        Ok(())
    }

    pub fn load_json(&mut self, json: &str) -> Result<(), SnapshotError> {
        let snapshot = Snapshot::from_json(json).inspect_err(|err| {
            tracing::warn!(target: "heart_clicker::snapshot", error = %err, "snapshot.rejected");
        })?;
        self.load(&snapshot)
    }

    /// Load a save written by the old browser build.
    pub fn import_legacy_json(&mut self, json: &str) -> Result<(), SnapshotError> {
        let snapshot = Snapshot::from_legacy_json(json).inspect_err(|err| {
            tracing::warn!(target: "heart_clicker::snapshot", error = %err, "legacy_save.rejected");
        })?;
        self.load(&snapshot)
    }

    pub fn readout(&self) -> Readout {
        let effective_rate = self.state.effective_rate();
        let next_level = next_level_status(&self.state, &self.catalog);
        let eta_display = match &next_level {
            NextLevelStatus::Remaining {
                eta_seconds: Some(eta),
                ..
            } => Some(format_eta(*eta)),
            _ => None,
        };
        Readout {
            currency: self.state.currency,
            currency_display: format_currency(self.state.currency),
            effective_rate,
            rate_display: format_rate(effective_rate),
            click_power: self.state.click_power,
            fever_remaining_seconds: self.state.fever_remaining_seconds(),
            milestone_level: self.state.milestone_level,
            viewing_level: self.state.viewing_level,
            viewing_asset: self
                .catalog
                .milestone(self.state.viewing_level)
                .and_then(|m| m.asset.clone()),
            next_level,
            eta_display,
            completed: self.state.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::SequenceSource;

    /// Samples that never pass a trial at the starting probabilities.
    fn quiet() -> SequenceSource {
        SequenceSource::new([0.99])
    }

    fn engine(rng: SequenceSource) -> Engine<SequenceSource> {
        Engine::with_rng(Catalog::builtin(), EngineConfig::default(), rng)
    }

    #[test]
    fn click_without_bonus() {
        let mut engine = engine(quiet());
        let out = engine.click();
        assert!((out.gained - 1.0).abs() < 0.001);
        assert_eq!(out.lucky, None);
        assert!(!out.fever_started);
        assert!(engine.lucky_bonuses().is_empty());
    }

    #[test]
    fn click_can_spawn_lucky_and_fever_together() {
        let mut engine = engine(SequenceSource::new([0.0, 0.0]));
        let out = engine.click();
        assert!(out.lucky.is_some());
        assert!(out.fever_started);
        assert!(engine.state().fever_active);
        assert_eq!(engine.lucky_bonuses().len(), 1);
    }

    #[test]
    fn fever_retrigger_is_noop() {
        let mut engine = engine(SequenceSource::new([0.99, 0.0]));
        assert!(engine.click().fever_started);
        let end = engine.state().fever_end_ms;
        engine.tick();
        engine.tick();
        assert!(!engine.click().fever_started);
        assert_eq!(engine.state().fever_end_ms, end);
    }

    #[test]
    fn claim_lucky_credits_reward() {
        let mut engine = engine(SequenceSource::new([0.0, 0.99]));
        let id = engine.click().lucky.unwrap();
        let claimed = engine.claim_lucky(id).unwrap();
        // click_power 1 → 100, auto_rate 0
        assert!((claimed.reward - 100.0).abs() < 0.001);
        assert!((engine.state().currency - 101.0).abs() < 0.001);
        assert_eq!(claimed.level_up.map(|l| l.level), Some(2));
        assert_eq!(engine.claim_lucky(id), Err(LuckyClaimError::Unknown(id)));
    }

    #[test]
    fn claim_after_window_forfeits() {
        let mut engine = engine(SequenceSource::new([0.0, 0.99]));
        let id = engine.click().lucky.unwrap();
        let before = engine.state().currency;
        for _ in 0..50 {
            engine.tick();
        }
        assert_eq!(engine.claim_lucky(id), Err(LuckyClaimError::Unknown(id)));
        assert_eq!(engine.state().currency, before);
    }

    #[test]
    fn failed_load_keeps_state() {
        let mut engine = engine(quiet());
        for _ in 0..10 {
            engine.click();
        }
        let before = engine.state().clone();
        assert!(engine.load_json("{ broken").is_err());
        let mut bad = engine.save();
        bad.state.viewing_level = 9;
        assert!(engine.load(&bad).is_err());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn load_drops_live_lucky_bonuses() {
        let mut engine = engine(SequenceSource::new([0.0, 0.99]));
        let saved = engine.save();
        engine.click();
        assert_eq!(engine.lucky_bonuses().len(), 1);
        engine.load(&saved).unwrap();
        assert!(engine.lucky_bonuses().is_empty());
        assert_eq!(engine.state().currency, 0.0);
    }

    #[test]
    fn readout_reflects_state() {
        let mut engine = engine(quiet());
        for _ in 0..150 {
            engine.click();
        }
        engine.purchase("auto_click_1").unwrap();
        let readout = engine.readout();
        assert_eq!(readout.currency_display, "50");
        assert_eq!(readout.rate_display, "1.0");
        assert_eq!(readout.milestone_level, 2);
        assert_eq!(readout.viewing_asset.as_deref(), Some("images/girl_lv2.jpg"));
        assert_eq!(
            readout.next_level,
            NextLevelStatus::Remaining {
                level: 3,
                needed: 950.0,
                eta_seconds: Some(950.0)
            }
        );
        assert_eq!(readout.eta_display.as_deref(), Some("15m 50s"));
        assert_eq!(readout.fever_remaining_seconds, None);
    }

    #[test]
    fn seeded_engines_agree() {
        let catalog = Catalog::builtin();
        let mut a = Engine::seeded(catalog.clone(), EngineConfig::default(), 99);
        let mut b = Engine::seeded(catalog, EngineConfig::default(), 99);
        for _ in 0..2_000 {
            assert_eq!(a.click(), b.click());
        }
        assert_eq!(a.state(), b.state());
    }
}
