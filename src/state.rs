//! Mutable player progress.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::config::EngineConfig;

/// Runtime counterpart of an upgrade definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeInstance {
    pub owned: u32,
    /// Price of the next unit. Never decreases.
    pub current_cost: f64,
}

/// Full economy state of one session.
#[derive(Clone, Debug, PartialEq)]
pub struct EconomyState {
    /// Spendable currency. Never negative.
    pub currency: f64,
    /// Automatic income per second, before fever.
    pub auto_rate: f64,
    /// Currency per manual click.
    pub click_power: u64,
    /// Per-click probability of spawning a lucky bonus.
    pub lucky_chance: f64,
    /// Per-click probability of starting fever.
    pub fever_chance: f64,
    pub fever_active: bool,
    /// Game-clock time at which fever ends.
    pub fever_end_ms: u64,
    pub fever_multiplier: f64,
    /// Highest milestone reached. Only increases within a session.
    pub milestone_level: u32,
    /// Milestone currently shown. Always `<= milestone_level`.
    pub viewing_level: u32,
    /// Set once the terminal milestone has been reached.
    pub completed: bool,
    /// Game clock, advanced by every tick.
    pub elapsed_ms: u64,
    /// Manual clicks made.
    pub total_clicks: u64,
    /// One instance per catalog upgrade, keyed by id.
    pub upgrades: BTreeMap<String, UpgradeInstance>,
}

impl EconomyState {
    pub fn new(catalog: &Catalog, config: &EngineConfig) -> Self {
        let upgrades = catalog
            .upgrades()
            .iter()
            .map(|u| {
                (
                    u.id.clone(),
                    UpgradeInstance {
                        owned: 0,
                        current_cost: u.cost_after(0, config.cost_growth),
                    },
                )
            })
            .collect();

        Self {
            currency: 0.0,
            auto_rate: 0.0,
            click_power: config.starting_click_power,
            lucky_chance: config.starting_lucky_chance,
            fever_chance: config.starting_fever_chance,
            fever_active: false,
            fever_end_ms: 0,
            fever_multiplier: config.fever_multiplier,
            milestone_level: 1,
            viewing_level: 1,
            completed: false,
            elapsed_ms: 0,
            total_clicks: 0,
            upgrades,
        }
    }

    /// Auto rate including the fever multiplier.
    pub fn effective_rate(&self) -> f64 {
        if self.fever_active {
            self.auto_rate * self.fever_multiplier
        } else {
            self.auto_rate
        }
    }

    /// The only source of manual income. Returns the amount gained.
    pub fn apply_manual_click(&mut self) -> f64 {
        let gained = self.click_power as f64;
        self.currency += gained;
        self.total_clicks += 1;
        gained
    }

    /// Accrue `elapsed_seconds` of automatic income. Returns the amount gained.
    pub fn apply_tick(&mut self, elapsed_seconds: f64) -> f64 {
        let gained = self.effective_rate() * elapsed_seconds.max(0.0);
        self.currency += gained;
        gained
    }

    pub fn instance(&self, id: &str) -> Option<&UpgradeInstance> {
        self.upgrades.get(id)
    }

    pub fn owned(&self, id: &str) -> u32 {
        self.instance(id).map_or(0, |u| u.owned)
    }

    /// Seconds of fever left, or `None` when fever is off.
    pub fn fever_remaining_seconds(&self) -> Option<f64> {
        if !self.fever_active {
            return None;
        }
        Some(self.fever_end_ms.saturating_sub(self.elapsed_ms) as f64 / 1000.0)
    }
}
