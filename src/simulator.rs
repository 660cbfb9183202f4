//! Balance simulator.
//!
//! Drives an [`Engine`] second by second with a fixed click rate, claims every
//! lucky bonus right away and greedily buys whatever pays back fastest. Used
//! to tune the catalog: how long does each milestone take for a steady player?

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::bonus::lucky_reward;
use crate::catalog::{Catalog, EffectKind, UpgradeDefinition};
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::state::EconomyState;

/// Purchases attempted per simulated second before giving up.
const MAX_PURCHASES_PER_SECOND: usize = 50;

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationParams {
    pub seed: u64,
    pub clicks_per_second: u32,
    pub seconds: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            seed: 0,
            clicks_per_second: 5,
            seconds: 3_600,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelReached {
    pub level: u32,
    pub second: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub clicks_per_second: u32,
    /// Seconds actually simulated. Shorter than requested when completed early.
    pub seconds: u32,
    pub levels: Vec<LevelReached>,
    /// Units bought per upgrade id.
    pub purchases: BTreeMap<String, u32>,
    pub total_purchases: u32,
    /// Longest stretch of seconds without a purchase.
    pub max_idle_gap: u32,
    pub lucky_claimed: u32,
    pub fevers: u32,
    pub final_currency: f64,
    pub final_auto_rate: f64,
    pub final_click_power: u64,
    pub final_level: u32,
    pub completed: bool,
    /// Game clock at the end of the run.
    pub elapsed_ms: u64,
}

/// Expected currency per second gained by one more unit of `upgrade`.
fn estimated_gain(
    state: &EconomyState,
    config: &EngineConfig,
    upgrade: &UpgradeDefinition,
    clicks_per_second: f64,
) -> f64 {
    match upgrade.effect {
        EffectKind::AutoRate => upgrade.value,
        EffectKind::ClickPower => upgrade.value * clicks_per_second,
        EffectKind::LuckyChance => {
            upgrade.value * clicks_per_second * lucky_reward(state, config)
        }
        EffectKind::FeverChance => {
            let per_fever = state.auto_rate
                * (config.fever_multiplier - 1.0)
                * (config.fever_duration_ms as f64 / 1000.0);
            upgrade.value * clicks_per_second * per_fever
        }
    }
}

/// Affordable upgrade with the shortest payback, if any pays back at all.
fn best_purchase<'a>(
    state: &EconomyState,
    catalog: &'a Catalog,
    config: &EngineConfig,
    clicks_per_second: f64,
) -> Option<&'a UpgradeDefinition> {
    let mut best: Option<(f64, &UpgradeDefinition)> = None;
    for upgrade in catalog.upgrades() {
        let Some(instance) = state.instance(&upgrade.id) else {
            continue;
        };
        if state.currency < instance.current_cost {
            continue;
        }
        let gain = estimated_gain(state, config, upgrade, clicks_per_second);
        if gain <= 0.0 {
            continue;
        }
        let payback = instance.current_cost / gain;
        let dominated = best.as_ref().is_some_and(|(bp, _)| *bp <= payback);
        if !dominated {
            best = Some((payback, upgrade));
        }
    }
    best.map(|(_, upgrade)| upgrade)
}

/// Run a deterministic session and report how it went.
pub fn simulate(
    catalog: Arc<Catalog>,
    config: EngineConfig,
    params: &SimulationParams,
) -> SimulationReport {
    let clicks_per_second = params.clicks_per_second as f64;
    let tick_ms = config.tick_ms.max(1);
    let mut engine = Engine::seeded(catalog.clone(), config.clone(), params.seed);

    let mut levels = Vec::new();
    let mut purchases: BTreeMap<String, u32> = BTreeMap::new();
    let mut total_purchases = 0u32;
    let mut last_purchase = 0u32;
    let mut max_idle_gap = 0u32;
    let mut lucky_claimed = 0u32;
    let mut fevers = 0u32;
    let mut seconds = 0u32;
    // Game time owed to the engine but shorter than one tick.
    let mut pending_ms = 0u64;

    for second in 1..=params.seconds {
        seconds = second;
        let level_before = engine.state().milestone_level;

        for _ in 0..params.clicks_per_second {
            let click = engine.click();
            if click.fever_started {
                fevers += 1;
            }
            if let Some(id) = click.lucky {
                if engine.claim_lucky(id).is_ok() {
                    lucky_claimed += 1;
                }
            }
        }

        pending_ms += 1_000;
        while pending_ms >= tick_ms {
            engine.tick();
            pending_ms -= tick_ms;
        }

        let mut bought = false;
        for _ in 0..MAX_PURCHASES_PER_SECOND {
            let Some(upgrade) =
                best_purchase(engine.state(), &catalog, &config, clicks_per_second)
            else {
                break;
            };
            if engine.purchase(&upgrade.id).is_err() {
                break;
            }
            *purchases.entry(upgrade.id.clone()).or_default() += 1;
            total_purchases += 1;
            bought = true;
        }
        if bought {
            max_idle_gap = max_idle_gap.max(second - last_purchase);
            last_purchase = second;
        }

        for level in level_before + 1..=engine.state().milestone_level {
            levels.push(LevelReached { level, second });
        }

        if engine.state().completed {
            break;
        }
    }
    max_idle_gap = max_idle_gap.max(seconds - last_purchase);

    let state = engine.state();
    let report = SimulationReport {
        seed: params.seed,
        clicks_per_second: params.clicks_per_second,
        seconds,
        levels,
        purchases,
        total_purchases,
        max_idle_gap,
        lucky_claimed,
        fevers,
        final_currency: state.currency,
        final_auto_rate: state.auto_rate,
        final_click_power: state.click_power,
        final_level: state.milestone_level,
        completed: state.completed,
        elapsed_ms: state.elapsed_ms,
    };
    tracing::info!(
        target: "heart_clicker::simulator",
        seed = report.seed,
        seconds = report.seconds,
        level = report.final_level,
        purchases = report.total_purchases,
        "simulation.finished"
    );
    report
}
