//! Purchase resolution: validate against the catalog, charge, apply the effect.

use thiserror::Error;

use crate::catalog::{Catalog, EffectKind};
use crate::config::EngineConfig;
use crate::state::{EconomyState, UpgradeInstance};

/// A successfully applied purchase.
#[derive(Clone, Debug, PartialEq)]
pub struct Purchased {
    pub id: String,
    pub effect: EffectKind,
    /// Amount charged.
    pub cost: f64,
    /// Units owned after the purchase.
    pub owned: u32,
    pub next_cost: f64,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum PurchaseError {
    #[error("unknown upgrade id `{0}`")]
    UnknownId(String),
    #[error("insufficient funds: costs {cost}, have {available}")]
    InsufficientFunds { cost: f64, available: f64 },
}

/// Whether `id` exists and is currently affordable.
pub fn can_afford(state: &EconomyState, id: &str) -> bool {
    state
        .instance(id)
        .is_some_and(|u| state.currency >= u.current_cost)
}

/// Buy one unit of `id`. On any error the state is left untouched.
pub fn purchase(
    state: &mut EconomyState,
    catalog: &Catalog,
    config: &EngineConfig,
    id: &str,
) -> Result<Purchased, PurchaseError> {
    let Some(definition) = catalog.upgrade(id) else {
        tracing::warn!(target: "heart_clicker::purchase", id, "purchase.unknown_id");
        return Err(PurchaseError::UnknownId(id.to_string()));
    };

    let cost = state
        .instance(id)
        .map_or_else(|| definition.cost_after(0, config.cost_growth), |u| u.current_cost);
    if state.currency < cost {
        tracing::debug!(
            target: "heart_clicker::purchase",
            id,
            cost,
            available = state.currency,
            "purchase.unaffordable"
        );
        return Err(PurchaseError::InsufficientFunds {
            cost,
            available: state.currency,
        });
    }

    state.currency -= cost;

    match definition.effect {
        EffectKind::ClickPower => {
            state.click_power = state
                .click_power
                .saturating_add(definition.click_power_gain());
        }
        EffectKind::AutoRate => state.auto_rate += definition.value,
        EffectKind::LuckyChance => {
            state.lucky_chance = (state.lucky_chance + definition.value).clamp(0.0, 1.0);
        }
        EffectKind::FeverChance => {
            state.fever_chance = (state.fever_chance + definition.value).clamp(0.0, 1.0);
        }
    }

    let instance = state
        .upgrades
        .entry(id.to_string())
        .or_insert_with(|| UpgradeInstance {
            owned: 0,
            current_cost: cost,
        });
    instance.owned = instance.owned.saturating_add(1);
    instance.current_cost = definition
        .cost_after(instance.owned, config.cost_growth)
        .max(instance.current_cost);

    let purchased = Purchased {
        id: id.to_string(),
        effect: definition.effect,
        cost,
        owned: instance.owned,
        next_cost: instance.current_cost,
    };
    tracing::debug!(
        target: "heart_clicker::purchase",
        id,
        cost,
        owned = purchased.owned,
        next_cost = purchased.next_cost,
        effect = definition.effect.as_str(),
        "purchase.applied"
    );
    Ok(purchased)
}
