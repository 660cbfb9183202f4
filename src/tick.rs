//! One fixed-cadence step of the economy.

use crate::bonus::{expire_fever, LuckyBonusId, LuckyBonuses};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::progression::{check_level_up, LevelUp};
use crate::state::EconomyState;

/// What a single tick changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickOutcome {
    /// Automatic income credited this tick.
    pub accrued: f64,
    pub fever_ended: bool,
    pub expired_lucky: Vec<LuckyBonusId>,
    pub level_up: Option<LevelUp>,
}

/// Advance the game clock by one cadence step.
///
/// Order: advance clock, clear an elapsed fever window, accrue income at the
/// resulting effective rate, drop expired lucky bonuses, re-check progression.
/// Missed wall-clock ticks are not backfilled here.
pub fn run_tick(
    state: &mut EconomyState,
    catalog: &Catalog,
    config: &EngineConfig,
    lucky: &mut LuckyBonuses,
) -> TickOutcome {
    state.elapsed_ms = state.elapsed_ms.saturating_add(config.tick_ms);
    let fever_ended = expire_fever(state);
    let accrued = state.apply_tick(config.tick_seconds());
    let expired_lucky = lucky.prune(state.elapsed_ms);
    let level_up = check_level_up(state, catalog);

    TickOutcome {
        accrued,
        fever_ended,
        expired_lucky,
        level_up,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::activate_fever;
    use std::sync::Arc;

    fn setup() -> (EconomyState, Arc<Catalog>, EngineConfig, LuckyBonuses) {
        let catalog = Catalog::builtin();
        let config = EngineConfig::default();
        let state = EconomyState::new(&catalog, &config);
        (state, catalog, config, LuckyBonuses::default())
    }

    #[test]
    fn tick_accrues_tenth_of_rate() {
        let (mut state, catalog, config, mut lucky) = setup();
        state.auto_rate = 10.0;
        let out = run_tick(&mut state, &catalog, &config, &mut lucky);
        assert!((out.accrued - 1.0).abs() < 1e-9);
        assert!((state.currency - 1.0).abs() < 1e-9);
        assert_eq!(state.elapsed_ms, 100);
    }

    #[test]
    fn tick_during_fever_doubles() {
        let (mut state, catalog, config, mut lucky) = setup();
        state.auto_rate = 10.0;
        activate_fever(&mut state, &config);
        let out = run_tick(&mut state, &catalog, &config, &mut lucky);
        assert!((out.accrued - 2.0).abs() < 1e-9);
    }

    #[test]
    fn fever_covers_exactly_its_window() {
        let (mut state, catalog, config, mut lucky) = setup();
        state.auto_rate = 10.0;
        activate_fever(&mut state, &config);
        let mut doubled = 0;
        let mut ended_at = None;
        for i in 1..=150 {
            let out = run_tick(&mut state, &catalog, &config, &mut lucky);
            if out.accrued > 1.5 {
                doubled += 1;
            }
            if out.fever_ended {
                ended_at = Some(i);
            }
        }
        assert_eq!(doubled, 100);
        assert_eq!(ended_at, Some(101));
        assert!(!state.fever_active);
    }

    #[test]
    fn tick_prunes_expired_lucky() {
        let (mut state, catalog, config, mut lucky) = setup();
        let id = lucky.spawn(state.elapsed_ms, &config);
        for _ in 0..49 {
            let out = run_tick(&mut state, &catalog, &config, &mut lucky);
            assert!(out.expired_lucky.is_empty());
        }
        let out = run_tick(&mut state, &catalog, &config, &mut lucky);
        assert_eq!(out.expired_lucky, vec![id]);
        assert!(lucky.live().is_empty());
    }

    #[test]
    fn tick_checks_progression() {
        let (mut state, catalog, config, mut lucky) = setup();
        state.currency = 100.0;
        let out = run_tick(&mut state, &catalog, &config, &mut lucky);
        assert_eq!(out.level_up.map(|l| l.level), Some(2));
    }
}
