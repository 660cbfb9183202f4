//! Milestone progression and the gallery view.

use thiserror::Error;

use crate::catalog::Catalog;
use crate::state::EconomyState;

/// A milestone transition that just happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelUp {
    pub level: u32,
    /// True when `level` is the terminal milestone.
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProgressionError {
    #[error("milestone level {0} does not exist")]
    UnknownLevel(u32),
    #[error("milestone level {0} has not been reached")]
    LevelLocked(u32),
}

/// Advance at most one milestone if currency has reached the next threshold.
///
/// Currency that jumps past several thresholds is caught up one level per
/// call; callers check after every click, tick and claim.
pub fn check_level_up(state: &mut EconomyState, catalog: &Catalog) -> Option<LevelUp> {
    if state.completed {
        return None;
    }
    let next = catalog.next_milestone(state.milestone_level)?;
    if state.currency < next.threshold {
        return None;
    }

    state.milestone_level = next.level;
    state.viewing_level = next.level;
    let completed = next.level == catalog.terminal_level();
    if completed {
        state.completed = true;
    }
    tracing::info!(
        target: "heart_clicker::progression",
        level = next.level,
        completed,
        "milestone.reached"
    );
    Some(LevelUp {
        level: next.level,
        completed,
    })
}

/// Switch the displayed milestone to any level already reached.
pub fn select_viewing_level(
    state: &mut EconomyState,
    catalog: &Catalog,
    level: u32,
) -> Result<(), ProgressionError> {
    if catalog.milestone(level).is_none() {
        return Err(ProgressionError::UnknownLevel(level));
    }
    if level > state.milestone_level {
        return Err(ProgressionError::LevelLocked(level));
    }
    state.viewing_level = level;
    Ok(())
}

/// Seconds until the next threshold at the current effective rate.
/// `None` when there is no next milestone or no automatic income.
pub fn time_to_next_level(state: &EconomyState, catalog: &Catalog) -> Option<f64> {
    let next = catalog.next_milestone(state.milestone_level)?;
    let rate = state.effective_rate();
    if rate <= 0.0 {
        return None;
    }
    Some(((next.threshold - state.currency) / rate).max(0.0))
}

#[derive(Clone, Debug, PartialEq)]
pub enum NextLevelStatus {
    /// Still short of the next threshold.
    Remaining {
        level: u32,
        needed: f64,
        eta_seconds: Option<f64>,
    },
    /// Threshold met; the next check will advance.
    Ready { level: u32 },
    /// No milestone left.
    Completed,
}

pub fn next_level_status(state: &EconomyState, catalog: &Catalog) -> NextLevelStatus {
    let Some(next) = catalog.next_milestone(state.milestone_level) else {
        return NextLevelStatus::Completed;
    };
    let needed = next.threshold - state.currency;
    if needed <= 0.0 {
        return NextLevelStatus::Ready { level: next.level };
    }
    NextLevelStatus::Remaining {
        level: next.level,
        needed,
        eta_seconds: time_to_next_level(state, catalog),
    }
}
