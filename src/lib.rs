//! Headless progression/economy engine for an idle "clicker" game.
//!
//! The engine holds no UI. A presentation layer drives it through
//! [`Engine`] commands and reads [`engine::Readout`] back.

pub mod bonus;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod format;
pub mod progression;
pub mod purchase;
pub mod simulator;
pub mod snapshot;
pub mod state;
pub mod tick;
pub mod time;

pub use bonus::{LuckyBonusId, LuckyClaimError, RandomSource, SequenceSource};
pub use catalog::{Catalog, CatalogError, EffectKind, UpgradeDefinition};
pub use config::{ConfigError, EngineConfig};
pub use engine::{ClickOutcome, Engine, LuckyClaimed, Readout};
pub use progression::{LevelUp, NextLevelStatus, ProgressionError};
pub use purchase::{PurchaseError, Purchased};
pub use snapshot::{Snapshot, SnapshotError};
pub use state::{EconomyState, UpgradeInstance};
pub use tick::TickOutcome;
pub use time::GameTime;
