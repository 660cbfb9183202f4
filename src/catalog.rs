//! Static upgrade and milestone definitions.
//!
//! The catalog is immutable once loaded. Upgrade ids are unique across all
//! groups so the purchase resolver and snapshots can key everything by id.

use std::{
    collections::HashMap,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;

pub const BUILTIN_CATALOG: &str = include_str!("data/catalog.json");

/// Environment variable pointing at a catalog override file.
pub const CATALOG_PATH_ENV: &str = "HEART_CLICKER_CATALOG_PATH";

/// What an upgrade changes when bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    ClickPower,
    AutoRate,
    LuckyChance,
    FeverChance,
}

impl EffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::ClickPower => "click_power",
            EffectKind::AutoRate => "auto_rate",
            EffectKind::LuckyChance => "lucky_chance",
            EffectKind::FeverChance => "fever_chance",
        }
    }
}

/// Display group an upgrade is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpgradeGroup {
    #[default]
    ClickPower,
    AutoClick,
    Special,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpgradeDefinition {
    pub id: String,
    pub name: String,
    pub effect: EffectKind,
    pub base_cost: f64,
    pub value: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(skip)]
    pub group: UpgradeGroup,
}

impl UpgradeDefinition {
    /// Price of the next unit once `owned` units have been bought.
    pub fn cost_after(&self, owned: u32, growth: f64) -> f64 {
        let exponent = owned.min(i32::MAX as u32) as i32;
        (self.base_cost * growth.powi(exponent)).ceil()
    }

    /// Click power granted per unit. Only meaningful for `EffectKind::ClickPower`,
    /// whose values are validated to be whole numbers.
    pub fn click_power_gain(&self) -> u64 {
        self.value as u64
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MilestoneDefinition {
    pub level: u32,
    pub threshold: f64,
    #[serde(default)]
    pub asset: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CatalogFile {
    click_power: Vec<UpgradeDefinition>,
    auto_click: Vec<UpgradeDefinition>,
    special: Vec<UpgradeDefinition>,
    milestones: Vec<MilestoneDefinition>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse upgrade catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read upgrade catalog from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("duplicate upgrade id `{id}`")]
    Duplicate { id: String },
    #[error("upgrade `{id}` has invalid {field}: {value}")]
    InvalidUpgrade {
        id: String,
        field: &'static str,
        value: f64,
    },
    #[error("catalog defines no milestones")]
    NoMilestones,
    #[error("milestone level {level} is out of sequence")]
    MilestoneOrder { level: u32 },
    #[error("milestone level {level} has invalid threshold {threshold}")]
    MilestoneThreshold { level: u32, threshold: f64 },
}

/// Ordered upgrade definitions plus the milestone table.
#[derive(Debug, Clone)]
pub struct Catalog {
    upgrades: Vec<UpgradeDefinition>,
    milestones: Vec<MilestoneDefinition>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn builtin() -> Arc<Self> {
        Arc::new(Self::from_json_str(BUILTIN_CATALOG).expect("builtin catalog should parse"))
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_parts(file)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    fn from_parts(file: CatalogFile) -> Result<Self, CatalogError> {
        let groups = [
            (UpgradeGroup::ClickPower, file.click_power),
            (UpgradeGroup::AutoClick, file.auto_click),
            (UpgradeGroup::Special, file.special),
        ];

        let mut upgrades = Vec::new();
        let mut index = HashMap::new();
        for (group, definitions) in groups {
            for mut definition in definitions {
                definition.group = group;
                validate_upgrade(&definition)?;
                if index.insert(definition.id.clone(), upgrades.len()).is_some() {
                    return Err(CatalogError::Duplicate { id: definition.id });
                }
                upgrades.push(definition);
            }
        }

        validate_milestones(&file.milestones)?;

        Ok(Self {
            upgrades,
            milestones: file.milestones,
            index,
        })
    }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDefinition> {
        self.index.get(id).map(|&idx| &self.upgrades[idx])
    }

    /// All upgrades in display order (click power, auto click, special).
    pub fn upgrades(&self) -> &[UpgradeDefinition] {
        &self.upgrades
    }

    pub fn group(&self, group: UpgradeGroup) -> impl Iterator<Item = &UpgradeDefinition> {
        self.upgrades.iter().filter(move |u| u.group == group)
    }

    pub fn milestones(&self) -> &[MilestoneDefinition] {
        &self.milestones
    }

    pub fn milestone(&self, level: u32) -> Option<&MilestoneDefinition> {
        level
            .checked_sub(1)
            .and_then(|idx| self.milestones.get(idx as usize))
    }

    /// The milestone after `level`, or `None` at the terminal level.
    pub fn next_milestone(&self, level: u32) -> Option<&MilestoneDefinition> {
        self.milestone(level.saturating_add(1))
    }

    pub fn terminal_level(&self) -> u32 {
        self.milestones.len() as u32
    }
}

fn validate_upgrade(definition: &UpgradeDefinition) -> Result<(), CatalogError> {
    let invalid = |field, value| CatalogError::InvalidUpgrade {
        id: definition.id.clone(),
        field,
        value,
    };
    if !(definition.base_cost.is_finite() && definition.base_cost > 0.0) {
        return Err(invalid("base_cost", definition.base_cost));
    }
    if !(definition.value.is_finite() && definition.value > 0.0) {
        return Err(invalid("value", definition.value));
    }
    if definition.effect == EffectKind::ClickPower && definition.value.fract() != 0.0 {
        return Err(invalid("value", definition.value));
    }
    Ok(())
}

fn validate_milestones(milestones: &[MilestoneDefinition]) -> Result<(), CatalogError> {
    if milestones.is_empty() {
        return Err(CatalogError::NoMilestones);
    }
    let mut previous: Option<f64> = None;
    for (idx, milestone) in milestones.iter().enumerate() {
        if milestone.level as usize != idx + 1 {
            return Err(CatalogError::MilestoneOrder {
                level: milestone.level,
            });
        }
        let threshold_ok = milestone.threshold.is_finite()
            && match previous {
                None => milestone.threshold == 0.0,
                Some(prev) => milestone.threshold > prev,
            };
        if !threshold_ok {
            return Err(CatalogError::MilestoneThreshold {
                level: milestone.level,
                threshold: milestone.threshold,
            });
        }
        previous = Some(milestone.threshold);
    }
    Ok(())
}

/// Load the catalog from `HEART_CLICKER_CATALOG_PATH`, falling back to the
/// built-in definitions when the variable is unset or the file is unusable.
pub fn load_catalog_from_env() -> Arc<Catalog> {
    if let Some(path) = env::var_os(CATALOG_PATH_ENV).map(PathBuf::from) {
        match Catalog::from_file(&path) {
            Ok(catalog) => {
                tracing::info!(
                    target: "heart_clicker::catalog",
                    path = %path.display(),
                    upgrades = catalog.upgrades().len(),
                    milestones = catalog.milestones().len(),
                    "catalog.loaded=file"
                );
                return Arc::new(catalog);
            }
            Err(err) => {
                tracing::warn!(
                    target: "heart_clicker::catalog",
                    path = %path.display(),
                    error = %err,
                    "catalog.load_failed"
                );
            }
        }
    }
    tracing::info!(target: "heart_clicker::catalog", "catalog.loaded=builtin");
    Catalog::builtin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.upgrades().len(), 11);
        assert_eq!(catalog.terminal_level(), 10);
        assert_eq!(catalog.group(UpgradeGroup::ClickPower).count(), 4);
        assert_eq!(catalog.group(UpgradeGroup::AutoClick).count(), 5);
        assert_eq!(catalog.group(UpgradeGroup::Special).count(), 2);
    }

    #[test]
    fn lookup_by_id_spans_groups() {
        let catalog = Catalog::builtin();
        let click = catalog.upgrade("click_power_1").unwrap();
        assert_eq!(click.effect, EffectKind::ClickPower);
        assert!((click.base_cost - 200.0).abs() < 0.001);
        let fever = catalog.upgrade("fever_time").unwrap();
        assert_eq!(fever.group, UpgradeGroup::Special);
        assert_eq!(fever.effect, EffectKind::FeverChance);
        assert!(catalog.upgrade("nope").is_none());
    }

    #[test]
    fn milestone_navigation() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.milestone(1).unwrap().threshold, 0.0);
        assert_eq!(catalog.next_milestone(1).unwrap().threshold, 100.0);
        assert!(catalog.next_milestone(10).is_none());
        assert!(catalog.milestone(0).is_none());
    }

    #[test]
    fn cost_after_compounds_from_base() {
        let catalog = Catalog::builtin();
        let click = catalog.upgrade("click_power_1").unwrap();
        assert_eq!(click.cost_after(0, 1.25), 200.0);
        assert_eq!(click.cost_after(1, 1.25), 250.0);
        assert_eq!(click.cost_after(2, 1.25), 313.0); // 312.5 rounds up
        assert_eq!(click.cost_after(3, 1.25), 391.0); // 390.625 rounds up
    }

    #[test]
    fn duplicate_ids_across_groups_rejected() {
        let json = r#"{
            "click_power": [{ "id": "dup", "name": "a", "effect": "click_power", "base_cost": 10, "value": 1 }],
            "special": [{ "id": "dup", "name": "b", "effect": "lucky_chance", "base_cost": 10, "value": 0.1 }],
            "milestones": [{ "level": 1, "threshold": 0 }]
        }"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { id } if id == "dup"));
    }

    #[test]
    fn fractional_click_power_rejected() {
        let json = r#"{
            "click_power": [{ "id": "half", "name": "a", "effect": "click_power", "base_cost": 10, "value": 0.5 }],
            "milestones": [{ "level": 1, "threshold": 0 }]
        }"#;
        assert!(matches!(
            Catalog::from_json_str(json),
            Err(CatalogError::InvalidUpgrade { field: "value", .. })
        ));
    }

    #[test]
    fn non_positive_cost_rejected() {
        let json = r#"{
            "auto_click": [{ "id": "free", "name": "a", "effect": "auto_rate", "base_cost": 0, "value": 1 }],
            "milestones": [{ "level": 1, "threshold": 0 }]
        }"#;
        assert!(matches!(
            Catalog::from_json_str(json),
            Err(CatalogError::InvalidUpgrade { field: "base_cost", .. })
        ));
    }

    #[test]
    fn milestones_must_start_at_zero_and_increase() {
        let not_zero = r#"{ "milestones": [{ "level": 1, "threshold": 5 }] }"#;
        assert!(matches!(
            Catalog::from_json_str(not_zero),
            Err(CatalogError::MilestoneThreshold { level: 1, .. })
        ));

        let flat = r#"{ "milestones": [
            { "level": 1, "threshold": 0 },
            { "level": 2, "threshold": 100 },
            { "level": 3, "threshold": 100 }
        ] }"#;
        assert!(matches!(
            Catalog::from_json_str(flat),
            Err(CatalogError::MilestoneThreshold { level: 3, .. })
        ));

        let skipped = r#"{ "milestones": [
            { "level": 1, "threshold": 0 },
            { "level": 3, "threshold": 100 }
        ] }"#;
        assert!(matches!(
            Catalog::from_json_str(skipped),
            Err(CatalogError::MilestoneOrder { level: 3 })
        ));

        assert!(matches!(
            Catalog::from_json_str("{}"),
            Err(CatalogError::NoMilestones)
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Catalog::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }
}
