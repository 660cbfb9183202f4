//! セーブ/ロード用スナップショット。
//!
//! ## バージョニング方針
//!
//! - `SNAPSHOT_VERSION`: 現在のスナップショット形式バージョン。フィールド追加時にインクリメントする。
//! - `MIN_COMPATIBLE_VERSION`: 互換性を維持できる最小バージョン。
//!   既存フィールドの意味変更や削除など破壊的変更を行った場合のみインクリメントする。
//!
//! アップグレードは配列の位置ではなく id をキーに保存する。カタログの並び順を
//! 変えてもセーブデータが別のアップグレードに適用されることはない。
//!
//! ロードは一時的な `EconomyState` を組み立てて検証し、すべて通った場合だけ
//! 呼び出し側が置き換える。途中で失敗しても既存の状態には一切触れない。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::state::{EconomyState, UpgradeInstance};

/// スナップショットのフォーマットバージョン。
pub const SNAPSHOT_VERSION: u32 = 1;

/// 互換性を維持できる最小バージョン。
pub const MIN_COMPATIBLE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {found} (supported {min}..={current})")]
    Version { found: u32, min: u32, current: u32 },
    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// 保存される経済状態。一時的なもの (ラッキーボーナス等) は含まない。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub currency: f64,
    pub auto_rate: f64,
    pub click_power: u64,
    pub lucky_chance: f64,
    pub fever_chance: f64,
    pub fever_active: bool,
    pub fever_end_ms: u64,
    pub fever_multiplier: f64,
    pub milestone_level: u32,
    pub viewing_level: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub elapsed_ms: u64,
    #[serde(default)]
    pub total_clicks: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub state: SavedState,
    /// アップグレード id → 所持数とコスト。
    #[serde(default)]
    pub upgrades: BTreeMap<String, UpgradeInstance>,
}

impl Snapshot {
    /// 現在の状態からスナップショットを作る。
    pub fn capture(state: &EconomyState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            state: SavedState {
                currency: state.currency,
                auto_rate: state.auto_rate,
                click_power: state.click_power,
                lucky_chance: state.lucky_chance,
                fever_chance: state.fever_chance,
                fever_active: state.fever_active,
                fever_end_ms: state.fever_end_ms,
                fever_multiplier: state.fever_multiplier,
                milestone_level: state.milestone_level,
                viewing_level: state.viewing_level,
                completed: state.completed,
                elapsed_ms: state.elapsed_ms,
                total_clicks: state.total_clicks,
            },
            upgrades: state.upgrades.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// スナップショットを検証し、新しい `EconomyState` を組み立てる。
    ///
    /// - カタログに存在しない id は警告を出して無視する。
    /// - スナップショットに無いアップグレードは未購入として扱う。
    /// - `current_cost` は所持数から再計算する。保存値の方が高ければそちらを残す (値下がりしない)。
    /// - 確率は `[0, 1]` に丸める。エラーにはしない。
    /// - フィーバー終了時刻がゲーム時計から 1 回分の発動時間より先なら壊れているとみなす。
    /// - `completed` は到達レベルから導く。保存フラグと食い違えば警告してレベル側を採る。
    pub fn restore(
        &self,
        catalog: &Catalog,
        config: &EngineConfig,
    ) -> Result<EconomyState, SnapshotError> {
        if self.version < MIN_COMPATIBLE_VERSION || self.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: self.version,
                min: MIN_COMPATIBLE_VERSION,
                current: SNAPSHOT_VERSION,
            });
        }

        let saved = &self.state;
        let malformed = |msg: String| Err(SnapshotError::Malformed(msg));

        if !(saved.currency.is_finite() && saved.currency >= 0.0) {
            return malformed(format!("currency {}", saved.currency));
        }
        if !(saved.auto_rate.is_finite() && saved.auto_rate >= 0.0) {
            return malformed(format!("auto_rate {}", saved.auto_rate));
        }
        if saved.click_power == 0 {
            return malformed("click_power 0".to_string());
        }
        if saved.lucky_chance.is_nan() || saved.fever_chance.is_nan() {
            return malformed("probability is NaN".to_string());
        }
        if !(saved.fever_multiplier.is_finite() && saved.fever_multiplier >= 1.0) {
            return malformed(format!("fever_multiplier {}", saved.fever_multiplier));
        }
        let terminal = catalog.terminal_level();
        if saved.milestone_level == 0 || saved.milestone_level > terminal {
            return malformed(format!("milestone_level {}", saved.milestone_level));
        }
        if saved.viewing_level == 0 || saved.viewing_level > saved.milestone_level {
            return malformed(format!("viewing_level {}", saved.viewing_level));
        }
        let latest_fever_end = saved.elapsed_ms.saturating_add(config.fever_duration_ms);
        if saved.fever_active && saved.fever_end_ms > latest_fever_end {
            return malformed(format!(
                "fever_end_ms {} past {}",
                saved.fever_end_ms, latest_fever_end
            ));
        }

        let mut state = EconomyState::new(catalog, config);
        for (id, saved_upgrade) in &self.upgrades {
            let Some(definition) = catalog.upgrade(id) else {
                tracing::warn!(
                    target: "heart_clicker::snapshot",
                    id = %id,
                    "snapshot.unknown_upgrade_skipped"
                );
                continue;
            };
            if !(saved_upgrade.current_cost.is_finite() && saved_upgrade.current_cost > 0.0) {
                return malformed(format!(
                    "upgrade `{}` cost {}",
                    id, saved_upgrade.current_cost
                ));
            }
            state.upgrades.insert(
                id.clone(),
                UpgradeInstance {
                    owned: saved_upgrade.owned,
                    current_cost: definition
                        .cost_after(saved_upgrade.owned, config.cost_growth)
                        .max(saved_upgrade.current_cost),
                },
            );
        }

        state.currency = saved.currency;
        state.auto_rate = saved.auto_rate;
        state.click_power = saved.click_power;
        state.lucky_chance = saved.lucky_chance.clamp(0.0, 1.0);
        state.fever_chance = saved.fever_chance.clamp(0.0, 1.0);
        state.fever_active = saved.fever_active;
        state.fever_end_ms = saved.fever_end_ms;
        state.fever_multiplier = saved.fever_multiplier;
        state.milestone_level = saved.milestone_level;
        state.viewing_level = saved.viewing_level;
        state.completed = terminal > 1 && saved.milestone_level == terminal;
        if saved.completed != state.completed {
            tracing::warn!(
                target: "heart_clicker::snapshot",
                level = saved.milestone_level,
                terminal,
                "snapshot.completed_flag_ignored"
            );
        }
        state.elapsed_ms = saved.elapsed_ms;
        state.total_clicks = saved.total_clicks;
        Ok(state)
    }

    /// 旧ブラウザ版のセーブデータ (位置合わせ配列形式) を取り込む。
    ///
    /// 旧形式の各エントリには `id` が含まれているので、位置ではなく id で対応付ける。
    /// 旧形式のフィーバー終了時刻は実時間なので引き継がない (フィーバーは解除状態になる)。
    pub fn from_legacy_json(json: &str) -> Result<Self, SnapshotError> {
        let legacy: LegacySave = serde_json::from_str(json)?;
        let s = legacy.state;
        if !(s.clicks_per_click.is_finite() && s.clicks_per_click >= 1.0) {
            return Err(SnapshotError::Malformed(format!(
                "clicksPerClick {}",
                s.clicks_per_click
            )));
        }

        let upgrades = legacy
            .click_power_upgrades
            .into_iter()
            .chain(legacy.auto_click_upgrades)
            .chain(legacy.special_upgrades)
            .map(|u| {
                (
                    u.id,
                    UpgradeInstance {
                        owned: u.owned,
                        current_cost: u.cost,
                    },
                )
            })
            .collect();

        Ok(Self {
            version: SNAPSHOT_VERSION,
            state: SavedState {
                currency: s.clicks,
                auto_rate: s.cps,
                click_power: s.clicks_per_click.round() as u64,
                lucky_chance: s.lucky_heart_chance,
                fever_chance: s.fever_time_chance,
                fever_active: false,
                fever_end_ms: 0,
                fever_multiplier: s.fever_time_multiplier,
                milestone_level: s.level,
                viewing_level: s.viewing_level,
                completed: false,
                elapsed_ms: 0,
                total_clicks: 0,
            },
            upgrades,
        })
    }
}

/// 旧形式のセーブデータ。未知のフィールドは無視される。
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySave {
    state: LegacyState,
    #[serde(default)]
    click_power_upgrades: Vec<LegacyUpgrade>,
    #[serde(default)]
    auto_click_upgrades: Vec<LegacyUpgrade>,
    #[serde(default)]
    special_upgrades: Vec<LegacyUpgrade>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyState {
    clicks: f64,
    cps: f64,
    clicks_per_click: f64,
    lucky_heart_chance: f64,
    fever_time_chance: f64,
    fever_time_multiplier: f64,
    level: u32,
    viewing_level: u32,
}

impl Default for LegacyState {
    fn default() -> Self {
        Self {
            clicks: 0.0,
            cps: 0.0,
            clicks_per_click: 1.0,
            lucky_heart_chance: 0.01,
            fever_time_chance: 0.005,
            fever_time_multiplier: 2.0,
            level: 1,
            viewing_level: 1,
        }
    }
}

#[derive(Deserialize)]
struct LegacyUpgrade {
    id: String,
    #[serde(default)]
    owned: u32,
    cost: f64,
}
