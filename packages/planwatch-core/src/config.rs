//! Strategy plan configuration.
//!
//! Every plan constant lives here so call sites and tests share one source of
//! truth. Trigger thresholds are plain constants; the plan itself (targets,
//! proceeds zones, exit ladder) is a [`StrategyConfig`] that can be overridden
//! from a TOML file.

use crate::portfolio::ProceedsZone;
use crate::types::Asset;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Fear & Greed reading at which the trigger turns `near`.
pub const FEAR_GREED_NEAR: f64 = 65.0;
/// Fear & Greed reading at which T1/T2 fire.
pub const FEAR_GREED_FIRED: f64 = 80.0;
/// Fear & Greed reading at which T3 (euphoria) fires.
pub const FEAR_GREED_EUPHORIA: f64 = 85.0;

/// BTC dominance above this is still a BTC-led market.
pub const DOMINANCE_WATCH_ABOVE: f64 = 55.0;
/// BTC dominance below this fires the rotation trigger.
pub const DOMINANCE_FIRED_BELOW: f64 = 52.0;

pub const NUPL_NEAR: f64 = 0.60;
pub const NUPL_FIRED: f64 = 0.75;

/// BTC price at which the price zone leaves accumulation.
pub const PRICE_ZONE_NEAR: f64 = 100_000.0;
/// BTC price at which the exit ladder becomes active.
pub const PRICE_ZONE_FIRED: f64 = 200_000.0;

/// Buys strictly below this Fear & Greed reading are "extreme fear" buys.
pub const EXTREME_FEAR_BELOW: f64 = 25.0;
/// Sells strictly above this Fear & Greed reading are "extreme greed" sells.
pub const EXTREME_GREED_ABOVE: f64 = 75.0;

/// Allowed drift of the summed targets away from 100%.
const TARGET_SUM_TOLERANCE: f64 = 0.5;

/// Target allocation of one asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AllocationTarget {
    pub asset: Asset,
    pub target_pct: f64,
}

/// One band of the proceeds split, starting at `min_price` (inclusive).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProceedsBand {
    pub zone: ProceedsZone,
    pub min_price: f64,
    pub cash_pct: f64,
    pub btc_pct: f64,
}

/// One rung of the exit ladder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExitTranche {
    /// BTC price at which the tranche is sold
    pub price: f64,
    /// Fraction of current BTC holdings sold at this rung
    pub sell_fraction: f64,
}

/// The strategic investment plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategyConfig {
    /// Per-asset targets
    pub targets: Vec<AllocationTarget>,
    /// Target share kept as dry powder
    pub cash_target_pct: f64,
    /// Portfolio value the plan is working towards (USD)
    pub portfolio_target_usd: f64,
    /// Proceeds split bands, ascending by `min_price`
    pub proceeds_zones: Vec<ProceedsBand>,
    /// Exit ladder tranches, ascending by price
    pub exit_ladder: Vec<ExitTranche>,
}

/// Built-in plan used by the config-free entry points.
pub static STRATEGY: LazyLock<StrategyConfig> = LazyLock::new(StrategyConfig::default);

impl Default for StrategyConfig {
    fn default() -> Self {
        let target = |asset, target_pct| AllocationTarget { asset, target_pct };
        let band = |zone, min_price, cash_pct, btc_pct| ProceedsBand {
            zone,
            min_price,
            cash_pct,
            btc_pct,
        };
        let rung = |price, sell_fraction| ExitTranche {
            price,
            sell_fraction,
        };

        Self {
            targets: vec![
                target(Asset::Btc, 50.0),
                target(Asset::Eth, 20.0),
                target(Asset::Sol, 10.0),
                target(Asset::Link, 5.0),
                target(Asset::Mstr, 5.0),
            ],
            cash_target_pct: 10.0,
            portfolio_target_usd: 1_000_000.0,
            proceeds_zones: vec![
                band(ProceedsZone::Below150k, 0.0, 30.0, 70.0),
                band(ProceedsZone::From150kTo250k, 150_000.0, 50.0, 50.0),
                band(ProceedsZone::From250kTo350k, 250_000.0, 70.0, 30.0),
                band(ProceedsZone::Above350k, 350_000.0, 90.0, 10.0),
            ],
            exit_ladder: vec![
                rung(200_000.0, 0.10),
                rung(250_000.0, 0.15),
                rung(300_000.0, 0.20),
                rung(350_000.0, 0.25),
                rung(400_000.0, 0.30),
            ],
        }
    }
}

impl StrategyConfig {
    /// Get the default config file path.
    ///
    /// Default path: `~/.planwatch/strategy.toml`
    /// Can be overridden with `PLANWATCH_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("PLANWATCH_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".planwatch/strategy.toml"))
            .unwrap_or_else(|| PathBuf::from("strategy.toml"))
    }

    /// Load and validate a plan from a TOML file.
    ///
    /// A missing file yields the built-in plan; fields left out of the file
    /// keep their built-in values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No strategy config at {}, using built-in plan", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: StrategyConfig = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded strategy config from {}", path.display());
        Ok(config)
    }

    /// Target percentage for an asset, 0 if the plan does not hold it.
    pub fn target_for(&self, asset: Asset) -> f64 {
        self.targets
            .iter()
            .find(|t| t.asset == asset)
            .map(|t| t.target_pct)
            .unwrap_or(0.0)
    }

    /// Price of the highest exit-ladder rung, if the ladder is not empty.
    pub fn ladder_top(&self) -> Option<f64> {
        self.exit_ladder.last().map(|t| t.price)
    }

    /// Check the plan for internal consistency.
    pub fn validate(&self) -> Result<()> {
        for (i, t) in self.targets.iter().enumerate() {
            if t.target_pct < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "target for {} is negative",
                    t.asset
                )));
            }
            if self.targets[..i].iter().any(|prev| prev.asset == t.asset) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate target for {}",
                    t.asset
                )));
            }
        }

        let sum: f64 =
            self.targets.iter().map(|t| t.target_pct).sum::<f64>() + self.cash_target_pct;
        if (sum - 100.0).abs() > TARGET_SUM_TOLERANCE {
            return Err(Error::InvalidConfig(format!(
                "targets must sum to 100%, got {:.2}%",
                sum
            )));
        }

        if self.portfolio_target_usd < 0.0 {
            return Err(Error::InvalidConfig(
                "portfolio target must not be negative".to_string(),
            ));
        }

        match self.proceeds_zones.first() {
            Some(first) if first.min_price <= 0.0 => {}
            _ => {
                return Err(Error::InvalidConfig(
                    "proceeds zones must start at a price of 0".to_string(),
                ))
            }
        }
        for pair in self.proceeds_zones.windows(2) {
            if pair[1].min_price <= pair[0].min_price {
                return Err(Error::InvalidConfig(
                    "proceeds zones must be strictly ascending".to_string(),
                ));
            }
        }
        for band in &self.proceeds_zones {
            if (band.cash_pct + band.btc_pct - 100.0).abs() > f64::EPSILON * 100.0 {
                return Err(Error::InvalidConfig(format!(
                    "proceeds zone {} does not split 100%",
                    band.zone.id()
                )));
            }
        }

        for pair in self.exit_ladder.windows(2) {
            if pair[1].price <= pair[0].price {
                return Err(Error::InvalidConfig(
                    "exit ladder must be strictly ascending".to_string(),
                ));
            }
        }
        if let Some(bad) = self
            .exit_ladder
            .iter()
            .find(|t| !(t.sell_fraction > 0.0 && t.sell_fraction <= 1.0))
        {
            return Err(Error::InvalidConfig(format!(
                "exit tranche at {} sells {} of holdings",
                bad.price, bad.sell_fraction
            )));
        }

        Ok(())
    }
}
