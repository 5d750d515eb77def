//! Point-in-time market snapshots and plan stage derivation.

use super::calc_all_triggers;
use crate::config::{StrategyConfig, PRICE_ZONE_FIRED, PRICE_ZONE_NEAR};
use crate::portfolio::calc_proceeds_split_with;
use crate::types::{Asset, MarketSnapshot, PositionStage, Prices, Severity};

/// Zone label used when the BTC price is unavailable.
const UNKNOWN_ZONE: &str = "unknown";

/// Derive the plan stage from the BTC price.
///
/// Accumulate below 100k, Distribute below 200k, Reduce while the exit ladder
/// is being worked, Exit at or above its top rung. `None` without a price.
pub fn derive_position_stage(
    btc_price: Option<f64>,
    config: &StrategyConfig,
) -> Option<PositionStage> {
    let price = btc_price?;
    let stage = if price < PRICE_ZONE_NEAR {
        PositionStage::Accumulate
    } else if price < PRICE_ZONE_FIRED {
        PositionStage::Distribute
    } else {
        match config.ladder_top() {
            Some(top) if price >= top => PositionStage::Exit,
            Some(_) => PositionStage::Reduce,
            None => PositionStage::Exit,
        }
    };
    Some(stage)
}

impl MarketSnapshot {
    /// Capture the market context for a decision made right now.
    ///
    /// Only `fired` triggers are listed as active; `warn` (missing data) is not.
    pub fn capture(
        prices: &Prices,
        nupl: f64,
        position_stage: PositionStage,
        config: &StrategyConfig,
    ) -> Self {
        let btc_price = prices.price(Asset::Btc);
        let active_triggers = calc_all_triggers(prices, nupl)
            .into_iter()
            .filter(|t| t.severity == Severity::Fired)
            .map(|t| t.id)
            .collect();
        let btc_price_zone = btc_price
            .map(|p| calc_proceeds_split_with(config, p).zone.id().to_string())
            .unwrap_or_else(|| UNKNOWN_ZONE.to_string());

        Self {
            btc_price,
            fear_greed: prices.fear_greed,
            btc_dominance: prices.btc_dominance,
            nupl,
            btc_price_zone,
            position_stage,
            active_triggers,
        }
    }
}
