//! Portfolio-level aggregates.

use crate::config::{StrategyConfig, STRATEGY};
use crate::types::{Asset, Holdings, Position, Prices};
use serde::{Deserialize, Serialize};

/// Sum of all known position values. Unpriced positions are left out, not zeroed.
pub fn calc_total_value(positions: &[Position]) -> f64 {
    let excluded = positions.iter().filter(|p| p.value.is_none()).count();
    if excluded > 0 {
        tracing::debug!("{} position(s) without a price left out of the total", excluded);
    }

    positions.iter().filter_map(|p| p.value).sum()
}

/// Portfolio-wide unrealized P&L.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PnlSummary {
    /// Total unrealized P&L (USD)
    pub total_pnl: Option<f64>,
    /// Total P&L over total invested (percent)
    pub pnl_pct: Option<f64>,
}

/// Unrealized P&L across the assets with a known price.
///
/// Without a price for either dominant asset (BTC, ETH) the aggregate is not
/// trustworthy, so both fields are `None`. `pnl_pct` is also `None` when
/// nothing was invested.
pub fn calc_total_pnl(holdings: &Holdings, prices: &Prices) -> PnlSummary {
    if let Some(missing) = Asset::ALL
        .into_iter()
        .find(|a| a.is_dominant() && prices.price(*a).is_none())
    {
        tracing::warn!("No {} price, total P&L unavailable", missing);
        return PnlSummary {
            total_pnl: None,
            pnl_pct: None,
        };
    }

    let mut total_pnl = 0.0;
    let mut total_invested = 0.0;
    for asset in Asset::ALL {
        let Some(price) = prices.price(asset) else {
            continue;
        };
        let holding = holdings.holding(asset);
        let invested = holding.invested();
        total_pnl += holding.qty * price - invested;
        total_invested += invested;
    }

    let pnl_pct = if total_invested > 0.0 {
        Some((total_pnl / total_invested) * 100.0)
    } else {
        None
    };

    PnlSummary {
        total_pnl: Some(total_pnl),
        pnl_pct,
    }
}

/// Progress towards the portfolio target, capped at 100. 0 for a 0 target.
pub fn calc_progress_to_target(total: f64, target: f64) -> f64 {
    if target == 0.0 {
        return 0.0;
    }
    ((total / target) * 100.0).min(100.0)
}

/// Amount above (positive) or below (negative) the portfolio target.
pub fn calc_gap_to_target(total: f64, target: f64) -> f64 {
    total - target
}

/// BTC price zone that decides how sale proceeds are split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProceedsZone {
    #[serde(rename = "below_150k")]
    Below150k,
    #[serde(rename = "150k_250k")]
    From150kTo250k,
    #[serde(rename = "250k_350k")]
    From250kTo350k,
    #[serde(rename = "above_350k")]
    Above350k,
}

impl ProceedsZone {
    /// Stable zone identifier.
    pub fn id(&self) -> &'static str {
        match self {
            ProceedsZone::Below150k => "below_150k",
            ProceedsZone::From150kTo250k => "150k_250k",
            ProceedsZone::From250kTo350k => "250k_350k",
            ProceedsZone::Above350k => "above_350k",
        }
    }
}

/// Cash vs. BTC reinvestment split for sale proceeds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProceedsSplit {
    pub zone: ProceedsZone,
    pub cash_pct: f64,
    pub btc_pct: f64,
}

const FALLBACK_SPLIT: ProceedsSplit = ProceedsSplit {
    zone: ProceedsZone::Below150k,
    cash_pct: 30.0,
    btc_pct: 70.0,
};

/// Proceeds split under the built-in plan.
pub fn calc_proceeds_split(btc_price: f64) -> ProceedsSplit {
    calc_proceeds_split_with(&STRATEGY, btc_price)
}

/// Proceeds split for a BTC price: the highest band whose lower bound
/// (inclusive) the price has reached.
pub fn calc_proceeds_split_with(config: &StrategyConfig, btc_price: f64) -> ProceedsSplit {
    config
        .proceeds_zones
        .iter()
        .rev()
        .find(|band| btc_price >= band.min_price)
        .or_else(|| config.proceeds_zones.first())
        .map(|band| ProceedsSplit {
            zone: band.zone,
            cash_pct: band.cash_pct,
            btc_pct: band.btc_pct,
        })
        .unwrap_or(FALLBACK_SPLIT)
}

/// One rung of the exit ladder against the current BTC price and holdings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LadderStep {
    pub price: f64,
    pub sell_fraction: f64,
    /// BTC to sell at this rung
    pub sell_qty: f64,
    /// Whether the current price has reached the rung
    pub reached: bool,
}

/// Lay the exit ladder over the current BTC holdings.
///
/// No rung counts as reached without a price.
pub fn exit_ladder_plan(
    btc_price: Option<f64>,
    btc_qty: f64,
    config: &StrategyConfig,
) -> Vec<LadderStep> {
    config
        .exit_ladder
        .iter()
        .map(|rung| LadderStep {
            price: rung.price,
            sell_fraction: rung.sell_fraction,
            sell_qty: btc_qty * rung.sell_fraction,
            reached: btc_price.is_some_and(|p| p >= rung.price),
        })
        .collect()
}
