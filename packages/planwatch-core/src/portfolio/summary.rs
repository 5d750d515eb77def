//! Everything the dashboard shows about the portfolio, computed in one go.

use super::aggregate::{
    calc_gap_to_target, calc_progress_to_target, calc_proceeds_split_with, calc_total_pnl,
    calc_total_value, exit_ladder_plan, LadderStep, ProceedsSplit,
};
use super::positions::{build_allocations_with, build_positions, fill_allocation_pcts};
use crate::config::StrategyConfig;
use crate::triggers::{calc_all_triggers, derive_position_stage};
use crate::types::{Allocation, Asset, Holdings, Position, PositionStage, Prices, TriggerState};
use serde::{Deserialize, Serialize};

/// Portfolio valuation and plan status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSummary {
    /// Positions sorted by value, with allocation percentages filled in
    pub positions: Vec<Position>,
    /// Allocation rows in display order
    pub allocations: Vec<Allocation>,
    /// Sum of all priced positions including cash
    pub total_value: f64,
    pub total_pnl: Option<f64>,
    pub pnl_pct: Option<f64>,
    pub progress_pct: f64,
    pub gap_to_target: f64,
    /// Only known with a BTC price
    pub proceeds_split: Option<ProceedsSplit>,
    pub position_stage: Option<PositionStage>,
    pub triggers: [TriggerState; 4],
    pub exit_ladder: Vec<LadderStep>,
}

impl PortfolioSummary {
    /// Value the holdings at the given prices and measure them against the plan.
    pub fn build(holdings: &Holdings, prices: &Prices, config: &StrategyConfig) -> Self {
        let positions = build_positions(holdings, prices);
        let total_value = calc_total_value(&positions);
        let positions = fill_allocation_pcts(positions, total_value);
        let allocations = build_allocations_with(config, &positions, total_value);

        let pnl = calc_total_pnl(holdings, prices);
        let btc_price = prices.price(Asset::Btc);
        let target = config.portfolio_target_usd;

        tracing::debug!(
            total_value,
            unpriced = positions.iter().filter(|p| p.price_unavailable).count(),
            "Built portfolio summary"
        );

        Self {
            allocations,
            total_value,
            total_pnl: pnl.total_pnl,
            pnl_pct: pnl.pnl_pct,
            progress_pct: calc_progress_to_target(total_value, target),
            gap_to_target: calc_gap_to_target(total_value, target),
            proceeds_split: btc_price.map(|p| calc_proceeds_split_with(config, p)),
            position_stage: derive_position_stage(btc_price, config),
            triggers: calc_all_triggers(prices, holdings.nupl),
            exit_ladder: exit_ladder_plan(btc_price, holdings.holding(Asset::Btc).qty, config),
            positions,
        }
    }
}
