//! Portfolio valuation module.
//!
//! Provides valued positions, allocation-vs-target rows, and portfolio-level
//! aggregates (total value, P&L, progress to target, proceeds split).

mod aggregate;
mod positions;
mod summary;

pub use aggregate::{
    calc_gap_to_target, calc_progress_to_target, calc_proceeds_split, calc_proceeds_split_with,
    calc_total_pnl, calc_total_value, exit_ladder_plan, LadderStep, PnlSummary, ProceedsSplit,
    ProceedsZone,
};
pub use positions::{
    build_allocations, build_allocations_with, build_positions, calc_allocation_gap,
    calc_allocation_pct, fill_allocation_pcts,
};
pub use summary::PortfolioSummary;
