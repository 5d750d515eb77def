//! Planwatch Core - derived metrics and decision alignment for a plan-driven portfolio.
//!
//! This crate turns raw prices and holdings into the numbers a strategic
//! investment plan is judged by, and grades individual trading decisions
//! against that plan:
//!
//! - **Market triggers**: Fear & Greed, BTC dominance, NUPL and BTC price zone alerts
//! - **Positions & allocations**: valued positions and allocation-vs-target gaps
//! - **Portfolio aggregates**: total value, P&L, progress to target, proceeds split
//! - **Alignment**: first-match-wins verdicts for buy/sell/rebalance decisions
//! - **Adherence score**: recency-weighted score over the decision history
//!
//! Every calculation is pure and synchronous. Missing market data is carried as
//! `None` all the way through; it never turns into a zero.
//!
//! # Example
//!
//! ```rust
//! use planwatch_core::{
//!     calc_total_value, build_allocations, build_positions, fill_allocation_pcts,
//!     AssetHolding, Asset, Holdings, Prices,
//! };
//!
//! let mut holdings = Holdings::default();
//! holdings.assets.insert(Asset::Btc, AssetHolding::new(0.5, 60_000.0));
//! holdings.dry_powder = 5_000.0;
//!
//! let mut prices = Prices::default();
//! prices.quotes.insert(Asset::Btc, Some(100_000.0));
//!
//! let positions = build_positions(&holdings, &prices);
//! let total = calc_total_value(&positions);
//! let positions = fill_allocation_pcts(positions, total);
//! let allocations = build_allocations(&positions, total);
//!
//! assert_eq!(total, 55_000.0);
//! assert_eq!(allocations.len(), Asset::ALL.len() + 1);
//! ```

pub mod alignment;
pub mod config;
pub mod portfolio;
pub mod store;
pub mod triggers;
pub mod types;

// Re-export commonly used types
pub use types::{
    Action, Alignment, Allocation, ApiResponse, Asset, AssetHolding, DecisionEntry, Holdings,
    MarketSnapshot, Position, PositionKey, PositionStage, Prices, Severity, TriggerState,
};

// Re-export main functionality
pub use alignment::{
    calculate_score, matching_rule, score_alignment, AlignmentRule, AlignmentVerdict,
    FearGreedZoneScores, ScoreBreakdown, ALIGNMENT_RULES,
};
pub use config::{StrategyConfig, STRATEGY};
pub use portfolio::{
    build_allocations, build_allocations_with, build_positions, calc_allocation_gap,
    calc_allocation_pct, calc_gap_to_target, calc_progress_to_target, calc_proceeds_split,
    calc_proceeds_split_with, calc_total_pnl, calc_total_value, exit_ladder_plan,
    fill_allocation_pcts, LadderStep, PnlSummary, PortfolioSummary, ProceedsSplit, ProceedsZone,
};
pub use store::JsonStore;
pub use triggers::{
    calc_all_triggers, derive_position_stage, eval_btc_dominance, eval_btc_price_zone,
    eval_fear_greed, eval_nupl,
};

/// Error types for planwatch-core operations.
///
/// None of the calculations raise these; they come from the boundary
/// (config files, the JSON store, and holdings validation).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for planwatch-core operations.
pub type Result<T> = std::result::Result<T, Error>;
