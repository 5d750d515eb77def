//! Core data types for the planwatch engine.

use crate::alignment::score_alignment;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A tracked asset.
///
/// The variant order is the fixed allocation display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Btc,
    Eth,
    Sol,
    Link,
    Mstr,
}

impl Asset {
    /// All tracked assets in display order.
    pub const ALL: [Asset; 5] = [Asset::Btc, Asset::Eth, Asset::Sol, Asset::Link, Asset::Mstr];

    /// Ticker symbol (uppercase).
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
            Asset::Sol => "SOL",
            Asset::Link => "LINK",
            Asset::Mstr => "MSTR",
        }
    }

    /// BTC and ETH dominate the portfolio; aggregates are unreliable without them.
    pub fn is_dominant(&self) -> bool {
        matches!(self, Asset::Btc | Asset::Eth)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Asset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Asset::ALL
            .into_iter()
            .find(|a| a.symbol().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("unknown asset: {}", s)))
    }
}

/// Quantity held of one asset and its per-unit average cost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct AssetHolding {
    /// Units held
    pub qty: f64,
    /// Average cost per unit (USD)
    pub cost_basis: f64,
}

impl AssetHolding {
    /// Create a holding with the given quantity and per-unit cost.
    pub fn new(qty: f64, cost_basis: f64) -> Self {
        Self { qty, cost_basis }
    }

    /// Total amount invested (qty * cost basis).
    pub fn invested(&self) -> f64 {
        self.qty * self.cost_basis
    }
}

/// The owner's holdings, replaced wholesale on every write.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Holdings {
    /// One holding per tracked asset; absent assets count as zero
    #[serde(default)]
    pub assets: BTreeMap<Asset, AssetHolding>,
    /// Cash waiting to be deployed (USD)
    #[serde(default)]
    pub dry_powder: f64,
    /// Manually supplied NUPL reading
    #[serde(default)]
    pub nupl: f64,
    /// When the holdings were last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Holdings {
    /// Holding for an asset, zero if it was never recorded.
    pub fn holding(&self, asset: Asset) -> AssetHolding {
        self.assets.get(&asset).copied().unwrap_or_default()
    }

    /// Reject negative or non-finite quantities and costs.
    ///
    /// The calculations assume well-formed holdings; call this at the boundary.
    pub fn validate(&self) -> Result<()> {
        for (asset, h) in &self.assets {
            if !h.qty.is_finite() || h.qty < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "{} quantity must be >= 0, got {}",
                    asset, h.qty
                )));
            }
            if !h.cost_basis.is_finite() || h.cost_basis < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "{} cost basis must be >= 0, got {}",
                    asset, h.cost_basis
                )));
            }
        }
        if !self.dry_powder.is_finite() || self.dry_powder < 0.0 {
            return Err(Error::InvalidInput(format!(
                "dry powder must be >= 0, got {}",
                self.dry_powder
            )));
        }
        if !self.nupl.is_finite() {
            return Err(Error::InvalidInput("nupl must be a finite number".to_string()));
        }
        Ok(())
    }
}

/// A price refresh. `None` means the source was unavailable this time.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Prices {
    /// USD price per asset
    #[serde(default)]
    pub quotes: BTreeMap<Asset, Option<f64>>,
    /// Fear & Greed index (0-100)
    #[serde(default)]
    pub fear_greed: Option<f64>,
    /// BTC share of total crypto market cap (percent)
    #[serde(default)]
    pub btc_dominance: Option<f64>,
    /// When the quotes were fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Prices {
    /// Price of an asset, `None` when missing or unavailable.
    pub fn price(&self, asset: Asset) -> Option<f64> {
        self.quotes.get(&asset).copied().flatten()
    }
}

/// What a position or allocation row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PositionKey {
    Asset(Asset),
    Cash,
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionKey::Asset(asset) => write!(f, "{}", asset),
            PositionKey::Cash => f.write_str("CASH"),
        }
    }
}

impl From<PositionKey> for String {
    fn from(key: PositionKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for PositionKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        if s.eq_ignore_ascii_case("cash") {
            Ok(PositionKey::Cash)
        } else {
            s.parse().map(PositionKey::Asset)
        }
    }
}

/// A valued position. Derived on every request, never stored.
///
/// `value`, `pnl`, `pnl_pct` and `alloc_pct` are all `None` when the price is
/// unavailable. Cash has a value but never a P&L.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub key: PositionKey,
    /// Market value (USD)
    pub value: Option<f64>,
    /// Unrealized P&L (USD)
    pub pnl: Option<f64>,
    /// Unrealized P&L percentage
    pub pnl_pct: Option<f64>,
    /// Share of total portfolio value, filled in by the second pass
    pub alloc_pct: Option<f64>,
    pub price_unavailable: bool,
}

/// Current vs. target allocation for one row of the plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Allocation {
    pub key: PositionKey,
    /// Current share of portfolio value (percent)
    pub current_pct: Option<f64>,
    /// `current_pct - target_pct`; positive means overweight
    pub gap: Option<f64>,
    /// Plan target (percent)
    pub target_pct: f64,
}

/// Alert level of a market trigger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Watch,
    Near,
    Fired,
    /// Only used when the driving input is unavailable
    Warn,
}

/// Categorized state of one market indicator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerState {
    /// Stable identifier, used in `MarketSnapshot::active_triggers`
    pub id: String,
    pub label: String,
    /// Indicator reading as shown to the owner
    pub value: String,
    pub status: String,
    pub severity: Severity,
}

/// Macro phase of the investment plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PositionStage {
    Accumulate,
    Distribute,
    Reduce,
    Exit,
}

impl FromStr for PositionStage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "accumulate" => Ok(PositionStage::Accumulate),
            "distribute" => Ok(PositionStage::Distribute),
            "reduce" => Ok(PositionStage::Reduce),
            "exit" => Ok(PositionStage::Exit),
            other => Err(Error::InvalidInput(format!("unknown stage: {}", other))),
        }
    }
}

/// Point-in-time market context attached to a decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub btc_price: Option<f64>,
    pub fear_greed: Option<f64>,
    pub btc_dominance: Option<f64>,
    pub nupl: f64,
    /// Proceeds zone id of the BTC price, `"unknown"` without a price
    pub btc_price_zone: String,
    pub position_stage: PositionStage,
    /// Ids of the triggers that were `fired` at capture time
    #[serde(default)]
    pub active_triggers: Vec<String>,
}

impl Default for MarketSnapshot {
    fn default() -> Self {
        Self {
            btc_price: None,
            fear_greed: None,
            btc_dominance: None,
            nupl: 0.0,
            btc_price_zone: "unknown".to_string(),
            position_stage: PositionStage::Accumulate,
            active_triggers: Vec::new(),
        }
    }
}

/// Kind of trading decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Rebalance,
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Action::Buy),
            "sell" => Ok(Action::Sell),
            "rebalance" => Ok(Action::Rebalance),
            other => Err(Error::InvalidInput(format!("unknown action: {}", other))),
        }
    }
}

/// Verdict of a decision against the plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Aligned,
    Misaligned,
    Neutral,
}

/// A recorded trading decision. Immutable apart from `notes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub asset: Asset,
    pub action: Action,
    /// Position size before the decision (USD)
    pub amount_before: f64,
    /// Position size after the decision (USD)
    pub amount_after: f64,
    pub snapshot: MarketSnapshot,
    pub alignment: Alignment,
    pub alignment_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DecisionEntry {
    /// Record a decision, stamping it with the alignment oracle's verdict.
    pub fn record(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        asset: Asset,
        action: Action,
        amount_before: f64,
        amount_after: f64,
        snapshot: MarketSnapshot,
    ) -> Self {
        let verdict = score_alignment(action, &snapshot);
        Self {
            id: id.into(),
            timestamp,
            asset,
            action,
            amount_before,
            amount_after,
            snapshot,
            alignment: verdict.alignment,
            alignment_reason: verdict.reason,
            notes: None,
        }
    }

    /// Attach or replace the free-form notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Response envelope printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
