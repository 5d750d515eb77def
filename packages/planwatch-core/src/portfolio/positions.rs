//! Valued positions and allocation-vs-target rows.
//!
//! Allocation percentages need the portfolio total, which needs the positions,
//! so the work is split in two passes: [`build_positions`] leaves `alloc_pct`
//! empty, [`fill_allocation_pcts`] fills it once the total is known.

use crate::config::{StrategyConfig, STRATEGY};
use crate::types::{Allocation, Asset, AssetHolding, Holdings, Position, PositionKey, Prices};
use std::cmp::Ordering;

fn unpriced(asset: Asset) -> Position {
    Position {
        key: PositionKey::Asset(asset),
        value: None,
        pnl: None,
        pnl_pct: None,
        alloc_pct: None,
        price_unavailable: true,
    }
}

fn priced(asset: Asset, holding: AssetHolding, price: f64) -> Position {
    let value = holding.qty * price;
    let invested = holding.invested();
    let pnl = value - invested;
    let pnl_pct = if invested > 0.0 {
        (pnl / invested) * 100.0
    } else {
        0.0
    };

    Position {
        key: PositionKey::Asset(asset),
        value: Some(value),
        pnl: Some(pnl),
        pnl_pct: Some(pnl_pct),
        alloc_pct: None,
        price_unavailable: false,
    }
}

/// Valued positions first (largest first), unpriced ones after in input order.
fn by_value_desc(a: &Position, b: &Position) -> Ordering {
    match (a.value, b.value) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Value every tracked asset plus the dry powder.
///
/// An asset without a price gets `price_unavailable` and no numbers at all.
/// Cash is valued at face and never has a P&L. `alloc_pct` is left empty.
pub fn build_positions(holdings: &Holdings, prices: &Prices) -> Vec<Position> {
    let mut positions: Vec<Position> = Asset::ALL
        .into_iter()
        .map(|asset| match prices.price(asset) {
            Some(price) => priced(asset, holdings.holding(asset), price),
            None => unpriced(asset),
        })
        .collect();

    positions.push(Position {
        key: PositionKey::Cash,
        value: Some(holdings.dry_powder),
        pnl: None,
        pnl_pct: None,
        alloc_pct: None,
        price_unavailable: false,
    });

    // sort_by is stable, so the unpriced group keeps its input order
    positions.sort_by(by_value_desc);
    positions
}

/// Second pass: fill `alloc_pct` now that the total is known.
pub fn fill_allocation_pcts(positions: Vec<Position>, total_value: f64) -> Vec<Position> {
    positions
        .into_iter()
        .map(|p| Position {
            alloc_pct: p.value.map(|v| calc_allocation_pct(v, total_value)),
            ..p
        })
        .collect()
}

/// Share of `total` held in `value`, as a percentage. 0 when the total is 0.
pub fn calc_allocation_pct(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    (value / total) * 100.0
}

/// Distance from target; positive means overweight.
pub fn calc_allocation_gap(current: f64, target: f64) -> f64 {
    current - target
}

/// Allocation rows for the built-in plan.
pub fn build_allocations(positions: &[Position], total_value: f64) -> Vec<Allocation> {
    build_allocations_with(&STRATEGY, positions, total_value)
}

/// One allocation row per asset in display order, then cash.
///
/// `current_pct` and `gap` are `None` when the position has no value or the
/// portfolio total is 0.
pub fn build_allocations_with(
    config: &StrategyConfig,
    positions: &[Position],
    total_value: f64,
) -> Vec<Allocation> {
    let rows = Asset::ALL
        .into_iter()
        .map(|asset| (PositionKey::Asset(asset), config.target_for(asset)))
        .chain(std::iter::once((PositionKey::Cash, config.cash_target_pct)));

    rows.map(|(key, target_pct)| {
        let value = positions.iter().find(|p| p.key == key).and_then(|p| p.value);
        let current_pct = match value {
            Some(v) if total_value != 0.0 => Some(calc_allocation_pct(v, total_value)),
            _ => None,
        };

        Allocation {
            key,
            current_pct,
            gap: current_pct.map(|c| calc_allocation_gap(c, target_pct)),
            target_pct,
        }
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_holdings() -> Holdings {
        let mut holdings = Holdings::default();
        holdings.assets.insert(Asset::Btc, AssetHolding::new(1.0, 50_000.0));
        holdings.assets.insert(Asset::Eth, AssetHolding::new(10.0, 2_000.0));
        holdings.assets.insert(Asset::Sol, AssetHolding::new(100.0, 150.0));
        holdings.dry_powder = 10_000.0;
        holdings
    }

    fn sample_prices() -> Prices {
        let mut prices = Prices::default();
        prices.quotes.insert(Asset::Btc, Some(100_000.0));
        prices.quotes.insert(Asset::Eth, Some(3_000.0));
        prices.quotes.insert(Asset::Sol, Some(120.0));
        prices.quotes.insert(Asset::Link, Some(20.0));
        prices.quotes.insert(Asset::Mstr, Some(400.0));
        prices
    }

    fn find(positions: &[Position], key: PositionKey) -> &Position {
        positions.iter().find(|p| p.key == key).unwrap()
    }

    #[test]
    fn test_priced_position_metrics() {
        let positions = build_positions(&sample_holdings(), &sample_prices());

        let btc = find(&positions, PositionKey::Asset(Asset::Btc));
        assert_eq!(btc.value, Some(100_000.0));
        assert_eq!(btc.pnl, Some(50_000.0));
        assert_eq!(btc.pnl_pct, Some(100.0));
        assert_eq!(btc.alloc_pct, None);
        assert!(!btc.price_unavailable);

        let sol = find(&positions, PositionKey::Asset(Asset::Sol));
        assert_eq!(sol.pnl, Some(-3_000.0));
        assert_relative_eq!(sol.pnl_pct.unwrap(), -20.0);
    }

    #[test]
    fn test_zero_cost_basis_pnl_pct() {
        let mut holdings = Holdings::default();
        holdings.assets.insert(Asset::Link, AssetHolding::new(50.0, 0.0));

        let positions = build_positions(&holdings, &sample_prices());
        let link = find(&positions, PositionKey::Asset(Asset::Link));
        assert_eq!(link.pnl, Some(1_000.0));
        assert_eq!(link.pnl_pct, Some(0.0));
    }

    #[test]
    fn test_null_price_nulls_everything() {
        let mut prices = sample_prices();
        prices.quotes.insert(Asset::Eth, None);

        let positions = build_positions(&sample_holdings(), &prices);
        let eth = find(&positions, PositionKey::Asset(Asset::Eth));
        assert!(eth.price_unavailable);
        assert_eq!(eth.value, None);
        assert_eq!(eth.pnl, None);
        assert_eq!(eth.pnl_pct, None);
        assert_eq!(eth.alloc_pct, None);
    }

    #[test]
    fn test_cash_position() {
        let positions = build_positions(&sample_holdings(), &sample_prices());
        let cash = find(&positions, PositionKey::Cash);
        assert_eq!(cash.value, Some(10_000.0));
        assert_eq!(cash.pnl, None);
        assert_eq!(cash.pnl_pct, None);
        assert!(!cash.price_unavailable);
    }

    #[test]
    fn test_sorted_by_value_with_nulls_last_in_input_order() {
        let mut prices = sample_prices();
        prices.quotes.insert(Asset::Sol, None);
        prices.quotes.remove(&Asset::Mstr);
        prices.quotes.insert(Asset::Eth, None);

        let positions = build_positions(&sample_holdings(), &prices);
        let keys: Vec<PositionKey> = positions.iter().map(|p| p.key).collect();
        assert_eq!(
            keys,
            vec![
                PositionKey::Asset(Asset::Btc),
                PositionKey::Cash,
                PositionKey::Asset(Asset::Link),
                PositionKey::Asset(Asset::Eth),
                PositionKey::Asset(Asset::Sol),
                PositionKey::Asset(Asset::Mstr),
            ]
        );
    }

    #[test]
    fn test_allocation_pct_guards_zero_total() {
        assert_eq!(calc_allocation_pct(500.0, 0.0), 0.0);
        assert_eq!(calc_allocation_pct(0.0, 1_000.0), 0.0);
        assert_eq!(calc_allocation_pct(250.0, 1_000.0), 25.0);
    }

    #[test]
    fn test_allocation_gap_sign() {
        assert_eq!(calc_allocation_gap(60.0, 50.0), 10.0);
        assert_eq!(calc_allocation_gap(15.0, 20.0), -5.0);
    }

    #[test]
    fn test_fill_allocation_pcts() {
        let positions = build_positions(&sample_holdings(), &sample_prices());
        let positions = fill_allocation_pcts(positions, 200_000.0);

        let btc = find(&positions, PositionKey::Asset(Asset::Btc));
        assert_eq!(btc.alloc_pct, Some(50.0));
        let cash = find(&positions, PositionKey::Cash);
        assert_relative_eq!(cash.alloc_pct.unwrap(), 5.0);
    }

    #[test]
    fn test_build_allocations_fixed_order() {
        let positions = build_positions(&sample_holdings(), &sample_prices());
        let allocations = build_allocations(&positions, 152_000.0);

        let keys: Vec<PositionKey> = allocations.iter().map(|a| a.key).collect();
        assert_eq!(
            keys,
            vec![
                PositionKey::Asset(Asset::Btc),
                PositionKey::Asset(Asset::Eth),
                PositionKey::Asset(Asset::Sol),
                PositionKey::Asset(Asset::Link),
                PositionKey::Asset(Asset::Mstr),
                PositionKey::Cash,
            ]
        );
        assert_eq!(allocations[0].target_pct, 50.0);
        assert_eq!(allocations[5].target_pct, 10.0);
    }

    #[test]
    fn test_build_allocations_gap() {
        let positions = build_positions(&sample_holdings(), &sample_prices());
        let allocations = build_allocations(&positions, 200_000.0);

        let btc = &allocations[0];
        assert_eq!(btc.current_pct, Some(50.0));
        assert_eq!(btc.gap, Some(0.0));

        let eth = &allocations[1];
        assert_relative_eq!(eth.current_pct.unwrap(), 15.0);
        assert_relative_eq!(eth.gap.unwrap(), -5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_build_allocations_null_value_and_zero_total() {
        let mut prices = sample_prices();
        prices.quotes.insert(Asset::Sol, None);
        let positions = build_positions(&sample_holdings(), &prices);

        let allocations = build_allocations(&positions, 140_000.0);
        assert_eq!(allocations[2].current_pct, None);
        assert_eq!(allocations[2].gap, None);
        assert!(allocations[0].current_pct.is_some());

        let allocations = build_allocations(&positions, 0.0);
        assert!(allocations
            .iter()
            .all(|a| a.current_pct.is_none() && a.gap.is_none()));
    }

    #[test]
    fn test_build_allocations_with_custom_plan() {
        let config = StrategyConfig {
            cash_target_pct: 25.0,
            ..Default::default()
        };
        let positions = build_positions(&sample_holdings(), &sample_prices());
        let allocations = build_allocations_with(&config, &positions, 200_000.0);

        let cash = allocations.last().unwrap();
        assert_eq!(cash.target_pct, 25.0);
        assert_relative_eq!(cash.gap.unwrap(), -20.0, epsilon = 1e-9);
    }
}
