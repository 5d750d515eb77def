//! Market trigger evaluation.
//!
//! Maps raw market indicators to categorized alert states:
//!
//! - **Fear & Greed**: sentiment euphoria tranches (T1/T2, T3)
//! - **BTC Dominance**: rotation out of BTC into alts
//! - **NUPL**: on-chain valuation, manually supplied
//! - **BTC Price Zone**: accumulation vs. exit ladder
//!
//! All lower bounds are inclusive. A missing reading is `warn`, never a crash.

mod snapshot;

pub use snapshot::derive_position_stage;

use crate::config::{
    DOMINANCE_FIRED_BELOW, DOMINANCE_WATCH_ABOVE, FEAR_GREED_EUPHORIA, FEAR_GREED_FIRED,
    FEAR_GREED_NEAR, NUPL_FIRED, NUPL_NEAR, PRICE_ZONE_FIRED, PRICE_ZONE_NEAR,
};
use crate::types::{Asset, Prices, Severity, TriggerState};

pub const FEAR_GREED_ID: &str = "fear-greed";
pub const BTC_DOMINANCE_ID: &str = "btc-dominance";
pub const NUPL_ID: &str = "nupl";
/// The price zone trigger fires when the exit ladder is active.
pub const EXIT_LADDER_ID: &str = "exit-ladder";

const UNAVAILABLE_VALUE: &str = "N/A";
const UNKNOWN_STATUS: &str = "UNKNOWN";

fn state(id: &str, label: &str, value: String, status: &str, severity: Severity) -> TriggerState {
    TriggerState {
        id: id.to_string(),
        label: label.to_string(),
        value,
        status: status.to_string(),
        severity,
    }
}

fn unavailable(id: &str, label: &str) -> TriggerState {
    state(
        id,
        label,
        UNAVAILABLE_VALUE.to_string(),
        UNKNOWN_STATUS,
        Severity::Warn,
    )
}

/// Evaluate the Fear & Greed index (0-100).
///
/// `< 65` watch, `[65, 80)` near, `[80, 85)` fires T1/T2, `>= 85` fires T3.
pub fn eval_fear_greed(fear_greed: Option<f64>) -> TriggerState {
    const LABEL: &str = "Fear & Greed";

    let Some(fg) = fear_greed else {
        return unavailable(FEAR_GREED_ID, LABEL);
    };
    // Unrounded, so the value and the status always agree on the band
    let value = fg.to_string();

    if fg >= FEAR_GREED_EUPHORIA {
        state(FEAR_GREED_ID, LABEL, value, "T3 euphoria", Severity::Fired)
    } else if fg >= FEAR_GREED_FIRED {
        state(FEAR_GREED_ID, LABEL, value, "T1/T2", Severity::Fired)
    } else if fg >= FEAR_GREED_NEAR {
        state(FEAR_GREED_ID, LABEL, value, "Approaching T1", Severity::Near)
    } else {
        state(FEAR_GREED_ID, LABEL, value, "Below alert zone", Severity::Watch)
    }
}

/// Evaluate BTC dominance (percent of total crypto market cap).
///
/// `> 55` watch, `[52, 55]` near, `< 52` fired.
pub fn eval_btc_dominance(dominance: Option<f64>) -> TriggerState {
    const LABEL: &str = "BTC Dominance";

    let Some(d) = dominance else {
        return unavailable(BTC_DOMINANCE_ID, LABEL);
    };
    let value = format!("{:.1}%", d);

    if d > DOMINANCE_WATCH_ABOVE {
        state(BTC_DOMINANCE_ID, LABEL, value, "BTC-led market", Severity::Watch)
    } else if d >= DOMINANCE_FIRED_BELOW {
        state(BTC_DOMINANCE_ID, LABEL, value, "Rotation zone", Severity::Near)
    } else {
        state(BTC_DOMINANCE_ID, LABEL, value, "Altseason rotation", Severity::Fired)
    }
}

/// Evaluate NUPL. Always supplied by the owner, so never `warn`.
///
/// `< 0.60` watch, `[0.60, 0.75)` near, `>= 0.75` fired.
pub fn eval_nupl(nupl: f64) -> TriggerState {
    const LABEL: &str = "NUPL";

    let value = format!("{:.2}", nupl);

    if nupl >= NUPL_FIRED {
        state(NUPL_ID, LABEL, value, "Euphoria", Severity::Fired)
    } else if nupl >= NUPL_NEAR {
        state(NUPL_ID, LABEL, value, "Belief", Severity::Near)
    } else {
        state(NUPL_ID, LABEL, value, "Below belief", Severity::Watch)
    }
}

/// Evaluate the BTC price zone (USD).
///
/// `< 100k` accumulate, `[100k, 200k)` near, `>= 200k` exit ladder active.
pub fn eval_btc_price_zone(btc_price: Option<f64>) -> TriggerState {
    const LABEL: &str = "BTC Price Zone";

    let Some(price) = btc_price else {
        return unavailable(EXIT_LADDER_ID, LABEL);
    };
    let value = format!("${:.0}", price);

    if price >= PRICE_ZONE_FIRED {
        state(EXIT_LADDER_ID, LABEL, value, "exit ladder active", Severity::Fired)
    } else if price >= PRICE_ZONE_NEAR {
        state(EXIT_LADDER_ID, LABEL, value, "Approaching exit ladder", Severity::Near)
    } else {
        state(EXIT_LADDER_ID, LABEL, value, "accumulate", Severity::Watch)
    }
}

/// Evaluate all four triggers.
///
/// The order is fixed: Fear & Greed, Dominance, NUPL, Price Zone. Consumers
/// index into the result positionally.
pub fn calc_all_triggers(prices: &Prices, nupl: f64) -> [TriggerState; 4] {
    [
        eval_fear_greed(prices.fear_greed),
        eval_btc_dominance(prices.btc_dominance),
        eval_nupl(nupl),
        eval_btc_price_zone(prices.price(Asset::Btc)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fear_greed_unknown() {
        let t = eval_fear_greed(None);
        assert_eq!(t.severity, Severity::Warn);
        assert_eq!(t.status, "UNKNOWN");
    }

    #[test]
    fn test_fear_greed_boundaries() {
        assert_eq!(eval_fear_greed(Some(0.0)).severity, Severity::Watch);
        assert_eq!(eval_fear_greed(Some(64.9)).severity, Severity::Watch);
        assert_eq!(eval_fear_greed(Some(65.0)).severity, Severity::Near);
        assert_eq!(eval_fear_greed(Some(79.9)).severity, Severity::Near);

        let t1 = eval_fear_greed(Some(80.0));
        assert_eq!(t1.severity, Severity::Fired);
        assert_eq!(t1.status, "T1/T2");

        let t3 = eval_fear_greed(Some(85.0));
        assert_eq!(t3.severity, Severity::Fired);
        assert_eq!(t3.status, "T3 euphoria");
        assert_eq!(t3.value, "85");
    }

    #[test]
    fn test_fear_greed_value_matches_band() {
        let t = eval_fear_greed(Some(84.6));
        assert_eq!(t.status, "T1/T2");
        assert_eq!(t.value, "84.6");

        let t = eval_fear_greed(Some(64.5));
        assert_eq!(t.severity, Severity::Watch);
        assert_eq!(t.value, "64.5");
    }

    #[test]
    fn test_dominance_boundaries() {
        assert_eq!(eval_btc_dominance(None).severity, Severity::Warn);
        assert_eq!(eval_btc_dominance(Some(55.1)).severity, Severity::Watch);
        // Both ends of the near band are inclusive
        assert_eq!(eval_btc_dominance(Some(55.0)).severity, Severity::Near);
        assert_eq!(eval_btc_dominance(Some(52.0)).severity, Severity::Near);
        assert_eq!(eval_btc_dominance(Some(51.9)).severity, Severity::Fired);
        assert_eq!(eval_btc_dominance(Some(57.24)).value, "57.2%");
    }

    #[test]
    fn test_nupl_boundaries() {
        assert_eq!(eval_nupl(-0.2).severity, Severity::Watch);
        assert_eq!(eval_nupl(0.59).severity, Severity::Watch);
        assert_eq!(eval_nupl(0.60).severity, Severity::Near);
        assert_eq!(eval_nupl(0.749).severity, Severity::Near);
        assert_eq!(eval_nupl(0.75).severity, Severity::Fired);
    }

    #[test]
    fn test_price_zone_boundaries() {
        assert_eq!(eval_btc_price_zone(None).severity, Severity::Warn);

        let accumulate = eval_btc_price_zone(Some(99_999.0));
        assert_eq!(accumulate.severity, Severity::Watch);
        assert_eq!(accumulate.status, "accumulate");

        assert_eq!(eval_btc_price_zone(Some(100_000.0)).severity, Severity::Near);
        assert_eq!(eval_btc_price_zone(Some(199_999.0)).severity, Severity::Near);

        let exit = eval_btc_price_zone(Some(200_000.0));
        assert_eq!(exit.severity, Severity::Fired);
        assert_eq!(exit.status, "exit ladder active");
        assert_eq!(exit.id, EXIT_LADDER_ID);
    }

    #[test]
    fn test_calc_all_triggers_order() {
        let mut prices = Prices {
            fear_greed: Some(82.0),
            btc_dominance: None,
            ..Default::default()
        };
        prices.quotes.insert(Asset::Btc, Some(150_000.0));

        let triggers = calc_all_triggers(&prices, 0.7);
        let labels: Vec<_> = triggers.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(
            labels,
            ["Fear & Greed", "BTC Dominance", "NUPL", "BTC Price Zone"]
        );
        assert_eq!(triggers[0].severity, Severity::Fired);
        assert_eq!(triggers[1].severity, Severity::Warn);
        assert_eq!(triggers[2].severity, Severity::Near);
        assert_eq!(triggers[3].severity, Severity::Near);
    }

    #[test]
    fn test_warn_only_for_missing_input() {
        let readings = [0.0, 50.0, 65.0, 80.0, 85.0, 100.0];
        for fg in readings {
            assert_ne!(eval_fear_greed(Some(fg)).severity, Severity::Warn);
            assert_ne!(eval_btc_dominance(Some(fg)).severity, Severity::Warn);
            assert_ne!(eval_nupl(fg / 100.0).severity, Severity::Warn);
            assert_ne!(eval_btc_price_zone(Some(fg * 3000.0)).severity, Severity::Warn);
        }
    }
}
