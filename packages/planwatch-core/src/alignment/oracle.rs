//! First-match-wins alignment rules.

use crate::config::{EXTREME_FEAR_BELOW, EXTREME_GREED_ABOVE};
use crate::triggers::EXIT_LADDER_ID;
use crate::types::{Action, Alignment, MarketSnapshot, PositionStage};
use serde::{Deserialize, Serialize};

/// Verdict returned by the oracle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlignmentVerdict {
    pub alignment: Alignment,
    pub reason: String,
}

/// A single rule: when `applies` holds, the decision gets `alignment`.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentRule {
    pub id: &'static str,
    pub applies: fn(Action, &MarketSnapshot) -> bool,
    pub alignment: Alignment,
    pub reason: &'static str,
}

impl AlignmentRule {
    pub fn verdict(&self) -> AlignmentVerdict {
        AlignmentVerdict {
            alignment: self.alignment,
            reason: self.reason.to_string(),
        }
    }
}

const NO_MATCH_REASON: &str = "No applicable rule matched";

fn buy_in_exit(action: Action, s: &MarketSnapshot) -> bool {
    action == Action::Buy && s.position_stage == PositionStage::Exit
}

fn buy_in_distribute(action: Action, s: &MarketSnapshot) -> bool {
    action == Action::Buy && s.position_stage == PositionStage::Distribute
}

fn sell_on_exit_ladder(action: Action, s: &MarketSnapshot) -> bool {
    action == Action::Sell && s.active_triggers.iter().any(|t| t == EXIT_LADDER_ID)
}

fn buy_in_extreme_fear(action: Action, s: &MarketSnapshot) -> bool {
    action == Action::Buy && s.fear_greed.is_some_and(|fg| fg < EXTREME_FEAR_BELOW)
}

fn sell_in_extreme_greed(action: Action, s: &MarketSnapshot) -> bool {
    action == Action::Sell && s.fear_greed.is_some_and(|fg| fg > EXTREME_GREED_ABOVE)
}

fn rebalance(action: Action, _: &MarketSnapshot) -> bool {
    action == Action::Rebalance
}

/// The rules in priority order. Stage rules outrank sentiment rules.
pub static ALIGNMENT_RULES: [AlignmentRule; 6] = [
    AlignmentRule {
        id: "buy-in-exit",
        applies: buy_in_exit,
        alignment: Alignment::Misaligned,
        reason: "Bought during Exit stage",
    },
    AlignmentRule {
        id: "buy-in-distribute",
        applies: buy_in_distribute,
        alignment: Alignment::Misaligned,
        reason: "Bought during Distribute stage",
    },
    AlignmentRule {
        id: "sell-on-exit-ladder",
        applies: sell_on_exit_ladder,
        alignment: Alignment::Aligned,
        reason: "Sold on Exit Ladder trigger",
    },
    AlignmentRule {
        id: "buy-in-extreme-fear",
        applies: buy_in_extreme_fear,
        alignment: Alignment::Aligned,
        reason: "Bought in Extreme Fear",
    },
    AlignmentRule {
        id: "sell-in-extreme-greed",
        applies: sell_in_extreme_greed,
        alignment: Alignment::Aligned,
        reason: "Sold in Extreme Greed",
    },
    AlignmentRule {
        id: "rebalance",
        applies: rebalance,
        alignment: Alignment::Neutral,
        reason: "Rebalances are always neutral",
    },
];

/// First rule that applies to the decision, if any.
pub fn matching_rule(action: Action, snapshot: &MarketSnapshot) -> Option<&'static AlignmentRule> {
    ALIGNMENT_RULES
        .iter()
        .find(|rule| (rule.applies)(action, snapshot))
}

/// Grade a decision against the plan. Neutral when no rule applies.
pub fn score_alignment(action: Action, snapshot: &MarketSnapshot) -> AlignmentVerdict {
    matching_rule(action, snapshot)
        .map(AlignmentRule::verdict)
        .unwrap_or_else(|| AlignmentVerdict {
            alignment: Alignment::Neutral,
            reason: NO_MATCH_REASON.to_string(),
        })
}
