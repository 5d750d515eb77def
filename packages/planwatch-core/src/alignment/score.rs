//! Plan adherence score over the decision history.

use crate::config::{EXTREME_FEAR_BELOW, EXTREME_GREED_ABOVE};
use crate::types::{Alignment, DecisionEntry, PositionStage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score with no evidence against the plan.
const VACUOUS_SCORE: u32 = 100;

/// Adherence per Fear & Greed band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FearGreedZoneScores {
    /// Fear & Greed below 25
    pub fear: u32,
    /// Fear & Greed above 75
    pub greed: u32,
    /// Fear & Greed from 25 to 75 inclusive
    pub neutral: u32,
}

/// Adherence score and its breakdowns. Recomputed from the full history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreBreakdown {
    /// Recency-weighted adherence, 0-100
    pub overall: u32,
    /// Adherence per plan stage; stages without decisions are absent
    pub by_stage: BTreeMap<PositionStage, u32>,
    pub by_fear_greed_zone: FearGreedZoneScores,
    pub total_decisions: usize,
    pub aligned_count: usize,
    pub misaligned_count: usize,
    /// Most frequent reason among misaligned decisions
    pub top_misalignment_reason: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    aligned: usize,
    total: usize,
}

impl Tally {
    fn add(&mut self, entry: &DecisionEntry) {
        self.total += 1;
        if entry.alignment == Alignment::Aligned {
            self.aligned += 1;
        }
    }

    fn score(&self) -> u32 {
        if self.total == 0 {
            return VACUOUS_SCORE;
        }
        percent(self.aligned as f64 / self.total as f64)
    }
}

fn percent(ratio: f64) -> u32 {
    (100.0 * ratio).round() as u32
}

/// Recency-weighted share of aligned decisions.
///
/// `scoreable` must be sorted oldest first. The entry at rank `i` of `n`
/// weighs `(i + 1) / n`, so the newest decision counts most. Weighting is by
/// rank, not by elapsed time.
fn weighted_overall(scoreable: &[&DecisionEntry]) -> u32 {
    if scoreable.is_empty() {
        return VACUOUS_SCORE;
    }

    let n = scoreable.len() as f64;
    let (weighted, total_weight) =
        scoreable
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(weighted, total), (i, entry)| {
                let weight = (i + 1) as f64 / n;
                let value = if entry.alignment == Alignment::Aligned {
                    1.0
                } else {
                    0.0
                };
                (weighted + weight * value, total + weight)
            });

    percent(weighted / total_weight)
}

/// Most frequent misalignment reason; ties go to the reason seen earliest.
///
/// `entries` must already be in chronological order.
fn top_misalignment_reason(entries: &[&DecisionEntry]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for entry in entries
        .iter()
        .filter(|e| e.alignment == Alignment::Misaligned)
    {
        match counts
            .iter_mut()
            .find(|(reason, _)| *reason == entry.alignment_reason)
        {
            Some((_, count)) => *count += 1,
            None => counts.push((entry.alignment_reason.as_str(), 1)),
        }
    }

    // Stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.first().map(|(reason, _)| reason.to_string())
}

/// Compute the adherence score from the complete decision history.
///
/// Input order does not matter. Neutral decisions carry no signal and are left
/// out of every percentage, but still count towards `total_decisions`.
pub fn calculate_score(entries: &[DecisionEntry]) -> ScoreBreakdown {
    let aligned_count = entries
        .iter()
        .filter(|e| e.alignment == Alignment::Aligned)
        .count();
    let misaligned_count = entries
        .iter()
        .filter(|e| e.alignment == Alignment::Misaligned)
        .count();

    let mut scoreable: Vec<&DecisionEntry> = entries
        .iter()
        .filter(|e| e.alignment != Alignment::Neutral)
        .collect();
    // Stable, so entries sharing a timestamp keep their relative order
    scoreable.sort_by_key(|e| e.timestamp);

    let mut stages: BTreeMap<PositionStage, Tally> = BTreeMap::new();
    let mut fear = Tally::default();
    let mut greed = Tally::default();
    let mut neutral = Tally::default();

    for entry in &scoreable {
        stages
            .entry(entry.snapshot.position_stage)
            .or_default()
            .add(entry);

        match entry.snapshot.fear_greed {
            Some(fg) if fg < EXTREME_FEAR_BELOW => fear.add(entry),
            Some(fg) if fg > EXTREME_GREED_ABOVE => greed.add(entry),
            Some(_) => neutral.add(entry),
            None => {}
        }
    }

    let breakdown = ScoreBreakdown {
        overall: weighted_overall(&scoreable),
        by_stage: stages
            .into_iter()
            .map(|(stage, tally)| (stage, tally.score()))
            .collect(),
        by_fear_greed_zone: FearGreedZoneScores {
            fear: fear.score(),
            greed: greed.score(),
            neutral: neutral.score(),
        },
        total_decisions: entries.len(),
        aligned_count,
        misaligned_count,
        top_misalignment_reason: top_misalignment_reason(&scoreable),
    };

    tracing::debug!(
        overall = breakdown.overall,
        scoreable = scoreable.len(),
        total = entries.len(),
        "Recomputed adherence score"
    );

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, Asset, MarketSnapshot};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn entry(day: i64, alignment: Alignment, reason: &str) -> DecisionEntry {
        entry_in(day, alignment, reason, PositionStage::Accumulate, Some(50.0))
    }

    fn entry_in(
        day: i64,
        alignment: Alignment,
        reason: &str,
        stage: PositionStage,
        fear_greed: Option<f64>,
    ) -> DecisionEntry {
        DecisionEntry {
            id: format!("d{}", day),
            timestamp: at(day),
            asset: Asset::Btc,
            action: Action::Buy,
            amount_before: 0.0,
            amount_after: 1_000.0,
            snapshot: MarketSnapshot {
                fear_greed,
                position_stage: stage,
                ..Default::default()
            },
            alignment,
            alignment_reason: reason.to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_empty_history() {
        let score = calculate_score(&[]);
        assert_eq!(score.overall, 100);
        assert_eq!(score.total_decisions, 0);
        assert!(score.by_stage.is_empty());
        assert_eq!(
            score.by_fear_greed_zone,
            FearGreedZoneScores {
                fear: 100,
                greed: 100,
                neutral: 100
            }
        );
        assert_eq!(score.top_misalignment_reason, None);
    }

    #[test]
    fn test_only_neutral_is_vacuous() {
        let entries = vec![
            entry(0, Alignment::Neutral, "Rebalances are always neutral"),
            entry(1, Alignment::Neutral, "No applicable rule matched"),
        ];
        let score = calculate_score(&entries);
        assert_eq!(score.overall, 100);
        assert_eq!(score.total_decisions, 2);
        assert!(score.by_stage.is_empty());
    }

    #[test]
    fn test_single_misaligned() {
        let score = calculate_score(&[entry(0, Alignment::Misaligned, "Bought during Exit stage")]);
        assert_eq!(score.overall, 0);
        assert_eq!(score.misaligned_count, 1);
        assert_eq!(score.aligned_count, 0);
    }

    #[test]
    fn test_recency_weighting_is_asymmetric() {
        let improving = calculate_score(&[
            entry(0, Alignment::Misaligned, "Bought during Exit stage"),
            entry(1, Alignment::Aligned, "Bought in Extreme Fear"),
        ]);
        let slipping = calculate_score(&[
            entry(0, Alignment::Aligned, "Bought in Extreme Fear"),
            entry(1, Alignment::Misaligned, "Bought during Exit stage"),
        ]);

        // weights 0.5 and 1.0 -> 1.0/1.5 vs 0.5/1.5
        assert_eq!(improving.overall, 67);
        assert_eq!(slipping.overall, 33);
        assert!(improving.overall > slipping.overall);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let sorted = vec![
            entry(0, Alignment::Misaligned, "Bought during Exit stage"),
            entry(1, Alignment::Aligned, "Bought in Extreme Fear"),
            entry(2, Alignment::Aligned, "Sold in Extreme Greed"),
        ];
        let mut shuffled = sorted.clone();
        shuffled.swap(0, 2);

        assert_eq!(calculate_score(&sorted), calculate_score(&shuffled));
    }

    #[test]
    fn test_tied_reasons_resolve_to_oldest() {
        let history = vec![
            entry(0, Alignment::Misaligned, "Bought during Distribute stage"),
            entry(1, Alignment::Misaligned, "Bought during Exit stage"),
            entry(2, Alignment::Aligned, "Bought in Extreme Fear"),
        ];
        let mut reversed = history.clone();
        reversed.reverse();

        let score = calculate_score(&history);
        assert_eq!(
            score.top_misalignment_reason.as_deref(),
            Some("Bought during Distribute stage")
        );
        assert_eq!(score, calculate_score(&reversed));
    }

    #[test]
    fn test_neutral_entries_do_not_stretch_weights() {
        let dense = calculate_score(&[
            entry(0, Alignment::Misaligned, "Bought during Exit stage"),
            entry(1, Alignment::Aligned, "Bought in Extreme Fear"),
        ]);
        let sparse = calculate_score(&[
            entry(0, Alignment::Misaligned, "Bought during Exit stage"),
            entry(1, Alignment::Neutral, "No applicable rule matched"),
            entry(2, Alignment::Neutral, "No applicable rule matched"),
            entry(30, Alignment::Aligned, "Bought in Extreme Fear"),
        ]);
        assert_eq!(dense.overall, sparse.overall);
    }

    #[test]
    fn test_by_stage_without_zero_fill() {
        let entries = vec![
            entry_in(0, Alignment::Aligned, "a", PositionStage::Accumulate, Some(20.0)),
            entry_in(1, Alignment::Misaligned, "m", PositionStage::Accumulate, Some(50.0)),
            entry_in(2, Alignment::Aligned, "a", PositionStage::Accumulate, Some(50.0)),
            entry_in(3, Alignment::Misaligned, "m", PositionStage::Exit, Some(80.0)),
            entry_in(4, Alignment::Neutral, "n", PositionStage::Reduce, Some(50.0)),
        ];
        let score = calculate_score(&entries);

        assert_eq!(score.by_stage.get(&PositionStage::Accumulate), Some(&67));
        assert_eq!(score.by_stage.get(&PositionStage::Exit), Some(&0));
        assert!(!score.by_stage.contains_key(&PositionStage::Distribute));
        // Reduce only saw a neutral decision
        assert!(!score.by_stage.contains_key(&PositionStage::Reduce));
    }

    #[test]
    fn test_fear_greed_bands() {
        let entries = vec![
            entry_in(0, Alignment::Aligned, "a", PositionStage::Accumulate, Some(24.9)),
            entry_in(1, Alignment::Misaligned, "m", PositionStage::Accumulate, Some(25.0)),
            entry_in(2, Alignment::Aligned, "a", PositionStage::Accumulate, Some(75.0)),
            entry_in(3, Alignment::Misaligned, "m", PositionStage::Reduce, Some(75.1)),
            entry_in(4, Alignment::Aligned, "a", PositionStage::Reduce, None),
        ];
        let score = calculate_score(&entries);

        assert_eq!(
            score.by_fear_greed_zone,
            FearGreedZoneScores {
                fear: 100,
                greed: 0,
                neutral: 50
            }
        );
    }

    #[test]
    fn test_top_misalignment_reason() {
        let entries = vec![
            entry(0, Alignment::Misaligned, "Bought during Distribute stage"),
            entry(1, Alignment::Misaligned, "Bought during Exit stage"),
            entry(2, Alignment::Misaligned, "Bought during Exit stage"),
            entry(3, Alignment::Aligned, "Bought in Extreme Fear"),
            entry(4, Alignment::Aligned, "Bought in Extreme Fear"),
            entry(5, Alignment::Aligned, "Bought in Extreme Fear"),
        ];
        let score = calculate_score(&entries);
        assert_eq!(
            score.top_misalignment_reason.as_deref(),
            Some("Bought during Exit stage")
        );
    }

    #[test]
    fn test_top_misalignment_reason_tie_goes_to_first_seen() {
        let entries = vec![
            entry(0, Alignment::Misaligned, "Bought during Distribute stage"),
            entry(1, Alignment::Misaligned, "Bought during Exit stage"),
        ];
        let score = calculate_score(&entries);
        assert_eq!(
            score.top_misalignment_reason.as_deref(),
            Some("Bought during Distribute stage")
        );
    }

    #[test]
    fn test_counts() {
        let entries = vec![
            entry(0, Alignment::Aligned, "a"),
            entry(1, Alignment::Neutral, "n"),
            entry(2, Alignment::Misaligned, "m"),
            entry(3, Alignment::Aligned, "a"),
        ];
        let score = calculate_score(&entries);
        assert_eq!(score.total_decisions, 4);
        assert_eq!(score.aligned_count, 2);
        assert_eq!(score.misaligned_count, 1);
        // weights 1/3, 2/3, 3/3 over aligned, misaligned, aligned -> 4/6
        assert_eq!(score.overall, 67);
    }
}
