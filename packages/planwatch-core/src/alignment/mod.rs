//! Decision alignment module.
//!
//! Grades individual trading decisions against the plan and folds the graded
//! history into a recency-weighted adherence score.

mod oracle;
mod score;

pub use oracle::{matching_rule, score_alignment, AlignmentRule, AlignmentVerdict, ALIGNMENT_RULES};
pub use score::{calculate_score, FearGreedZoneScores, ScoreBreakdown};
