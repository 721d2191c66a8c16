//! Pillar health scoring
//!
//! - [`updater`]: the bounded, diminishing-returns update law for one pillar
//! - [`report`]: aggregates completion statistics and builds the score report
//! - [`pillar`], [`interpretation`]: the fixed pillar set, rating bands and text

pub mod interpretation;
pub mod pillar;
pub mod report;
pub mod updater;

pub use interpretation::interpretation;
pub use pillar::{Pillar, RatingBand, UnknownPillar};
pub use report::{
    build_report, tally_by_pillar, CompletionStatistic, PillarCompletionStats, PillarScore,
    PillarTally, PriorScores, RoutineCompletion, ScoreReport, DEFAULT_PRIOR_SCORE,
};
pub use updater::{update, ScoreUpdate};
