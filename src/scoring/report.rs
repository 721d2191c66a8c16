//! Score report construction
//!
//! Folds a period's completion statistics into the seven pillar scores and
//! builds the externally visible report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::interpretation::interpretation;
use super::pillar::{Pillar, RatingBand};
use super::updater::{self, ScoreUpdate};

/// Prior used for a pillar with no stored score
pub const DEFAULT_PRIOR_SCORE: f64 = 0.0;

/// Completions recorded for one period of a routine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatistic {
    pub completed_count: u32,
    #[serde(default)]
    pub period_unit: String,
    #[serde(default)]
    pub period_sequence_number: u32,
}

/// One routine's completions for the scoring period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineCompletion {
    pub routine_unique_id: String,
    #[serde(default)]
    pub scheduled_count: u32,
    #[serde(default)]
    pub completion_statistics: Vec<CompletionStatistic>,
}

impl RoutineCompletion {
    pub fn completed(&self) -> u32 {
        self.completion_statistics
            .iter()
            .fold(0u32, |acc, s| acc.saturating_add(s.completed_count))
    }
}

/// Completion statistics for all routines of one pillar
///
/// The pillar stays a string on the wire so unknown pillars can be dropped
/// instead of failing the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PillarCompletionStats {
    pub pillar: String,
    #[serde(default)]
    pub routines: Vec<RoutineCompletion>,
}

/// Aggregated `(completed, scheduled)` counts for one pillar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PillarTally {
    pub completed: u32,
    pub scheduled: u32,
}

/// Sum completions per known pillar; unknown pillars are dropped
pub fn tally_by_pillar(stats: &[PillarCompletionStats]) -> HashMap<Pillar, PillarTally> {
    let mut tallies: HashMap<Pillar, PillarTally> = HashMap::new();

    for entry in stats {
        let Ok(pillar) = entry.pillar.parse::<Pillar>() else {
            debug!(pillar = %entry.pillar, "Dropping stats for unknown pillar");
            continue;
        };
        let tally = tallies.entry(pillar).or_default();
        for routine in &entry.routines {
            tally.completed = tally.completed.saturating_add(routine.completed());
            tally.scheduled = tally.scheduled.saturating_add(routine.scheduled_count);
        }
    }

    tallies
}

/// Prior scores keyed by pillar, with unknown keys already dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorScores(BTreeMap<Pillar, f64>);

impl PriorScores {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build from store-shaped keys, dropping anything that is not a pillar
    pub fn from_raw(raw: &BTreeMap<String, f64>) -> Self {
        Self(
            raw.iter()
                .filter_map(|(key, score)| key.parse::<Pillar>().ok().map(|p| (p, *score)))
                .collect(),
        )
    }

    pub fn get(&self, pillar: Pillar) -> f64 {
        self.0.get(&pillar).copied().unwrap_or(DEFAULT_PRIOR_SCORE)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn two_decimals<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.2}", value))
}

/// One pillar's result for a scoring pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PillarScore {
    pub pillar: Pillar,
    #[serde(serialize_with = "two_decimals")]
    pub score: f64,
    #[serde(serialize_with = "two_decimals")]
    pub delta: f64,
    pub rating_band: RatingBand,
    pub interpretation_text: &'static str,
}

impl PillarScore {
    fn from_update(pillar: Pillar, update: ScoreUpdate) -> Self {
        let rating_band = RatingBand::from_score(update.new_score);
        Self {
            pillar,
            score: update.new_score,
            delta: update.delta,
            rating_band,
            interpretation_text: interpretation(pillar, rating_band),
        }
    }
}

/// Score report returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub account_id: String,
    /// Floor of the mean pillar score
    pub total_score: u32,
    /// Exactly one entry per pillar, in canonical order
    pub pillar_scores: Vec<PillarScore>,
    pub generated_at: DateTime<Utc>,
}

impl ScoreReport {
    /// New scores keyed by pillar name, as persisted
    pub fn score_map(&self) -> BTreeMap<String, f64> {
        self.pillar_scores
            .iter()
            .map(|p| (p.pillar.as_str().to_string(), p.score))
            .collect()
    }

    pub fn pillar(&self, pillar: Pillar) -> Option<&PillarScore> {
        self.pillar_scores.iter().find(|p| p.pillar == pillar)
    }
}

/// Run every pillar through the update law and assemble the report
pub fn build_report(
    account_id: &str,
    priors: &PriorScores,
    stats: &[PillarCompletionStats],
) -> ScoreReport {
    let tallies = tally_by_pillar(stats);

    let pillar_scores: Vec<PillarScore> = Pillar::ALL
        .into_iter()
        .map(|pillar| {
            let tally = tallies.get(&pillar).copied().unwrap_or_default();
            let update = updater::update(priors.get(pillar), tally.completed, tally.scheduled);
            PillarScore::from_update(pillar, update)
        })
        .collect();

    let mean = pillar_scores.iter().map(|p| p.score).sum::<f64>() / pillar_scores.len() as f64;

    ScoreReport {
        account_id: account_id.to_string(),
        total_score: mean.floor() as u32,
        pillar_scores,
        generated_at: Utc::now(),
    }
}
