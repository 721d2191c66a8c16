//! Pillar score update law
//!
//! Completions push a score up with diminishing returns as it nears 100;
//! missed sessions pull it down at a third of that rate.

/// Exponential decay constant of the completion response
pub const DECAY_K: f64 = 0.025;

/// Maximum movement per pass before dampening
const STEP: f64 = 10.0;

/// Dampening divisor: a score of 10 moves at the full step
const DAMPENING_SPAN: f64 = 90.0;

/// Missed sessions weigh this much less than completions
const MISS_DIVISOR: f64 = 3.0;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Outcome of one pillar update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreUpdate {
    /// Clamped to `[0, 100]`
    pub new_score: f64,
    /// Raw movement before clamping
    pub delta: f64,
}

/// Compute a pillar's new score from its prior and the period's completions
pub fn update(prior_score: f64, completed: u32, scheduled: u32) -> ScoreUpdate {
    let prior = if prior_score.is_finite() {
        prior_score.clamp(MIN_SCORE, MAX_SCORE)
    } else {
        MIN_SCORE
    };

    let not_completed = scheduled.saturating_sub(completed);
    let dampening = (MAX_SCORE - prior) / DAMPENING_SPAN;

    let delta_pos = STEP * dampening * (1.0 - (-DECAY_K * completed as f64).exp());
    let delta_neg = STEP * dampening * (1.0 - (-DECAY_K * not_completed as f64).exp());
    let delta = delta_pos - delta_neg / MISS_DIVISOR;

    ScoreUpdate {
        new_score: (prior + delta).clamp(MIN_SCORE, MAX_SCORE),
        delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_four_of_five() {
        let result = update(50.0, 4, 5);

        let dampening: f64 = 50.0 / 90.0;
        let pos = 10.0 * dampening * (1.0 - (-0.1f64).exp());
        let neg = 10.0 * dampening * (1.0 - (-0.025f64).exp());
        assert!((result.delta - (pos - neg / 3.0)).abs() < 1e-12);
        assert!((pos - 0.5287).abs() < 1e-3);
        assert!(result.new_score > 50.0);
    }

    #[test]
    fn test_no_evidence_is_identity() {
        for s in [0.0, 12.5, 50.0, 99.99, 100.0] {
            assert_eq!(update(s, 0, 0), ScoreUpdate { new_score: s, delta: 0.0 });
        }
    }

    #[test]
    fn test_misses_only_lower_score() {
        let result = update(70.0, 0, 10);
        assert!(result.delta < 0.0);
        assert!(result.new_score < 70.0);
    }

    #[test]
    fn test_ceiling_has_no_movement() {
        let result = update(100.0, 20, 20);
        assert_eq!(result.new_score, 100.0);
        assert_eq!(result.delta, 0.0);
    }

    #[test]
    fn test_completed_above_scheduled_counts_no_misses() {
        assert_eq!(update(40.0, 8, 5), update(40.0, 8, 8));
    }

    #[test]
    fn test_out_of_range_prior_is_clamped() {
        assert_eq!(update(140.0, 0, 0).new_score, 100.0);
        assert_eq!(update(f64::NAN, 0, 0).new_score, 0.0);
    }

    proptest! {
        #[test]
        fn prop_score_stays_bounded(prior in 0.0f64..=100.0, completed in 0u32..500, extra in 0u32..500) {
            let result = update(prior, completed, completed + extra);
            prop_assert!(result.new_score >= 0.0 && result.new_score <= 100.0);
        }

        #[test]
        fn prop_no_misses_never_lowers(prior in 0.0f64..=100.0, completed in 1u32..500) {
            let result = update(prior, completed, completed);
            prop_assert!(result.new_score >= prior);
        }

        #[test]
        fn prop_dampening_shrinks_delta(low in 0.0f64..99.0, gap in 0.5f64..50.0, completed in 1u32..200) {
            let high = (low + gap).min(100.0);
            prop_assume!(high > low);
            let near_floor = update(low, completed, completed);
            let near_ceiling = update(high, completed, completed);
            prop_assert!(near_ceiling.delta < near_floor.delta);
        }
    }
}
