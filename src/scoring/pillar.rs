//! Health pillars and rating bands

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the seven scored health dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pillar {
    Movement,
    Nutrition,
    Sleep,
    SocialEngagement,
    Stress,
    Gratitude,
    CognitiveEnhancement,
}

impl Pillar {
    /// Canonical report order
    pub const ALL: [Pillar; 7] = [
        Pillar::Movement,
        Pillar::Nutrition,
        Pillar::Sleep,
        Pillar::SocialEngagement,
        Pillar::Stress,
        Pillar::Gratitude,
        Pillar::CognitiveEnhancement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pillar::Movement => "MOVEMENT",
            Pillar::Nutrition => "NUTRITION",
            Pillar::Sleep => "SLEEP",
            Pillar::SocialEngagement => "SOCIAL_ENGAGEMENT",
            Pillar::Stress => "STRESS",
            Pillar::Gratitude => "GRATITUDE",
            Pillar::CognitiveEnhancement => "COGNITIVE_ENHANCEMENT",
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown pillar name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pillar '{0}'")]
pub struct UnknownPillar(pub String);

impl FromStr for Pillar {
    type Err = UnknownPillar;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pillar::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPillar(s.to_string()))
    }
}

/// Coarse classification of a pillar score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingBand {
    NeedsAction,
    Improvable,
    Optimal,
}

impl RatingBand {
    pub const IMPROVABLE_FLOOR: f64 = 40.0;
    pub const OPTIMAL_FLOOR: f64 = 64.0;

    /// Band for a score; lower boundaries are inclusive
    pub fn from_score(score: f64) -> Self {
        if score >= Self::OPTIMAL_FLOOR {
            RatingBand::Optimal
        } else if score >= Self::IMPROVABLE_FLOOR {
            RatingBand::Improvable
        } else {
            RatingBand::NeedsAction
        }
    }
}
