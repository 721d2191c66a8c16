//! Interpretation text per pillar and rating band
//!
//! The table is a single exhaustive match so a new pillar or band does not
//! compile until every combination has text.

use super::pillar::{Pillar, RatingBand};

pub fn interpretation(pillar: Pillar, band: RatingBand) -> &'static str {
    use Pillar::*;
    use RatingBand::*;

    match (pillar, band) {
        (Movement, NeedsAction) => {
            "Your activity level is low. Short daily walks or light stretching are a good place to start building momentum."
        }
        (Movement, Improvable) => {
            "You move regularly but not consistently. Adding one or two scheduled sessions a week will lift this score."
        }
        (Movement, Optimal) => {
            "You are staying active on a steady schedule. Keep varying intensity to maintain the habit."
        }
        (Nutrition, NeedsAction) => {
            "Your eating pattern needs attention. Focus first on adding vegetables and water to each meal."
        }
        (Nutrition, Improvable) => {
            "Your nutrition is on the right track. Planning meals ahead can help close the remaining gaps."
        }
        (Nutrition, Optimal) => {
            "You are fuelling your body well. Keep up the balanced, regular meals."
        }
        (Sleep, NeedsAction) => {
            "Your sleep is falling short. A fixed bedtime and a screen-free wind-down are the first routines to try."
        }
        (Sleep, Improvable) => {
            "Your sleep is improving. Protecting a consistent wake time will make rest more reliable."
        }
        (Sleep, Optimal) => {
            "You are getting restorative sleep. Maintain your current evening routine."
        }
        (SocialEngagement, NeedsAction) => {
            "You have had few social connections lately. Reaching out to one person this week is a meaningful step."
        }
        (SocialEngagement, Improvable) => {
            "You stay in touch with others some of the time. Scheduling regular check-ins can deepen those ties."
        }
        (SocialEngagement, Optimal) => {
            "You are well connected with the people around you. Keep nurturing those relationships."
        }
        (Stress, NeedsAction) => {
            "Stress is taking a toll. Brief breathing exercises during the day can provide quick relief."
        }
        (Stress, Improvable) => {
            "You are managing stress reasonably well. A regular relaxation practice will build more resilience."
        }
        (Stress, Optimal) => {
            "You handle stress effectively. Continue the practices that keep you balanced."
        }
        (Gratitude, NeedsAction) => {
            "Gratitude has not been part of your routine yet. Writing down one good thing each day is an easy start."
        }
        (Gratitude, Improvable) => {
            "You reflect on the positives some days. Making it a daily habit strengthens the benefit."
        }
        (Gratitude, Optimal) => {
            "Gratitude is a steady part of your day. Keep sharing appreciation with others."
        }
        (CognitiveEnhancement, NeedsAction) => {
            "Your mind could use more stimulation. Puzzles, reading or learning something new are good starting routines."
        }
        (CognitiveEnhancement, Improvable) => {
            "You challenge your mind from time to time. More regular brain-training sessions will sharpen focus."
        }
        (CognitiveEnhancement, Optimal) => {
            "You keep your mind active and engaged. Keep exploring new skills and challenges."
        }
    }
}
