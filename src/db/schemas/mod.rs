//! Database schemas
//!
//! MongoDB document structures for action plans, pillar scores and the
//! routine catalog.

mod metadata;
mod plan;
mod routine;
mod score;

pub use metadata::Metadata;
pub use plan::{PlanDoc, PLAN_COLLECTION};
pub use routine::{RoutineDoc, ROUTINE_COLLECTION};
pub use score::{ScoreDoc, SCORE_COLLECTION};
