//! Action plans and their renewal

pub mod model;
pub mod renewal;
pub mod schedule;

pub use model::{ActionPlan, ChangeLogEntry, ChangeTarget, PlanRoutine, PropertyChange, Routine};
pub use renewal::renew;
pub use schedule::{parse_schedule_days, ScheduleError};
