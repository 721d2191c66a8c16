//! Action plan renewal
//!
//! A renewal never touches the previous plan. It copies it under a new
//! identity and re-applies the change-log entries that still resolve to a
//! routine in the plan and carry a valid value.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::{ActionPlan, ChangeLogEntry, ChangeTarget, PlanRoutine, PropertyChange};
use super::schedule::parse_schedule_days;

pub const SCHEDULE_DAYS: &str = "SCHEDULE_DAYS";
pub const DURATION_IN_MINS: &str = "DURATION_IN_MINS";

/// Derive the successor of `previous` with the change log applied
pub fn renew(previous: &ActionPlan, change_log: &[ChangeLogEntry]) -> ActionPlan {
    let mut plan = ActionPlan {
        plan_id: Uuid::new_v4().to_string(),
        previous_plan_id: Some(previous.plan_id.clone()),
        account_id: previous.account_id.clone(),
        period_in_days: previous.period_in_days,
        gender: previous.gender.to_uppercase(),
        total_daily_time_in_mins: previous.total_daily_time_in_mins,
        routines: previous.routines.clone(),
        created_at: Utc::now(),
    };

    let mut applied = 0usize;
    let mut durations_changed = false;

    for entry in change_log {
        if entry.change_target != ChangeTarget::Routine {
            debug!(target_id = %entry.target_id, "Ignoring non-routine change");
            continue;
        }

        let Some(routine) = plan.routine_mut(&entry.target_id) else {
            debug!(target_id = %entry.target_id, "Change targets a routine not in the plan");
            continue;
        };

        for change in &entry.changes {
            match apply_change(routine, change) {
                Ok(Applied::Schedule) => applied += 1,
                Ok(Applied::Duration) => {
                    applied += 1;
                    durations_changed = true;
                }
                Err(reason) => warn!(
                    target_id = %entry.target_id,
                    property = %change.changed_property,
                    reason = %reason,
                    "Skipping change"
                ),
            }
        }
    }

    if durations_changed {
        plan.total_daily_time_in_mins = plan.daily_minutes();
    }

    info!(
        plan_id = %plan.plan_id,
        previous_plan_id = %previous.plan_id,
        changes_applied = applied,
        "Action plan renewed"
    );

    plan
}

enum Applied {
    Schedule,
    Duration,
}

fn apply_change(routine: &mut PlanRoutine, change: &PropertyChange) -> Result<Applied, String> {
    match change.changed_property.as_str() {
        SCHEDULE_DAYS => {
            let days = parse_schedule_days(&change.new_value).map_err(|e| e.to_string())?;
            routine.schedule_days = days;
            Ok(Applied::Schedule)
        }
        DURATION_IN_MINS => {
            routine.duration_in_mins = parse_minutes(&change.new_value)?;
            Ok(Applied::Duration)
        }
        other => Err(format!("unsupported property '{}'", other)),
    }
}

fn parse_minutes(value: &Value) -> Result<u32, String> {
    let minutes = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match minutes {
        Some(m) if m > 0 && m <= u32::MAX as u64 => Ok(m as u32),
        _ => Err(format!("invalid duration {}", value)),
    }
}
