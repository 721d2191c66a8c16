//! Action plan, routine and change-log documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rules::{AnswerValue, RoutineAttributes};
use crate::scoring::Pillar;

/// Catalog routine, owned by the content store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub routine_unique_id: String,
    pub name: String,
    pub pillar: Pillar,
    #[serde(default)]
    pub duration_in_mins: u32,
    /// Free-form attributes referenced by rule actions
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A routine as scheduled inside a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRoutine {
    pub routine_unique_id: String,
    pub name: String,
    pub pillar: Pillar,
    /// ISO weekdays, 1 = Monday
    #[serde(default)]
    pub schedule_days: Vec<u8>,
    #[serde(default)]
    pub duration_in_mins: u32,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl PlanRoutine {
    pub fn from_routine(routine: &Routine, schedule_days: Vec<u8>) -> Self {
        Self {
            routine_unique_id: routine.routine_unique_id.clone(),
            name: routine.name.clone(),
            pillar: routine.pillar,
            schedule_days,
            duration_in_mins: routine.duration_in_mins,
            attributes: routine.attributes.clone(),
        }
    }
}

fn lookup(
    field: &str,
    id: &str,
    name: &str,
    pillar: Pillar,
    duration: u32,
    attributes: &Map<String, Value>,
) -> Option<AnswerValue> {
    match field {
        "routineUniqueId" => Some(AnswerValue::Text(id.to_string())),
        "name" => Some(AnswerValue::Text(name.to_string())),
        "pillar" => Some(AnswerValue::Text(pillar.as_str().to_string())),
        "durationInMins" => Some(AnswerValue::Number(duration as f64)),
        _ => attributes.get(field).and_then(AnswerValue::from_json),
    }
}

impl RoutineAttributes for Routine {
    fn routine_id(&self) -> &str {
        &self.routine_unique_id
    }

    fn attribute(&self, field: &str) -> Option<AnswerValue> {
        lookup(
            field,
            &self.routine_unique_id,
            &self.name,
            self.pillar,
            self.duration_in_mins,
            &self.attributes,
        )
    }
}

impl RoutineAttributes for PlanRoutine {
    fn routine_id(&self) -> &str {
        &self.routine_unique_id
    }

    fn attribute(&self, field: &str) -> Option<AnswerValue> {
        lookup(
            field,
            &self.routine_unique_id,
            &self.name,
            self.pillar,
            self.duration_in_mins,
            &self.attributes,
        )
    }
}

/// A versioned bundle of scheduled routines for one account
///
/// Issued plans are never modified; renewal produces a successor that points
/// back through `previous_plan_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    pub plan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_plan_id: Option<String>,
    pub account_id: String,
    pub period_in_days: u32,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub total_daily_time_in_mins: u32,
    #[serde(default)]
    pub routines: Vec<PlanRoutine>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ActionPlan {
    pub fn routine(&self, routine_id: &str) -> Option<&PlanRoutine> {
        self.routines.iter().find(|r| r.routine_unique_id == routine_id)
    }

    pub fn routine_mut(&mut self, routine_id: &str) -> Option<&mut PlanRoutine> {
        self.routines
            .iter_mut()
            .find(|r| r.routine_unique_id == routine_id)
    }

    /// Sum of routine durations
    pub fn daily_minutes(&self) -> u32 {
        self.routines.iter().map(|r| r.duration_in_mins).sum()
    }
}

/// What a change-log entry targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeTarget {
    Routine,
    Plan,
    #[serde(other)]
    Other,
}

/// One property mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChange {
    pub changed_property: String,
    #[serde(default)]
    pub new_value: Value,
}

/// A client-recorded change to re-apply on renewal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    #[serde(default)]
    pub event_enum: String,
    pub change_target: ChangeTarget,
    pub target_id: String,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub event_details: Option<Value>,
    #[serde(default)]
    pub changes: Vec<PropertyChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_flattened_attributes() {
        let routine: Routine = serde_json::from_value(serde_json::json!({
            "routineUniqueId": "r-walk",
            "name": "Morning walk",
            "pillar": "MOVEMENT",
            "durationInMins": 20,
            "intensity": "low",
            "tags": ["outdoor", "cardio"]
        }))
        .unwrap();

        assert_eq!(routine.attribute("intensity"), Some(AnswerValue::Text("low".into())));
        assert_eq!(routine.attribute("pillar"), Some(AnswerValue::Text("MOVEMENT".into())));
        assert_eq!(
            routine.attribute("tags"),
            Some(AnswerValue::List(vec!["outdoor".into(), "cardio".into()]))
        );
        assert_eq!(routine.attribute("missing"), None);
    }

    #[test]
    fn test_change_log_entry_shape() {
        let entry: ChangeLogEntry = serde_json::from_value(serde_json::json!({
            "eventEnum": "ROUTINE_UPDATED",
            "changeTarget": "ROUTINE",
            "targetId": "r-walk",
            "eventDate": "2026-10-01T08:00:00Z",
            "eventDetails": {"source": "app"},
            "changes": [{"changedProperty": "SCHEDULE_DAYS", "newValue": "[1,3,5]"}]
        }))
        .unwrap();
        assert_eq!(entry.change_target, ChangeTarget::Routine);
        assert_eq!(entry.changes.len(), 1);

        let other: ChangeLogEntry = serde_json::from_value(serde_json::json!({
            "changeTarget": "REMINDER",
            "targetId": "x"
        }))
        .unwrap();
        assert_eq!(other.change_target, ChangeTarget::Other);
    }
}
