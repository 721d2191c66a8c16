//! Inbound event envelope and payloads
//!
//! ```text
//! Event         := { eventEnum: string, eventPayload: string|object }
//! CreatePayload := { accountId, surveyResponseId?, answers?, gender?, periodInDays? }
//! RecalcPayload := { actionPlanUniqueId, accountId, pillarCompletionStats: [...], answers? }
//! RenewPayload  := { actionPlanUniqueId, accountId, changeLog: [ChangeLogEntry] }
//! ```
//!
//! Parsing fails closed: anything malformed is a validation error before any
//! collaborator is touched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::plan::ChangeLogEntry;
use crate::rules::AnswerRecord;
use crate::scoring::PillarCompletionStats;
use crate::types::{Result, TrellisError};

/// Recognised event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// No plan yet: build one from survey answers
    Create,
    /// Completion stats arrived: rescore the plan's account
    Recalculate,
    /// Period ended: issue the successor plan
    Renew,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "ACTION_PLAN_CREATE",
            EventKind::Recalculate => "ACTION_PLAN_RECALCULATE",
            EventKind::Renew => "ACTION_PLAN_RENEW",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "ACTION_PLAN_CREATE" | "SURVEY_COMPLETED" => Ok(EventKind::Create),
            "ACTION_PLAN_RECALCULATE" | "COMPLETION_STATS" => Ok(EventKind::Recalculate),
            "ACTION_PLAN_RENEW" => Ok(EventKind::Renew),
            other => Err(TrellisError::validation(format!("Unknown event type: {}", other))),
        }
    }
}

/// A validated envelope, payload not yet decoded
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub payload: Value,
}

impl InboundEvent {
    /// Decode the payload into the shape for this event
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| TrellisError::validation(format!("Invalid eventPayload: {}", e)))
    }
}

/// Validate the raw request body into an [`InboundEvent`]
pub fn parse_event(body: &[u8]) -> Result<InboundEvent> {
    let envelope: Value = serde_json::from_slice(body)
        .map_err(|e| TrellisError::validation(format!("Malformed JSON payload: {}", e)))?;

    let Value::Object(mut envelope) = envelope else {
        return Err(TrellisError::validation("Event must be a JSON object"));
    };

    let kind = match envelope.get("eventEnum") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.parse::<EventKind>()?,
        Some(_) => return Err(TrellisError::validation("eventEnum must be a string")),
        None => return Err(TrellisError::validation("Missing eventEnum")),
    };

    let payload = match envelope.remove("eventPayload") {
        Some(Value::String(encoded)) => serde_json::from_str::<Value>(&encoded).map_err(|e| {
            TrellisError::validation(format!("Malformed JSON payload: {}", e))
        })?,
        Some(value) => value,
        None => return Err(TrellisError::validation("Missing eventPayload")),
    };

    if !payload.is_object() {
        return Err(TrellisError::validation("eventPayload must be a JSON object"));
    }

    Ok(InboundEvent { kind, payload })
}

/// Required, non-blank string field
pub fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TrellisError::validation(format!("Missing {}", name))),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayload {
    pub account_id: Option<String>,
    pub survey_response_id: Option<String>,
    pub answers: Option<AnswerRecord>,
    pub gender: Option<String>,
    pub period_in_days: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcPayload {
    pub action_plan_unique_id: Option<String>,
    pub account_id: Option<String>,
    #[serde(default)]
    pub pillar_completion_stats: Vec<PillarCompletionStats>,
    #[serde(default)]
    pub answers: AnswerRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewPayload {
    pub action_plan_unique_id: Option<String>,
    pub account_id: Option<String>,
    #[serde(default)]
    pub change_log: Vec<ChangeLogEntry>,
}
