//! Event webhook (POST /events, POST /webhook)
//!
//! Request body: `{"eventEnum": "...", "eventPayload": <string|object>}`.
//! Success is 200 with the orchestrator's response; failures carry
//! `{"error": <kind>, "message": <text>}` with the status mapped from
//! [`TrellisError::status_code`].

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::json_response;
use crate::logging::AuditEvent;
use crate::orchestrator::{parse_event, EventResponse, InboundEvent};
use crate::server::AppState;
use crate::types::TrellisError;

/// Largest accepted event body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub async fn handle_event(state: Arc<AppState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let started = Instant::now();

    let body = match read_body(req.into_body()).await {
        Ok(body) => body,
        Err(err) => return finish(&state, None, Err(err), started).await,
    };

    process(&state, &body, started).await
}

/// Collect a request body, stopping as soon as it passes [`MAX_BODY_BYTES`]
pub async fn read_body<B>(body: B) -> Result<Bytes, TrellisError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(TrellisError::validation(
            format!("Event body exceeds {} bytes", MAX_BODY_BYTES),
        )),
        Err(e) => Err(TrellisError::validation(format!(
            "Failed to read request body: {}",
            e
        ))),
    }
}

/// Validate and dispatch one event body
pub async fn process(state: &AppState, body: &[u8], started: Instant) -> Response<Full<Bytes>> {
    let event = match parse_event(body) {
        Ok(event) => event,
        Err(e) => return finish(state, None, Err(e), started).await,
    };

    let result = state.orchestrator.dispatch(&event).await;
    finish(state, Some(&event), result, started).await
}

async fn finish(
    state: &AppState,
    event: Option<&InboundEvent>,
    result: Result<EventResponse, TrellisError>,
    started: Instant,
) -> Response<Full<Bytes>> {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let event_name = event.map(|e| e.kind.as_str());

    let (response, audit) = match result.and_then(|r| serialize(&r).map(|body| (r, body))) {
        Ok((outcome, body)) => {
            let (account_id, plan_id) = response_ids(&outcome);
            info!(
                event = event_name.unwrap_or("-"),
                account_id = %account_id,
                duration_ms = elapsed_ms,
                "Event processed"
            );

            let mut audit = state.audit.event(200).with_account(account_id);
            if let Some(plan_id) = plan_id {
                audit = audit.with_plan(plan_id);
            }
            (json_response(StatusCode::OK, body), audit)
        }
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                error!(event = event_name.unwrap_or("-"), error = %err, "Event failed");
            } else {
                warn!(event = event_name.unwrap_or("-"), error = %err, "Event rejected");
            }

            let mut audit = state.audit.event(status.as_u16()).with_error(err.kind());
            if let Some(account_id) = event.and_then(payload_account) {
                audit = audit.with_account(account_id);
            }
            (error_response(&err), audit)
        }
    };

    let mut audit: AuditEvent = audit.with_duration(elapsed_ms);
    if let Some(name) = event_name {
        audit = audit.with_event(name);
    }
    state.audit.log(audit).await;

    response
}

fn serialize(response: &EventResponse) -> Result<String, TrellisError> {
    serde_json::to_string(response)
        .map_err(|e| TrellisError::Internal(format!("Failed to serialize response: {}", e)))
}

/// Account and plan a successful response refers to
fn response_ids(response: &EventResponse) -> (String, Option<String>) {
    match response {
        EventResponse::Created(created) => (
            created.plan.account_id.clone(),
            Some(created.plan.plan_id.clone()),
        ),
        EventResponse::Recalculated(recalc) => (recalc.score_report.account_id.clone(), None),
        EventResponse::Renewed(renewed) => (
            renewed.plan.account_id.clone(),
            Some(renewed.plan.plan_id.clone()),
        ),
    }
}

fn payload_account(event: &InboundEvent) -> Option<String> {
    event
        .payload
        .get("accountId")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Error body for a failed event
pub fn error_response(err: &TrellisError) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": err.kind(),
        "message": err.to_string(),
    });
    json_response(err.status_code(), body.to_string())
}
