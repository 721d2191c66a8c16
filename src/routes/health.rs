//! Health check endpoints
//!
//! - /health, /healthz: liveness probe, 200 whenever the process is serving
//! - /version: build info for deployment verification

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::json_response;
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    /// 'online' or 'maintenance'
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since the server started
    pub uptime: u64,
    pub timestamp: String,
    /// 'development' or 'production'
    pub mode: &'static str,
    pub node_id: String,
    /// Plan store backend ('mongodb' or 'memory')
    pub store: &'static str,
    /// Number of loaded matching rules
    pub rules: usize,
    /// Audit log file, when one is configured
    pub audit_log: Option<String>,
}

async fn build_health_response(state: &AppState) -> HealthResponse {
    let rules = state.orchestrator.rules().len();
    let audit_log = state.audit.path().await.map(|p| p.display().to_string());

    HealthResponse {
        healthy: true,
        // An empty rule set still serves, but can never recommend anything
        status: if rules == 0 { "maintenance" } else { "online" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        node_id: state.args.node_id.to_string(),
        store: state.store_backend,
        rules,
        audit_log,
    }
}

/// Handle liveness probe (/health, /healthz)
pub async fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state).await;

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());

    json_response(StatusCode::OK, body)
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle /version
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "trellis",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    json_response(StatusCode::OK, body)
}
