//! Event audit log
//!
//! One JSONL line per processed event, written to `AUDIT_LOG_PATH` when set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// How an event ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Processed and answered with 200
    Succeeded,
    /// Refused before or during processing (4xx)
    Rejected,
    /// A collaborator or the service itself failed (5xx)
    Failed,
}

impl Outcome {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Outcome::Succeeded,
            400..=499 => Outcome::Rejected,
            _ => Outcome::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    /// Node that handled the request
    pub node_id: String,
    /// `eventEnum` as received; absent when the body never parsed
    pub event: Option<String>,
    pub outcome: Outcome,
    pub status: u16,
    pub account_id: Option<String>,
    pub plan_id: Option<String>,
    /// Error kind for non-200 outcomes
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl AuditEvent {
    pub fn new(node_id: String, status: u16) -> Self {
        Self {
            timestamp: Utc::now(),
            node_id,
            event: None,
            outcome: Outcome::from_status(status),
            status,
            account_id: None,
            plan_id: None,
            error: None,
            duration_ms: None,
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_plan(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    pub fn with_error(mut self, kind: impl Into<String>) -> Self {
        self.error = Some(kind.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit logger; a no-op until [`AuditLogger::init_file`] succeeds
#[derive(Clone)]
pub struct AuditLogger {
    inner: Arc<Mutex<AuditLoggerInner>>,
    node_id: String,
}

struct AuditLoggerInner {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl AuditLogger {
    pub fn new(node_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuditLoggerInner {
                writer: None,
                path: None,
            })),
            node_id,
        }
    }

    /// Append to the file at `path`, creating it if needed
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut inner = self.inner.lock().await;
        inner.writer = Some(BufWriter::new(file));
        inner.path = Some(path.clone());

        info!("Audit logging initialized to {}", path.display());
        Ok(())
    }

    pub async fn log(&self, event: AuditEvent) {
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write audit event: {}", e);
            }
            if let Err(e) = writer.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        }
    }

    /// Start an event stamped with this node
    pub fn event(&self, status: u16) -> AuditEvent {
        AuditEvent::new(self.node_id.clone(), status)
    }

    /// File the log appends to, once initialized
    pub async fn path(&self) -> Option<PathBuf> {
        self.inner.lock().await.path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::new("node-1".to_string(), 404)
            .with_event("ACTION_PLAN_RENEW")
            .with_account("acct-1")
            .with_error("NotFoundError");

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("\"outcome\":\"rejected\""));
        assert!(jsonl.contains("ACTION_PLAN_RENEW"));
        assert!(jsonl.contains("NotFoundError"));
    }

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(Outcome::from_status(200), Outcome::Succeeded);
        assert_eq!(Outcome::from_status(400), Outcome::Rejected);
        assert_eq!(Outcome::from_status(502), Outcome::Failed);
    }

    #[tokio::test]
    async fn test_appends_lines() {
        let path = std::env::temp_dir().join(format!("trellis-audit-{}.jsonl", uuid::Uuid::new_v4()));
        let logger = AuditLogger::new("node-1".to_string());
        logger.init_file(path.clone()).await.unwrap();

        logger.log(logger.event(200).with_event("ACTION_PLAN_CREATE")).await;
        logger.log(logger.event(400)).await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: AuditEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.outcome, Outcome::Succeeded);
        assert_eq!(first.node_id, "node-1");

        let _ = std::fs::remove_file(path);
    }
}
