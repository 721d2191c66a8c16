//! Logging infrastructure
//!
//! Process logs go through `tracing`; processed events are additionally
//! recorded in the JSONL audit log.

pub mod audit;

pub use audit::{AuditEvent, AuditLogger, Outcome};
