//! Port for structured audit logging.
//!
//! Defines the [`AuditLogger`] trait for recording pipeline events (deltas
//! built, quorum reached, envelopes submitted, commits and rejections) to a
//! structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures a
//! machine-readable record of every configuration change (JSONL).

use serde_json::Value;

/// A structured pipeline event for logging.
pub struct AuditEvent {
    /// Event type identifier (e.g., "delta_built", "update_committed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl AuditEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging audit events.
///
/// The `log` method is synchronous and non-fallible; logging failures never
/// interrupt an update.
pub trait AuditLogger: Send + Sync {
    /// Record an audit event.
    fn log(&self, event: AuditEvent);
}

/// No-op implementation for tests and when audit logging is disabled.
pub struct NoAuditLogger;

impl AuditLogger for NoAuditLogger {
    fn log(&self, _event: AuditEvent) {}
}
