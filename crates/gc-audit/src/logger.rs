//! Audit logging backends.
//!
//! This module provides the [`AuditSink`] trait and default implementations.

use crate::events::{AuditEvent, Severity};

/// The audit port: a pluggable destination for [`AuditEvent`]s.
///
/// Implement this to wire in a real audit log (database, SIEM, message
/// queue). Callers never need to null-check — every collaborator that
/// needs an audit sink can default to [`NoopAuditSink`].
pub trait AuditSink: Send + Sync {
    /// Record an event.
    fn emit(&self, event: &AuditEvent);

    /// Record an event only if its severity is at or above `min_severity`.
    fn emit_if_severe(&self, event: &AuditEvent, min_severity: Severity) {
        if event.severity() >= min_severity {
            self.emit(event);
        }
    }
}

/// Audit sink that forwards every event to `tracing` as structured JSON.
///
/// Severity maps to tracing level: Info → `info!`, Medium → `warn!`,
/// High/Critical → `error!`. This is the sink `gc-server` wires by default,
/// standing in for the out-of-scope external audit log.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink {
    /// Optional prefix for all emitted log lines.
    prefix: Option<String>,
}

impl TracingAuditSink {
    /// Create a new tracing-backed sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that prefixes every log line.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: &AuditEvent) {
        let action = event.action();
        let severity = event.severity();
        let event_id = event.id();
        let json = event.to_json().unwrap_or_else(|_| "{}".to_string());
        let prefix = self.prefix.as_deref().unwrap_or("AUDIT");

        match severity {
            Severity::Info => {
                tracing::info!(target: "gc_audit", %event_id, %action, event_json = %json, "[{prefix}] {action}");
            }
            Severity::Medium => {
                tracing::warn!(target: "gc_audit", %event_id, %action, event_json = %json, "[{prefix}] {action}");
            }
            Severity::High | Severity::Critical => {
                tracing::error!(target: "gc_audit", %event_id, %action, event_json = %json, "[{prefix}] {action}");
            }
        }
    }
}

/// An audit sink that discards every event.
///
/// The default for services built without a configured audit backend —
/// tests, local development, collaborators that only need the type to
/// be `Send + Sync`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl NoopAuditSink {
    /// Create a new no-op sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: &AuditEvent) {}
}

/// A boxed sink for dynamic dispatch, as services hold `Arc<dyn AuditSink>`.
pub type BoxedAuditSink = Box<dyn AuditSink>;

impl AuditSink for BoxedAuditSink {
    fn emit(&self, event: &AuditEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AuditAction;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct CountingSink {
        count: AtomicUsize,
    }

    impl AuditSink for CountingSink {
        fn emit(&self, _event: &AuditEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_event() -> AuditEvent {
        AuditEvent::builder(AuditAction::NetworkJoin)
            .actor("user:1")
            .object("network:1")
            .build()
            .unwrap()
    }

    #[test]
    fn tracing_sink_does_not_panic() {
        let sink = TracingAuditSink::with_prefix("TEST");
        sink.emit(&sample_event());
    }

    #[test]
    fn noop_sink_discards() {
        let sink = NoopAuditSink::new();
        sink.emit(&sample_event());
    }

    #[test]
    fn counting_sink_tracks_calls() {
        let sink = CountingSink::default();
        sink.emit(&sample_event());
        sink.emit(&sample_event());
        assert_eq!(sink.count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn emit_if_severe_filters() {
        let sink = CountingSink::default();
        let info_event = sample_event();
        sink.emit_if_severe(&info_event, Severity::Medium);
        assert_eq!(sink.count.load(Ordering::SeqCst), 0);

        let critical_event = AuditEvent::builder(AuditAction::PeerProvisionFailed)
            .actor("system")
            .object("network:1")
            .build()
            .unwrap();
        sink.emit_if_severe(&critical_event, Severity::Medium);
        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sink_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TracingAuditSink>();
        assert_send_sync::<NoopAuditSink>();
    }

    #[test]
    fn sink_in_arc() {
        let sink: Arc<dyn AuditSink> = Arc::new(TracingAuditSink::new());
        sink.emit(&sample_event());
    }
}
