//! Audit sink that writes events to the tracing pipeline.

use tracing::info;

use receipta_core::audit::{AuditEvent, AuditSink};

/// Emits one structured `info!` line per audit event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            target: "receipta::audit",
            event_type = %event.event_type,
            entity_type = event.entity_type,
            entity_id = %event.entity_id,
            business_id = %event.business_id,
            actor_user_id = ?event.actor_user_id,
            metadata = %event.metadata,
            occurred_at = %event.occurred_at,
            "audit event"
        );
    }
}
