//! Audit events.
//!
//! Each committed state change produces one [`AuditEvent`]. Delivery is up to
//! the [`AuditSink`] the caller wires in.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    /// Draft created.
    InvoiceCreated,
    /// Draft updated.
    InvoiceUpdated,
    /// Links minted and status SENT.
    InvoiceSent,
    /// Client signed.
    InvoiceSigned,
    /// New revision drafted.
    InvoiceRevised,
    /// Invoice voided.
    InvoiceVoided,
    /// Payment recorded.
    PaymentCreated,
    /// Reversal recorded.
    PaymentReversal,
}

impl AuditEventType {
    /// Returns the stored event tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvoiceCreated => "INVOICE_CREATED",
            Self::InvoiceUpdated => "INVOICE_UPDATED",
            Self::InvoiceSent => "INVOICE_SENT",
            Self::InvoiceSigned => "INVOICE_SIGNED",
            Self::InvoiceRevised => "INVOICE_REVISED",
            Self::InvoiceVoided => "INVOICE_VOIDED",
            Self::PaymentCreated => "PAYMENT_CREATED",
            Self::PaymentReversal => "PAYMENT_REVERSAL",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    /// Tenant.
    pub business_id: Uuid,
    /// Acting user; `None` for public token actions.
    pub actor_user_id: Option<Uuid>,
    /// `"Invoice"` or `"Payment"`.
    pub entity_type: &'static str,
    /// Entity id.
    pub entity_id: Uuid,
    /// Event tag.
    pub event_type: AuditEventType,
    /// Free-form details.
    pub metadata: serde_json::Value,
    /// When the change committed.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Event about an invoice.
    #[must_use]
    pub fn invoice(
        business_id: Uuid,
        actor_user_id: Option<Uuid>,
        invoice_id: Uuid,
        event_type: AuditEventType,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            business_id,
            actor_user_id,
            entity_type: "Invoice",
            entity_id: invoice_id,
            event_type,
            metadata,
            occurred_at: Utc::now(),
        }
    }

    /// Event about a payment line.
    #[must_use]
    pub fn payment(
        business_id: Uuid,
        actor_user_id: Option<Uuid>,
        payment_id: Uuid,
        event_type: AuditEventType,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            business_id,
            actor_user_id,
            entity_type: "Payment",
            entity_id: payment_id,
            event_type,
            metadata,
            occurred_at: Utc::now(),
        }
    }
}

/// Receives audit events after commit.
pub trait AuditSink: Send + Sync {
    /// Records one event. Must not fail the calling operation.
    fn record(&self, event: AuditEvent);
}

/// Sink that keeps events in memory.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the recorded event types in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<AuditEventType> {
        self.events().iter().map(|e| e.event_type).collect()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingAuditSink::new();
        let business_id = Uuid::new_v4();
        let invoice_id = Uuid::new_v4();

        sink.record(AuditEvent::invoice(
            business_id,
            None,
            invoice_id,
            AuditEventType::InvoiceCreated,
            json!({}),
        ));
        sink.record(AuditEvent::payment(
            business_id,
            Some(Uuid::new_v4()),
            Uuid::new_v4(),
            AuditEventType::PaymentCreated,
            json!({ "invoiceId": invoice_id }),
        ));

        assert_eq!(
            sink.event_types(),
            vec![AuditEventType::InvoiceCreated, AuditEventType::PaymentCreated]
        );
        assert_eq!(sink.events()[1].entity_type, "Payment");
    }

    #[test]
    fn test_event_type_tags() {
        assert_eq!(AuditEventType::PaymentReversal.as_str(), "PAYMENT_REVERSAL");
        assert_eq!(
            serde_json::to_string(&AuditEventType::InvoiceSigned).unwrap(),
            "\"INVOICE_SIGNED\""
        );
    }
}
