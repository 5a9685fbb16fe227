//! # Audit Trail
//!
//! Records who did what to which entity. Every state-changing engine
//! operation emits one [`AuditEvent`] after the change is durable, so the
//! trail never contains actions that were rolled back.
//!
//! Sinks are deliberately synchronous and infallible: an audit failure must
//! never fail the business operation it describes. The channel sink drops
//! events (with a warning) rather than block when its consumer lags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

// =============================================================================
// Events
// =============================================================================

/// Action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    OrderCreated,
    OrderStatusChanged,
    OrderCancelled,
    PaymentConfirmed,
    PaymentRejected,
    ProofAttached,
    CouponCreated,
    CouponToggled,
    PointsRedeemed,
    PointsAwarded,
    InvoiceCreated,
    InvoicePaid,
    InvoiceVoided,
    ProductCreated,
    ProductUpdated,
}

impl AuditAction {
    /// Stable string form used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::OrderCreated => "order_created",
            AuditAction::OrderStatusChanged => "order_status_changed",
            AuditAction::OrderCancelled => "order_cancelled",
            AuditAction::PaymentConfirmed => "payment_confirmed",
            AuditAction::PaymentRejected => "payment_rejected",
            AuditAction::ProofAttached => "proof_attached",
            AuditAction::CouponCreated => "coupon_created",
            AuditAction::CouponToggled => "coupon_toggled",
            AuditAction::PointsRedeemed => "points_redeemed",
            AuditAction::PointsAwarded => "points_awarded",
            AuditAction::InvoiceCreated => "invoice_created",
            AuditAction::InvoicePaid => "invoice_paid",
            AuditAction::InvoiceVoided => "invoice_voided",
            AuditAction::ProductCreated => "product_created",
            AuditAction::ProductUpdated => "product_updated",
        }
    }
}

/// One entry in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Principal id of the caller.
    pub actor: String,

    /// What happened.
    pub action: AuditAction,

    /// Id of the entity acted upon (order id, coupon id, ...).
    pub entity: String,

    /// Free-form context: new status, amounts, reasons.
    pub detail: String,

    /// When the action completed.
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        actor: impl Into<String>,
        action: AuditAction,
        entity: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        AuditEvent {
            actor: actor.into(),
            action,
            entity: entity.into(),
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Sink Trait
// =============================================================================

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Records one event. Must not block and must not fail the caller.
    fn record(&self, event: AuditEvent);
}

/// Writes audit events to the tracing log.
///
/// The default sink. Suitable when the deployment scrapes structured logs.
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            target: "mercato::audit",
            actor = %event.actor,
            action = event.action.as_str(),
            entity = %event.entity,
            detail = %event.detail,
            "audit"
        );
    }
}

/// Forwards audit events over a bounded channel.
///
/// For callers that persist or display the trail. Uses `try_send` so a
/// slow consumer costs events, never latency.
pub struct ChannelAuditSink {
    tx: mpsc::Sender<AuditEvent>,
}

impl ChannelAuditSink {
    /// Creates the sink and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelAuditSink { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Err(err) = self.tx.try_send(event) {
            warn!(error = %err, "audit channel full, event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelAuditSink::new(8);
        sink.record(AuditEvent::new(
            "staff-1",
            AuditAction::OrderCreated,
            "ord-1",
            "ORD-20240501-00001",
        ));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.actor, "staff-1");
        assert_eq!(event.action, AuditAction::OrderCreated);
        assert_eq!(event.entity, "ord-1");
    }

    #[test]
    fn test_channel_sink_drops_on_overflow() {
        let (sink, mut rx) = ChannelAuditSink::new(1);
        sink.record(AuditEvent::new("a", AuditAction::OrderCreated, "1", ""));
        sink.record(AuditEvent::new("a", AuditAction::OrderCancelled, "2", ""));

        assert_eq!(rx.try_recv().unwrap().entity, "1");
        assert!(rx.try_recv().is_err());
    }
}
