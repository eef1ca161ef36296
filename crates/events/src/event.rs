use chrono::{DateTime, Utc};

/// A domain event: an immutable, versioned fact appended to an order's stream.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "purchasing.order.coo_confirmed").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable note for the audit trail, if this event warrants one.
    fn audit_note(&self) -> Option<String> {
        None
    }
}
