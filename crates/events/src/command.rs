use stardust_core::AggregateId;

/// A command targets a specific aggregate.
///
/// Commands carry intent ("confirm this order as COO"); they are rejected
/// when preconditions fail and are never persisted. Accepted commands become
/// events.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> AggregateId;
}
