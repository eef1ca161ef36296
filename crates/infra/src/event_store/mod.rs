//! Append-only event store boundary.
//!
//! One stream per purchase order. The audit trail of an order is its stream.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
