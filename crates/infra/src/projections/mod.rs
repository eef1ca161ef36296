//! Projection implementations (read model builders).
//!
//! Projections consume domain events and build query-optimized read models.
//! All projections are:
//! - **Rebuildable**: Can be reconstructed from the event stream
//! - **Idempotent**: Safe to replay an already-applied event

pub mod purchasing;

pub use purchasing::{PurchaseOrderReadModel, PurchaseOrdersProjection, PurchaseOrderProjectionError};
