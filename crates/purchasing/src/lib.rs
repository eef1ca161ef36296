//! Purchasing domain module: purchase orders with a two-tier (COO/MD)
//! approval workflow, event-sourced.
//!
//! Pure deterministic domain logic (no IO, no HTTP, no storage). Vendor
//! notification content is built here; sending it is an infrastructure
//! concern.

pub mod approval;
pub mod error;
pub mod notification;
pub mod order;

pub use approval::{requires_md_approval, ApprovalState, Approver, DEFAULT_MD_APPROVAL_THRESHOLD};
pub use error::{ApprovalError, ErrorKind};
pub use notification::VendorNotice;
pub use order::{
    AddLine, ApprovalReset, ApproveFinal, Cancel, ChangeLinePrice, ConfirmStep, CooConfirmed,
    CreatePurchaseOrder, FinalApproved, Finalize, LineAdded, LineItem, LinePriceChanged, MarkSent,
    MdRequirementRecomputed, OrderCancelled, OrderFinalized, OrderReopened, OrderStatus,
    PurchaseOrder, PurchaseOrderCommand, PurchaseOrderCreated, PurchaseOrderEvent,
    PurchaseOrderId, ResetToDraft, RfqSent, VendorId, AGGREGATE_TYPE,
};
