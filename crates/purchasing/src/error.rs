//! Rejections raised by the approval workflow.

use thiserror::Error;

use stardust_core::DomainError;

use crate::approval::{ApprovalState, Approver};
use crate::order::OrderStatus;

/// Coarse classification of a rejection (drives HTTP status mapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The actor lacks the role for the operation.
    Permission,
    /// Wrong approval state or lifecycle status for the requested transition.
    Stage,
    Validation,
    NotFound,
    Conflict,
}

/// A purchase-order operation was rejected. Nothing has been written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("permission denied: {0}")]
    Permission(String),

    #[error("this purchase order has already been finally approved")]
    AlreadyApproved,

    #[error("{role} approval is only allowed when the order is {required} (it is {actual})")]
    WrongApprovalStage {
        role: Approver,
        required: ApprovalState,
        actual: ApprovalState,
    },

    #[error("{}", role_mismatch_message(.role))]
    ApprovalNotRequiredForRole { role: Approver },

    #[error("MD approval is required before confirming this purchase order")]
    MdApprovalRequired,

    #[error("COO must approve this purchase order before confirmation")]
    CooApprovalRequired,

    #[error("only RFQs can be {action} (order is {status})")]
    NotAnRfq {
        action: &'static str,
        status: OrderStatus,
    },

    #[error("the order must be cancelled before its approval workflow is reset (order is {status})")]
    NotCancelled { status: OrderStatus },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

fn role_mismatch_message(role: &Approver) -> &'static str {
    match role {
        Approver::Coo => "MD approval is required for this purchase order; COO cannot finalize it",
        Approver::Md => "this purchase order does not require MD approval",
    }
}

impl ApprovalError {
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApprovalError::Permission(_) => ErrorKind::Permission,
            ApprovalError::AlreadyApproved
            | ApprovalError::WrongApprovalStage { .. }
            | ApprovalError::ApprovalNotRequiredForRole { .. }
            | ApprovalError::MdApprovalRequired
            | ApprovalError::CooApprovalRequired
            | ApprovalError::NotAnRfq { .. }
            | ApprovalError::NotCancelled { .. } => ErrorKind::Stage,
            ApprovalError::Domain(e) => match e {
                DomainError::Validation(_) | DomainError::InvalidId(_) => ErrorKind::Validation,
                DomainError::InvariantViolation(_) => ErrorKind::Stage,
                DomainError::NotFound => ErrorKind::NotFound,
                DomainError::Conflict(_) => ErrorKind::Conflict,
            },
        }
    }

    /// Short machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ApprovalError::Permission(_) => "permission_denied",
            ApprovalError::AlreadyApproved => "already_approved",
            ApprovalError::WrongApprovalStage { .. } => "wrong_approval_stage",
            ApprovalError::ApprovalNotRequiredForRole { .. } => "approval_not_required_for_role",
            ApprovalError::MdApprovalRequired => "md_approval_required",
            ApprovalError::CooApprovalRequired => "coo_approval_required",
            ApprovalError::NotAnRfq { .. } => "not_an_rfq",
            ApprovalError::NotCancelled { .. } => "not_cancelled",
            ApprovalError::Domain(e) => e.code(),
        }
    }
}
