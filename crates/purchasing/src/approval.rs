//! Approval states, approver roles and the MD-threshold rule.

use serde::{Deserialize, Serialize};

use stardust_core::Amount;

use crate::order::LineItem;

/// Unit price above which the managing director must approve (50000.00).
pub const DEFAULT_MD_APPROVAL_THRESHOLD: Amount = Amount::from_major(50_000);

/// Approval workflow state of a purchase order.
///
/// `draft -> coo_confirmed -> coo_approved` below the threshold,
/// `draft -> md_waiting -> md_approved` above it. Reset returns to `draft`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    #[default]
    Draft,
    CooConfirmed,
    CooApproved,
    MdWaiting,
    MdApproved,
}

impl ApprovalState {
    /// Terminal approved states.
    pub fn is_final_approved(self) -> bool {
        matches!(self, ApprovalState::CooApproved | ApprovalState::MdApproved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalState::Draft => "draft",
            ApprovalState::CooConfirmed => "coo_confirmed",
            ApprovalState::CooApproved => "coo_approved",
            ApprovalState::MdWaiting => "md_waiting",
            ApprovalState::MdApproved => "md_approved",
        }
    }

    /// Label shown on printed orders and in the back office.
    pub fn label(self) -> &'static str {
        match self {
            ApprovalState::Draft => "Draft",
            ApprovalState::CooConfirmed => "Confirmed by COO",
            ApprovalState::CooApproved => "Approved by COO",
            ApprovalState::MdWaiting => "Waiting for MD Approval",
            ApprovalState::MdApproved => "Approved by MD",
        }
    }
}

impl core::fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role giving the final approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approver {
    Coo,
    Md,
}

impl Approver {
    /// The state an order must be in for this approver to finalize it.
    pub fn required_prior_state(self) -> ApprovalState {
        match self {
            Approver::Coo => ApprovalState::CooConfirmed,
            Approver::Md => ApprovalState::MdWaiting,
        }
    }

    /// The terminal state this approver moves the order to.
    pub fn approved_state(self) -> ApprovalState {
        match self {
            Approver::Coo => ApprovalState::CooApproved,
            Approver::Md => ApprovalState::MdApproved,
        }
    }

    /// Whether this approver finalizes orders on the given branch.
    pub fn finalizes_branch(self, requires_md_approval: bool) -> bool {
        match self {
            Approver::Coo => !requires_md_approval,
            Approver::Md => requires_md_approval,
        }
    }
}

impl core::fmt::Display for Approver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Approver::Coo => "COO",
            Approver::Md => "MD",
        })
    }
}

/// True iff any line's unit price strictly exceeds `threshold`.
pub fn requires_md_approval<'a>(
    lines: impl IntoIterator<Item = &'a LineItem>,
    threshold: Amount,
) -> bool {
    lines.into_iter().any(|l| l.unit_price > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(line_no: u32, minor: i64) -> LineItem {
        LineItem {
            line_no,
            description: format!("line {line_no}"),
            quantity: 1,
            unit_price: Amount::from_minor(minor),
        }
    }

    #[test]
    fn threshold_is_strict() {
        let at = [line(1, 5_000_000)];
        let above = [line(1, 5_000_001)];
        assert!(!requires_md_approval(&at, DEFAULT_MD_APPROVAL_THRESHOLD));
        assert!(requires_md_approval(&above, DEFAULT_MD_APPROVAL_THRESHOLD));
    }

    #[test]
    fn empty_order_needs_no_md() {
        assert!(!requires_md_approval(std::iter::empty(), DEFAULT_MD_APPROVAL_THRESHOLD));
    }

    #[test]
    fn branch_ownership() {
        assert!(Approver::Coo.finalizes_branch(false));
        assert!(!Approver::Coo.finalizes_branch(true));
        assert!(Approver::Md.finalizes_branch(true));
        assert_eq!(Approver::Md.approved_state(), ApprovalState::MdApproved);
        assert_eq!(Approver::Coo.required_prior_state(), ApprovalState::CooConfirmed);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: MD approval is required iff some line price exceeds the threshold.
        #[test]
        fn md_requirement_matches_max_price(
            prices in prop::collection::vec(0i64..10_000_000i64, 0..8),
            threshold in 0i64..10_000_000i64,
        ) {
            let lines: Vec<LineItem> = prices
                .iter()
                .enumerate()
                .map(|(i, p)| line(i as u32 + 1, *p))
                .collect();
            let expected = prices.iter().any(|p| *p > threshold);
            prop_assert_eq!(
                requires_md_approval(&lines, Amount::from_minor(threshold)),
                expected
            );
        }
    }
}
