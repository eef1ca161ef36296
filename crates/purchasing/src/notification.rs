//! Vendor "new purchase order" notice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::{OrderStatus, PurchaseOrder, VendorId};

/// Content of the mail sent to a vendor once an order is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorNotice {
    pub vendor_id: VendorId,
    pub subject: String,
    pub po_name: String,
    pub approved_by: String,
    pub approval_date: Option<DateTime<Utc>>,
    pub contact_person: String,
    pub contact_email: Option<String>,
}

impl VendorNotice {
    /// Builds the notice, or `None` unless the order has reached `purchase`.
    ///
    /// `approved_by` is the display name of the final approver; the contact
    /// person is the user who created the order.
    pub fn for_order(
        order: &PurchaseOrder,
        approved_by: impl Into<String>,
        contact_person: impl Into<String>,
        contact_email: Option<String>,
    ) -> Option<Self> {
        if order.status() != OrderStatus::Purchase {
            return None;
        }
        let vendor_id = order.vendor_id()?;

        Some(Self {
            vendor_id,
            subject: format!("New PO is created {}", order.name()),
            po_name: order.name().to_string(),
            approved_by: approved_by.into(),
            approval_date: order.date_approve(),
            contact_person: contact_person.into(),
            contact_email,
        })
    }

    /// Plain-text mail body.
    pub fn body(&self) -> String {
        let date = self
            .approval_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let mut body = format!(
            "Dear vendor,\n\nPurchase order {} has been approved by {} on {}.\n\n\
             Contact person: {}",
            self.po_name, self.approved_by, date, self.contact_person
        );
        if let Some(email) = &self.contact_email {
            body.push_str(&format!(" <{email}>"));
        }
        body.push('\n');
        body
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use stardust_core::{Aggregate, AggregateId, Amount, CurrencyCode, UserId};

    use super::*;
    use crate::approval::{Approver, DEFAULT_MD_APPROVAL_THRESHOLD};
    use crate::order::{
        AddLine, ApproveFinal, ConfirmStep, CreatePurchaseOrder, PurchaseOrderCommand,
        PurchaseOrderId,
    };

    fn run(order: &mut PurchaseOrder, cmd: PurchaseOrderCommand) {
        let events = order.handle(&cmd).unwrap();
        for e in &events {
            order.apply(e);
        }
    }

    fn draft_order() -> PurchaseOrder {
        let order_id = PurchaseOrderId::new(AggregateId::new());
        let mut order = PurchaseOrder::empty(order_id);
        run(
            &mut order,
            PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                order_id,
                name: "PO00042".to_string(),
                vendor_id: VendorId::new(AggregateId::new()),
                currency: CurrencyCode::new("BDT").unwrap(),
                created_by: UserId::new(),
                occurred_at: Utc::now(),
            }),
        );
        run(
            &mut order,
            PurchaseOrderCommand::AddLine(AddLine {
                order_id,
                description: "Monitor".to_string(),
                quantity: 1,
                unit_price: Amount::from_major(300),
                md_threshold: DEFAULT_MD_APPROVAL_THRESHOLD,
                occurred_at: Utc::now(),
            }),
        );
        order
    }

    #[test]
    fn no_notice_before_finalization() {
        let order = draft_order();
        assert!(VendorNotice::for_order(&order, "Coo", "Buyer", None).is_none());
    }

    #[test]
    fn notice_carries_order_and_contact_details() {
        let mut order = draft_order();
        let order_id = order.id_typed();
        run(
            &mut order,
            PurchaseOrderCommand::ConfirmStep(ConfirmStep {
                order_id,
                actor: UserId::new(),
                occurred_at: Utc::now(),
            }),
        );
        run(
            &mut order,
            PurchaseOrderCommand::ApproveFinal(ApproveFinal {
                order_id,
                actor: UserId::new(),
                role: Approver::Coo,
                occurred_at: Utc::now(),
            }),
        );

        let notice = VendorNotice::for_order(
            &order,
            "Chief Ops",
            "Bea Buyer",
            Some("bea@example.com".to_string()),
        )
        .unwrap();
        assert_eq!(notice.subject, "New PO is created PO00042");
        assert_eq!(notice.po_name, "PO00042");
        assert_eq!(notice.approval_date, order.date_approve());
        assert!(notice.body().contains("Chief Ops"));
        assert!(notice.body().contains("<bea@example.com>"));
    }
}
