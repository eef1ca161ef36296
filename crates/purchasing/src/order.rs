use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stardust_core::{Aggregate, AggregateId, AggregateRoot, Amount, CurrencyCode, DomainError, UserId};
use stardust_events::{Command, Event};

use crate::approval::{requires_md_approval, ApprovalState, Approver};
use crate::error::ApprovalError;

/// Stream type under which purchase order events are stored.
pub const AGGREGATE_TYPE: &str = "purchasing.order";

/// Purchase order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Vendor (supplier partner) identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(pub AggregateId);

impl VendorId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VendorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Host lifecycle status of the order.
///
/// `draft`/`sent` are the RFQ statuses; `purchase` is the finalized order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Draft,
    Sent,
    Purchase,
    Cancel,
}

impl OrderStatus {
    /// Pre-finalization (request for quotation) status.
    pub fn is_rfq(self) -> bool {
        matches!(self, OrderStatus::Draft | OrderStatus::Sent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Sent => "sent",
            OrderStatus::Purchase => "purchase",
            OrderStatus::Cancel => "cancel",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub line_no: u32,
    pub description: String,
    pub quantity: i64,
    /// Price in minor currency units.
    pub unit_price: Amount,
}

impl LineItem {
    pub fn subtotal(&self) -> Option<Amount> {
        self.unit_price.checked_mul(self.quantity)
    }
}

fn total_of(lines: &[LineItem]) -> Option<Amount> {
    lines
        .iter()
        .try_fold(Amount::ZERO, |acc, l| acc.checked_add(l.subtotal()?))
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    name: String,
    vendor_id: Option<VendorId>,
    currency: Option<CurrencyCode>,
    lines: Vec<LineItem>,
    status: OrderStatus,
    approval_state: ApprovalState,
    requires_md_approval: bool,
    created_by: Option<UserId>,
    date_order: Option<DateTime<Utc>>,
    confirmed_by: Option<UserId>,
    confirmed_date: Option<DateTime<Utc>>,
    approved_by: Option<UserId>,
    date_approve: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            name: String::new(),
            vendor_id: None,
            currency: None,
            lines: Vec::new(),
            status: OrderStatus::Draft,
            approval_state: ApprovalState::Draft,
            requires_md_approval: false,
            created_by: None,
            date_order: None,
            confirmed_by: None,
            confirmed_date: None,
            approved_by: None,
            date_approve: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor_id(&self) -> Option<VendorId> {
        self.vendor_id
    }

    pub fn currency(&self) -> Option<&CurrencyCode> {
        self.currency.as_ref()
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn approval_state(&self) -> ApprovalState {
        self.approval_state
    }

    pub fn requires_md_approval(&self) -> bool {
        self.requires_md_approval
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn date_order(&self) -> Option<DateTime<Utc>> {
        self.date_order
    }

    pub fn confirmed_by(&self) -> Option<UserId> {
        self.confirmed_by
    }

    pub fn confirmed_date(&self) -> Option<DateTime<Utc>> {
        self.confirmed_date
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    pub fn date_approve(&self) -> Option<DateTime<Utc>> {
        self.date_approve
    }

    /// Sum of line subtotals; `None` on overflow.
    pub fn amount_total(&self) -> Option<Amount> {
        total_of(&self.lines)
    }

    /// Gate in front of the native finalize operation. Pure check, no mutation.
    ///
    /// Orders above the threshold need `md_approved`. Orders below it need the
    /// COO branch: `coo_confirmed`, or `coo_approved` when the gate runs as
    /// part of the COO's own final approval.
    pub fn finalize_confirm(&self) -> Result<(), ApprovalError> {
        if self.requires_md_approval && self.approval_state != ApprovalState::MdApproved {
            return Err(ApprovalError::MdApprovalRequired);
        }
        if !self.requires_md_approval
            && !matches!(
                self.approval_state,
                ApprovalState::CooConfirmed | ApprovalState::CooApproved
            )
        {
            return Err(ApprovalError::CooApprovalRequired);
        }
        Ok(())
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub name: String,
    pub vendor_id: VendorId,
    pub currency: CurrencyCode,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine (RFQ statuses only). Carries the MD threshold in force,
/// read by the caller once for this recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub order_id: PurchaseOrderId,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Amount,
    pub md_threshold: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeLinePrice (RFQ statuses only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLinePrice {
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub unit_price: Amount,
    pub md_threshold: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSent (RFQ sent to the vendor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSent {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmStep (COO first step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmStep {
    pub order_id: PurchaseOrderId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveFinal (COO or MD final approval, finalizes the order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveFinal {
    pub order_id: PurchaseOrderId,
    pub actor: UserId,
    pub role: Approver,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Finalize (native order confirmation, behind the approval gate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finalize {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Cancel (native cancellation, followed by an approval reset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancel {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResetToDraft (approval workflow back to draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetToDraft {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    AddLine(AddLine),
    ChangeLinePrice(ChangeLinePrice),
    MarkSent(MarkSent),
    ConfirmStep(ConfirmStep),
    ApproveFinal(ApproveFinal),
    Finalize(Finalize),
    Cancel(Cancel),
    ResetToDraft(ResetToDraft),
}

impl PurchaseOrderCommand {
    pub fn order_id(&self) -> PurchaseOrderId {
        match self {
            PurchaseOrderCommand::CreatePurchaseOrder(c) => c.order_id,
            PurchaseOrderCommand::AddLine(c) => c.order_id,
            PurchaseOrderCommand::ChangeLinePrice(c) => c.order_id,
            PurchaseOrderCommand::MarkSent(c) => c.order_id,
            PurchaseOrderCommand::ConfirmStep(c) => c.order_id,
            PurchaseOrderCommand::ApproveFinal(c) => c.order_id,
            PurchaseOrderCommand::Finalize(c) => c.order_id,
            PurchaseOrderCommand::Cancel(c) => c.order_id,
            PurchaseOrderCommand::ResetToDraft(c) => c.order_id,
        }
    }
}

impl Command for PurchaseOrderCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        self.order_id().0
    }
}

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub order_id: PurchaseOrderId,
    pub name: String,
    pub vendor_id: VendorId,
    pub currency: CurrencyCode,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub order_id: PurchaseOrderId,
    pub line: LineItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LinePriceChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePriceChanged {
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub unit_price: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MdRequirementRecomputed.
///
/// Emitted with every line price change so the derived flag never depends on
/// hidden recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdRequirementRecomputed {
    pub order_id: PurchaseOrderId,
    pub requires_md_approval: bool,
    pub threshold: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqSent {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CooConfirmed. `approval_state` is `md_waiting` or `coo_confirmed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooConfirmed {
    pub order_id: PurchaseOrderId,
    pub confirmed_by: UserId,
    pub approval_state: ApprovalState,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FinalApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalApproved {
    pub order_id: PurchaseOrderId,
    pub approved_by: UserId,
    pub role: Approver,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderFinalized (status becomes `purchase`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFinalized {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderReopened (cancelled order back to `draft`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReopened {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ApprovalReset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalReset {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    LineAdded(LineAdded),
    LinePriceChanged(LinePriceChanged),
    MdRequirementRecomputed(MdRequirementRecomputed),
    RfqSent(RfqSent),
    CooConfirmed(CooConfirmed),
    FinalApproved(FinalApproved),
    OrderFinalized(OrderFinalized),
    OrderCancelled(OrderCancelled),
    OrderReopened(OrderReopened),
    ApprovalReset(ApprovalReset),
}

impl PurchaseOrderEvent {
    pub fn order_id(&self) -> PurchaseOrderId {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.order_id,
            PurchaseOrderEvent::LineAdded(e) => e.order_id,
            PurchaseOrderEvent::LinePriceChanged(e) => e.order_id,
            PurchaseOrderEvent::MdRequirementRecomputed(e) => e.order_id,
            PurchaseOrderEvent::RfqSent(e) => e.order_id,
            PurchaseOrderEvent::CooConfirmed(e) => e.order_id,
            PurchaseOrderEvent::FinalApproved(e) => e.order_id,
            PurchaseOrderEvent::OrderFinalized(e) => e.order_id,
            PurchaseOrderEvent::OrderCancelled(e) => e.order_id,
            PurchaseOrderEvent::OrderReopened(e) => e.order_id,
            PurchaseOrderEvent::ApprovalReset(e) => e.order_id,
        }
    }
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "purchasing.order.created",
            PurchaseOrderEvent::LineAdded(_) => "purchasing.order.line_added",
            PurchaseOrderEvent::LinePriceChanged(_) => "purchasing.order.line_price_changed",
            PurchaseOrderEvent::MdRequirementRecomputed(_) => "purchasing.order.md_requirement_recomputed",
            PurchaseOrderEvent::RfqSent(_) => "purchasing.order.rfq_sent",
            PurchaseOrderEvent::CooConfirmed(_) => "purchasing.order.coo_confirmed",
            PurchaseOrderEvent::FinalApproved(_) => "purchasing.order.final_approved",
            PurchaseOrderEvent::OrderFinalized(_) => "purchasing.order.finalized",
            PurchaseOrderEvent::OrderCancelled(_) => "purchasing.order.cancelled",
            PurchaseOrderEvent::OrderReopened(_) => "purchasing.order.reopened",
            PurchaseOrderEvent::ApprovalReset(_) => "purchasing.order.approval_reset",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::LineAdded(e) => e.occurred_at,
            PurchaseOrderEvent::LinePriceChanged(e) => e.occurred_at,
            PurchaseOrderEvent::MdRequirementRecomputed(e) => e.occurred_at,
            PurchaseOrderEvent::RfqSent(e) => e.occurred_at,
            PurchaseOrderEvent::CooConfirmed(e) => e.occurred_at,
            PurchaseOrderEvent::FinalApproved(e) => e.occurred_at,
            PurchaseOrderEvent::OrderFinalized(e) => e.occurred_at,
            PurchaseOrderEvent::OrderCancelled(e) => e.occurred_at,
            PurchaseOrderEvent::OrderReopened(e) => e.occurred_at,
            PurchaseOrderEvent::ApprovalReset(e) => e.occurred_at,
        }
    }

    fn audit_note(&self) -> Option<String> {
        let note = match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => format!("Purchase order {} created.", e.name),
            PurchaseOrderEvent::RfqSent(_) => "RFQ sent to vendor.".to_string(),
            PurchaseOrderEvent::CooConfirmed(e) => match e.approval_state {
                ApprovalState::MdWaiting => "Confirmed by COO. Waiting for MD approval.".to_string(),
                _ => "Confirmed by COO. MD approval not required.".to_string(),
            },
            PurchaseOrderEvent::FinalApproved(e) => {
                format!("{} approved. Finalizing purchase order.", e.role)
            }
            PurchaseOrderEvent::OrderFinalized(_) => "Purchase order confirmed.".to_string(),
            PurchaseOrderEvent::OrderCancelled(_) => "Purchase order cancelled.".to_string(),
            PurchaseOrderEvent::OrderReopened(_) => "Purchase order set back to RFQ.".to_string(),
            PurchaseOrderEvent::ApprovalReset(_) => "Approval workflow reset to draft.".to_string(),
            PurchaseOrderEvent::LineAdded(_)
            | PurchaseOrderEvent::LinePriceChanged(_)
            | PurchaseOrderEvent::MdRequirementRecomputed(_) => return None,
        };
        Some(note)
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = ApprovalError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.order_id;
                self.name = e.name.clone();
                self.vendor_id = Some(e.vendor_id);
                self.currency = Some(e.currency.clone());
                self.created_by = Some(e.created_by);
                self.date_order = Some(e.occurred_at);
                self.status = OrderStatus::Draft;
                self.approval_state = ApprovalState::Draft;
                self.lines.clear();
                self.created = true;
            }
            PurchaseOrderEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            PurchaseOrderEvent::LinePriceChanged(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    line.unit_price = e.unit_price;
                }
            }
            PurchaseOrderEvent::MdRequirementRecomputed(e) => {
                self.requires_md_approval = e.requires_md_approval;
            }
            PurchaseOrderEvent::RfqSent(_) => {
                self.status = OrderStatus::Sent;
            }
            PurchaseOrderEvent::CooConfirmed(e) => {
                self.approval_state = e.approval_state;
                self.confirmed_by = Some(e.confirmed_by);
                self.confirmed_date = Some(e.occurred_at);
            }
            PurchaseOrderEvent::FinalApproved(e) => {
                self.approval_state = e.role.approved_state();
                self.approved_by = Some(e.approved_by);
            }
            PurchaseOrderEvent::OrderFinalized(e) => {
                self.status = OrderStatus::Purchase;
                self.date_approve = Some(e.occurred_at);
            }
            PurchaseOrderEvent::OrderCancelled(_) => {
                self.status = OrderStatus::Cancel;
            }
            PurchaseOrderEvent::OrderReopened(_) => {
                self.status = OrderStatus::Draft;
                self.date_approve = None;
            }
            PurchaseOrderEvent::ApprovalReset(_) => {
                self.approval_state = ApprovalState::Draft;
                self.confirmed_by = None;
                self.confirmed_date = None;
                self.approved_by = None;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            PurchaseOrderCommand::ChangeLinePrice(cmd) => self.handle_change_line_price(cmd),
            PurchaseOrderCommand::MarkSent(cmd) => self.handle_mark_sent(cmd),
            PurchaseOrderCommand::ConfirmStep(cmd) => self.handle_confirm_step(cmd),
            PurchaseOrderCommand::ApproveFinal(cmd) => self.handle_approve_final(cmd),
            PurchaseOrderCommand::Finalize(cmd) => self.handle_finalize(cmd),
            PurchaseOrderCommand::Cancel(cmd) => self.handle_cancel(cmd),
            PurchaseOrderCommand::ResetToDraft(cmd) => self.handle_reset_to_draft(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_exists(&self, order_id: PurchaseOrderId) -> Result<(), ApprovalError> {
        if !self.created {
            return Err(DomainError::not_found().into());
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch").into());
        }
        Ok(())
    }

    fn ensure_rfq(&self, action: &'static str) -> Result<(), ApprovalError> {
        if !self.status.is_rfq() {
            return Err(ApprovalError::NotAnRfq {
                action,
                status: self.status,
            });
        }
        Ok(())
    }

    fn recomputed(
        &self,
        order_id: PurchaseOrderId,
        lines: &[LineItem],
        threshold: Amount,
        occurred_at: DateTime<Utc>,
    ) -> PurchaseOrderEvent {
        PurchaseOrderEvent::MdRequirementRecomputed(MdRequirementRecomputed {
            order_id,
            requires_md_approval: requires_md_approval(lines, threshold),
            threshold,
            occurred_at,
        })
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, ApprovalError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists").into());
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("order reference must not be empty").into());
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(
            PurchaseOrderCreated {
                order_id: cmd.order_id,
                name: cmd.name.trim().to_string(),
                vendor_id: cmd.vendor_id,
                currency: cmd.currency.clone(),
                created_by: cmd.created_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<PurchaseOrderEvent>, ApprovalError> {
        self.ensure_exists(cmd.order_id)?;
        self.ensure_rfq("edited")?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive").into());
        }
        if cmd.unit_price.is_negative() {
            return Err(DomainError::validation("unit price must not be negative").into());
        }

        let line = LineItem {
            line_no: self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1,
            description: cmd.description.trim().to_string(),
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
        };
        if line.subtotal().is_none() {
            return Err(DomainError::validation("line subtotal is out of range").into());
        }

        let mut lines = self.lines.clone();
        lines.push(line.clone());
        if total_of(&lines).is_none() {
            return Err(DomainError::validation("order total is out of range").into());
        }

        Ok(vec![
            PurchaseOrderEvent::LineAdded(LineAdded {
                order_id: cmd.order_id,
                line,
                occurred_at: cmd.occurred_at,
            }),
            self.recomputed(cmd.order_id, &lines, cmd.md_threshold, cmd.occurred_at),
        ])
    }

    fn handle_change_line_price(
        &self,
        cmd: &ChangeLinePrice,
    ) -> Result<Vec<PurchaseOrderEvent>, ApprovalError> {
        self.ensure_exists(cmd.order_id)?;
        self.ensure_rfq("edited")?;

        if cmd.unit_price.is_negative() {
            return Err(DomainError::validation("unit price must not be negative").into());
        }

        let mut lines = self.lines.clone();
        let line = lines
            .iter_mut()
            .find(|l| l.line_no == cmd.line_no)
            .ok_or_else(|| DomainError::validation(format!("no line number {}", cmd.line_no)))?;
        line.unit_price = cmd.unit_price;
        if line.subtotal().is_none() {
            return Err(DomainError::validation("line subtotal is out of range").into());
        }
        if total_of(&lines).is_none() {
            return Err(DomainError::validation("order total is out of range").into());
        }

        Ok(vec![
            PurchaseOrderEvent::LinePriceChanged(LinePriceChanged {
                order_id: cmd.order_id,
                line_no: cmd.line_no,
                unit_price: cmd.unit_price,
                occurred_at: cmd.occurred_at,
            }),
            self.recomputed(cmd.order_id, &lines, cmd.md_threshold, cmd.occurred_at),
        ])
    }

    fn handle_mark_sent(&self, cmd: &MarkSent) -> Result<Vec<PurchaseOrderEvent>, ApprovalError> {
        self.ensure_exists(cmd.order_id)?;

        if self.status != OrderStatus::Draft {
            return Err(DomainError::invariant("only draft RFQs can be marked as sent").into());
        }

        Ok(vec![PurchaseOrderEvent::RfqSent(RfqSent {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm_step(
        &self,
        cmd: &ConfirmStep,
    ) -> Result<Vec<PurchaseOrderEvent>, ApprovalError> {
        self.ensure_exists(cmd.order_id)?;

        if self.approval_state.is_final_approved() {
            return Err(ApprovalError::AlreadyApproved);
        }
        self.ensure_rfq("confirmed by the COO")?;

        let approval_state = if self.requires_md_approval {
            ApprovalState::MdWaiting
        } else {
            ApprovalState::CooConfirmed
        };

        Ok(vec![PurchaseOrderEvent::CooConfirmed(CooConfirmed {
            order_id: cmd.order_id,
            confirmed_by: cmd.actor,
            approval_state,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve_final(
        &self,
        cmd: &ApproveFinal,
    ) -> Result<Vec<PurchaseOrderEvent>, ApprovalError> {
        self.ensure_exists(cmd.order_id)?;
        self.ensure_rfq("given final approval")?;

        if !cmd.role.finalizes_branch(self.requires_md_approval) {
            return Err(ApprovalError::ApprovalNotRequiredForRole { role: cmd.role });
        }
        let required = cmd.role.required_prior_state();
        if self.approval_state != required {
            return Err(ApprovalError::WrongApprovalStage {
                role: cmd.role,
                required,
                actual: self.approval_state,
            });
        }

        let approved = PurchaseOrderEvent::FinalApproved(FinalApproved {
            order_id: cmd.order_id,
            approved_by: cmd.actor,
            role: cmd.role,
            occurred_at: cmd.occurred_at,
        });

        // Native finalize runs against the approved state; any rejection
        // discards the approval as well.
        let mut approved_order = self.clone();
        approved_order.apply(&approved);
        let finalized = approved_order.handle_finalize(&Finalize {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })?;

        let mut events = Vec::with_capacity(1 + finalized.len());
        events.push(approved);
        events.extend(finalized);
        Ok(events)
    }

    fn handle_finalize(&self, cmd: &Finalize) -> Result<Vec<PurchaseOrderEvent>, ApprovalError> {
        self.ensure_exists(cmd.order_id)?;
        self.finalize_confirm()?;
        self.ensure_rfq("confirmed")?;

        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot confirm a purchase order without lines").into());
        }

        Ok(vec![PurchaseOrderEvent::OrderFinalized(OrderFinalized {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &Cancel) -> Result<Vec<PurchaseOrderEvent>, ApprovalError> {
        self.ensure_exists(cmd.order_id)?;

        if self.status == OrderStatus::Cancel {
            return Err(DomainError::invariant("purchase order is already cancelled").into());
        }

        Ok(vec![
            PurchaseOrderEvent::OrderCancelled(OrderCancelled {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            }),
            PurchaseOrderEvent::ApprovalReset(ApprovalReset {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            }),
        ])
    }

    fn handle_reset_to_draft(
        &self,
        cmd: &ResetToDraft,
    ) -> Result<Vec<PurchaseOrderEvent>, ApprovalError> {
        self.ensure_exists(cmd.order_id)?;

        let mut events = Vec::with_capacity(2);
        match self.status {
            OrderStatus::Purchase => {
                return Err(ApprovalError::NotCancelled { status: self.status });
            }
            OrderStatus::Cancel => {
                events.push(PurchaseOrderEvent::OrderReopened(OrderReopened {
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                }));
            }
            OrderStatus::Draft | OrderStatus::Sent => {}
        }
        events.push(PurchaseOrderEvent::ApprovalReset(ApprovalReset {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        }));
        Ok(events)
    }
}
