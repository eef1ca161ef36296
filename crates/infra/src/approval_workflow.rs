//! Approval workflow service.
//!
//! Entry point for every purchase order transition: authorizes the actor,
//! reads the MD threshold, dispatches the command, refreshes the read model
//! and, once an order has been finalized by a final approval, notifies the
//! vendor.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use stardust_auth::{authorize, authorize_any, AuthzError, Principal, Role};
use stardust_core::{AggregateId, Amount, CurrencyCode, DomainError};
use stardust_purchasing::{
    AddLine, ApprovalError, ApprovalState, ApproveFinal, Approver, Cancel, ChangeLinePrice,
    ConfirmStep, CreatePurchaseOrder, ErrorKind, Finalize, MarkSent, OrderStatus, PurchaseOrder,
    PurchaseOrderCommand, PurchaseOrderId, ResetToDraft, VendorId, VendorNotice, AGGREGATE_TYPE,
};
use stardust_reporting::{amount_to_words, WordsError};

use crate::command_dispatcher::{CommandDispatcher, DispatchError, Dispatched};
use crate::config::{md_approval_threshold, ConfigError, ConfigParameters};
use crate::directory::Directory;
use crate::event_store::EventStore;
use crate::mail::{MailDispatch, MailError, OutgoingMail, SmtpSenderLookup};
use crate::projections::purchasing::{PurchaseOrderReadModel, PurchaseOrdersProjection};
use crate::read_model::ReadStore;

const BACK_OFFICE: [Role; 3] = [Role::PROCUREMENT, Role::COO, Role::MD];
const APPROVERS: [Role; 2] = [Role::COO, Role::MD];

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Rejected(#[from] ApprovalError),

    #[error("concurrent modification, reload and retry: {0}")]
    Concurrency(String),

    #[error("purchase order not found")]
    NotFound,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Words(#[from] WordsError),

    #[error("storage failure: {0}")]
    Store(String),
}

impl WorkflowError {
    /// Short machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::Rejected(e) => e.code(),
            WorkflowError::Concurrency(_) => "conflict",
            WorkflowError::NotFound => "not_found",
            WorkflowError::Config(_) => "config_error",
            WorkflowError::Words(_) => "unsupported_currency",
            WorkflowError::Store(_) => "store_error",
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            WorkflowError::NotFound => true,
            WorkflowError::Rejected(e) => e.kind() == ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<DispatchError<ApprovalError>> for WorkflowError {
    fn from(value: DispatchError<ApprovalError>) -> Self {
        match value {
            DispatchError::Rejected(e) if e.kind() == ErrorKind::NotFound => WorkflowError::NotFound,
            DispatchError::Rejected(e) => WorkflowError::Rejected(e),
            DispatchError::Concurrency(msg) => WorkflowError::Concurrency(msg),
            DispatchError::NotFound => WorkflowError::NotFound,
            DispatchError::Deserialize(msg) => WorkflowError::Store(msg),
            DispatchError::Store(e) => WorkflowError::Store(e.to_string()),
        }
    }
}

impl From<AuthzError> for WorkflowError {
    fn from(value: AuthzError) -> Self {
        WorkflowError::Rejected(ApprovalError::permission(value.to_string()))
    }
}

/// Input for [`ApprovalWorkflow::create_order`].
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Order reference; the next `PO00000` sequence value when absent.
    pub name: Option<String>,
    pub vendor_id: VendorId,
    pub currency: CurrencyCode,
}

/// One line of an order's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub sequence_number: u64,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub note: String,
}

/// What the printed purchase order shows besides the order itself.
#[derive(Debug, Clone)]
pub struct PrintedOrder {
    pub order: PurchaseOrder,
    pub company_name: Option<String>,
    pub vendor_name: Option<String>,
    pub amount_in_words: String,
    /// Present once the COO has confirmed the order.
    pub coo_signature: Option<String>,
    /// Present once the MD has approved the order.
    pub md_signature: Option<String>,
    pub vendor_signature: Option<String>,
}

/// External collaborators the workflow talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub params: Arc<dyn ConfigParameters>,
    pub directory: Arc<dyn Directory>,
    pub mailer: Arc<dyn MailDispatch>,
    pub sender: Arc<dyn SmtpSenderLookup>,
}

pub struct ApprovalWorkflow<S, R>
where
    S: EventStore,
    R: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    dispatcher: CommandDispatcher<S>,
    projection: Arc<PurchaseOrdersProjection<R>>,
    deps: Collaborators,
    /// Held while the read model is brought up to the store.
    projecting: Mutex<()>,
    /// Last `PO00000` sequence value handed out; held across name check and create.
    naming: Mutex<u64>,
}

fn acquire<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S, R> ApprovalWorkflow<S, R>
where
    S: EventStore,
    R: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    pub fn new(store: S, projection: Arc<PurchaseOrdersProjection<R>>, deps: Collaborators) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store),
            projection,
            deps,
            projecting: Mutex::new(()),
            naming: Mutex::new(0),
        }
    }

    pub fn projection(&self) -> &Arc<PurchaseOrdersProjection<R>> {
        &self.projection
    }

    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.deps.directory
    }

    fn execute(&self, order_id: PurchaseOrderId, command: PurchaseOrderCommand) -> Result<PurchaseOrder, WorkflowError> {
        let Dispatched { aggregate, .. } = self.dispatcher.dispatch(
            order_id.0,
            AGGREGATE_TYPE,
            command,
            |id| PurchaseOrder::empty(PurchaseOrderId::new(id)),
        )?;
        self.project(order_id);
        Ok(aggregate)
    }

    /// Brings the order's read model up to its stream in the store.
    ///
    /// Replays the whole stream under one lock; envelopes the projection
    /// already holds are skipped. Failures are logged and never fail the
    /// transition.
    fn project(&self, order_id: PurchaseOrderId) {
        let _guard = acquire(&self.projecting);

        let history = match self.dispatcher.store().load_stream(order_id.0) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "purchase order stream reload failed");
                return;
            }
        };
        for stored in &history {
            if let Err(e) = self.projection.apply_envelope(&stored.to_envelope()) {
                tracing::warn!(
                    order_id = %order_id,
                    sequence_number = stored.sequence_number,
                    error = %e,
                    "purchase order projection update failed"
                );
                return;
            }
        }
    }

    fn threshold(&self) -> Result<Amount, WorkflowError> {
        Ok(md_approval_threshold(self.deps.params.as_ref())?)
    }

    fn name_taken(&self, name: &str) -> bool {
        self.projection.list().iter().any(|o| o.name == name)
    }

    /// Next free `PO00000` reference, skipping names already in use.
    fn next_name(&self, last: &mut u64) -> String {
        loop {
            *last += 1;
            let name = format!("PO{:05}", *last);
            if !self.name_taken(&name) {
                return name;
            }
        }
    }

    /// Create an RFQ. Only procurement may create orders; nothing is written
    /// on rejection.
    pub fn create_order(&self, actor: &Principal, input: NewOrder) -> Result<PurchaseOrder, WorkflowError> {
        if let Err(e) = authorize(actor, &Role::PROCUREMENT) {
            tracing::warn!(user_id = %actor.user_id, "purchase order creation refused");
            return Err(ApprovalError::permission(format!(
                "only the procurement team can create purchase orders ({e})"
            ))
            .into());
        }
        if self.deps.directory.vendor(input.vendor_id).is_none() {
            return Err(ApprovalError::from(DomainError::validation(format!(
                "unknown vendor {}",
                input.vendor_id
            )))
            .into());
        }

        let mut last = acquire(&self.naming);
        let name = match input.name.filter(|n| !n.trim().is_empty()) {
            Some(name) => {
                let name = name.trim().to_string();
                if self.name_taken(&name) {
                    return Err(ApprovalError::from(DomainError::conflict(format!(
                        "purchase order name '{name}' is already in use"
                    )))
                    .into());
                }
                name
            }
            None => self.next_name(&mut last),
        };

        let order_id = PurchaseOrderId::new(AggregateId::new());

        let order = self.execute(
            order_id,
            PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                order_id,
                name,
                vendor_id: input.vendor_id,
                currency: input.currency,
                created_by: actor.user_id,
                occurred_at: Utc::now(),
            }),
        )?;
        tracing::info!(order_id = %order_id, name = order.name(), "purchase order created");
        Ok(order)
    }

    pub fn add_line(
        &self,
        actor: &Principal,
        order_id: PurchaseOrderId,
        description: String,
        quantity: i64,
        unit_price: Amount,
    ) -> Result<PurchaseOrder, WorkflowError> {
        authorize(actor, &Role::PROCUREMENT)?;
        let md_threshold = self.threshold()?;

        let order = self.execute(
            order_id,
            PurchaseOrderCommand::AddLine(AddLine {
                order_id,
                description,
                quantity,
                unit_price,
                md_threshold,
                occurred_at: Utc::now(),
            }),
        )?;
        tracing::info!(
            order_id = %order_id,
            requires_md_approval = order.requires_md_approval(),
            "line added"
        );
        Ok(order)
    }

    pub fn change_line_price(
        &self,
        actor: &Principal,
        order_id: PurchaseOrderId,
        line_no: u32,
        unit_price: Amount,
    ) -> Result<PurchaseOrder, WorkflowError> {
        authorize(actor, &Role::PROCUREMENT)?;
        let md_threshold = self.threshold()?;

        let order = self.execute(
            order_id,
            PurchaseOrderCommand::ChangeLinePrice(ChangeLinePrice {
                order_id,
                line_no,
                unit_price,
                md_threshold,
                occurred_at: Utc::now(),
            }),
        )?;
        tracing::info!(
            order_id = %order_id,
            line_no,
            requires_md_approval = order.requires_md_approval(),
            "line price changed"
        );
        Ok(order)
    }

    pub fn mark_sent(&self, actor: &Principal, order_id: PurchaseOrderId) -> Result<PurchaseOrder, WorkflowError> {
        authorize(actor, &Role::PROCUREMENT)?;
        self.execute(
            order_id,
            PurchaseOrderCommand::MarkSent(MarkSent {
                order_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// COO first step: `coo_confirmed` or `md_waiting`.
    pub fn confirm_step(&self, actor: &Principal, order_id: PurchaseOrderId) -> Result<PurchaseOrder, WorkflowError> {
        authorize(actor, &Role::COO)?;
        let order = self.execute(
            order_id,
            PurchaseOrderCommand::ConfirmStep(ConfirmStep {
                order_id,
                actor: actor.user_id,
                occurred_at: Utc::now(),
            }),
        )?;
        tracing::info!(
            order_id = %order_id,
            approval_state = %order.approval_state(),
            "coo confirmation recorded"
        );
        Ok(order)
    }

    /// Final approval by `role`, finalizing the order in the same commit.
    /// The vendor is notified afterwards, best effort.
    pub fn approve_final(
        &self,
        actor: &Principal,
        order_id: PurchaseOrderId,
        role: Approver,
    ) -> Result<PurchaseOrder, WorkflowError> {
        let required = match role {
            Approver::Coo => Role::COO,
            Approver::Md => Role::MD,
        };
        authorize(actor, &required)?;

        let order = self.execute(
            order_id,
            PurchaseOrderCommand::ApproveFinal(ApproveFinal {
                order_id,
                actor: actor.user_id,
                role,
                occurred_at: Utc::now(),
            }),
        )?;
        tracing::info!(
            order_id = %order_id,
            approver = %role,
            status = %order.status(),
            "final approval recorded"
        );

        if order.status() == OrderStatus::Purchase {
            if let Err(e) = self.notify_vendor(&order) {
                tracing::warn!(order_id = %order_id, error = %e, "vendor notification failed");
            }
        }
        Ok(order)
    }

    /// Native order confirmation, behind the approval gate. Does not notify.
    pub fn finalize(&self, actor: &Principal, order_id: PurchaseOrderId) -> Result<PurchaseOrder, WorkflowError> {
        authorize_any(actor, &APPROVERS)?;
        let order = self.execute(
            order_id,
            PurchaseOrderCommand::Finalize(Finalize {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        tracing::info!(order_id = %order_id, "purchase order confirmed");
        Ok(order)
    }

    pub fn cancel(&self, actor: &Principal, order_id: PurchaseOrderId) -> Result<PurchaseOrder, WorkflowError> {
        authorize_any(actor, &BACK_OFFICE)?;
        let order = self.execute(
            order_id,
            PurchaseOrderCommand::Cancel(Cancel {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        tracing::info!(order_id = %order_id, "purchase order cancelled, approval reset");
        Ok(order)
    }

    pub fn reset_to_draft(&self, actor: &Principal, order_id: PurchaseOrderId) -> Result<PurchaseOrder, WorkflowError> {
        authorize_any(actor, &BACK_OFFICE)?;
        let order = self.execute(
            order_id,
            PurchaseOrderCommand::ResetToDraft(ResetToDraft {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        tracing::info!(order_id = %order_id, status = %order.status(), "approval workflow reset");
        Ok(order)
    }

    pub fn get(&self, actor: &Principal, order_id: PurchaseOrderId) -> Result<PurchaseOrder, WorkflowError> {
        authorize_any(actor, &BACK_OFFICE)?;
        let (order, _) = self
            .dispatcher
            .load(order_id.0, |id| PurchaseOrder::empty(PurchaseOrderId::new(id)))?;
        Ok(order)
    }

    pub fn list(&self, actor: &Principal) -> Result<Vec<PurchaseOrderReadModel>, WorkflowError> {
        authorize_any(actor, &BACK_OFFICE)?;
        let mut orders = self.projection.list();
        orders.sort_by(|a, b| b.date_order.cmp(&a.date_order).then_with(|| a.name.cmp(&b.name)));
        Ok(orders)
    }

    /// Audit notes of an order in commit order.
    pub fn audit_trail(&self, actor: &Principal, order_id: PurchaseOrderId) -> Result<Vec<AuditEntry>, WorkflowError> {
        authorize_any(actor, &BACK_OFFICE)?;
        let (_, history) = self
            .dispatcher
            .load(order_id.0, |id| PurchaseOrder::empty(PurchaseOrderId::new(id)))?;

        Ok(history
            .into_iter()
            .filter_map(|e| {
                e.note.map(|note| AuditEntry {
                    sequence_number: e.sequence_number,
                    event_type: e.event_type,
                    occurred_at: e.occurred_at,
                    note,
                })
            })
            .collect())
    }

    /// Order total in words, for the printed order.
    pub fn amount_in_words(&self, actor: &Principal, order_id: PurchaseOrderId) -> Result<String, WorkflowError> {
        let order = self.get(actor, order_id)?;
        words_for(&order)
    }

    /// Everything the printed order needs: totals in words and the
    /// signatures of whoever has signed off so far.
    pub fn printed_order(&self, actor: &Principal, order_id: PurchaseOrderId) -> Result<PrintedOrder, WorkflowError> {
        let order = self.get(actor, order_id)?;
        let amount_in_words = words_for(&order)?;

        let directory = &self.deps.directory;
        let company = directory.company().unwrap_or_default();
        let vendor = order.vendor_id().and_then(|v| directory.vendor(v));

        let state = order.approval_state();
        let coo_signed = state != ApprovalState::Draft;
        let md_signed = state == ApprovalState::MdApproved;

        Ok(PrintedOrder {
            company_name: Some(company.name).filter(|n| !n.is_empty()),
            vendor_name: vendor.as_ref().map(|v| v.name.clone()),
            vendor_signature: vendor.and_then(|v| v.signature),
            coo_signature: company.coo_signature.filter(|_| coo_signed),
            md_signature: company.md_signature.filter(|_| md_signed),
            amount_in_words,
            order,
        })
    }

    fn notify_vendor(&self, order: &PurchaseOrder) -> Result<(), MailError> {
        let directory = &self.deps.directory;

        let approved_by = order
            .approved_by()
            .map(|u| directory.display_name(u))
            .unwrap_or_default();
        let creator = order.created_by().and_then(|u| directory.user(u));
        let (contact_person, contact_email) = match creator {
            Some(profile) => (profile.name, profile.email),
            None => (String::new(), None),
        };

        let Some(notice) = VendorNotice::for_order(order, approved_by, contact_person, contact_email) else {
            return Ok(());
        };

        let to = directory
            .vendor(notice.vendor_id)
            .and_then(|v| v.email)
            .ok_or(MailError::NoRecipient)?;
        let from = self.deps.sender.sender_address().ok_or(MailError::NoSender)?;

        self.deps.mailer.send(OutgoingMail {
            from,
            to,
            subject: notice.subject.clone(),
            body: notice.body(),
            notice,
        })?;
        tracing::info!(order_id = %order.id_typed(), "vendor notified");
        Ok(())
    }
}

fn words_for(order: &PurchaseOrder) -> Result<String, WorkflowError> {
    let total = order
        .amount_total()
        .ok_or_else(|| ApprovalError::from(DomainError::validation("order total is out of range")))?;
    let currency = order
        .currency()
        .ok_or_else(|| ApprovalError::from(DomainError::invariant("order has no currency")))?;
    Ok(amount_to_words(total, currency)?)
}
