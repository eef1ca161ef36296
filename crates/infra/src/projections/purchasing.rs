use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use stardust_core::{AggregateId, Amount, CurrencyCode, UserId};
use stardust_events::EventEnvelope;
use stardust_purchasing::{
    ApprovalState, LineItem, OrderStatus, PurchaseOrderEvent,
    PurchaseOrderId, VendorId, AGGREGATE_TYPE,
};

use crate::read_model::ReadStore;

/// Query-side view of a purchase order (back office listing and vendor portal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseOrderReadModel {
    pub order_id: PurchaseOrderId,
    pub name: String,
    pub vendor_id: VendorId,
    pub currency: CurrencyCode,
    pub status: OrderStatus,
    pub approval_state: ApprovalState,
    pub requires_md_approval: bool,
    pub lines: Vec<LineItem>,
    pub amount_total: Amount,
    pub created_by: UserId,
    pub date_order: DateTime<Utc>,
    pub confirmed_by: Option<UserId>,
    pub approved_by: Option<UserId>,
    pub date_approve: Option<DateTime<Utc>>,
}

impl PurchaseOrderReadModel {
    fn recompute_total(&mut self) {
        self.amount_total = self
            .lines
            .iter()
            .filter_map(LineItem::subtotal)
            .fold(Amount::ZERO, |acc, s| acc.checked_add(s).unwrap_or(acc));
    }
}

#[derive(Debug, Error)]
pub enum PurchaseOrderProjectionError {
    #[error("failed to deserialize purchase order event: {0}")]
    Deserialize(String),
    #[error("event order_id does not match envelope aggregate_id")]
    StreamMismatch,
    #[error("event for unknown purchase order {0}")]
    UnknownOrder(PurchaseOrderId),
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Builds [`PurchaseOrderReadModel`]s from committed order events.
///
/// Idempotent per stream: envelopes at or below the stored cursor are skipped.
#[derive(Debug)]
pub struct PurchaseOrdersProjection<S>
where
    S: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> PurchaseOrdersProjection<S>
where
    S: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn get_cursor(&self, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => *cursors.get(&aggregate_id).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn update_cursor(&self, aggregate_id: AggregateId, seq: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(aggregate_id, seq);
        }
    }

    pub fn get(&self, order_id: &PurchaseOrderId) -> Option<PurchaseOrderReadModel> {
        self.store.get(order_id)
    }

    pub fn list(&self) -> Vec<PurchaseOrderReadModel> {
        self.store.list()
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), PurchaseOrderProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(aggregate_id);
        if seq == 0 {
            return Err(PurchaseOrderProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 {
            return Err(PurchaseOrderProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: PurchaseOrderEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| PurchaseOrderProjectionError::Deserialize(e.to_string()))?;

        let order_id = ev.order_id();
        if order_id.0 != aggregate_id {
            return Err(PurchaseOrderProjectionError::StreamMismatch);
        }

        let rm = match ev {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => PurchaseOrderReadModel {
                order_id: e.order_id,
                name: e.name,
                vendor_id: e.vendor_id,
                currency: e.currency,
                status: OrderStatus::Draft,
                approval_state: ApprovalState::Draft,
                requires_md_approval: false,
                lines: vec![],
                amount_total: Amount::ZERO,
                created_by: e.created_by,
                date_order: e.occurred_at,
                confirmed_by: None,
                approved_by: None,
                date_approve: None,
            },
            other => {
                let mut rm = self
                    .store
                    .get(&order_id)
                    .ok_or(PurchaseOrderProjectionError::UnknownOrder(order_id))?;
                apply_to_read_model(&mut rm, other);
                rm
            }
        };

        self.store.upsert(order_id, rm);
        self.update_cursor(aggregate_id, seq);
        Ok(())
    }

    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), PurchaseOrderProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        self.store.clear();
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }

        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}

fn apply_to_read_model(rm: &mut PurchaseOrderReadModel, ev: PurchaseOrderEvent) {
    match ev {
        PurchaseOrderEvent::PurchaseOrderCreated(_) => {}
        PurchaseOrderEvent::LineAdded(e) => {
            rm.lines.push(e.line);
            rm.recompute_total();
        }
        PurchaseOrderEvent::LinePriceChanged(e) => {
            if let Some(line) = rm.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                line.unit_price = e.unit_price;
            }
            rm.recompute_total();
        }
        PurchaseOrderEvent::MdRequirementRecomputed(e) => {
            rm.requires_md_approval = e.requires_md_approval;
        }
        PurchaseOrderEvent::RfqSent(_) => rm.status = OrderStatus::Sent,
        PurchaseOrderEvent::CooConfirmed(e) => {
            rm.approval_state = e.approval_state;
            rm.confirmed_by = Some(e.confirmed_by);
        }
        PurchaseOrderEvent::FinalApproved(e) => {
            rm.approval_state = e.role.approved_state();
            rm.approved_by = Some(e.approved_by);
        }
        PurchaseOrderEvent::OrderFinalized(e) => {
            rm.status = OrderStatus::Purchase;
            rm.date_approve = Some(e.occurred_at);
        }
        PurchaseOrderEvent::OrderCancelled(_) => rm.status = OrderStatus::Cancel,
        PurchaseOrderEvent::OrderReopened(_) => {
            rm.status = OrderStatus::Draft;
            rm.date_approve = None;
        }
        PurchaseOrderEvent::ApprovalReset(_) => {
            rm.approval_state = ApprovalState::Draft;
            rm.confirmed_by = None;
            rm.approved_by = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use stardust_events::Event;
    use stardust_purchasing::{LineAdded, PurchaseOrderCreated, RfqSent};

    use super::*;
    use crate::read_model::InMemoryReadStore;

    fn envelope(seq: u64, ev: &PurchaseOrderEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            Uuid::now_v7(),
            ev.order_id().0,
            AGGREGATE_TYPE,
            seq,
            ev.event_type(),
            ev.occurred_at(),
            serde_json::to_value(ev).unwrap(),
        )
    }

    fn created(order_id: PurchaseOrderId) -> PurchaseOrderEvent {
        PurchaseOrderEvent::PurchaseOrderCreated(PurchaseOrderCreated {
            order_id,
            name: "PO00007".to_string(),
            vendor_id: VendorId::new(AggregateId::new()),
            currency: CurrencyCode::new("USD").unwrap(),
            created_by: UserId::new(),
            occurred_at: Utc::now(),
        })
    }

    fn line_added(order_id: PurchaseOrderId, line_no: u32, quantity: i64, minor: i64) -> PurchaseOrderEvent {
        PurchaseOrderEvent::LineAdded(LineAdded {
            order_id,
            line: LineItem {
                line_no,
                description: format!("item {line_no}"),
                quantity,
                unit_price: Amount::from_minor(minor),
            },
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn builds_read_model_and_skips_replayed_envelopes() {
        let projection = PurchaseOrdersProjection::new(Arc::new(InMemoryReadStore::new()));
        let order_id = PurchaseOrderId::new(AggregateId::new());

        let envs = vec![
            envelope(1, &created(order_id)),
            envelope(2, &line_added(order_id, 1, 2, 1_000)),
            envelope(3, &line_added(order_id, 2, 1, 550)),
            envelope(
                4,
                &PurchaseOrderEvent::RfqSent(RfqSent {
                    order_id,
                    occurred_at: Utc::now(),
                }),
            ),
        ];
        for env in &envs {
            projection.apply_envelope(env).unwrap();
        }
        // At-least-once delivery: a duplicate is a no-op.
        projection.apply_envelope(&envs[1]).unwrap();

        let rm = projection.get(&order_id).unwrap();
        assert_eq!(rm.lines.len(), 2);
        assert_eq!(rm.amount_total, Amount::from_minor(2_550));
        assert_eq!(rm.status, OrderStatus::Sent);
    }

    #[test]
    fn gap_in_sequence_is_rejected() {
        let projection = PurchaseOrdersProjection::new(Arc::new(InMemoryReadStore::new()));
        let order_id = PurchaseOrderId::new(AggregateId::new());

        projection.apply_envelope(&envelope(1, &created(order_id))).unwrap();
        let err = projection
            .apply_envelope(&envelope(3, &line_added(order_id, 1, 1, 100)))
            .unwrap_err();
        assert!(matches!(
            err,
            PurchaseOrderProjectionError::NonMonotonicSequence { last: 1, found: 3 }
        ));
    }

    #[test]
    fn rebuild_replaces_existing_state() {
        let projection = PurchaseOrdersProjection::new(Arc::new(InMemoryReadStore::new()));
        let order_id = PurchaseOrderId::new(AggregateId::new());
        let envs = vec![
            envelope(2, &line_added(order_id, 1, 3, 100)),
            envelope(1, &created(order_id)),
        ];

        projection.rebuild_from_scratch(envs.clone()).unwrap();
        projection.rebuild_from_scratch(envs).unwrap();

        let rm = projection.get(&order_id).unwrap();
        assert_eq!(rm.amount_total, Amount::from_minor(300));
        assert_eq!(projection.list().len(), 1);
    }
}
