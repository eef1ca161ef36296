//! Read-only vendor portal.
//!
//! A vendor sees only its own orders, and only once they are confirmed
//! (`purchase`).

use core::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stardust_auth::{authorize, Principal, Role};
use stardust_purchasing::{OrderStatus, PurchaseOrderId, VendorId};

use crate::directory::Directory;
use crate::projections::purchasing::{PurchaseOrderReadModel, PurchaseOrdersProjection};
use crate::read_model::ReadStore;

/// Orders per portal page.
pub const PORTAL_PAGE_SIZE: u64 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortalError {
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("purchase order not found")]
    NotFound,
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortalSort {
    /// Newest approval first.
    #[default]
    Date,
    Name,
    /// Order total, ascending.
    Price,
}

impl FromStr for PortalSort {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(PortalSort::Date),
            "name" => Ok(PortalSort::Name),
            "price" => Ok(PortalSort::Price),
            other => Err(PortalError::InvalidQuery(format!(
                "sortby must be one of date, name, price (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchIn {
    #[default]
    Name,
    /// Order reference and line descriptions.
    All,
}

impl FromStr for SearchIn {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SearchIn::Name),
            "all" => Ok(SearchIn::All),
            other => Err(PortalError::InvalidQuery(format!(
                "search_in must be one of name, all (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortalQuery {
    pub page: u64,
    pub sortby: PortalSort,
    pub search: Option<String>,
    pub search_in: SearchIn,
}

impl Default for PortalQuery {
    fn default() -> Self {
        Self {
            page: 1,
            sortby: PortalSort::default(),
            search: None,
            search_in: SearchIn::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pager {
    pub page: u64,
    pub page_count: u64,
    pub offset: u64,
    pub total: u64,
    pub step: u64,
}

impl Pager {
    /// The requested page is clamped to `1..=page_count`; an empty result
    /// still has one (empty) page.
    pub fn new(total: u64, page: u64, step: u64) -> Self {
        let page_count = total.div_ceil(step).max(1);
        let page = page.clamp(1, page_count);
        Self {
            page,
            page_count,
            offset: (page - 1) * step,
            total,
            step,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalPage {
    pub orders: Vec<PurchaseOrderReadModel>,
    pub pager: Pager,
    /// Effective query, after defaults and clamping.
    pub query: PortalQuery,
}

pub struct VendorPortal<R>
where
    R: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    projection: Arc<PurchaseOrdersProjection<R>>,
    directory: Arc<dyn Directory>,
}

impl<R> VendorPortal<R>
where
    R: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    pub fn new(projection: Arc<PurchaseOrdersProjection<R>>, directory: Arc<dyn Directory>) -> Self {
        Self { projection, directory }
    }

    fn vendor_of(&self, actor: &Principal) -> Result<VendorId, PortalError> {
        authorize(actor, &Role::VENDOR).map_err(|e| PortalError::Permission(e.to_string()))?;
        self.directory
            .user(actor.user_id)
            .and_then(|u| u.vendor_id)
            .ok_or_else(|| PortalError::Permission("user is not linked to a vendor".to_string()))
    }

    fn visible(vendor_id: VendorId, order: &PurchaseOrderReadModel) -> bool {
        order.vendor_id == vendor_id && order.status == OrderStatus::Purchase
    }

    pub fn list(&self, actor: &Principal, query: PortalQuery) -> Result<PortalPage, PortalError> {
        let vendor_id = self.vendor_of(actor)?;

        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut orders = self
            .projection
            .list()
            .into_iter()
            .filter(|o| Self::visible(vendor_id, o))
            .filter(|o| match &needle {
                None => true,
                Some(n) => matches_search(o, n, query.search_in),
            })
            .collect::<Vec<_>>();

        match query.sortby {
            PortalSort::Date => orders.sort_by(|a, b| {
                b.date_approve
                    .cmp(&a.date_approve)
                    .then_with(|| a.name.cmp(&b.name))
            }),
            PortalSort::Name => orders.sort_by(|a, b| a.name.cmp(&b.name)),
            PortalSort::Price => orders.sort_by(|a, b| {
                a.amount_total
                    .cmp(&b.amount_total)
                    .then_with(|| a.name.cmp(&b.name))
            }),
        }

        let pager = Pager::new(orders.len() as u64, query.page, PORTAL_PAGE_SIZE);
        let orders = orders
            .into_iter()
            .skip(pager.offset as usize)
            .take(pager.step as usize)
            .collect();

        tracing::debug!(vendor_id = %vendor_id, total = pager.total, page = pager.page, "portal list");
        Ok(PortalPage {
            orders,
            pager,
            query: PortalQuery {
                page: pager.page,
                ..query
            },
        })
    }

    pub fn detail(&self, actor: &Principal, order_id: PurchaseOrderId) -> Result<PurchaseOrderReadModel, PortalError> {
        let vendor_id = self.vendor_of(actor)?;
        self.projection
            .get(&order_id)
            .filter(|o| Self::visible(vendor_id, o))
            .ok_or(PortalError::NotFound)
    }
}

fn matches_search(order: &PurchaseOrderReadModel, needle: &str, search_in: SearchIn) -> bool {
    let in_name = order.name.to_lowercase().contains(needle);
    match search_in {
        SearchIn::Name => in_name,
        SearchIn::All => {
            in_name
                || order
                    .lines
                    .iter()
                    .any(|l| l.description.to_lowercase().contains(needle))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pager_clamps_and_offsets() {
        assert_eq!(
            Pager::new(12, 3, 5),
            Pager {
                page: 3,
                page_count: 3,
                offset: 10,
                total: 12,
                step: 5
            }
        );
        assert_eq!(Pager::new(12, 9, 5).page, 3);
        assert_eq!(Pager::new(12, 0, 5).page, 1);

        let empty = Pager::new(0, 4, 5);
        assert_eq!((empty.page, empty.page_count, empty.offset), (1, 1, 0));
    }

    #[test]
    fn query_words_parse() {
        assert_eq!("price".parse::<PortalSort>(), Ok(PortalSort::Price));
        assert!("newest".parse::<PortalSort>().is_err());
        assert_eq!("all".parse::<SearchIn>(), Ok(SearchIn::All));
    }
}
