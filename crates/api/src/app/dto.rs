use serde::Deserialize;
use serde_json::json;

use stardust_core::{AggregateId, Amount, CurrencyCode, UserId};
use stardust_infra::approval_workflow::PrintedOrder;
use stardust_infra::directory::UserProfile;
use stardust_infra::portal::PortalPage;
use stardust_infra::projections::purchasing::PurchaseOrderReadModel;
use stardust_purchasing::{Approver, LineItem, PurchaseOrder, PurchaseOrderId, VendorId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderRequest {
    pub name: Option<String>,
    pub vendor_id: String,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub description: String,
    pub quantity: i64,
    /// Decimal string, e.g. `"1250.50"`.
    pub unit_price: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePriceRequest {
    pub unit_price: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub role: Approver,
}

#[derive(Debug, Default, Deserialize)]
pub struct PortalListParams {
    pub sortby: Option<String>,
    pub search: Option<String>,
    pub search_in: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterVendorRequest {
    pub name: String,
    pub email: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompanyRequest {
    pub name: String,
    pub coo_signature: Option<String>,
    pub md_signature: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertUserRequest {
    pub name: String,
    pub email: Option<String>,
    pub vendor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetParamRequest {
    pub value: String,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_order_id(raw: &str) -> Result<PurchaseOrderId, axum::response::Response> {
    raw.parse::<AggregateId>()
        .map(PurchaseOrderId::new)
        .map_err(|_| errors::invalid_id("purchase order id"))
}

pub fn parse_vendor_id(raw: &str) -> Result<VendorId, axum::response::Response> {
    raw.parse::<AggregateId>()
        .map(VendorId::new)
        .map_err(|_| errors::invalid_id("vendor_id"))
}

pub fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse::<UserId>().map_err(|_| errors::invalid_id("user id"))
}

pub fn parse_amount(raw: &str) -> Result<Amount, axum::response::Response> {
    raw.parse::<Amount>().map_err(|e| {
        errors::json_error(axum::http::StatusCode::BAD_REQUEST, "invalid_amount", e.to_string())
    })
}

pub fn parse_currency(raw: &str) -> Result<CurrencyCode, axum::response::Response> {
    CurrencyCode::new(raw).map_err(|e| {
        errors::json_error(axum::http::StatusCode::BAD_REQUEST, "invalid_currency", e.to_string())
    })
}

// -------------------------
// Response mapping
// -------------------------

fn line_to_json(l: &LineItem) -> serde_json::Value {
    json!({
        "line_no": l.line_no,
        "description": l.description,
        "quantity": l.quantity,
        "unit_price": l.unit_price.to_string(),
        "subtotal": l.subtotal().map(|s| s.to_string()),
    })
}

pub fn order_to_json(order: &PurchaseOrder) -> serde_json::Value {
    json!({
        "id": order.id_typed().to_string(),
        "name": order.name(),
        "vendor_id": order.vendor_id().map(|v| v.to_string()),
        "currency": order.currency().map(|c| c.to_string()),
        "status": order.status().as_str(),
        "approval_state": order.approval_state().as_str(),
        "approval_label": order.approval_state().label(),
        "requires_md_approval": order.requires_md_approval(),
        "amount_total": order.amount_total().map(|a| a.to_string()),
        "lines": order.lines().iter().map(line_to_json).collect::<Vec<_>>(),
        "created_by": order.created_by().map(|u| u.to_string()),
        "date_order": order.date_order(),
        "confirmed_by": order.confirmed_by().map(|u| u.to_string()),
        "confirmed_date": order.confirmed_date(),
        "approved_by": order.approved_by().map(|u| u.to_string()),
        "date_approve": order.date_approve(),
    })
}

pub fn printed_order_to_json(printed: &PrintedOrder) -> serde_json::Value {
    json!({
        "order": order_to_json(&printed.order),
        "company_name": printed.company_name,
        "vendor_name": printed.vendor_name,
        "amount_in_words": printed.amount_in_words,
        "coo_signature": printed.coo_signature,
        "md_signature": printed.md_signature,
        "vendor_signature": printed.vendor_signature,
    })
}

/// Blank signature uploads clear the image.
pub fn signature(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn read_model_to_json(rm: &PurchaseOrderReadModel) -> serde_json::Value {
    json!({
        "id": rm.order_id.to_string(),
        "name": rm.name,
        "vendor_id": rm.vendor_id.to_string(),
        "currency": rm.currency.to_string(),
        "status": rm.status.as_str(),
        "approval_state": rm.approval_state.as_str(),
        "requires_md_approval": rm.requires_md_approval,
        "amount_total": rm.amount_total.to_string(),
        "lines": rm.lines.iter().map(line_to_json).collect::<Vec<_>>(),
        "date_order": rm.date_order,
        "date_approve": rm.date_approve,
    })
}

pub fn portal_page_to_json(page: &PortalPage) -> serde_json::Value {
    json!({
        "items": page.orders.iter().map(read_model_to_json).collect::<Vec<_>>(),
        "pager": page.pager,
        "query": page.query,
    })
}

pub fn user_to_json(profile: &UserProfile) -> serde_json::Value {
    json!({
        "id": profile.user_id.to_string(),
        "name": profile.name,
        "email": profile.email,
        "vendor_id": profile.vendor_id.map(|v| v.to_string()),
    })
}
