use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use stardust_auth::Principal;
use stardust_infra::approval_workflow::{NewOrder, WorkflowError};
use stardust_purchasing::{PurchaseOrder, PurchaseOrderId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().nest("/orders", orders_router())
}

fn orders_router() -> Router {
    Router::new()
        .route("/", post(create_purchase_order).get(list_purchase_orders))
        .route("/:id", get(get_purchase_order))
        .route("/:id/lines", post(add_purchase_order_line))
        .route("/:id/lines/:line_no/price", put(change_line_price))
        .route("/:id/send", post(send_rfq))
        .route("/:id/confirm", post(confirm_purchase_order))
        .route("/:id/approve", post(approve_purchase_order))
        .route("/:id/finalize", post(finalize_purchase_order))
        .route("/:id/cancel", post(cancel_purchase_order))
        .route("/:id/reset", post(reset_purchase_order))
        .route("/:id/amount-in-words", get(amount_in_words))
        .route("/:id/print", get(printed_order))
        .route("/:id/audit", get(audit_trail))
}

fn order_response(status: StatusCode, result: Result<PurchaseOrder, WorkflowError>) -> axum::response::Response {
    match result {
        Ok(order) => (status, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

/// Shared shape of the body-less transition endpoints.
fn transition(
    id: &str,
    run: impl FnOnce(PurchaseOrderId) -> Result<PurchaseOrder, WorkflowError>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    order_response(StatusCode::OK, run(order_id))
}

pub async fn create_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::CreatePurchaseOrderRequest>,
) -> axum::response::Response {
    let vendor_id = match dto::parse_vendor_id(&body.vendor_id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let currency = match dto::parse_currency(&body.currency) {
        Ok(v) => v,
        Err(r) => return r,
    };

    let result = services.workflow.create_order(
        &principal,
        NewOrder {
            name: body.name,
            vendor_id,
            currency,
        },
    );
    order_response(StatusCode::CREATED, result)
}

pub async fn list_purchase_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    match services.workflow.list(&principal) {
        Ok(orders) => {
            let items = orders.iter().map(dto::read_model_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn get_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(&id, |order_id| services.workflow.get(&principal, order_id))
}

pub async fn add_purchase_order_line(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddLineRequest>,
) -> axum::response::Response {
    let unit_price = match dto::parse_amount(&body.unit_price) {
        Ok(v) => v,
        Err(r) => return r,
    };
    transition(&id, |order_id| {
        services
            .workflow
            .add_line(&principal, order_id, body.description, body.quantity, unit_price)
    })
}

pub async fn change_line_price(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path((id, line_no)): Path<(String, u32)>,
    Json(body): Json<dto::ChangePriceRequest>,
) -> axum::response::Response {
    let unit_price = match dto::parse_amount(&body.unit_price) {
        Ok(v) => v,
        Err(r) => return r,
    };
    transition(&id, |order_id| {
        services
            .workflow
            .change_line_price(&principal, order_id, line_no, unit_price)
    })
}

pub async fn send_rfq(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(&id, |order_id| services.workflow.mark_sent(&principal, order_id))
}

pub async fn confirm_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(&id, |order_id| services.workflow.confirm_step(&principal, order_id))
}

pub async fn approve_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::ApproveRequest>,
) -> axum::response::Response {
    transition(&id, |order_id| {
        services.workflow.approve_final(&principal, order_id, body.role)
    })
}

pub async fn finalize_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(&id, |order_id| services.workflow.finalize(&principal, order_id))
}

pub async fn cancel_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(&id, |order_id| services.workflow.cancel(&principal, order_id))
}

pub async fn reset_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(&id, |order_id| services.workflow.reset_to_draft(&principal, order_id))
}

pub async fn amount_in_words(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.workflow.amount_in_words(&principal, order_id) {
        Ok(words) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": order_id.to_string(), "amount_in_words": words })),
        )
            .into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn printed_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.workflow.printed_order(&principal, order_id) {
        Ok(printed) => (StatusCode::OK, Json(dto::printed_order_to_json(&printed))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn audit_trail(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.workflow.audit_trail(&principal, order_id) {
        Ok(entries) => (StatusCode::OK, Json(serde_json::json!({ "items": entries }))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
