//! Admin routes: directory entries, the company profile, runtime parameters
//! and the mail outbox.
//!
//! All endpoints require the `admin` role.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use stardust_auth::{authorize, Principal, Role};
use stardust_core::AggregateId;
use stardust_infra::config::{md_approval_threshold, ConfigParameters, MD_APPROVAL_THRESHOLD_KEY, SMTP_FROM_KEY};
use stardust_infra::directory::{CompanyProfile, UserProfile, VendorProfile};
use stardust_purchasing::VendorId;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/vendors", post(register_vendor))
        .route("/company", put(set_company))
        .route("/users/:id", put(upsert_user))
        .route("/params/:key", put(set_param))
        .route("/outbox", get(list_outbox))
}

fn require_admin(principal: &Principal) -> Result<(), axum::response::Response> {
    authorize(principal, &Role::ADMIN)
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "permission_denied", e.to_string()))
}

/// POST /admin/vendors
pub async fn register_vendor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::RegisterVendorRequest>,
) -> axum::response::Response {
    if let Err(r) = require_admin(&principal) {
        return r;
    }
    if body.name.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "vendor name is required");
    }

    let vendor_id = VendorId::new(AggregateId::new());
    services.directory.upsert_vendor(VendorProfile {
        vendor_id,
        name: body.name,
        email: body.email,
        signature: dto::signature(body.signature),
    });
    tracing::info!(vendor_id = %vendor_id, "vendor registered");

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": vendor_id.to_string() })),
    )
        .into_response()
}

/// PUT /admin/company
///
/// Company name and the COO and MD signatures printed on approved orders.
pub async fn set_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::CompanyRequest>,
) -> axum::response::Response {
    if let Err(r) = require_admin(&principal) {
        return r;
    }
    if body.name.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "company name is required");
    }

    let profile = CompanyProfile {
        name: body.name.trim().to_string(),
        coo_signature: dto::signature(body.coo_signature),
        md_signature: dto::signature(body.md_signature),
    };
    services.directory.set_company(profile.clone());
    tracing::info!(
        coo_signature = profile.coo_signature.is_some(),
        md_signature = profile.md_signature.is_some(),
        "company profile updated"
    );
    (StatusCode::OK, Json(profile)).into_response()
}

/// PUT /admin/users/:id
pub async fn upsert_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpsertUserRequest>,
) -> axum::response::Response {
    if let Err(r) = require_admin(&principal) {
        return r;
    }
    let user_id = match dto::parse_user_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let vendor_id = match body.vendor_id.as_deref().map(dto::parse_vendor_id).transpose() {
        Ok(v) => v,
        Err(r) => return r,
    };

    let profile = UserProfile {
        user_id,
        name: body.name,
        email: body.email,
        vendor_id,
    };
    services.directory.upsert_user(profile.clone());
    (StatusCode::OK, Json(dto::user_to_json(&profile))).into_response()
}

/// PUT /admin/params/:key
///
/// Only the known keys are writable; the threshold is validated before it
/// is stored.
pub async fn set_param(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(key): Path<String>,
    Json(body): Json<dto::SetParamRequest>,
) -> axum::response::Response {
    if let Err(r) = require_admin(&principal) {
        return r;
    }
    match key.as_str() {
        MD_APPROVAL_THRESHOLD_KEY => {
            if let Err(r) = dto::parse_amount(&body.value) {
                return r;
            }
        }
        SMTP_FROM_KEY => {}
        _ => return errors::json_error(StatusCode::NOT_FOUND, "unknown_parameter", format!("unknown parameter '{key}'")),
    }

    services.params.set_param(&key, body.value.clone());
    tracing::info!(key = %key, "parameter updated");

    let threshold = md_approval_threshold(services.params.as_ref())
        .map(|t| t.to_string())
        .ok();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "key": key,
            "value": body.value,
            "md_approval_threshold": threshold,
        })),
    )
        .into_response()
}

/// GET /admin/outbox
pub async fn list_outbox(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    if let Err(r) = require_admin(&principal) {
        return r;
    }
    let items = services.outbox.sent();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
