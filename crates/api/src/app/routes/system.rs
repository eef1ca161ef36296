use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use stardust_auth::Principal;
use stardust_infra::directory::Directory;

use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> impl IntoResponse {
    let profile = services.directory.user(principal.user_id);
    let mut roles = principal.roles.iter().map(|r| r.as_str()).collect::<Vec<_>>();
    roles.sort_unstable();

    Json(serde_json::json!({
        "user_id": principal.user_id.to_string(),
        "name": profile.as_ref().map(|p| p.name.clone()),
        "vendor_id": profile.and_then(|p| p.vendor_id).map(|v| v.to_string()),
        "roles": roles,
    }))
}
