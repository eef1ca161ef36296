use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stardust_infra::approval_workflow::WorkflowError;
use stardust_infra::portal::PortalError;
use stardust_purchasing::ErrorKind;

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    let status = match &err {
        WorkflowError::Rejected(e) => match e.kind() {
            ErrorKind::Permission => StatusCode::FORBIDDEN,
            ErrorKind::Stage => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
        },
        WorkflowError::Concurrency(_) => StatusCode::CONFLICT,
        WorkflowError::NotFound => StatusCode::NOT_FOUND,
        WorkflowError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Words(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "purchase order request failed");
    }
    json_error(status, err.code(), err.to_string())
}

pub fn portal_error_to_response(err: PortalError) -> axum::response::Response {
    match err {
        PortalError::Permission(msg) => json_error(StatusCode::FORBIDDEN, "permission_denied", msg),
        PortalError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "purchase order not found"),
        PortalError::InvalidQuery(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_query", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_id(what: &str) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what}"))
}
