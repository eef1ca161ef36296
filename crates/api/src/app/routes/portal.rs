//! Vendor portal: read-only listing of the caller's confirmed orders.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stardust_auth::Principal;
use stardust_infra::portal::{PortalError, PortalQuery};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_first_page))
        .route("/page/:page", get(list_page))
        .route("/:id", get(get_order))
}

fn portal_query(page: u64, params: dto::PortalListParams) -> Result<PortalQuery, PortalError> {
    let mut query = PortalQuery {
        page,
        search: params.search,
        ..PortalQuery::default()
    };
    if let Some(raw) = params.sortby.as_deref() {
        query.sortby = raw.parse()?;
    }
    if let Some(raw) = params.search_in.as_deref() {
        query.search_in = raw.parse()?;
    }
    Ok(query)
}

fn list(services: &AppServices, principal: &Principal, page: u64, params: dto::PortalListParams) -> axum::response::Response {
    let result = portal_query(page, params).and_then(|q| services.portal.list(principal, q));
    match result {
        Ok(page) => (StatusCode::OK, Json(dto::portal_page_to_json(&page))).into_response(),
        Err(e) => errors::portal_error_to_response(e),
    }
}

pub async fn list_first_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<dto::PortalListParams>,
) -> axum::response::Response {
    list(&services, &principal, 1, params)
}

pub async fn list_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(page): Path<u64>,
    Query(params): Query<dto::PortalListParams>,
) -> axum::response::Response {
    list(&services, &principal, page, params)
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.portal.detail(&principal, order_id) {
        Ok(rm) => (StatusCode::OK, Json(dto::read_model_to_json(&rm))).into_response(),
        Err(e) => errors::portal_error_to_response(e),
    }
}

#[cfg(test)]
mod tests {
    use stardust_infra::portal::{PortalSort, SearchIn};

    use super::*;

    #[test]
    fn query_params_are_parsed() {
        let q = portal_query(
            2,
            dto::PortalListParams {
                sortby: Some("price".to_string()),
                search: Some("PO0".to_string()),
                search_in: Some("all".to_string()),
            },
        )
        .unwrap();
        assert_eq!(q.page, 2);
        assert_eq!(q.sortby, PortalSort::Price);
        assert_eq!(q.search_in, SearchIn::All);

        let q = portal_query(1, dto::PortalListParams::default()).unwrap();
        assert_eq!(q, PortalQuery::default());

        let err = portal_query(
            1,
            dto::PortalListParams {
                sortby: Some("newest".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PortalError::InvalidQuery(_)));
    }
}
