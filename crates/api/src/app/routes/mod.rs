use axum::{routing::get, Router};

pub mod admin;
pub mod portal;
pub mod purchases;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/purchases", purchases::router())
        .nest("/my/purchase-orders", portal::router())
        .nest("/admin", admin::router())
}
