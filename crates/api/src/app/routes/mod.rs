use axum::{Router, routing::get};

pub mod movements;
pub mod products;
pub mod reports;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route(
            "/movements",
            get(movements::list_movements).post(movements::create_movement),
        )
        .nest("/products", products::router())
        .nest("/reports", reports::router())
}
