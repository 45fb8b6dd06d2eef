//! HTTP application wiring (axum router + service wiring).
//!
//! - `services.rs`: storage backend selection and the ledger service handle
//! - `routes/`: HTTP routes + handlers (one file per surface area)
//! - `dto.rs`: request/response mapping to/from domain types
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use stockroom_auth::StaticTokenAuth;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub async fn build_app(tokens: StaticTokenAuth) -> anyhow::Result<Router> {
    let auth_state = middleware::AuthState {
        tokens: Arc::new(tokens),
    };

    let services = Arc::new(services::build_services().await?);

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new()))
}
