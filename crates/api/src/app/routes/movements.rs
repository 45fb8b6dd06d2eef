use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub async fn create_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<serde_json::Value>,
) -> axum::response::Response {
    let draft = match dto::movement_draft_from_json(&body) {
        Ok(draft) => draft,
        Err(resp) => return resp,
    };

    match services.ledger().record_movement(draft).await {
        Ok(movement) => (
            StatusCode::CREATED,
            Json(dto::movement_to_json(&movement)),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::MovementQuery>,
) -> axum::response::Response {
    let mut filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(resp) => return resp,
    };

    // Access policy, not a ledger rule: operators see only their own
    // movements, whatever filter they asked for.
    if !principal.is_admin() {
        filter.user_id = Some(principal.user_id());
    }

    match services.ledger().list_movements(&filter).await {
        Ok(movements) => {
            let body: Vec<_> = movements.iter().map(dto::movement_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}
