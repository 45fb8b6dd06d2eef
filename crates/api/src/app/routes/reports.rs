use std::sync::Arc;

use axum::{
    Json, Router, extract::Extension, http::StatusCode, response::IntoResponse, routing::get,
};
use chrono::Utc;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/stock", get(stock_report))
        .route("/sales", get(sales_report))
        .route("/sales/detailed", get(detailed_sales_report))
}

pub async fn stock_report(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger().stock_report().await {
        Ok(rows) => {
            let body: Vec<_> = rows.iter().map(dto::stock_row_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn sales_report(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger().sales_report().await {
        Ok(summary) => (StatusCode::OK, Json(dto::sales_summary_to_json(&summary))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn detailed_sales_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if !principal.is_admin() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "detailed sales reporting requires the admin role",
        );
    }

    match services.ledger().detailed_sales_report(Utc::now()).await {
        Ok(report) => (StatusCode::OK, Json(dto::detailed_sales_to_json(&report))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
