use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use stockroom_catalog::{Product, ProductDraft, ProductUpdate};
use stockroom_core::{CategoryId, ProductId, SupplierId, UserId};
use stockroom_infra::MovementFilter;
use stockroom_ledger::{
    DetailedSalesReport, ExitReason, MovementDraft, MovementType, SalesSummary, StockMovement,
    StockReportRow,
};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub initial_stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub price_cost: i64,
    #[serde(default)]
    pub price_sale: i64,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub supplier_ids: Vec<SupplierId>,
}

impl CreateProductRequest {
    pub fn into_draft(self) -> ProductDraft {
        ProductDraft {
            sku: self.sku,
            name: self.name,
            initial_stock: self.initial_stock,
            min_stock: self.min_stock,
            price_cost: self.price_cost,
            price_sale: self.price_sale,
            category_id: self.category_id,
            supplier_ids: self.supplier_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub price_cost: i64,
    #[serde(default)]
    pub price_sale: i64,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub supplier_ids: Vec<SupplierId>,
}

impl UpdateProductRequest {
    pub fn into_update(self) -> ProductUpdate {
        ProductUpdate {
            sku: self.sku,
            name: self.name,
            min_stock: self.min_stock,
            price_cost: self.price_cost,
            price_sale: self.price_sale,
            category_id: self.category_id,
            supplier_ids: self.supplier_ids,
        }
    }
}

/// Query parameters of `GET /movements`. Everything optional; timestamps
/// are RFC3339 and the range is inclusive on both ends.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementQuery {
    pub product_id: Option<String>,
    pub user_id: Option<String>,
    pub r#type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl MovementQuery {
    pub fn into_filter(self) -> Result<MovementFilter, axum::response::Response> {
        let mut filter = MovementFilter::default();

        if let Some(product_id) = self.product_id {
            filter.product_id = Some(parse_field(&product_id, "productId", |s| s.parse().ok())?);
        }
        if let Some(user_id) = self.user_id {
            filter.user_id = Some(parse_field(&user_id, "userId", |s| s.parse().ok())?);
        }
        if let Some(movement_type) = self.r#type {
            filter.movement_type = Some(parse_field(&movement_type, "type", |s| {
                MovementType::parse(s).ok()
            })?);
        }
        if let Some(from) = self.from {
            filter.created_from = Some(parse_field(&from, "from", parse_timestamp)?);
        }
        if let Some(to) = self.to {
            filter.created_to = Some(parse_field(&to, "to", parse_timestamp)?);
        }

        Ok(filter)
    }
}

fn parse_timestamp(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

fn parse_field<T>(
    raw: &str,
    name: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, axum::response::Response> {
    parse(raw).ok_or_else(|| malformed(name))
}

/// Decode a movement request from a raw JSON body.
///
/// Decoded by hand (rather than a typed extractor) so that missing and
/// malformed fields all surface as the ledger's validation error shape.
pub fn movement_draft_from_json(body: &Value) -> Result<MovementDraft, axum::response::Response> {
    let product_id: ProductId = required_str(body, "productId")?
        .parse()
        .map_err(|_| malformed("productId"))?;
    let user_id: UserId = required_str(body, "userId")?
        .parse()
        .map_err(|_| malformed("userId"))?;
    let movement_type = MovementType::parse(required_str(body, "type")?)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))?;

    let quantity = match field(body, "quantity") {
        Some(v) => v.as_i64().ok_or_else(|| malformed("quantity"))?,
        None => return Err(malformed("quantity")),
    };

    let reason = match field(body, "reason") {
        Some(v) => {
            let raw = v.as_str().ok_or_else(|| malformed("reason"))?;
            Some(ExitReason::parse(raw).map_err(|e| {
                errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
            })?)
        }
        None => None,
    };

    let unit_price = match field(body, "unitPrice") {
        Some(v) => Some(v.as_i64().ok_or_else(|| malformed("unitPrice"))?),
        None => None,
    };

    let notes = match field(body, "notes") {
        Some(v) => Some(v.as_str().ok_or_else(|| malformed("notes"))?.to_string()),
        None => None,
    };

    Ok(MovementDraft {
        product_id,
        user_id,
        movement_type,
        quantity,
        reason,
        unit_price,
        notes,
    })
}

fn field<'a>(body: &'a Value, name: &str) -> Option<&'a Value> {
    body.get(name).filter(|v| !v.is_null())
}

fn required_str<'a>(body: &'a Value, name: &str) -> Result<&'a str, axum::response::Response> {
    field(body, name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed(name))
}

fn malformed(name: &str) -> axum::response::Response {
    errors::json_error(
        StatusCode::BAD_REQUEST,
        "validation_error",
        format!("missing or malformed field: {name}"),
    )
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn movement_to_json(m: &StockMovement) -> Value {
    json!({
        "id": m.id.to_string(),
        "productId": m.product_id.to_string(),
        "userId": m.user_id.to_string(),
        "type": m.movement_type,
        "quantity": m.quantity,
        "reason": m.reason,
        "unitPrice": m.unit_price,
        "notes": m.notes,
        "createdAt": m.created_at.to_rfc3339(),
    })
}

pub fn product_to_json(p: &Product) -> Value {
    json!({
        "id": p.id.to_string(),
        "sku": p.sku,
        "name": p.name,
        "stockQuantity": p.stock_quantity,
        "minStock": p.min_stock,
        "priceCost": p.price_cost,
        "priceSale": p.price_sale,
        "categoryId": p.category_id.map(|c| c.to_string()),
        "supplierIds": p.supplier_ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "createdAt": p.created_at.to_rfc3339(),
        "updatedAt": p.updated_at.to_rfc3339(),
    })
}

pub fn stock_row_to_json(row: &StockReportRow) -> Value {
    json!({
        "id": row.id.to_string(),
        "name": row.name,
        "sku": row.sku,
        "stockQuantity": row.stock_quantity,
        "minStock": row.min_stock,
        "priceCost": row.price_cost,
        "belowMin": row.below_min,
    })
}

pub fn sales_summary_to_json(summary: &SalesSummary) -> Value {
    json!({
        "totalSales": summary.total_sales,
        "totalItems": summary.total_items,
    })
}

pub fn detailed_sales_to_json(report: &DetailedSalesReport) -> Value {
    json!({
        "salesByProduct": report.sales_by_product.iter().map(|p| json!({
            "productId": p.product_id.to_string(),
            "productName": p.product_name,
            "sku": p.sku,
            "totalQuantity": p.total_quantity,
            "totalRevenue": p.total_revenue,
            "saleCount": p.sale_count,
        })).collect::<Vec<_>>(),
        "salesByPeriod": report.sales_by_period.iter().map(|d| json!({
            "date": d.date.to_string(),
            "saleCount": d.sale_count,
            "totalQuantity": d.total_quantity,
            "totalRevenue": d.total_revenue,
        })).collect::<Vec<_>>(),
        "topProducts": report.top_products.iter().map(|t| json!({
            "productName": t.product_name,
            "sku": t.sku,
            "totalQuantity": t.total_quantity,
            "totalRevenue": t.total_revenue,
        })).collect::<Vec<_>>(),
    })
}
