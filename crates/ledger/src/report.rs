//! Report computation over products and the movement log.
//!
//! Pure functions so the in-memory and relational backends share one
//! implementation. Sales revenue is priced at the product's **current**
//! sale price, not the price at movement time; `StockMovement::unit_price`
//! exists to change that later without breaking the interface.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_catalog::Product;
use stockroom_core::ProductId;

use crate::movement::StockMovement;

/// One row of the stock report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReportRow {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub stock_quantity: i64,
    pub min_stock: i64,
    pub price_cost: i64,
    pub below_min: bool,
}

/// Totals over all sale exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SalesSummary {
    /// Revenue in cents, priced at current sale prices.
    pub total_sales: i64,
    pub total_items: i64,
}

/// Per-product sales aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub total_quantity: i64,
    pub total_revenue: i64,
    pub sale_count: i64,
}

/// Per-calendar-day sales aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSales {
    pub date: NaiveDate,
    pub sale_count: i64,
    pub total_quantity: i64,
    pub total_revenue: i64,
}

/// Entry of the top-products ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_name: String,
    pub sku: String,
    pub total_quantity: i64,
    pub total_revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedSalesReport {
    /// Products with at least one sale, ordered by revenue descending.
    pub sales_by_product: Vec<ProductSales>,
    /// Calendar days within the trailing 30-day window, most recent first.
    pub sales_by_period: Vec<PeriodSales>,
    /// Top 10 products by quantity sold.
    pub top_products: Vec<TopProduct>,
}

/// Stock levels for every product, ordered by name, with the advisory
/// low-stock flag.
pub fn stock_report(products: &[Product]) -> Vec<StockReportRow> {
    let mut rows: Vec<StockReportRow> = products
        .iter()
        .map(|p| StockReportRow {
            id: p.id,
            name: p.name.clone(),
            sku: p.sku.clone(),
            stock_quantity: p.stock_quantity,
            min_stock: p.min_stock,
            price_cost: p.price_cost,
            below_min: p.below_min(),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.sku.cmp(&b.sku)));
    rows
}

/// Sum quantity and revenue over all sale exits.
///
/// Movements whose product is no longer resolvable are skipped (join
/// semantics); the deletion guard makes that unreachable in practice.
pub fn sales_summary(movements: &[StockMovement], products: &[Product]) -> SalesSummary {
    let by_id = index_products(products);
    let mut summary = SalesSummary::default();

    for movement in movements.iter().filter(|m| m.is_sale()) {
        let Some(product) = by_id.get(&movement.product_id) else {
            continue;
        };
        summary.total_items += movement.quantity;
        summary.total_sales += movement.quantity * product.price_sale;
    }

    summary
}

/// Three derived views over the sale-exit subset of the log.
///
/// `now` anchors the trailing 30-day window of `sales_by_period`; pass it
/// in so reports are reproducible in tests.
pub fn detailed_sales_report(
    movements: &[StockMovement],
    products: &[Product],
    now: DateTime<Utc>,
) -> DetailedSalesReport {
    let by_id = index_products(products);
    let window_start = now - Duration::days(30);

    let mut per_product: HashMap<ProductId, ProductSales> = HashMap::new();
    let mut per_day: HashMap<NaiveDate, PeriodSales> = HashMap::new();

    for movement in movements.iter().filter(|m| m.is_sale()) {
        let Some(product) = by_id.get(&movement.product_id) else {
            continue;
        };
        let revenue = movement.quantity * product.price_sale;

        let entry = per_product
            .entry(product.id)
            .or_insert_with(|| ProductSales {
                product_id: product.id,
                product_name: product.name.clone(),
                sku: product.sku.clone(),
                total_quantity: 0,
                total_revenue: 0,
                sale_count: 0,
            });
        entry.total_quantity += movement.quantity;
        entry.total_revenue += revenue;
        entry.sale_count += 1;

        if movement.created_at >= window_start && movement.created_at <= now {
            let date = movement.created_at.date_naive();
            let entry = per_day.entry(date).or_insert_with(|| PeriodSales {
                date,
                sale_count: 0,
                total_quantity: 0,
                total_revenue: 0,
            });
            entry.sale_count += 1;
            entry.total_quantity += movement.quantity;
            entry.total_revenue += revenue;
        }
    }

    let mut sales_by_product: Vec<ProductSales> = per_product.into_values().collect();
    sales_by_product.sort_by(|a, b| {
        b.total_revenue
            .cmp(&a.total_revenue)
            .then_with(|| a.sku.cmp(&b.sku))
    });

    let mut sales_by_period: Vec<PeriodSales> = per_day.into_values().collect();
    sales_by_period.sort_by(|a, b| b.date.cmp(&a.date));

    let mut top_products: Vec<TopProduct> = sales_by_product
        .iter()
        .map(|p| TopProduct {
            product_name: p.product_name.clone(),
            sku: p.sku.clone(),
            total_quantity: p.total_quantity,
            total_revenue: p.total_revenue,
        })
        .collect();
    top_products.sort_by(|a, b| {
        b.total_quantity
            .cmp(&a.total_quantity)
            .then_with(|| a.sku.cmp(&b.sku))
    });
    top_products.truncate(10);

    DetailedSalesReport {
        sales_by_product,
        sales_by_period,
        top_products,
    }
}

fn index_products(products: &[Product]) -> HashMap<ProductId, &Product> {
    products.iter().map(|p| (p.id, p)).collect()
}
