use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use stockroom_catalog::{Product, ProductDraft, ProductUpdate};
use stockroom_core::{MovementId, ProductId};
use stockroom_ledger::{MovementDraft, StockMovement, next_balance};

use super::r#trait::{MovementFilter, StockStore, StoreError};

/// In-memory store for demos and tests. Not optimized for performance.
///
/// The check-then-act sequence of `apply_movement` is serialized per
/// product through a mutex registry keyed by product id; movements against
/// different products proceed in parallel. `delete_product` takes the same
/// product mutex, so a movement can never slip in between the reference
/// check and the removal.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    products: RwLock<HashMap<ProductId, Product>>,
    movements: RwLock<Vec<StockMovement>>,
    product_locks: Mutex<HashMap<ProductId, Arc<Mutex<()>>>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn product_lock(&self, id: ProductId) -> Result<Arc<Mutex<()>>, StoreError> {
        let mut locks = self.product_locks.lock().map_err(|_| poisoned())?;
        Ok(locks.entry(id).or_default().clone())
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        if products.values().any(|p| p.sku == draft.sku) {
            return Err(StoreError::DuplicateSku(draft.sku));
        }

        let product = draft.into_product(ProductId::new(), Utc::now());
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        let mut all: Vec<Product> = products.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.sku.cmp(&b.sku)));
        Ok(all)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        if products
            .values()
            .any(|p| p.id != id && p.sku == update.sku)
        {
            return Err(StoreError::DuplicateSku(update.sku));
        }

        let Some(existing) = products.get(&id) else {
            return Err(StoreError::NotFound);
        };
        let updated = update.apply_to(existing, Utc::now());
        products.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let lock = self.product_lock(id)?;
        let _guard = lock.lock().map_err(|_| poisoned())?;

        {
            let products = self.products.read().map_err(|_| poisoned())?;
            if !products.contains_key(&id) {
                return Err(StoreError::NotFound);
            }
        }
        {
            let movements = self.movements.read().map_err(|_| poisoned())?;
            if movements.iter().any(|m| m.product_id == id) {
                return Err(StoreError::MovementsReferenced);
            }
        }

        let mut products = self.products.write().map_err(|_| poisoned())?;
        products.remove(&id).ok_or(StoreError::NotFound)?;
        Ok(())
    }

    async fn apply_movement(&self, draft: MovementDraft) -> Result<StockMovement, StoreError> {
        let lock = self.product_lock(draft.product_id)?;
        let _guard = lock.lock().map_err(|_| poisoned())?;

        let balance = {
            let products = self.products.read().map_err(|_| poisoned())?;
            products
                .get(&draft.product_id)
                .ok_or(StoreError::NotFound)?
                .stock_quantity
        };

        let new_balance = next_balance(draft.movement_type, draft.quantity, balance)
            .map_err(StoreError::Rejected)?;

        // Commit: balance write and log append together under the product
        // guard. The timestamp is taken while holding the log lock so
        // created_at is non-decreasing in insertion order.
        let mut products = self.products.write().map_err(|_| poisoned())?;
        let mut movements = self.movements.write().map_err(|_| poisoned())?;
        let Some(product) = products.get_mut(&draft.product_id) else {
            return Err(StoreError::NotFound);
        };

        let movement = draft.accept(MovementId::new(), Utc::now());
        product.stock_quantity = new_balance;
        product.updated_at = movement.created_at;
        movements.push(movement.clone());
        Ok(movement)
    }

    async fn query_movements(
        &self,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, StoreError> {
        let movements = self.movements.read().map_err(|_| poisoned())?;
        // Insertion order is created_at ascending; reversing yields most
        // recent first.
        Ok(movements
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::{SupplierId, UserId};
    use stockroom_ledger::{ExitReason, MovementType};

    fn draft(sku: &str, name: &str, initial_stock: i64) -> ProductDraft {
        ProductDraft {
            sku: sku.to_string(),
            name: name.to_string(),
            initial_stock,
            min_stock: 5,
            price_cost: 100,
            price_sale: 200,
            category_id: None,
            supplier_ids: vec![],
        }
    }

    fn movement(product_id: ProductId, movement_type: MovementType, quantity: i64) -> MovementDraft {
        MovementDraft {
            product_id,
            user_id: UserId::new(),
            movement_type,
            quantity,
            reason: match movement_type {
                MovementType::Exit => Some(ExitReason::Sale),
                _ => None,
            },
            unit_price: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn duplicate_sku_is_rejected() {
        let store = InMemoryStockStore::new();
        store.insert_product(draft("SKU-1", "Widget", 0)).await.unwrap();

        let err = store
            .insert_product(draft("SKU-1", "Other widget", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSku(sku) if sku == "SKU-1"));
    }

    #[tokio::test]
    async fn update_rejects_sku_taken_by_another_product() {
        let store = InMemoryStockStore::new();
        store.insert_product(draft("SKU-1", "Widget", 0)).await.unwrap();
        let other = store.insert_product(draft("SKU-2", "Gadget", 0)).await.unwrap();

        let update = ProductUpdate {
            sku: "SKU-1".to_string(),
            name: "Gadget".to_string(),
            min_stock: 5,
            price_cost: 100,
            price_sale: 200,
            category_id: None,
            supplier_ids: vec![SupplierId::new()],
        };
        let err = store.update_product(other.id, update).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSku(_)));
    }

    #[tokio::test]
    async fn update_never_touches_the_balance() {
        let store = InMemoryStockStore::new();
        let product = store.insert_product(draft("SKU-1", "Widget", 40)).await.unwrap();

        let update = ProductUpdate {
            sku: "SKU-1".to_string(),
            name: "Widget mk2".to_string(),
            min_stock: 8,
            price_cost: 120,
            price_sale: 240,
            category_id: None,
            supplier_ids: vec![],
        };
        let updated = store.update_product(product.id, update).await.unwrap();
        assert_eq!(updated.stock_quantity, 40);
        assert_eq!(updated.name, "Widget mk2");
    }

    #[tokio::test]
    async fn unreferenced_product_can_be_deleted() {
        let store = InMemoryStockStore::new();
        let product = store.insert_product(draft("SKU-1", "Widget", 0)).await.unwrap();

        store.delete_product(product.id).await.unwrap();
        assert!(store.get_product(product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn referenced_product_cannot_be_deleted() {
        let store = InMemoryStockStore::new();
        let product = store.insert_product(draft("SKU-1", "Widget", 0)).await.unwrap();
        store
            .apply_movement(movement(product.id, MovementType::Entry, 5))
            .await
            .unwrap();

        let err = store.delete_product(product.id).await.unwrap_err();
        assert!(matches!(err, StoreError::MovementsReferenced));

        // The product (and its balance) survives the attempt.
        let survivor = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(survivor.stock_quantity, 5);
    }

    #[tokio::test]
    async fn movement_records_are_stable_once_created() {
        let store = InMemoryStockStore::new();
        let product = store.insert_product(draft("SKU-1", "Widget", 0)).await.unwrap();

        let recorded = store
            .apply_movement(movement(product.id, MovementType::Entry, 5))
            .await
            .unwrap();

        // Pile more operations on top and re-read the original record.
        store
            .apply_movement(movement(product.id, MovementType::Exit, 2))
            .await
            .unwrap();
        store
            .apply_movement(movement(product.id, MovementType::Adjustment, 9))
            .await
            .unwrap();

        let all = store.query_movements(&MovementFilter::default()).await.unwrap();
        let found = all.iter().find(|m| m.id == recorded.id).unwrap();
        assert_eq!(*found, recorded);
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn movements_are_listed_most_recent_first() {
        let store = InMemoryStockStore::new();
        let product = store.insert_product(draft("SKU-1", "Widget", 0)).await.unwrap();

        let first = store
            .apply_movement(movement(product.id, MovementType::Entry, 1))
            .await
            .unwrap();
        let second = store
            .apply_movement(movement(product.id, MovementType::Entry, 2))
            .await
            .unwrap();

        let all = store.query_movements(&MovementFilter::default()).await.unwrap();
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
        assert!(all[0].created_at >= all[1].created_at);
    }

    #[tokio::test]
    async fn filters_narrow_the_movement_list() {
        let store = InMemoryStockStore::new();
        let widget = store.insert_product(draft("SKU-1", "Widget", 0)).await.unwrap();
        let gadget = store.insert_product(draft("SKU-2", "Gadget", 0)).await.unwrap();

        let user = UserId::new();
        let mut entry = movement(widget.id, MovementType::Entry, 10);
        entry.user_id = user;
        store.apply_movement(entry).await.unwrap();

        let mut exit = movement(widget.id, MovementType::Exit, 4);
        exit.user_id = user;
        store.apply_movement(exit).await.unwrap();

        store
            .apply_movement(movement(gadget.id, MovementType::Entry, 7))
            .await
            .unwrap();

        let by_product = MovementFilter {
            product_id: Some(widget.id),
            ..Default::default()
        };
        assert_eq!(store.query_movements(&by_product).await.unwrap().len(), 2);

        let by_type = MovementFilter {
            movement_type: Some(MovementType::Exit),
            ..Default::default()
        };
        let exits = store.query_movements(&by_type).await.unwrap();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].quantity, 4);

        let by_user = MovementFilter {
            user_id: Some(user),
            ..Default::default()
        };
        assert_eq!(store.query_movements(&by_user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn created_range_is_inclusive_on_both_ends() {
        let store = InMemoryStockStore::new();
        let product = store.insert_product(draft("SKU-1", "Widget", 0)).await.unwrap();
        let recorded = store
            .apply_movement(movement(product.id, MovementType::Entry, 1))
            .await
            .unwrap();

        let pinned = MovementFilter {
            created_from: Some(recorded.created_at),
            created_to: Some(recorded.created_at),
            ..Default::default()
        };
        assert_eq!(store.query_movements(&pinned).await.unwrap().len(), 1);

        let after = MovementFilter {
            created_from: Some(recorded.created_at + chrono::Duration::seconds(1)),
            ..Default::default()
        };
        assert!(store.query_movements(&after).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn movement_for_unknown_product_is_not_found() {
        let store = InMemoryStockStore::new();
        let err = store
            .apply_movement(movement(ProductId::new(), MovementType::Entry, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
