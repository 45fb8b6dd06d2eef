use std::sync::Arc;

use anyhow::Context;

use stockroom_infra::{InMemoryStockStore, PostgresStockStore, StockLedger, StockStore};

/// Type-erased store handle; the ledger is written once against the trait.
pub type DynStockStore = Arc<dyn StockStore>;

/// Shared application services injected into handlers.
pub struct AppServices {
    ledger: StockLedger<DynStockStore>,
}

impl AppServices {
    pub fn with_store(store: DynStockStore) -> Self {
        Self {
            ledger: StockLedger::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(InMemoryStockStore::new()))
    }

    pub fn ledger(&self) -> &StockLedger<DynStockStore> {
        &self.ledger
    }
}

/// Select the storage backend from the environment.
///
/// `USE_PERSISTENT_STORE=true` + `DATABASE_URL` selects Postgres; anything
/// else runs the in-memory store (demo mode, state is lost on restart).
pub async fn build_services() -> anyhow::Result<AppServices> {
    let use_persistent = std::env::var("USE_PERSISTENT_STORE")
        .map(|v| v == "true")
        .unwrap_or(false);

    if use_persistent {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set when USE_PERSISTENT_STORE=true")?;
        let store = PostgresStockStore::connect(&database_url)
            .await
            .context("failed to connect to Postgres")?;
        tracing::info!("using Postgres stock store");
        Ok(AppServices::with_store(Arc::new(store)))
    } else {
        tracing::info!("using in-memory stock store (demo mode; state is not persisted)");
        Ok(AppServices::in_memory())
    }
}
