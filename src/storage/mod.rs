//! Storage layer for the Gateway
//!
//! Chooses the budget store backend from configuration.

/// Database storage module
pub mod database;

use crate::config::StorageConfig;
use crate::core::budget::{BudgetStore, InMemoryBudgetStore};
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub use database::Database;

/// Connect and migrate the configured database, or fall back to memory
pub async fn budget_store(config: &StorageConfig) -> Result<Arc<dyn BudgetStore>> {
    if !config.database.enabled {
        debug!("Database disabled, budget counters are kept in memory");
        return Ok(Arc::new(InMemoryBudgetStore::new()));
    }

    info!("Initializing budget storage");
    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    Ok(Arc::new(database))
}
