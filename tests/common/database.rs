//! Test database utilities
//!
//! Each test gets an isolated in-memory SQLite database.

use provider_gateway::config::DatabaseConfig;
use provider_gateway::storage::database::Database;
use std::sync::Arc;

/// Migrated in-memory SQLite database
#[derive(Debug, Clone)]
pub struct TestDatabase {
    inner: Arc<Database>,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1, // In-memory DB only supports 1 connection
            connection_timeout: 5,
            enabled: true,
        };

        let db = Database::new(&config)
            .await
            .expect("Failed to create in-memory test database");
        db.migrate()
            .await
            .expect("Failed to run database migrations");

        Self {
            inner: Arc::new(db),
        }
    }

    pub fn db(&self) -> &Database {
        &self.inner
    }

    pub fn db_arc(&self) -> Arc<Database> {
        Arc::clone(&self.inner)
    }
}
