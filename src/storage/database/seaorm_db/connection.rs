use crate::config::DatabaseConfig;
use crate::utils::error::{GatewayError, Result};
use sea_orm::*;
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::super::entities;
use super::super::migration::Migrator;
use super::types::{DatabaseBackendType, SeaOrmDatabase};

const SQLITE_FALLBACK_URL: &str = "sqlite://data/gateway.db?mode=rwc";

impl SeaOrmDatabase {
    /// Connect, falling back to a local SQLite file when PostgreSQL is unreachable
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        match Self::try_connect(&config.url, config.max_connections, config.connection_timeout)
            .await
        {
            Ok(db) => {
                let backend_type = DatabaseBackendType::from_url(&config.url);
                info!("Database connection established ({:?})", backend_type);
                Ok(Self { db, backend_type })
            }
            Err(e) => {
                if config.url.starts_with("postgresql://") || config.url.starts_with("postgres://")
                {
                    warn!(
                        "PostgreSQL connection failed: {}. Attempting SQLite fallback...",
                        e
                    );
                    Self::fallback_to_sqlite().await
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Connect to `url` with default pool settings; no fallback
    pub async fn connect(url: &str) -> Result<Self> {
        let db = Self::try_connect(url, 5, 5).await?;
        Ok(Self {
            db,
            backend_type: DatabaseBackendType::from_url(url),
        })
    }

    async fn try_connect(
        url: &str,
        max_connections: u32,
        connection_timeout: u64,
    ) -> Result<DatabaseConnection> {
        // Every pooled connection to an in-memory SQLite database is a separate database
        let max_connections = if url.contains(":memory:") {
            1
        } else {
            max_connections
        };

        let mut opt = ConnectOptions::new(url.to_string());
        opt.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(connection_timeout))
            .acquire_timeout(Duration::from_secs(30))
            .sqlx_logging(true)
            .sqlx_logging_level(log::LevelFilter::Debug);
        if !url.contains(":memory:") {
            opt.idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(3600));
        }

        Database::connect(opt).await.map_err(GatewayError::Database)
    }

    async fn fallback_to_sqlite() -> Result<Self> {
        let data_dir = std::path::Path::new("data");
        if !data_dir.exists() {
            std::fs::create_dir_all(data_dir).map_err(|e| {
                GatewayError::Internal(format!("Failed to create data directory: {}", e))
            })?;
        }

        info!("Falling back to SQLite database: {}", SQLITE_FALLBACK_URL);
        let db = Self::try_connect(SQLITE_FALLBACK_URL, 5, 5).await?;

        info!("SQLite fallback connection established successfully");
        Ok(Self {
            db,
            backend_type: DatabaseBackendType::SQLite,
        })
    }

    pub fn backend_type(&self) -> DatabaseBackendType {
        self.backend_type
    }

    /// Check if using SQLite
    pub fn is_sqlite(&self) -> bool {
        self.backend_type == DatabaseBackendType::SQLite
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");
        Migrator::up(&self.db, None).await.map_err(|e| {
            warn!("Migration failed: {}", e);
            GatewayError::Database(e)
        })?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying database connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Close the database connection
    pub async fn close(self) -> Result<()> {
        self.db.close().await.map_err(GatewayError::Database)?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        debug!("Performing database health check");

        entities::BudgetCounter::find()
            .limit(1)
            .all(&self.db)
            .await
            .map_err(GatewayError::Database)?;

        debug!("Database health check passed");
        Ok(())
    }
}
