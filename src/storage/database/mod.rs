//! Database storage implementation using SeaORM
//!
//! Persists budget counters and usage records. Enabled through
//! `storage.database`; without it the gateway keeps budgets in memory.

/// Database entities module
pub mod entities;
/// Database migration module
pub mod migration;
/// SeaORM database implementation module
pub mod seaorm_db;

pub use seaorm_db::SeaOrmDatabase as Database;
pub use seaorm_db::DatabaseBackendType;
