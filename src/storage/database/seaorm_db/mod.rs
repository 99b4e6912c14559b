// Module declarations
mod budget_ops;
mod connection;
mod conversions;
mod types;

// Re-export public types
pub use types::{DatabaseBackendType, SeaOrmDatabase};
