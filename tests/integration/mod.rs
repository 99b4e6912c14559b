//! Integration tests
//!
//! These tests wire real components together: registries, the failover
//! executor, budget stores (in-memory and SQLite) and the gateway facade.
//! Vendors are either scripted adapters or wiremock servers.

pub mod adapter_tests;
pub mod budget_tests;
pub mod database_tests;
pub mod failover_tests;
