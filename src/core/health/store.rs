//! Health state storage
//!
//! All mutations go through `compare_and_set`, so an implementation backed by a
//! shared store (Redis, a database row with a version column) can replace the
//! in-memory map without changing the tracker.

use super::types::ProviderHealthState;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt::Debug;

/// Result of a compare-and-set
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// Stored; carries the state with its new version
    Applied(ProviderHealthState),
    /// Version moved on; carries the current state
    Conflict(ProviderHealthState),
    /// Provider not registered
    Missing,
}

/// Key-to-state store for breaker state
#[async_trait]
pub trait HealthStore: Send + Sync + Debug {
    async fn get(&self, code: &str) -> Option<ProviderHealthState>;

    async fn list(&self) -> Vec<ProviderHealthState>;

    /// Create fresh state for `code`; existing state is kept. Returns whether
    /// a new entry was created.
    async fn register(&self, code: &str) -> bool;

    async fn remove(&self, code: &str) -> Option<ProviderHealthState>;

    /// Replace the state iff its version still equals `expected_version`
    async fn compare_and_set(
        &self,
        code: &str,
        expected_version: u64,
        new_state: ProviderHealthState,
    ) -> CasOutcome;
}

/// Instance-local store
#[derive(Debug, Default)]
pub struct InMemoryHealthStore {
    states: DashMap<String, ProviderHealthState>,
}

impl InMemoryHealthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HealthStore for InMemoryHealthStore {
    async fn get(&self, code: &str) -> Option<ProviderHealthState> {
        self.states.get(code).map(|entry| entry.value().clone())
    }

    async fn list(&self) -> Vec<ProviderHealthState> {
        let mut states: Vec<_> = self.states.iter().map(|e| e.value().clone()).collect();
        states.sort_by(|a, b| a.code.cmp(&b.code));
        states
    }

    async fn register(&self, code: &str) -> bool {
        let mut created = false;
        self.states.entry(code.to_string()).or_insert_with(|| {
            created = true;
            ProviderHealthState::new(code)
        });
        created
    }

    async fn remove(&self, code: &str) -> Option<ProviderHealthState> {
        self.states.remove(code).map(|(_, state)| state)
    }

    async fn compare_and_set(
        &self,
        code: &str,
        expected_version: u64,
        new_state: ProviderHealthState,
    ) -> CasOutcome {
        // The shard lock is held for the whole check-and-write
        match self.states.get_mut(code) {
            Some(mut entry) => {
                if entry.version != expected_version {
                    return CasOutcome::Conflict(entry.clone());
                }
                let mut next = new_state;
                next.code = code.to_string();
                next.version = expected_version + 1;
                *entry = next.clone();
                CasOutcome::Applied(next)
            }
            None => CasOutcome::Missing,
        }
    }
}
