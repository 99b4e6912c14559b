//! Provider Registry
//!
//! Builds one adapter per active descriptor and answers ordering questions.
//! A registry is immutable once built; a reload builds a new one.

use super::contract::ProviderAdapter;
use super::http_messaging::HttpMessagingAdapter;
use super::openai_compatible::OpenAiCompatibleAdapter;
use crate::config::{ProviderDescriptor, ProviderKind};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds an uninitialized adapter for a descriptor
pub type AdapterConstructor =
    Arc<dyn Fn(&ProviderDescriptor) -> Box<dyn ProviderAdapter> + Send + Sync>;

/// Registration map from vendor family to adapter constructor
#[derive(Clone, Default)]
pub struct AdapterFactory {
    constructors: HashMap<ProviderKind, AdapterConstructor>,
}

impl AdapterFactory {
    /// Factory with no constructors
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory populated with the built-in adapters
    pub fn with_builtin() -> Self {
        let mut factory = Self::new();
        factory.register(ProviderKind::OpenAiCompatible, |d| {
            Box::new(OpenAiCompatibleAdapter::new(d))
        });
        factory.register(ProviderKind::HttpMessaging, |d| {
            Box::new(HttpMessagingAdapter::new(d))
        });
        factory
    }

    /// Register or replace the constructor for a kind
    pub fn register<F>(&mut self, kind: ProviderKind, constructor: F) -> &mut Self
    where
        F: Fn(&ProviderDescriptor) -> Box<dyn ProviderAdapter> + Send + Sync + 'static,
    {
        self.constructors.insert(kind, Arc::new(constructor));
        self
    }

    pub fn supports(&self, kind: ProviderKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Construct an adapter, `None` when the kind has no constructor
    pub fn create(&self, descriptor: &ProviderDescriptor) -> Option<Box<dyn ProviderAdapter>> {
        self.constructors
            .get(&descriptor.kind())
            .map(|constructor| constructor(descriptor))
    }
}

impl fmt::Debug for AdapterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterFactory")
            .field("kinds", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An initialized adapter with the descriptor it was built from
#[derive(Debug, Clone)]
pub struct RegisteredProvider {
    pub descriptor: ProviderDescriptor,
    pub adapter: Arc<dyn ProviderAdapter>,
}

impl RegisteredProvider {
    pub fn code(&self) -> &str {
        &self.descriptor.code
    }
}

/// One registry generation
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registration order (primary-flagged first, then configured order)
    providers: Vec<RegisteredProvider>,
    index: HashMap<String, usize>,
    primary: Option<String>,
    secondary: Option<String>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from descriptors
    ///
    /// Inactive descriptors are skipped, duplicates keep the first occurrence,
    /// and a provider whose construction or initialization fails is logged and
    /// left out. This never fails as a whole.
    pub async fn initialize(descriptors: &[ProviderDescriptor], factory: &AdapterFactory) -> Self {
        let mut seen = HashSet::new();
        let mut candidates: Vec<&ProviderDescriptor> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors.iter().filter(|d| d.is_active) {
            if seen.insert(descriptor.code.as_str()) {
                candidates.push(descriptor);
            } else {
                warn!("Duplicate provider code {}, keeping the first", descriptor.code);
            }
        }
        // Stable: configured order is preserved within each group
        candidates.sort_by_key(|d| !d.is_primary);

        let mut registry = Self::new();
        for descriptor in candidates {
            let Some(mut adapter) = factory.create(descriptor) else {
                warn!(
                    "No adapter registered for provider {} of kind {}",
                    descriptor.code,
                    descriptor.kind()
                );
                continue;
            };

            match adapter.initialize(descriptor).await {
                Ok(()) => {
                    debug!(provider = %descriptor.code, kind = %descriptor.kind(), "Provider initialized");
                    registry.push(RegisteredProvider {
                        descriptor: descriptor.clone(),
                        adapter: Arc::from(adapter),
                    });
                }
                Err(e) => warn!("Provider {} excluded: {}", descriptor.code, e),
            }
        }

        registry.elect();
        info!(
            providers = registry.len(),
            primary = registry.primary().unwrap_or("-"),
            secondary = registry.secondary().unwrap_or("-"),
            "Provider registry built"
        );
        registry
    }

    fn push(&mut self, provider: RegisteredProvider) {
        self.index
            .insert(provider.code().to_string(), self.providers.len());
        self.providers.push(provider);
    }

    /// Primary is the first registered provider flagged primary, else the first
    /// registered; secondary is the first registered provider that is not it.
    fn elect(&mut self) {
        self.primary = self
            .providers
            .iter()
            .find(|p| p.descriptor.is_primary)
            .or_else(|| self.providers.first())
            .map(|p| p.code().to_string());

        self.secondary = self
            .providers
            .iter()
            .find(|p| Some(p.code()) != self.primary.as_deref())
            .map(|p| p.code().to_string());
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn secondary(&self) -> Option<&str> {
        self.secondary.as_deref()
    }

    /// Get provider by code
    pub fn get(&self, code: &str) -> Option<&RegisteredProvider> {
        self.index.get(code).map(|&i| &self.providers[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// Registered codes in registration order
    pub fn codes(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.code().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredProvider> {
        self.providers.iter()
    }

    /// Get provider count
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Attempt order: preferred (if registered), primary, secondary, then the
    /// rest in registration order, without duplicates
    pub fn get_order(&self, preferred: Option<&str>) -> Vec<String> {
        let mut order: Vec<String> = Vec::with_capacity(self.providers.len());
        let mut push = |code: &str| {
            if self.contains(code) && !order.iter().any(|c| c == code) {
                order.push(code.to_string());
            }
        };

        if let Some(code) = preferred {
            push(code);
        }
        if let Some(code) = self.primary() {
            push(code);
        }
        if let Some(code) = self.secondary() {
            push(code);
        }
        for provider in &self.providers {
            push(provider.code());
        }
        order
    }

    /// Providers in attempt order
    pub fn ordered_providers(&self, preferred: Option<&str>) -> Vec<RegisteredProvider> {
        self.get_order(preferred)
            .iter()
            .filter_map(|code| self.get(code).cloned())
            .collect()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("provider_count", &self.providers.len())
            .field("providers", &self.codes())
            .field("primary", &self.primary)
            .field("secondary", &self.secondary)
            .finish()
    }
}
