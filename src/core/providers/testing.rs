//! Scripted adapters for unit tests

use super::contract::{NormalizedResult, ProviderAdapter};
use super::error::{AdapterError, ConfigurationError};
use super::provider_registry::AdapterFactory;
use super::types::{GatewayRequest, HealthCheckReport, ProviderResponse, UsageUnits};
use crate::config::{ProviderDescriptor, ProviderKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug)]
struct Script {
    queue: VecDeque<NormalizedResult>,
    fallback: NormalizedResult,
    calls: u32,
    fail_init: bool,
}

impl Script {
    fn succeeding(code: &str) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: Ok(served_by(code)),
            calls: 0,
            fail_init: false,
        }
    }
}

/// The response a scripted provider serves by default
pub(crate) fn served_by(code: &str) -> ProviderResponse {
    ProviderResponse::new(serde_json::json!({ "provider": code }), UsageUnits::tokens(100, 50))
}

/// Per-code behaviour shared by every adapter a factory builds
#[derive(Debug, Clone, Default)]
pub(crate) struct Scripts {
    inner: Arc<Mutex<HashMap<String, Script>>>,
}

impl Scripts {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every call to `code` returns `result` once the queue is drained
    pub(crate) fn always(&self, code: &str, result: NormalizedResult) -> &Self {
        self.inner
            .lock()
            .entry(code.to_string())
            .or_insert_with(|| Script::succeeding(code))
            .fallback = result;
        self
    }

    pub(crate) fn always_fail(&self, code: &str, error: AdapterError) -> &Self {
        self.always(code, Err(error))
    }

    /// Queue one result ahead of the fallback
    pub(crate) fn push(&self, code: &str, result: NormalizedResult) -> &Self {
        self.inner
            .lock()
            .entry(code.to_string())
            .or_insert_with(|| Script::succeeding(code))
            .queue
            .push_back(result);
        self
    }

    pub(crate) fn fail_initialization(&self, code: &str) -> &Self {
        self.inner
            .lock()
            .entry(code.to_string())
            .or_insert_with(|| Script::succeeding(code))
            .fail_init = true;
        self
    }

    pub(crate) fn calls(&self, code: &str) -> u32 {
        self.inner.lock().get(code).map(|s| s.calls).unwrap_or(0)
    }

    /// Factory building scripted adapters for both vendor families
    pub(crate) fn factory(&self) -> AdapterFactory {
        let mut factory = AdapterFactory::new();
        for kind in [ProviderKind::OpenAiCompatible, ProviderKind::HttpMessaging] {
            let scripts = self.clone();
            factory.register(kind, move |descriptor: &ProviderDescriptor| {
                Box::new(ScriptedAdapter {
                    code: descriptor.code.clone(),
                    kind: descriptor.kind(),
                    scripts: scripts.clone(),
                }) as Box<dyn ProviderAdapter>
            });
        }
        factory
    }

    fn next(&self, code: &str) -> NormalizedResult {
        let mut inner = self.inner.lock();
        let script = inner
            .entry(code.to_string())
            .or_insert_with(|| Script::succeeding(code));
        script.calls += 1;
        match script.queue.pop_front() {
            Some(result) => result,
            None => script.fallback.clone(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedAdapter {
    code: String,
    kind: ProviderKind,
    scripts: Scripts,
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn code(&self) -> &str {
        &self.code
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn initialize(&mut self, _descriptor: &ProviderDescriptor) -> Result<(), ConfigurationError> {
        let fail = self
            .scripts
            .inner
            .lock()
            .get(&self.code)
            .is_some_and(|s| s.fail_init);
        if fail {
            return Err(ConfigurationError::MissingCredential {
                provider: self.code.clone(),
                field: "api_key",
            });
        }
        Ok(())
    }

    async fn execute(&self, _request: &GatewayRequest) -> NormalizedResult {
        self.scripts.next(&self.code)
    }

    async fn health_check(&self) -> HealthCheckReport {
        HealthCheckReport::healthy(self.code.clone(), 1)
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
