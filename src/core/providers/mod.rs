//! Provider contract, registry and the built-in adapters

pub mod contract;
pub mod error;
pub mod http_messaging;
pub mod openai_compatible;
pub mod provider_registry;
pub mod shared;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

pub use contract::{NormalizedResult, ProviderAdapter};
pub use error::{AdapterError, AdapterErrorCode, ConfigurationError};
pub use http_messaging::HttpMessagingAdapter;
pub use openai_compatible::OpenAiCompatibleAdapter;
pub use provider_registry::{AdapterConstructor, AdapterFactory, ProviderRegistry, RegisteredProvider};
pub use types::{
    ChatMessage, CompletionRequest, GatewayRequest, HealthCheckReport, MessageRequest,
    ProviderResponse, UsageUnits,
};
