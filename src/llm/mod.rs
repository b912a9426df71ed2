//! LLM integration for the planner.
//!
//! Supports:
//! - **OpenAI**: Direct API access via rig-core
//! - **OpenAI-compatible endpoints**: plain HTTP when a base URL is configured
//!
//! rig-core handles transport for the hosted API; `RigAdapter` bridges
//! rig's `CompletionModel` trait to our `LlmProvider` trait.

mod openai_compat;
pub mod provider;
mod rig_adapter;

pub use openai_compat::OpenAiCompatProvider;
pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Custom endpoint; routes through the OpenAI-compatible HTTP provider.
    pub base_url: Option<String>,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    if let Some(base_url) = &config.base_url {
        tracing::info!("Using OpenAI-compatible endpoint {} (model: {})", base_url, config.model);
        return Ok(Arc::new(OpenAiCompatProvider::new(
            config.api_key.clone(),
            base_url,
            &config.model,
        )?));
    }
    create_openai_provider(config)
}

fn create_openai_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(model, &config.model)))
}
