//! Provider router: selects the LLM provider based on config.
//!
//! Handles provider creation and lookup by name. The pipeline uses the same
//! provider for the judge and the generator; only models and sampling differ.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use stratadesk_config::AppConfig;
use stratadesk_core::provider::Provider;

use crate::anthropic::AnthropicProvider;
use crate::aws::AwsAuth;
use crate::bedrock::BedrockProvider;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// Both backends are always registered; `config.provider` picks the default.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.provider);
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let mut bedrock = BedrockProvider::new(&config.region, AwsAuth::resolve(config.api_key_for("bedrock")))
        .with_timeout(timeout);
    if let Some(url) = config.providers.get("bedrock").and_then(|p| p.api_url.as_ref()) {
        bedrock = bedrock.with_base_url(url);
    }
    router.register("bedrock", Arc::new(bedrock));

    let mut anthropic =
        AnthropicProvider::new(config.api_key_for("anthropic").unwrap_or_default()).with_timeout(timeout);
    if let Some(url) = config.providers.get("anthropic").and_then(|p| p.api_url.as_ref()) {
        anthropic = anthropic.with_base_url(url);
    }
    router.register("anthropic", Arc::new(anthropic));

    router
}
