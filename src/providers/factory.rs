use crate::config::{Config, ProviderConfig};
use crate::core::error::AibudError;
use crate::providers::{CompletionProvider, openai::OpenAICompletionProvider};
use std::collections::HashMap;
use std::sync::Arc;

/// Completion providers keyed by model family.
pub struct ProviderFactory {
    providers: HashMap<String, Arc<dyn CompletionProvider>>,
    default_family: String,
}

impl ProviderFactory {
    pub fn new(default_family: &str) -> Self {
        Self {
            providers: HashMap::new(),
            default_family: default_family.to_lowercase(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AibudError> {
        let mut factory = Self::new(&config.default_model);

        for (family, provider_config) in &config.providers {
            factory.register(family, Self::create(family, provider_config));
        }

        if !factory.providers.contains_key(&factory.default_family) {
            return Err(AibudError::Config(format!(
                "Provider not found: {}",
                config.default_model
            )));
        }
        Ok(factory)
    }

    fn create(family: &str, config: &ProviderConfig) -> Arc<dyn CompletionProvider> {
        if config.api_key.is_none() {
            tracing::warn!(family = %family, "No API key configured");
        }
        let headers = (!config.headers.is_empty()).then(|| config.headers.clone());
        let provider = OpenAICompletionProvider::new(
            family,
            config.base_url().to_string(),
            config.api_key.clone(),
            headers,
        );
        tracing::debug!(family = %family, endpoint = %provider.endpoint(), "Registered provider");
        Arc::new(provider)
    }

    pub fn register(&mut self, family: &str, provider: Arc<dyn CompletionProvider>) {
        self.providers.insert(family.to_lowercase(), provider);
    }

    /// Provider for `family`, falling back to the default family for names
    /// nobody configured.
    pub fn resolve(&self, family: &str) -> Result<Arc<dyn CompletionProvider>, AibudError> {
        if let Some(provider) = self.providers.get(&family.to_lowercase()) {
            return Ok(provider.clone());
        }

        tracing::warn!(
            family = %family,
            fallback = %self.default_family,
            "Unknown model family, using default provider"
        );
        self.providers
            .get(&self.default_family)
            .cloned()
            .ok_or_else(|| {
                AibudError::Config(format!("Provider not found: {}", self.default_family))
            })
    }
}
