//! Builds the ordered provider list from configuration.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use super::cohere::CohereProvider;
use super::gemini::GeminiProvider;
use super::huggingface::HuggingFaceProvider;
use super::openai::OpenAICompatibleProvider;
use super::provider::{LLMProvider, ProviderKind, ProviderOptions};
use crate::config::{Credentials, ProviderConfig};

/// Providers in priority order.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn LLMProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every configured provider, in order, sharing one HTTP client.
    ///
    /// Providers without a credential are still registered so the dispatcher
    /// can record them as skipped.
    pub fn from_config(
        configs: &[ProviderConfig],
        credentials: &Credentials,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        let mut registry = Self::new();

        for config in configs {
            let api_key = config
                .api_key_env
                .as_deref()
                .and_then(|name| credentials.get(name))
                .map(str::to_string);

            let options = ProviderOptions::new(&config.id, &config.base_url, &config.model)
                .api_key(api_key)
                .anonymous(config.anonymous)
                .sampling(config.temperature, config.max_tokens);

            let provider: Arc<dyn LLMProvider> = match config.kind {
                ProviderKind::OpenAI => {
                    Arc::new(OpenAICompatibleProvider::new(client.clone(), options))
                }
                ProviderKind::Gemini => Arc::new(GeminiProvider::new(client.clone(), options)),
                ProviderKind::Cohere => Arc::new(CohereProvider::new(client.clone(), options)),
                ProviderKind::HuggingFace => {
                    Arc::new(HuggingFaceProvider::new(client.clone(), options))
                }
            };

            info!(
                provider = %config.id,
                kind = %config.kind,
                credential = provider.has_credential(),
                "Registered provider"
            );
            registry.register(provider);
        }

        if !registry.has_usable_provider() {
            warn!(
                "No usable LLM providers configured. \
                Set an API key such as GROQ_API_KEY, GOOGLE_API_KEY, or OPENAI_API_KEY."
            );
        }

        Ok(registry)
    }

    /// Append a provider at the lowest priority.
    pub fn register(&mut self, provider: Arc<dyn LLMProvider>) {
        self.providers.push(provider);
    }

    #[cfg(test)]
    fn get(&self, id: &str) -> Option<Arc<dyn LLMProvider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    /// Whether any provider can be called at all.
    pub fn has_usable_provider(&self) -> bool {
        self.providers
            .iter()
            .any(|p| p.has_credential() || p.allows_anonymous())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn LLMProvider>> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
