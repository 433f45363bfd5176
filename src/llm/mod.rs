mod anthropic;
mod google;
mod ollama;
mod openai;
pub(crate) mod parsing;
mod prompts;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::cli::LlmProvider;
use crate::config::Config;
use crate::keywords::{KeyphraseModel, KeyphraseRequest, ScoredPhrase};
use crate::summarize::{SummaryBounds, SummaryModel};

/// Trait for LLM providers
#[async_trait]
pub trait LlmProviderTrait: Send + Sync {
    /// Run a single deterministic completion
    async fn complete(&self, system: &str, user_message: &str, max_tokens: u32) -> Result<String>;

    /// Get the provider name
    fn name(&self) -> &'static str;
}

/// Main LLM client that abstracts over providers
pub struct LlmClient {
    provider: Box<dyn LlmProviderTrait>,
}

impl LlmClient {
    /// Create a new LLM client for the specified provider
    pub fn new(
        provider: LlmProvider,
        config: &Config,
        model_override: Option<&str>,
    ) -> Result<Self> {
        let model_override = model_override.or(config.default_model.as_deref());

        let provider_impl: Box<dyn LlmProviderTrait> = match provider {
            LlmProvider::Anthropic => {
                let provider_config = config
                    .get_provider("anthropic")
                    .context("Anthropic provider not configured")?;
                let model = model_override
                    .map(String::from)
                    .or_else(|| provider_config.model.clone())
                    .unwrap_or_else(|| "claude-sonnet-4-20250514".to_string());
                Box::new(anthropic::AnthropicProvider::new(
                    &provider_config.api_key,
                    &model,
                    provider_config.base_url.as_deref(),
                )?)
            }
            LlmProvider::OpenAI => {
                let provider_config = config
                    .get_provider("openai")
                    .context("OpenAI provider not configured")?;
                let model = model_override
                    .map(String::from)
                    .or_else(|| provider_config.model.clone())
                    .unwrap_or_else(|| "gpt-4o-mini".to_string());
                Box::new(openai::OpenAIProvider::new(
                    &provider_config.api_key,
                    &model,
                    provider_config.base_url.as_deref(),
                )?)
            }
            LlmProvider::Ollama => {
                // A local Ollama needs no credentials, so a missing section means defaults
                let provider_config = config.get_provider("ollama");
                let model = model_override
                    .map(String::from)
                    .or_else(|| provider_config.and_then(|p| p.model.clone()))
                    .unwrap_or_else(|| "llama3.2".to_string());
                let base_url = provider_config
                    .and_then(|p| p.base_url.as_deref())
                    .unwrap_or("http://localhost:11434");
                Box::new(ollama::OllamaProvider::new(base_url, &model))
            }
            LlmProvider::Google => {
                let provider_config = config
                    .get_provider("google")
                    .context("Google provider not configured")?;
                let model = model_override
                    .map(String::from)
                    .or_else(|| provider_config.model.clone())
                    .unwrap_or_else(|| "gemini-2.0-flash".to_string());
                Box::new(google::GoogleProvider::new(
                    &provider_config.api_key,
                    &model,
                    provider_config.base_url.as_deref(),
                )?)
            }
        };

        Ok(Self {
            provider: provider_impl,
        })
    }

    /// Get the provider name
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

#[async_trait]
impl SummaryModel for LlmClient {
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String> {
        let system = prompts::summary_system_prompt(bounds.min_length, bounds.max_length);
        let response = self
            .provider
            .complete(&system, &prompts::document_user_prompt(text), bounds.max_length)
            .await?;

        let summary = parsing::clean_summary(&response);
        if summary.is_empty() {
            anyhow::bail!("{} returned an empty summary", self.provider.name());
        }
        Ok(summary)
    }
}

#[async_trait]
impl KeyphraseModel for LlmClient {
    async fn keyphrases(&self, text: &str, request: &KeyphraseRequest) -> Result<Vec<ScoredPhrase>> {
        let system = prompts::keyphrase_system_prompt(request);
        let response = self
            .provider
            .complete(&system, &prompts::document_user_prompt(text), 1024)
            .await?;

        parsing::parse_keyphrases_json(&response)
    }
}

/// The loaded summarization and keyphrase models
pub struct ModelHandles {
    pub summarizer: Arc<dyn SummaryModel>,
    pub keyphrases: Arc<dyn KeyphraseModel>,
    pub description: String,
}

/// Process-wide owner of the model handles.
///
/// Handles are built on first use and then shared read-only by every request
/// until `teardown` is called.
pub struct ModelRegistry {
    provider: LlmProvider,
    model: Option<String>,
    config: Config,
    handles: OnceCell<Arc<ModelHandles>>,
}

impl ModelRegistry {
    pub fn new(provider: LlmProvider, model: Option<String>, config: &Config) -> Self {
        Self {
            provider,
            model,
            config: config.clone(),
            handles: OnceCell::new(),
        }
    }

    /// Get the shared handles, loading them on first call
    pub async fn handles(&self) -> Result<Arc<ModelHandles>> {
        self.handles
            .get_or_try_init(|| async {
                let client = Arc::new(LlmClient::new(
                    self.provider,
                    &self.config,
                    self.model.as_deref(),
                )?);
                let description = format!(
                    "{} ({})",
                    client.provider_name(),
                    self.model
                        .as_deref()
                        .or(self.config.default_model.as_deref())
                        .unwrap_or("default model")
                );
                tracing::info!("Loaded models: {}", description);

                Ok::<_, anyhow::Error>(Arc::new(ModelHandles {
                    summarizer: client.clone(),
                    keyphrases: client,
                    description,
                }))
            })
            .await
            .cloned()
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.handles.initialized()
    }

    /// Drop the registry's reference to the loaded models
    pub fn teardown(&mut self) {
        if self.handles.take().is_some() {
            tracing::info!("Released model handles");
        }
    }
}
