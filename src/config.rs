use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::SummaryMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_provider")]
    pub default_provider: String,
    pub default_model: Option<String>,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

fn default_provider() -> String {
    "ollama".to_string()
}

/// How long documents are condensed before summarization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub mode: SummaryMode,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    #[serde(default = "default_truncate_chars")]
    pub truncate_chars: usize,
    #[serde(default = "default_max_length")]
    pub max_length: u32,
    #[serde(default = "default_min_length")]
    pub min_length: u32,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_max_chunks() -> usize {
    5
}

fn default_truncate_chars() -> usize {
    1024
}

fn default_max_length() -> u32 {
    130
}

fn default_min_length() -> u32 {
    30
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            mode: SummaryMode::default(),
            chunk_size: default_chunk_size(),
            max_chunks: default_max_chunks(),
            truncate_chars: default_truncate_chars(),
            max_length: default_max_length(),
            min_length: default_min_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_top_n() -> usize {
    8
}

fn default_ngram_min() -> usize {
    1
}

fn default_ngram_max() -> usize {
    2
}

fn default_max_input_chars() -> usize {
    12_000
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrConfig {
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_dpi() -> u32 {
    300
}

fn default_language() -> String {
    "eng".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            language: default_language(),
        }
    }
}

/// Upper bounds for the slow external steps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeoutConfig {
    #[serde(default = "default_model_secs")]
    pub model_secs: u64,
    #[serde(default = "default_ocr_page_secs")]
    pub ocr_page_secs: u64,
}

fn default_model_secs() -> u64 {
    120
}

fn default_ocr_page_secs() -> u64 {
    60
}

impl TimeoutConfig {
    pub fn model(&self) -> Duration {
        Duration::from_secs(self.model_secs)
    }

    pub fn ocr_page(&self) -> Duration {
        Duration::from_secs(self.ocr_page_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            model_secs: default_model_secs(),
            ocr_page_secs: default_ocr_page_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

fn default_max_concurrent() -> usize {
    1
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_concurrent: default_max_concurrent(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub anthropic: Option<ProviderConfig>,
    pub openai: Option<ProviderConfig>,
    pub ollama: Option<ProviderConfig>,
    pub google: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            default_model: None,
            summarizer: SummarizerConfig::default(),
            keywords: KeywordConfig::default(),
            ocr: OcrConfig::default(),
            timeouts: TimeoutConfig::default(),
            server: ServerConfig::default(),
            providers: ProvidersConfig {
                ollama: Some(ProviderConfig {
                    api_key: String::new(),
                    base_url: Some("http://localhost:11434".to_string()),
                    model: None,
                }),
                ..ProvidersConfig::default()
            },
        }
    }
}

impl Config {
    /// Get the configuration directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("autometa");
        Ok(config_dir)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            anyhow::bail!(
                "Configuration file not found at {}. Run 'autometa init' first.",
                config_path.display()
            );
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file at {}", config_path.display()))
    }

    /// Load configuration from file, or fall back to built-in defaults when none exists
    pub fn load_or_default() -> Result<Self> {
        match Self::config_path() {
            Ok(path) if path.exists() => Self::load(),
            _ => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;

        // Expand environment variables in API keys
        config.expand_env_vars();

        Ok(config)
    }

    /// Expand environment variables in configuration values
    fn expand_env_vars(&mut self) {
        for provider in [
            &mut self.providers.anthropic,
            &mut self.providers.openai,
            &mut self.providers.ollama,
            &mut self.providers.google,
        ]
        .into_iter()
        .flatten()
        {
            provider.api_key = expand_env_var(&provider.api_key);
        }
    }

    /// Get provider configuration by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        match name.to_lowercase().as_str() {
            "anthropic" => self.providers.anthropic.as_ref(),
            "openai" => self.providers.openai.as_ref(),
            "ollama" => self.providers.ollama.as_ref(),
            "google" => self.providers.google.as_ref(),
            _ => None,
        }
    }
}

/// Expand environment variable references like ${VAR_NAME}
fn expand_env_var(value: &str) -> String {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).unwrap_or_default()
    } else if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_default()
    } else {
        value.to_string()
    }
}
