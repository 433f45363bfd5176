pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "autometa")]
#[command(author = "AutoMeta Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate structured metadata (summary, keywords, type, word count) for PDF, DOCX and TXT documents", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long, default_value = "false")]
        force: bool,
    },

    /// Extract text from documents and print their metadata as JSON and YAML
    #[command(long_about = "Extract text from documents and print their metadata.\n\n\
        Supported inputs: .pdf (scanned PDFs fall back to OCR), .docx, .txt.\n\
        Directories are walked recursively for supported files.\n\n\
        OCR requires pdfinfo/pdftoppm (poppler-utils) and tesseract on PATH.")]
    Extract {
        /// Path(s) to documents or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// LLM provider (anthropic, openai, google, ollama)
        #[arg(short, long, env = "AUTOMETA_PROVIDER")]
        provider: Option<LlmProvider>,

        /// Model name (provider-specific, e.g. llama3.2, gpt-4o-mini, claude-sonnet-4-20250514)
        #[arg(short, long, env = "AUTOMETA_MODEL")]
        model: Option<String>,

        /// Summarization strategy for long documents
        #[arg(long)]
        mode: Option<SummaryMode>,

        /// Characters per chunk in chunked mode
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Maximum number of chunks summarized in chunked mode
        #[arg(long)]
        max_chunks: Option<usize>,

        /// Which serializations to print
        #[arg(short, long, default_value = "both")]
        format: OutputFormat,

        /// Also print the full extracted text
        #[arg(long, default_value = "false")]
        show_text: bool,

        /// Write <file>.meta.json / <file>.meta.yaml next to each input
        #[arg(long, default_value = "false")]
        save: bool,
    },

    /// Start the HTTP upload server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// LLM provider (anthropic, openai, google, ollama)
        #[arg(long, env = "AUTOMETA_PROVIDER")]
        provider: Option<LlmProvider>,

        /// Model name
        #[arg(short, long, env = "AUTOMETA_MODEL")]
        model: Option<String>,
    },

    /// Check system health and diagnose common problems
    Doctor,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    #[value(name = "openai")]
    OpenAI,
    #[default]
    Ollama,
    Google,
}

impl LlmProvider {
    pub fn from_config_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "anthropic" => LlmProvider::Anthropic,
            "openai" => LlmProvider::OpenAI,
            "google" => LlmProvider::Google,
            _ => LlmProvider::Ollama,
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Anthropic => write!(f, "anthropic"),
            LlmProvider::OpenAI => write!(f, "openai"),
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::Google => write!(f, "google"),
        }
    }
}

/// Summarization strategy
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    /// Summarize only the first `truncate_chars` characters
    Truncate,
    /// Summarize the first `max_chunks` fixed-size chunks and join the results
    #[default]
    Chunked,
}

impl std::fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryMode::Truncate => write!(f, "truncate"),
            SummaryMode::Chunked => write!(f, "chunked"),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    #[default]
    Both,
}

impl OutputFormat {
    pub fn includes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }

    pub fn includes_yaml(self) -> bool {
        matches!(self, OutputFormat::Yaml | OutputFormat::Both)
    }
}
