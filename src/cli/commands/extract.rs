use anyhow::{Context, Result};
use console::{Emoji, style};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use walkdir::WalkDir;

use crate::cli::{LlmProvider, OutputFormat, SummaryMode};
use crate::config::Config;
use crate::error::MetaError;
use crate::llm::ModelRegistry;
use crate::metadata::MetadataAssembler;
use crate::parser::{TextExtractor, declared_extension, is_supported_file};
use crate::pipeline::{self, ProcessedDocument};

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static BRAIN: Emoji<'_, '_> = Emoji("🧠 ", "");
static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[X] ");
static DISK: Emoji<'_, '_> = Emoji("💾 ", "");

#[allow(clippy::too_many_arguments)]
pub async fn run(
    paths: Vec<PathBuf>,
    provider: Option<LlmProvider>,
    model: Option<String>,
    mode: Option<SummaryMode>,
    chunk_size: Option<usize>,
    max_chunks: Option<usize>,
    format: OutputFormat,
    show_text: bool,
    save: bool,
) -> Result<()> {
    let started = Instant::now();

    println!();
    println!(
        "{}",
        style(" AutoMeta - Document Metadata Generator ")
            .bold()
            .reverse()
    );
    println!();

    let mut config = Config::load_or_default()?;
    if let Some(mode) = mode {
        config.summarizer.mode = mode;
    }
    if let Some(chunk_size) = chunk_size {
        config.summarizer.chunk_size = chunk_size;
    }
    if let Some(max_chunks) = max_chunks {
        config.summarizer.max_chunks = max_chunks;
    }

    let provider = provider.unwrap_or_else(|| LlmProvider::from_config_name(&config.default_provider));

    println!("{}Provider: {}", BRAIN, style(&provider.to_string()).cyan().bold());
    println!(
        "{}Summary mode: {}",
        BRAIN,
        style(&config.summarizer.mode.to_string()).cyan()
    );

    let documents = collect_documents(&paths);
    println!(
        "{}Found {} document(s)",
        LOOKING_GLASS,
        style(documents.len()).green().bold()
    );
    println!();

    // Models load on the first document that has text to summarize
    let mut registry = ModelRegistry::new(provider, model, &config);
    let extractor = pipeline::extractor_from_config(&config);
    let assembler = OnceCell::new();

    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for path in &documents {
        println!("{}{}", PAPER, style(path.display()).cyan().bold());

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner().template(&format!("{}{{spinner:.green}} {{msg}}", SPARKLE))?,
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message("Extracting text and generating metadata...");

        let result = process_document(&extractor, &assembler, &registry, &config, path).await;
        spinner.finish_and_clear();
        let result = result?;

        match result {
            Ok(processed) => {
                print_document(&processed, format, show_text)?;
                if save {
                    save_document(path, &processed, format)?;
                }
                succeeded += 1;
            }
            Err(MetaError::FileNotFound(missing)) => {
                println!("{}File not found: {}", WARN, style(missing.display()).yellow());
            }
            Err(MetaError::EmptyDocument) => {
                println!("{}No text found in the document.", CROSS);
            }
            Err(err) if err.is_warning() => {
                println!("{}{}", WARN, style(err.to_string()).yellow());
            }
            Err(err) => {
                tracing::error!("{}: {}", path.display(), err);
                println!(
                    "{}{} {}",
                    CROSS,
                    style(format!("[{}]", err.stage())).red().bold(),
                    style(err.to_string()).red()
                );
                failed += 1;
            }
        }
        println!();
    }

    drop(assembler);
    registry.teardown();

    println!("{}", style("━".repeat(50)).dim());
    println!(
        "{}Processed {} of {} document(s) in {}",
        CHECK,
        style(succeeded).green().bold(),
        documents.len(),
        HumanDuration(started.elapsed())
    );

    if failed > 0 {
        anyhow::bail!("{} document(s) failed", failed);
    }
    Ok(())
}

/// Run one document through extraction and, when it has text, the models.
///
/// The outer error is a model initialization failure, which ends the run.
async fn process_document(
    extractor: &TextExtractor,
    assembler: &OnceCell<MetadataAssembler>,
    registry: &ModelRegistry,
    config: &Config,
    path: &Path,
) -> Result<Result<ProcessedDocument, MetaError>> {
    let extracted = match pipeline::extract_document(extractor, path, &declared_extension(path)).await {
        Ok(extracted) => extracted,
        Err(err) => return Ok(Err(err)),
    };

    let assembler = assembler
        .get_or_try_init(|| async {
            let handles = registry
                .handles()
                .await
                .context("Failed to initialize models")?;
            tracing::info!("Using {}", handles.description);
            Ok::<_, anyhow::Error>(pipeline::assembler_from_config(config, &handles))
        })
        .await?;

    Ok(pipeline::assemble_document(assembler, extracted).await)
}

/// Expand directories into their supported files; explicit file paths are kept as given
fn collect_documents(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut documents = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_supported_file(p))
                .collect();
            found.sort();
            documents.extend(found);
        } else {
            documents.push(path.clone());
        }
    }
    documents
}

fn print_document(processed: &ProcessedDocument, format: OutputFormat, show_text: bool) -> Result<()> {
    if show_text {
        println!("{}", style("Extracted Text").bold().underlined());
        println!("{}", processed.text);
        println!();
    }
    if format.includes_json() {
        println!("{}", style("JSON Metadata Output").bold().underlined());
        println!("{}", processed.record.to_json_pretty()?);
        println!();
    }
    if format.includes_yaml() {
        println!("{}", style("YAML Metadata Output").bold().underlined());
        print!("{}", processed.record.to_yaml()?);
    }
    Ok(())
}

fn save_document(path: &Path, processed: &ProcessedDocument, format: OutputFormat) -> Result<()> {
    if format.includes_json() {
        let target = sidecar_path(path, ".meta.json");
        fs::write(&target, processed.record.to_json_pretty()?)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        println!("{}Saved {}", DISK, style(target.display()).dim());
    }
    if format.includes_yaml() {
        let target = sidecar_path(path, ".meta.yaml");
        fs::write(&target, processed.record.to_yaml()?)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        println!("{}Saved {}", DISK, style(target.display()).dim());
    }
    Ok(())
}

/// `report.pdf` -> `report.pdf.meta.json`
fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
