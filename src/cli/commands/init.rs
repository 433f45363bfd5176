use anyhow::{Context, Result};
use console::{Emoji, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::time::Duration;

use crate::config::{Config, ProviderConfig, ProvidersConfig};
use crate::parser::ocr::is_ocr_available;

static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static KEY: Emoji<'_, '_> = Emoji("🔑 ", "");

pub async fn run(force: bool) -> Result<()> {
    println!();
    println!("{}", style(" AutoMeta - Initialization ").bold().reverse());
    println!();

    let config_dir = Config::config_dir()?;
    let config_path = config_dir.join("config.toml");

    if config_path.exists() && !force {
        println!(
            "{}Configuration already exists at {}",
            WARN,
            style(config_path.display()).cyan()
        );
        println!("  Use {} to overwrite", style("--force").yellow());
        return Ok(());
    }

    fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner().template(&format!("{}{{spinner:.green}} {{msg}}", GEAR))?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Creating configuration...");

    let config_content = toml::to_string_pretty(&default_config())?;
    fs::write(&config_path, config_content).context("Failed to write config file")?;
    spinner.finish_and_clear();

    println!(
        "{}Created configuration at {}",
        CHECK,
        style(config_path.display()).cyan()
    );

    println!();
    if is_ocr_available() {
        println!("{}OCR tools found (pdfinfo, pdftoppm, tesseract)", CHECK);
    } else {
        println!(
            "{}OCR tools not found. Scanned PDFs need poppler-utils and tesseract-ocr on PATH.",
            WARN
        );
    }

    println!();
    println!("{}Next steps:", KEY);
    println!(
        "  {} Start a local model: {}",
        style("1.").dim(),
        style("ollama pull llama3.2 && ollama serve").yellow()
    );
    println!(
        "  {} Or use a hosted provider: {}",
        style("2.").dim(),
        style("export OPENAI_API_KEY=...").yellow()
    );
    println!(
        "  {} Generate metadata: {}",
        style("3.").dim(),
        style("autometa extract ./report.pdf").yellow()
    );
    println!();

    Ok(())
}

/// The configuration written by `init`: local Ollama by default, hosted
/// providers reading their keys from the environment
fn default_config() -> Config {
    Config {
        default_model: Some("llama3.2".to_string()),
        providers: ProvidersConfig {
            anthropic: Some(ProviderConfig {
                api_key: "${ANTHROPIC_API_KEY}".to_string(),
                base_url: None,
                model: Some("claude-sonnet-4-20250514".to_string()),
            }),
            openai: Some(ProviderConfig {
                api_key: "${OPENAI_API_KEY}".to_string(),
                base_url: None,
                model: Some("gpt-4o-mini".to_string()),
            }),
            ollama: Some(ProviderConfig {
                api_key: String::new(),
                base_url: Some("http://localhost:11434".to_string()),
                model: Some("llama3.2".to_string()),
            }),
            google: Some(ProviderConfig {
                api_key: "${GOOGLE_API_KEY}".to_string(),
                base_url: None,
                model: Some("gemini-2.0-flash".to_string()),
            }),
        },
        ..Config::default()
    }
}
