use anyhow::Result;
use console::{Emoji, style};
use std::process::Command;
use std::time::Duration;

use crate::cli::LlmProvider;
use crate::config::{Config, ProviderConfig};

static DOCTOR: Emoji<'_, '_> = Emoji("🩺 ", "");
static PASS: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static FAIL: Emoji<'_, '_> = Emoji("❌ ", "[!!] ");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[i] ");
static ARROW: Emoji<'_, '_> = Emoji("   → ", "  -> ");

#[derive(Default)]
struct Tally {
    pass: u32,
    warn: u32,
    fail: u32,
}

pub async fn run() -> Result<()> {
    println!();
    println!("{}", style(" AutoMeta Doctor ").bold().reverse());
    println!();
    println!("{}Running diagnostics...", DOCTOR);
    println!();

    let mut tally = Tally::default();

    // ── 1. Binary version ────────────────────────────────────────────
    print_section("Binary");
    pass(&format!("autometa {}", env!("CARGO_PKG_VERSION")), &mut tally);

    // ── 2. Config file ───────────────────────────────────────────────
    print_section("Configuration");

    let config_path = Config::config_path().ok();
    let config = match config_path {
        Some(ref path) if path.exists() => {
            pass(
                &format!("Config found at {}", style(path.display()).dim()),
                &mut tally,
            );
            match Config::load() {
                Ok(c) => {
                    pass(
                        &format!("Config is valid TOML (provider: {})", c.default_provider),
                        &mut tally,
                    );
                    c
                }
                Err(e) => {
                    fail(&format!("Config parse error: {:#}", e), &mut tally);
                    hint("Run: autometa init --force");
                    Config::default()
                }
            }
        }
        Some(_) => {
            warn("Config file not found, using built-in defaults", &mut tally);
            hint("Run: autometa init");
            Config::default()
        }
        None => {
            fail("Cannot determine config directory", &mut tally);
            Config::default()
        }
    };

    // ── 3. OCR tools ─────────────────────────────────────────────────
    print_section("OCR");

    for (program, version_arg, package) in [
        ("pdfinfo", "-v", "poppler-utils"),
        ("pdftoppm", "-v", "poppler-utils"),
        ("tesseract", "--version", "tesseract-ocr"),
    ] {
        match command_version(program, version_arg) {
            Some(version) => pass(&format!("{} installed ({})", program, version), &mut tally),
            None => {
                warn(
                    &format!("{} not found (needed for scanned PDFs)", program),
                    &mut tally,
                );
                hint(&format!("Install {}", package));
            }
        }
    }

    if command_version("tesseract", "--version").is_some() {
        let languages = command_output("tesseract", &["--list-langs"]);
        if languages.lines().any(|l| l.trim() == config.ocr.language) {
            pass(
                &format!("Tesseract language '{}' available", config.ocr.language),
                &mut tally,
            );
        } else {
            warn(
                &format!("Tesseract language '{}' not installed", config.ocr.language),
                &mut tally,
            );
        }
    }

    // ── 4. LLM provider ──────────────────────────────────────────────
    print_section("LLM Provider");

    let provider = LlmProvider::from_config_name(&config.default_provider);
    info(&format!("Active provider: {}", provider));

    match provider {
        LlmProvider::Ollama => {
            let ollama_url = config
                .get_provider("ollama")
                .and_then(|p| p.base_url.as_deref())
                .unwrap_or("http://localhost:11434");

            match check_http_get(&format!("{}/api/tags", ollama_url)).await {
                Ok(200) => pass(&format!("Ollama is running at {}", ollama_url), &mut tally),
                Ok(status) => warn(
                    &format!("Ollama responded with status {} at {}", status, ollama_url),
                    &mut tally,
                ),
                Err(_) => {
                    fail(&format!("Ollama not reachable at {}", ollama_url), &mut tally);
                    hint("Start Ollama: ollama serve");
                }
            }
        }
        LlmProvider::Anthropic => {
            check_api_key("Anthropic", config.get_provider("anthropic"), &["ANTHROPIC_API_KEY"], &mut tally)
        }
        LlmProvider::OpenAI => {
            check_api_key("OpenAI", config.get_provider("openai"), &["OPENAI_API_KEY"], &mut tally)
        }
        LlmProvider::Google => check_api_key(
            "Google",
            config.get_provider("google"),
            &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            &mut tally,
        ),
    }

    // ── 5. System info ───────────────────────────────────────────────
    print_section("System");

    info(&format!(
        "OS: {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    ));
    if let Some(ref path) = config_path {
        info(&format!("Config path: {}", path.display()));
    }

    // ── Summary ──────────────────────────────────────────────────────
    println!();
    println!("{}", style("━".repeat(50)).dim());
    println!();

    print!(
        "  {} {} passed",
        style(tally.pass).green().bold(),
        if tally.pass == 1 { "check" } else { "checks" }
    );
    if tally.warn > 0 {
        print!(
            ", {} {}",
            style(tally.warn).yellow().bold(),
            if tally.warn == 1 { "warning" } else { "warnings" }
        );
    }
    if tally.fail > 0 {
        print!(
            ", {} {}",
            style(tally.fail).red().bold(),
            if tally.fail == 1 { "failure" } else { "failures" }
        );
    }
    println!();
    println!();

    if tally.fail > 0 {
        println!(
            "  {}",
            style("Some checks failed. Fix the issues above and re-run:").red()
        );
        println!("    {} autometa doctor", style("$").dim());
    } else if tally.warn > 0 {
        println!(
            "  {}",
            style("Everything essential works, but there are some warnings.").yellow()
        );
    } else {
        println!(
            "  {}",
            style("All checks passed! You're ready to go.").green().bold()
        );
    }
    println!();

    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────

fn print_section(name: &str) {
    println!("  {}", style(name).bold().underlined());
}

fn pass(msg: &str, tally: &mut Tally) {
    println!("  {}{}", PASS, msg);
    tally.pass += 1;
}

fn fail(msg: &str, tally: &mut Tally) {
    println!("  {}{}", FAIL, style(msg).red());
    tally.fail += 1;
}

fn warn(msg: &str, tally: &mut Tally) {
    println!("  {}{}", WARN, style(msg).yellow());
    tally.warn += 1;
}

fn info(msg: &str) {
    println!("  {}{}", INFO, style(msg).dim());
}

fn hint(msg: &str) {
    println!("{}{}", ARROW, style(msg).dim());
}

/// First line of a tool's version output, if the tool runs at all
fn command_version(cmd: &str, arg: &str) -> Option<String> {
    let output = Command::new(cmd).arg(arg).output().ok()?;
    // poppler prints its version on stderr
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).to_string()
    };
    Some(text.lines().next().unwrap_or(cmd).trim().to_string())
}

fn command_output(cmd: &str, args: &[&str]) -> String {
    Command::new(cmd)
        .args(args)
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).to_string())
        .unwrap_or_default()
}

async fn check_http_get(url: &str) -> Result<u16, ()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|_| ())?;

    client
        .get(url)
        .send()
        .await
        .map(|r| r.status().as_u16())
        .map_err(|_| ())
}

fn check_api_key(name: &str, provider: Option<&ProviderConfig>, env_vars: &[&str], tally: &mut Tally) {
    for env_var in env_vars {
        if let Ok(val) = std::env::var(env_var)
            && !val.is_empty()
        {
            pass(
                &format!("{} API key set via {}", name, style(*env_var).dim()),
                tally,
            );
            return;
        }
    }

    if let Some(p) = provider
        && !p.api_key.is_empty()
        && !p.api_key.starts_with("${")
    {
        pass(&format!("{} API key configured in config", name), tally);
        return;
    }

    fail(&format!("{} API key not configured", name), tally);
    hint(&format!("Set {}", env_vars.join(" or ")));
}
