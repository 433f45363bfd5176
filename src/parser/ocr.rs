//! OCR fallback for scanned PDFs.
//!
//! Pages are rendered one at a time with `pdftoppm` (poppler-utils) and
//! recognized with `tesseract`. Every external process runs under the per-page
//! timeout and is killed if the timeout elapses.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::config::OcrConfig;
use crate::error::{ExtractionStage, MetaError};

/// Something that turns the pages of a PDF into text
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize every page in page order, joined with `\n` and trimmed
    async fn recognize_pdf(&self, path: &Path) -> Result<String, MetaError>;

    fn name(&self) -> &'static str;
}

/// Poppler + Tesseract command-line OCR
pub struct TesseractOcr {
    dpi: u32,
    language: String,
    page_timeout: Duration,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig, page_timeout: Duration) -> Self {
        Self {
            dpi: config.dpi,
            language: config.language.clone(),
            page_timeout,
        }
    }

    async fn page_count(&self, path: &Path) -> Result<usize, MetaError> {
        let output = run_bounded(
            Command::new("pdfinfo").arg(path),
            self.page_timeout,
            "pdfinfo",
        )
        .await?;

        parse_page_count(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            MetaError::extraction(
                ExtractionStage::Ocr,
                format!("pdfinfo reported no page count for {}", path.display()),
            )
        })
    }

    async fn render_page(&self, path: &Path, page: usize, dir: &Path) -> Result<PathBuf, MetaError> {
        let prefix = dir.join(format!("page-{:05}", page));
        run_bounded(
            Command::new("pdftoppm")
                .arg("-png")
                .arg("-singlefile")
                .arg("-r")
                .arg(self.dpi.to_string())
                .arg("-f")
                .arg(page.to_string())
                .arg("-l")
                .arg(page.to_string())
                .arg(path)
                .arg(&prefix),
            self.page_timeout,
            "pdftoppm",
        )
        .await?;

        let image = prefix.with_extension("png");
        if !image.exists() {
            return Err(MetaError::extraction(
                ExtractionStage::Ocr,
                format!("pdftoppm produced no image for page {}", page),
            ));
        }
        Ok(image)
    }

    async fn recognize_image(&self, image: &Path) -> Result<String, MetaError> {
        let output = run_bounded(
            Command::new("tesseract")
                .arg(image)
                .arg("stdout")
                .arg("-l")
                .arg(&self.language),
            self.page_timeout,
            "tesseract",
        )
        .await?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize_pdf(&self, path: &Path) -> Result<String, MetaError> {
        let pages = self.page_count(path).await?;
        tracing::info!(pages, dpi = self.dpi, lang = %self.language, "Starting OCR");

        // Rendered images live only as long as this directory handle
        let workdir = tempfile::tempdir()
            .map_err(|e| MetaError::extraction(ExtractionStage::Ocr, e))?;

        let mut texts = Vec::with_capacity(pages);
        for page in 1..=pages {
            let image = self.render_page(path, page, workdir.path()).await?;
            let text = self.recognize_image(&image).await?;
            tracing::debug!(page, chars = text.len(), "OCR page done");
            texts.push(text);
        }

        Ok(texts.join("\n").trim().to_string())
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}

/// Run an external command, failing on spawn errors, non-zero exit or timeout
async fn run_bounded(
    command: &mut Command,
    limit: Duration,
    program: &str,
) -> Result<Output, MetaError> {
    command.kill_on_drop(true);

    let output = tokio::time::timeout(limit, command.output())
        .await
        .map_err(|_| {
            MetaError::extraction(
                ExtractionStage::Ocr,
                format!("{} timed out after {:?}", program, limit),
            )
        })?
        .map_err(|e| {
            MetaError::extraction(
                ExtractionStage::Ocr,
                format!("failed to run {} (is it installed?): {}", program, e),
            )
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MetaError::extraction(
            ExtractionStage::Ocr,
            format!("{} failed ({}): {}", program, output.status, stderr.trim()),
        ));
    }

    Ok(output)
}

/// Parse the `Pages:` line of `pdfinfo` output
fn parse_page_count(pdfinfo: &str) -> Option<usize> {
    let re = Regex::new(r"(?m)^Pages:\s+(\d+)\s*$").ok()?;
    re.captures(pdfinfo)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether the OCR command-line tools are on PATH
pub fn is_ocr_available() -> bool {
    ["pdfinfo", "pdftoppm", "tesseract"]
        .iter()
        .all(|program| tool_available(program))
}

pub fn tool_available(program: &str) -> bool {
    let flag = if program == "tesseract" { "--version" } else { "-v" };
    std::process::Command::new(program)
        .arg(flag)
        .output()
        .is_ok()
}
