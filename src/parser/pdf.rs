use std::path::{Path, PathBuf};

use crate::error::{ExtractionStage, MetaError};

/// Extract the embedded text layer of a PDF.
///
/// Page texts are joined with `\n` in page order and the result is trimmed.
/// An empty string means the PDF has no usable text layer.
pub async fn extract_text(path: &Path) -> Result<String, MetaError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        MetaError::extraction(
            ExtractionStage::PdfParse,
            format!("failed to read {}: {}", path.display(), e),
        )
    })?;

    let owned: PathBuf = path.to_path_buf();
    // pdf-extract is synchronous and may panic on malformed input
    let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .await
        .map_err(|e| {
            MetaError::extraction(
                ExtractionStage::PdfParse,
                format!("parser aborted on {}: {}", owned.display(), e),
            )
        })?
        .map_err(|e| {
            MetaError::extraction(
                ExtractionStage::PdfParse,
                format!("failed to extract text from {}: {}", path.display(), e),
            )
        })?;

    tracing::debug!(pages = pages.len(), "Extracted PDF text layer");

    Ok(join_pages(&pages))
}

/// Join per-page text in page order and trim the whole
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
