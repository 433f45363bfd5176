use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::MetaError;
use crate::keywords::KeywordExtractor;
use crate::llm::ModelHandles;
use crate::metadata::{MetadataAssembler, MetadataRecord};
use crate::parser::{DocumentType, ExtractedText, TesseractOcr, TextExtractor, declared_extension};
use crate::summarize::Summarizer;

/// Metadata for one document together with the text it was derived from
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub record: MetadataRecord,
    pub text: String,
}

/// Document to record orchestration shared by the CLI and the server
pub struct Pipeline {
    extractor: TextExtractor,
    assembler: MetadataAssembler,
}

impl Pipeline {
    pub fn new(extractor: TextExtractor, assembler: MetadataAssembler) -> Self {
        Self {
            extractor,
            assembler,
        }
    }

    /// Wire the production extractor and adapters around loaded models
    pub fn from_config(config: &Config, handles: &ModelHandles) -> Self {
        Self::new(extractor_from_config(config), assembler_from_config(config, handles))
    }

    /// Process a file, classifying it by its own extension
    pub async fn process(&self, path: &Path) -> Result<ProcessedDocument, MetaError> {
        self.process_as(path, &declared_extension(path)).await
    }

    /// Process a file under an explicitly declared extension.
    ///
    /// Uploads are stored under temporary names, so the declared extension
    /// comes from the original filename rather than `path`.
    pub async fn process_as(
        &self,
        path: &Path,
        extension: &str,
    ) -> Result<ProcessedDocument, MetaError> {
        let started = Instant::now();
        let extracted = extract_document(&self.extractor, path, extension).await?;
        let processed = assemble_document(&self.assembler, extracted).await?;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Document processed");
        Ok(processed)
    }
}

/// Text extractor with the Tesseract OCR fallback
pub fn extractor_from_config(config: &Config) -> TextExtractor {
    TextExtractor::new(Arc::new(TesseractOcr::new(
        &config.ocr,
        config.timeouts.ocr_page(),
    )))
}

/// Summarizer and keyword extractor around loaded models
pub fn assembler_from_config(config: &Config, handles: &ModelHandles) -> MetadataAssembler {
    let summarizer = Summarizer::new(
        handles.summarizer.clone(),
        &config.summarizer,
        config.timeouts.model(),
    );
    let keywords = KeywordExtractor::new(
        handles.keyphrases.clone(),
        &config.keywords,
        config.timeouts.model(),
    );
    MetadataAssembler::new(summarizer, keywords)
}

/// Existence check, type check, extraction and empty check.
///
/// Needs no model, so callers can report input problems before loading one.
pub async fn extract_document(
    extractor: &TextExtractor,
    path: &Path,
    extension: &str,
) -> Result<ExtractedText, MetaError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(MetaError::FileNotFound(path.to_path_buf()));
    }
    if DocumentType::from_extension(extension) == DocumentType::Unknown {
        return Err(MetaError::UnsupportedFileType(if extension.is_empty() {
            "(none)".to_string()
        } else {
            extension.to_string()
        }));
    }

    let extracted = extractor.extract(path, extension).await?;
    tracing::info!(
        document_type = %extracted.document_type,
        chars = extracted.text.len(),
        "Extracted text from {}",
        path.display()
    );

    if extracted.text.is_empty() {
        return Err(MetaError::EmptyDocument);
    }
    Ok(extracted)
}

/// Summarize and tag extracted text
pub async fn assemble_document(
    assembler: &MetadataAssembler,
    extracted: ExtractedText,
) -> Result<ProcessedDocument, MetaError> {
    let record = assembler
        .assemble(&extracted.text, extracted.document_type)
        .await?;
    Ok(ProcessedDocument {
        record,
        text: extracted.text,
    })
}
