mod chunker;
mod docx;
pub mod ocr;
mod pdf;
mod text;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::MetaError;

pub use chunker::{TextChunker, truncate_chars};
pub use ocr::{OcrEngine, TesseractOcr};

/// How the text of a document was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "Scanned PDF")]
    ScannedPdf,
    #[serde(rename = "DOCX")]
    Docx,
    #[serde(rename = "TXT")]
    Txt,
    Unknown,
}

impl DocumentType {
    /// Classify a declared extension (case-insensitive, with or without the dot)
    pub fn from_extension(extension: &str) -> Self {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => DocumentType::Pdf,
            "docx" => DocumentType::Docx,
            "txt" => DocumentType::Txt,
            _ => DocumentType::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::from_extension(&declared_extension(path))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::Pdf => write!(f, "PDF"),
            DocumentType::ScannedPdf => write!(f, "Scanned PDF"),
            DocumentType::Docx => write!(f, "DOCX"),
            DocumentType::Txt => write!(f, "TXT"),
            DocumentType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Lowercased extension of a path, empty when there is none
pub fn declared_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Whether the extractor knows how to read this path
pub fn is_supported_file(path: &Path) -> bool {
    DocumentType::from_path(path) != DocumentType::Unknown
}

/// Raw text of a document and how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub document_type: DocumentType,
}

/// Text extraction for PDF (with OCR fallback), DOCX and TXT files
pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    /// Extract text from `path`, dispatching on the declared extension.
    ///
    /// Unknown extensions yield empty text with `DocumentType::Unknown`.
    pub async fn extract(&self, path: &Path, extension: &str) -> Result<ExtractedText, MetaError> {
        match DocumentType::from_extension(extension) {
            DocumentType::Pdf => {
                let direct = pdf::extract_text(path).await?;
                self.pdf_with_ocr_fallback(path, direct).await
            }
            DocumentType::Docx => Ok(ExtractedText {
                text: docx::extract_text(path).await?,
                document_type: DocumentType::Docx,
            }),
            DocumentType::Txt => Ok(ExtractedText {
                text: text::extract_text(path).await?,
                document_type: DocumentType::Txt,
            }),
            DocumentType::ScannedPdf | DocumentType::Unknown => Ok(ExtractedText {
                text: String::new(),
                document_type: DocumentType::Unknown,
            }),
        }
    }

    /// Keep a non-empty text layer, otherwise recognize the pages with OCR
    async fn pdf_with_ocr_fallback(
        &self,
        path: &Path,
        direct: String,
    ) -> Result<ExtractedText, MetaError> {
        if !direct.is_empty() {
            return Ok(ExtractedText {
                text: direct,
                document_type: DocumentType::Pdf,
            });
        }

        tracing::info!(
            engine = self.ocr.name(),
            "No text layer in {}, falling back to OCR",
            path.display()
        );
        let text = self.ocr.recognize_pdf(path).await?;

        Ok(ExtractedText {
            text,
            document_type: DocumentType::ScannedPdf,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ExtractionStage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// OCR stand-in that records how often it was asked to run
    pub(crate) struct FakeOcr {
        pub text: String,
        pub calls: AtomicUsize,
    }

    impl FakeOcr {
        pub(crate) fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl OcrEngine for FakeOcr {
        async fn recognize_pdf(&self, _path: &Path) -> Result<String, MetaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    struct BrokenOcr;

    #[async_trait]
    impl OcrEngine for BrokenOcr {
        async fn recognize_pdf(&self, _path: &Path) -> Result<String, MetaError> {
            Err(MetaError::extraction(ExtractionStage::Ocr, "engine crashed"))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_document_type_from_extension() {
        assert_eq!(DocumentType::from_extension("pdf"), DocumentType::Pdf);
        assert_eq!(DocumentType::from_extension(".PDF"), DocumentType::Pdf);
        assert_eq!(DocumentType::from_extension("Docx"), DocumentType::Docx);
        assert_eq!(DocumentType::from_extension("txt"), DocumentType::Txt);
        assert_eq!(DocumentType::from_extension("md"), DocumentType::Unknown);
        assert_eq!(DocumentType::from_extension(""), DocumentType::Unknown);
    }

    #[test]
    fn test_document_type_labels() {
        assert_eq!(DocumentType::ScannedPdf.to_string(), "Scanned PDF");
        assert_eq!(
            serde_json::to_string(&DocumentType::ScannedPdf).unwrap(),
            "\"Scanned PDF\""
        );
        assert_eq!(serde_json::to_string(&DocumentType::Txt).unwrap(), "\"TXT\"");
    }

    #[test]
    fn test_is_supported_file() {
        assert!(is_supported_file(Path::new("a/b/report.PDF")));
        assert!(is_supported_file(Path::new("notes.txt")));
        assert!(!is_supported_file(Path::new("sheet.xlsx")));
        assert!(!is_supported_file(Path::new("README")));
    }

    #[tokio::test]
    async fn test_pdf_with_text_layer_skips_ocr() {
        let ocr = FakeOcr::returning("should not be used");
        let extractor = TextExtractor::new(ocr.clone());

        let extracted = extractor
            .pdf_with_ocr_fallback(Path::new("doc.pdf"), "Embedded text".to_string())
            .await
            .unwrap();

        assert_eq!(extracted.document_type, DocumentType::Pdf);
        assert_eq!(extracted.text, "Embedded text");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pdf_without_text_layer_uses_ocr() {
        let ocr = FakeOcr::returning("Scanned words");
        let extractor = TextExtractor::new(ocr.clone());

        let extracted = extractor
            .pdf_with_ocr_fallback(Path::new("scan.pdf"), String::new())
            .await
            .unwrap();

        assert_eq!(extracted.document_type, DocumentType::ScannedPdf);
        assert_eq!(extracted.text, "Scanned words");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ocr_failure_propagates() {
        let extractor = TextExtractor::new(Arc::new(BrokenOcr));
        let err = extractor
            .pdf_with_ocr_fallback(Path::new("scan.pdf"), String::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MetaError::ExtractionFailed {
                stage: ExtractionStage::Ocr,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_txt_is_read_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        std::fs::write(&path, "  The quick brown fox. It jumps.\n").unwrap();

        let extractor = TextExtractor::new(FakeOcr::returning(""));
        let extracted = extractor.extract(&path, "txt").await.unwrap();

        assert_eq!(extracted.document_type, DocumentType::Txt);
        assert_eq!(extracted.text, "  The quick brown fox. It jumps.\n");
    }

    #[tokio::test]
    async fn test_docx_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.docx");
        std::fs::write(
            &path,
            docx::tests::docx_bytes("<w:p><w:r><w:t>Memo body</w:t></w:r></w:p>"),
        )
        .unwrap();

        let extractor = TextExtractor::new(FakeOcr::returning(""));
        let extracted = extractor.extract(&path, "docx").await.unwrap();

        assert_eq!(extracted.document_type, DocumentType::Docx);
        assert_eq!(extracted.text, "Memo body");
    }

    #[tokio::test]
    async fn test_unknown_extension_yields_empty_text() {
        let ocr = FakeOcr::returning("unused");
        let extractor = TextExtractor::new(ocr.clone());
        let extracted = extractor
            .extract(Path::new("does-not-matter.xlsx"), "xlsx")
            .await
            .unwrap();

        assert_eq!(extracted.document_type, DocumentType::Unknown);
        assert!(extracted.text.is_empty());
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }
}
