use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Stage of text extraction that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    PdfParse,
    DocxParse,
    Ocr,
    TxtRead,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStage::PdfParse => write!(f, "pdf-parse"),
            ExtractionStage::DocxParse => write!(f, "docx-parse"),
            ExtractionStage::Ocr => write!(f, "ocr"),
            ExtractionStage::TxtRead => write!(f, "txt-read"),
        }
    }
}

/// Errors that abort processing of a single document
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("Extraction failed at stage {stage}: {cause}")]
    ExtractionFailed {
        stage: ExtractionStage,
        cause: String,
    },

    #[error("Summarization failed: {0}")]
    SummarizationFailed(String),

    #[error("Keyword extraction failed: {0}")]
    KeywordExtractionFailed(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("No text found in the document")]
    EmptyDocument,

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl MetaError {
    pub fn extraction(stage: ExtractionStage, cause: impl fmt::Display) -> Self {
        MetaError::ExtractionFailed {
            stage,
            cause: cause.to_string(),
        }
    }

    /// Short label of the pipeline stage this error came from
    pub fn stage(&self) -> String {
        match self {
            MetaError::ExtractionFailed { stage, .. } => stage.to_string(),
            MetaError::SummarizationFailed(_) => "summarize".to_string(),
            MetaError::KeywordExtractionFailed(_) => "keywords".to_string(),
            MetaError::UnsupportedFileType(_) | MetaError::FileNotFound(_) => "input".to_string(),
            MetaError::EmptyDocument => "extract".to_string(),
        }
    }

    /// Whether the condition is reported as a warning rather than a failure
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            MetaError::EmptyDocument
                | MetaError::FileNotFound(_)
                | MetaError::UnsupportedFileType(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(ExtractionStage::PdfParse.to_string(), "pdf-parse");
        assert_eq!(ExtractionStage::DocxParse.to_string(), "docx-parse");
        assert_eq!(ExtractionStage::Ocr.to_string(), "ocr");
        assert_eq!(ExtractionStage::TxtRead.to_string(), "txt-read");
    }

    #[test]
    fn test_extraction_error_names_stage() {
        let err = MetaError::extraction(ExtractionStage::Ocr, "tesseract exited with status 1");
        let message = err.to_string();
        assert!(message.contains("ocr"));
        assert!(message.contains("tesseract exited"));
        assert_eq!(err.stage(), "ocr");
        assert!(!err.is_warning());
    }

    #[test]
    fn test_warnings() {
        assert!(MetaError::EmptyDocument.is_warning());
        assert!(MetaError::FileNotFound(PathBuf::from("missing.pdf")).is_warning());
        assert!(MetaError::UnsupportedFileType("xlsx".into()).is_warning());
        assert!(!MetaError::SummarizationFailed("down".into()).is_warning());
    }
}
