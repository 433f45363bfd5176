use std::path::Path;

use crate::error::{ExtractionStage, MetaError};

/// Read a plain text file as UTF-8, verbatim
pub async fn extract_text(path: &Path) -> Result<String, MetaError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        MetaError::extraction(
            ExtractionStage::TxtRead,
            format!("failed to read {}: {}", path.display(), e),
        )
    })?;

    String::from_utf8(bytes).map_err(|e| {
        MetaError::extraction(
            ExtractionStage::TxtRead,
            format!("{} is not valid UTF-8: {}", path.display(), e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_extract_text_is_verbatim() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "  Hello, World!\n\n").unwrap();

        let text = extract_text(file.path()).await.unwrap();
        assert_eq!(text, "  Hello, World!\n\n");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_txt_read_failure() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x66, 0x6f, 0xff, 0xfe]).unwrap();

        let err = extract_text(file.path()).await.unwrap_err();
        assert!(matches!(
            err,
            MetaError::ExtractionFailed {
                stage: ExtractionStage::TxtRead,
                ..
            }
        ));
    }
}
