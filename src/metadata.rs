use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::MetaError;
use crate::keywords::KeywordExtractor;
use crate::parser::DocumentType;
use crate::summarize::Summarizer;

/// Structured metadata for one document.
///
/// Field order here is the serialized order in both JSON and YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub document_type: DocumentType,
    pub word_count: usize,
}

impl MetadataRecord {
    /// Pretty JSON with 4-space indentation
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .context("Failed to serialize metadata as JSON")?;
        String::from_utf8(buf).context("JSON output was not valid UTF-8")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize metadata as YAML")
    }
}

/// Title is the summary up to its first period, or the whole summary without one
pub fn derive_title(summary: &str) -> String {
    summary.split('.').next().unwrap_or_default().to_string()
}

/// Number of whitespace-delimited tokens
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Builds a `MetadataRecord` from extracted text
pub struct MetadataAssembler {
    summarizer: Summarizer,
    keywords: KeywordExtractor,
}

impl MetadataAssembler {
    pub fn new(summarizer: Summarizer, keywords: KeywordExtractor) -> Self {
        Self {
            summarizer,
            keywords,
        }
    }

    pub async fn assemble(
        &self,
        text: &str,
        document_type: DocumentType,
    ) -> Result<MetadataRecord, MetaError> {
        let summary = self.summarizer.summarize(text).await?;
        let keywords = self.keywords.extract(text).await?;

        Ok(MetadataRecord {
            title: derive_title(&summary),
            summary,
            keywords,
            document_type,
            word_count: word_count(text),
        })
    }
}
