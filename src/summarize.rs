use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::SummaryMode;
use crate::config::SummarizerConfig;
use crate::error::MetaError;
use crate::parser::{TextChunker, truncate_chars};

/// Length bounds passed to the summarization model, in tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryBounds {
    pub min_length: u32,
    pub max_length: u32,
}

/// A model that condenses one passage into a short summary
#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String>;
}

/// Applies the configured truncate/chunk policy around a `SummaryModel`
pub struct Summarizer {
    model: Arc<dyn SummaryModel>,
    config: SummarizerConfig,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(model: Arc<dyn SummaryModel>, config: &SummarizerConfig, timeout: Duration) -> Self {
        Self {
            model,
            config: config.clone(),
            timeout,
        }
    }

    fn bounds(&self) -> SummaryBounds {
        SummaryBounds {
            min_length: self.config.min_length,
            max_length: self.config.max_length,
        }
    }

    /// The slices of `text` that are sent to the model, in order
    pub fn passages<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self.config.mode {
            SummaryMode::Truncate => vec![truncate_chars(text, self.config.truncate_chars)],
            SummaryMode::Chunked => {
                TextChunker::new(self.config.chunk_size).split_limited(text, self.config.max_chunks)
            }
        }
    }

    /// Summarize `text`; per-passage summaries are joined with a single space
    pub async fn summarize(&self, text: &str) -> Result<String, MetaError> {
        let passages = self.passages(text);
        tracing::info!(
            mode = %self.config.mode,
            passages = passages.len(),
            "Summarizing"
        );

        let mut summaries = Vec::with_capacity(passages.len());
        for (index, passage) in passages.iter().enumerate() {
            let summary = tokio::time::timeout(self.timeout, self.model.summarize(passage, self.bounds()))
                .await
                .map_err(|_| {
                    MetaError::SummarizationFailed(format!(
                        "passage {} timed out after {:?}",
                        index + 1,
                        self.timeout
                    ))
                })?
                .map_err(|e| MetaError::SummarizationFailed(format!("{:#}", e)))?;

            tracing::debug!(passage = index + 1, chars = summary.len(), "Passage summarized");
            summaries.push(summary);
        }

        Ok(summaries.join(" "))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Summary model stand-in that records its inputs
    pub(crate) struct FakeSummaryModel {
        pub reply: String,
        pub seen: Mutex<Vec<String>>,
    }

    impl FakeSummaryModel {
        pub(crate) fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SummaryModel for FakeSummaryModel {
        async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String> {
            assert!(bounds.min_length <= bounds.max_length);
            let mut seen = self.seen.lock().unwrap();
            seen.push(text.to_string());
            Ok(format!("{} {}", self.reply, seen.len()))
        }
    }

    struct FailingModel;

    #[async_trait]
    impl SummaryModel for FailingModel {
        async fn summarize(&self, _text: &str, _bounds: SummaryBounds) -> Result<String> {
            anyhow::bail!("model unavailable")
        }
    }

    struct SlowModel;

    #[async_trait]
    impl SummaryModel for SlowModel {
        async fn summarize(&self, _text: &str, _bounds: SummaryBounds) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    fn config(mode: SummaryMode) -> SummarizerConfig {
        SummarizerConfig {
            mode,
            ..SummarizerConfig::default()
        }
    }

    fn long_text(chars: usize) -> String {
        (0..chars).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
    }

    #[tokio::test]
    async fn test_chunked_covers_at_most_five_chunks() {
        let model = FakeSummaryModel::replying("Part");
        let summarizer = Summarizer::new(model.clone(), &config(SummaryMode::Chunked), Duration::from_secs(5));
        let text = long_text(7_300);

        let summary = summarizer.summarize(&text).await.unwrap();
        assert_eq!(summary, "Part 1 Part 2 Part 3 Part 4 Part 5");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(|chunk| chunk.chars().count() == 1000));
        assert_eq!(seen.concat(), text[..5000]);
    }

    #[tokio::test]
    async fn test_chunked_short_text_is_one_chunk() {
        let model = FakeSummaryModel::replying("Only");
        let summarizer = Summarizer::new(model.clone(), &config(SummaryMode::Chunked), Duration::from_secs(5));

        let summary = summarizer.summarize("The quick brown fox. It jumps.").await.unwrap();
        assert_eq!(summary, "Only 1");
        assert_eq!(model.seen.lock().unwrap()[0], "The quick brown fox. It jumps.");
    }

    #[tokio::test]
    async fn test_truncate_sends_first_1024_chars() {
        let model = FakeSummaryModel::replying("Cut");
        let summarizer = Summarizer::new(model.clone(), &config(SummaryMode::Truncate), Duration::from_secs(5));
        let text = long_text(3_000);

        let summary = summarizer.summarize(&text).await.unwrap();
        assert_eq!(summary, "Cut 1");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], text[..1024]);
    }

    #[test]
    fn test_truncate_keeps_short_text_whole() {
        let summarizer = Summarizer::new(
            FakeSummaryModel::replying("x"),
            &config(SummaryMode::Truncate),
            Duration::from_secs(5),
        );
        assert_eq!(summarizer.passages("short"), vec!["short"]);
    }

    #[test]
    fn test_custom_chunking() {
        let cfg = SummarizerConfig {
            mode: SummaryMode::Chunked,
            chunk_size: 3,
            max_chunks: 2,
            ..SummarizerConfig::default()
        };
        let summarizer = Summarizer::new(FakeSummaryModel::replying("x"), &cfg, Duration::from_secs(5));
        assert_eq!(summarizer.passages("abcdefgh"), vec!["abc", "def"]);
    }

    #[tokio::test]
    async fn test_model_failure_is_summarization_failed() {
        let summarizer = Summarizer::new(Arc::new(FailingModel), &config(SummaryMode::Chunked), Duration::from_secs(5));
        let err = summarizer.summarize("Some text.").await.unwrap_err();
        assert!(matches!(err, MetaError::SummarizationFailed(ref m) if m.contains("model unavailable")));
    }

    #[tokio::test]
    async fn test_model_timeout_is_summarization_failed() {
        let summarizer = Summarizer::new(Arc::new(SlowModel), &config(SummaryMode::Truncate), Duration::from_millis(20));
        let err = summarizer.summarize("Some text.").await.unwrap_err();
        assert!(matches!(err, MetaError::SummarizationFailed(ref m) if m.contains("timed out")));
    }
}
