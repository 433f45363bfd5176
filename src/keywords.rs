use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::KeywordConfig;
use crate::error::MetaError;
use crate::parser::truncate_chars;

/// A candidate phrase with its relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPhrase {
    pub phrase: String,
    pub score: f32,
}

/// What the keyphrase model is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyphraseRequest {
    pub top_n: usize,
    pub ngram_min: usize,
    pub ngram_max: usize,
}

/// A model that ranks candidate phrases of a document by relevance
#[async_trait]
pub trait KeyphraseModel: Send + Sync {
    async fn keyphrases(&self, text: &str, request: &KeyphraseRequest) -> Result<Vec<ScoredPhrase>>;
}

/// English stop words; a keyword containing any of them is rejected
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "done", "down",
    "due", "during", "each", "either", "else", "elsewhere", "enough", "etc", "even", "ever",
    "every", "everyone", "everything", "everywhere", "except", "few", "for", "former",
    "formerly", "from", "further", "had", "has", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hers", "herself", "him", "himself", "his", "how",
    "however", "i", "ie", "if", "in", "indeed", "into", "is", "it", "its", "itself", "just",
    "last", "latter", "least", "less", "many", "may", "me", "meanwhile", "might", "mine", "more",
    "moreover", "most", "mostly", "much", "must", "my", "myself", "namely", "neither", "never",
    "nevertheless", "next", "no", "nobody", "none", "nor", "not", "nothing", "now", "nowhere",
    "of", "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others",
    "otherwise", "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps", "please",
    "rather", "re", "same", "seem", "seemed", "seeming", "seems", "several", "she", "should",
    "since", "so", "some", "somehow", "someone", "something", "sometime", "sometimes",
    "somewhere", "still", "such", "than", "that", "the", "their", "them", "themselves", "then",
    "thence", "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these",
    "they", "this", "those", "though", "through", "throughout", "thru", "thus", "to",
    "together", "too", "toward", "towards", "under", "until", "up", "upon", "us", "very", "via",
    "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever", "where",
    "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which",
    "while", "whither", "who", "whoever", "whole", "whom", "whose", "why", "will", "with",
    "within", "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Wraps a `KeyphraseModel` and enforces the keyword contract on its output
pub struct KeywordExtractor {
    model: Arc<dyn KeyphraseModel>,
    config: KeywordConfig,
    timeout: Duration,
}

impl KeywordExtractor {
    pub fn new(model: Arc<dyn KeyphraseModel>, config: &KeywordConfig, timeout: Duration) -> Self {
        Self {
            model,
            config: config.clone(),
            timeout,
        }
    }

    fn request(&self) -> KeyphraseRequest {
        KeyphraseRequest {
            top_n: self.config.top_n,
            ngram_min: self.config.ngram_min,
            ngram_max: self.config.ngram_max,
        }
    }

    /// Extract at most `top_n` keywords, most relevant first
    pub async fn extract(&self, text: &str) -> Result<Vec<String>, MetaError> {
        let input = truncate_chars(text, self.config.max_input_chars);
        if input.len() < text.len() {
            tracing::debug!(
                total_chars = text.chars().count(),
                kept_chars = self.config.max_input_chars,
                "Keyword input truncated to max_input_chars"
            );
        }
        tracing::info!(chars = input.chars().count(), "Extracting keywords");

        let request = self.request();
        let candidates = tokio::time::timeout(self.timeout, self.model.keyphrases(input, &request))
            .await
            .map_err(|_| {
                MetaError::KeywordExtractionFailed(format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| MetaError::KeywordExtractionFailed(format!("{:#}", e)))?;

        let received = candidates.len();
        let keywords = select_keywords(candidates, &request);
        tracing::debug!(received, kept = keywords.len(), "Keywords selected");
        Ok(keywords)
    }
}

/// Normalize, filter, dedupe and rank model candidates
pub fn select_keywords(candidates: Vec<ScoredPhrase>, request: &KeyphraseRequest) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut kept: Vec<ScoredPhrase> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let phrase = normalize_phrase(&candidate.phrase);
            let tokens = phrase.split(' ').filter(|t| !t.is_empty()).count();
            if tokens < request.ngram_min.max(1) || tokens > request.ngram_max {
                return None;
            }
            if phrase.split(' ').any(is_stop_word) {
                return None;
            }
            if !seen.insert(phrase.clone()) {
                return None;
            }
            Some(ScoredPhrase {
                phrase,
                score: candidate.score,
            })
        })
        .collect();

    // sort_by is stable, so equal scores keep the model's order
    kept.sort_by(|a, b| b.score.total_cmp(&a.score));
    kept.truncate(request.top_n);
    kept.into_iter().map(|p| p.phrase).collect()
}

/// Lowercase, strip edge punctuation and collapse inner whitespace
fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
