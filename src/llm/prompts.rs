use crate::keywords::KeyphraseRequest;

/// System prompt for summarizing one piece of a document
pub fn summary_system_prompt(min_tokens: u32, max_tokens: u32) -> String {
    format!(
        r#"You are a news-style summarization model. You are given a passage of a document (delimited by ```).
Write an abstractive summary of the passage.

Rules:
- The summary must be between {min_tokens} and {max_tokens} tokens long
- Write complete sentences in plain prose, ending each sentence with a period
- Start directly with the content: no preamble such as "This document" or "Summary:"
- Do not use bullet points, headings, quotes or markdown
- Use only information present in the passage"#
    )
}

/// System prompt for ranked keyphrase extraction
pub fn keyphrase_system_prompt(request: &KeyphraseRequest) -> String {
    format!(
        r#"You are a keyphrase extraction model. You are given a document (delimited by ```).
Find the {top_n} candidate phrases that best represent what the document is about.

Rules:
- Each keyphrase is between {min} and {max} words long and appears in the document
- Keyphrases must not contain English stop words (such as "the", "of", "and", "is", "to")
- Keyphrases are lowercase
- Score each keyphrase by its relevance to the whole document, from 0.0 to 1.0
- Sort by score, highest first, and do not repeat a keyphrase

Format your output as a JSON array:
[
    {{"keyphrase": "example phrase", "score": 0.71}}
]

Output ONLY valid JSON, no other text"#,
        top_n = request.top_n,
        min = request.ngram_min,
        max = request.ngram_max,
    )
}

/// User prompt wrapping the document text
pub fn document_user_prompt(text: &str) -> String {
    format!("context: ```{}```\n\noutput: ", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_carries_bounds() {
        let prompt = summary_system_prompt(30, 130);
        assert!(prompt.contains("between 30 and 130 tokens"));
    }

    #[test]
    fn test_keyphrase_prompt_carries_request() {
        let request = KeyphraseRequest {
            top_n: 8,
            ngram_min: 1,
            ngram_max: 2,
        };
        let prompt = keyphrase_system_prompt(&request);
        assert!(prompt.contains("Find the 8 candidate phrases"));
        assert!(prompt.contains("between 1 and 2 words"));
        assert!(prompt.contains(r#"{"keyphrase": "example phrase", "score": 0.71}"#));
    }
}
