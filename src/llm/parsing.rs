//! Shared parsing utilities for LLM response handling.
//!
//! LLM responses are unpredictable: they may wrap JSON in markdown fences,
//! include explanatory text before/after, or prefix a summary with a label.
//! This module turns raw model output into summaries and ranked keyphrases.

use anyhow::Result;
use serde::Deserialize;

use crate::keywords::ScoredPhrase;

/// One element of a keyphrase array as models actually return it
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPhrase {
    Scored {
        #[serde(alias = "phrase", alias = "keyword")]
        keyphrase: String,
        #[serde(default)]
        score: Option<f32>,
    },
    Pair(String, f32),
    Plain(String),
}

/// Parse a raw LLM response into keyphrases in the order the model ranked them.
///
/// Handles:
/// - `[{"keyphrase": "...", "score": 0.7}]` (also `phrase` / `keyword` keys)
/// - `[["phrase", 0.7]]` pairs
/// - `["phrase", ...]` plain strings, scored by position
/// - JSON wrapped in markdown code fences or prose
///
/// A response with no parsable array is an error.
pub fn parse_keyphrases_json(response: &str) -> Result<Vec<ScoredPhrase>> {
    let json_str = extract_json_array(response);

    let raw: Vec<RawPhrase> = serde_json::from_str(&json_str).map_err(|e| {
        tracing::warn!(
            "Failed to parse keyphrase JSON: {}. Response: {}",
            e,
            response
        );
        anyhow::anyhow!("model returned no parsable keyphrase list: {}", e)
    })?;

    let count = raw.len();
    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(rank, phrase)| {
            // Unscored entries keep their position as rank
            let positional = (count - rank) as f32 / count as f32;
            match phrase {
                RawPhrase::Scored { keyphrase, score } => ScoredPhrase {
                    phrase: keyphrase,
                    score: score.unwrap_or(positional),
                },
                RawPhrase::Pair(phrase, score) => ScoredPhrase { phrase, score },
                RawPhrase::Plain(phrase) => ScoredPhrase {
                    phrase,
                    score: positional,
                },
            }
        })
        .collect())
}

/// Normalize a model summary to a single line of prose.
///
/// Strips code fences, a leading "Summary:" label and surrounding quotes, and
/// collapses runs of whitespace.
pub fn clean_summary(response: &str) -> String {
    let text = strip_code_fences(response);
    let text = text
        .strip_prefix("Summary:")
        .or_else(|| text.strip_prefix("summary:"))
        .unwrap_or(text)
        .trim();
    let text = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract a JSON array from a response that may contain extra text.
///
/// Tries the following strategies in order:
/// 1. Strip markdown code fences (` ```json ... ``` `)
/// 2. If the (cleaned) text starts with `[`, find matching `]`
/// 3. Search for the first `[` in the text and find its matching `]`
/// 4. Fall back to returning the original text as-is
pub fn extract_json_array(response: &str) -> String {
    let response = response.trim();

    // Strip markdown code fences if present
    let stripped = strip_code_fences(response);

    // Strategy 1: starts with [
    if stripped.starts_with('[')
        && let Some(end) = find_matching_bracket(stripped)
    {
        return stripped[..=end].to_string();
    }

    // Strategy 2: find first [ anywhere
    if let Some(start) = stripped.find('[')
        && let Some(end) = find_matching_bracket(&stripped[start..])
    {
        return stripped[start..=start + end].to_string();
    }

    // Fallback
    stripped.to_string()
}

/// Strip markdown code fences (``` or ```json) from around content.
fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();

    // Handle ```json\n...\n``` or ```\n...\n```
    if s.starts_with("```")
        && let Some(first_newline) = s.find('\n')
    {
        let inner = &s[first_newline + 1..];
        if let Some(closing) = inner.rfind("```") {
            return inner[..closing].trim();
        }
    }

    s
}

/// Find the byte index of the `]` that matches the first `[` in the string.
///
/// Returns `None` if brackets are unbalanced.
fn find_matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── extract_json_array ──────────────────────────────────────────────

    #[test]
    fn test_extract_clean_array() {
        let input = r#"[{"keyphrase":"rust","score":0.9}]"#;
        assert_eq!(extract_json_array(input), input);
    }

    #[test]
    fn test_extract_with_surrounding_prose() {
        let input = r#"Here are the keyphrases: [{"keyphrase":"rust","score":0.9}] Hope this helps!"#;
        let result = extract_json_array(input);
        assert!(result.starts_with('['));
        assert!(result.ends_with(']'));
        assert!(!result.contains("Hope"));
    }

    #[test]
    fn test_extract_with_markdown_fences() {
        let input = "```json\n[\"rust\", \"tokio\"]\n```";
        assert_eq!(extract_json_array(input), "[\"rust\", \"tokio\"]");
    }

    #[test]
    fn test_extract_no_json() {
        let input = "I couldn't find any keyphrases.";
        assert_eq!(extract_json_array(input), input);
    }

    #[test]
    fn test_extract_after_multibyte_prefix() {
        let input = "Résumé → [\"café culture\"]";
        assert_eq!(extract_json_array(input), "[\"café culture\"]");
    }

    // ── find_matching_bracket ───────────────────────────────────────────

    #[test]
    fn test_bracket_nested() {
        assert_eq!(find_matching_bracket("[[a],[b]]"), Some(8));
    }

    #[test]
    fn test_bracket_unbalanced() {
        assert_eq!(find_matching_bracket("[abc"), None);
    }

    #[test]
    fn test_bracket_string_with_brackets() {
        assert_eq!(find_matching_bracket(r#"["a]b"]"#), Some(6));
    }

    #[test]
    fn test_bracket_escaped_quote() {
        assert_eq!(find_matching_bracket(r#"["a\"b"]"#), Some(7));
    }

    // ── parse_keyphrases_json ───────────────────────────────────────────

    #[test]
    fn test_parse_scored_objects_keep_order() {
        let input = r#"[
            {"keyphrase": "brown fox", "score": 0.82},
            {"keyphrase": "jumps", "score": 0.41}
        ]"#;
        let phrases = parse_keyphrases_json(input).unwrap();
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].phrase, "brown fox");
        assert_eq!(phrases[0].score, 0.82);
        assert_eq!(phrases[1].phrase, "jumps");
    }

    #[test]
    fn test_parse_alias_keys_and_pairs() {
        let objects = parse_keyphrases_json(r#"[{"phrase": "a", "score": 0.5}, {"keyword": "b"}]"#).unwrap();
        assert_eq!(objects[0].phrase, "a");
        assert_eq!(objects[1].phrase, "b");

        let pairs = parse_keyphrases_json(r#"[["quick fox", 0.6], ["fox", 0.5]]"#).unwrap();
        assert_eq!(pairs[0].phrase, "quick fox");
        assert_eq!(pairs[1].score, 0.5);
    }

    #[test]
    fn test_parse_plain_strings_scored_by_position() {
        let phrases = parse_keyphrases_json(r#"["first", "second", "third", "fourth"]"#).unwrap();
        assert_eq!(phrases.len(), 4);
        assert!(phrases[0].score > phrases[1].score);
        assert!(phrases[2].score > phrases[3].score);
    }

    #[test]
    fn test_parse_wrapped_in_prose() {
        let input = r#"Based on the text, here are the keyphrases:

```json
[{"keyphrase": "machine learning", "score": 0.77}]
```

These represent the key topics."#;
        let phrases = parse_keyphrases_json(input).unwrap();
        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0].phrase, "machine learning");
    }

    #[test]
    fn test_parse_invalid_json_is_error() {
        assert!(parse_keyphrases_json("no keyphrases here").is_err());
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_keyphrases_json("[]").unwrap().is_empty());
    }

    // ── clean_summary ───────────────────────────────────────────────────

    #[test]
    fn test_clean_summary_strips_label_and_whitespace() {
        let input = "Summary:  The fox jumps.\n\n  It is quick. ";
        assert_eq!(clean_summary(input), "The fox jumps. It is quick.");
    }

    #[test]
    fn test_clean_summary_strips_quotes_and_fences() {
        assert_eq!(clean_summary("\"A fox jumps.\""), "A fox jumps.");
        assert_eq!(clean_summary("```\nA fox jumps.\n```"), "A fox jumps.");
    }

    #[test]
    fn test_clean_summary_empty() {
        assert_eq!(clean_summary("   \n "), "");
    }
}
