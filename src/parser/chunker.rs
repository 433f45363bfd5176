/// Splits text into fixed-size, contiguous, non-overlapping chunks.
///
/// Sizes are counted in characters, not bytes, so chunk boundaries always land
/// on UTF-8 boundaries. The first chunk starts at offset 0 and concatenating
/// all chunks yields the input unchanged.
pub struct TextChunker {
    pub chunk_size: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Split text into chunks of at most `chunk_size` characters
    #[cfg(test)]
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.chunks(text).collect()
    }

    /// Split text and keep only the first `max_chunks` chunks
    pub fn split_limited<'a>(&self, text: &'a str, max_chunks: usize) -> Vec<&'a str> {
        self.chunks(text).take(max_chunks).collect()
    }

    fn chunks<'a>(&self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let starts: Vec<usize> = text
            .char_indices()
            .step_by(self.chunk_size)
            .map(|(i, _)| i)
            .collect();

        let ends: Vec<usize> = starts
            .iter()
            .skip(1)
            .copied()
            .chain(std::iter::once(text.len()))
            .collect();

        starts
            .into_iter()
            .zip(ends)
            .map(move |(start, end)| &text[start..end])
    }
}

/// Return the first `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::new(100);
        assert!(chunker.split("").is_empty());
    }

    #[test]
    fn test_small_text_fits_one_chunk() {
        let chunker = TextChunker::new(1000);
        let text = "This is a small text that fits in one chunk.";
        assert_eq!(chunker.split(text), vec![text]);
    }

    #[test]
    fn test_chunks_are_contiguous_and_non_overlapping() {
        let chunker = TextChunker::new(1000);
        let text: String = (0..2500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunker.split(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1000);
        assert_eq!(chunks[1].len(), 1000);
        assert_eq!(chunks[2].len(), 500);
        assert_eq!(chunks[0], &text[..1000]);
        assert_eq!(chunks[1], &text[1000..2000]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_limited_caps_coverage() {
        let chunker = TextChunker::new(1000);
        let text = "x".repeat(12_345);
        let chunks = chunker.split_limited(&text, 5);

        assert_eq!(chunks.len(), 5);
        let covered: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert_eq!(covered, 5000);
        assert_eq!(chunks.concat(), text[..5000]);
    }

    #[test]
    fn test_unicode_text_counts_characters() {
        let chunker = TextChunker::new(4);
        let text = "日本語のテスト文章です";
        let chunks = chunker.split(text);
        assert_eq!(chunks, vec!["日本語の", "テスト文", "章です"]);
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let chunker = TextChunker::new(0);
        assert_eq!(chunker.split("abc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("short", 1024), "short");
        assert_eq!(truncate_chars("żółw", 2), "żó");
        assert_eq!(truncate_chars("", 10), "");
    }
}
