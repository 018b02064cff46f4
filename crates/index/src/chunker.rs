/// A contiguous span of the source document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    /// Byte offset of the chunk start in the source text.
    pub start_offset: usize,
}

/// Split text into overlapping character windows, preferring to break at
/// whitespace so chunks do not end mid-word. Mirrors the recursive
/// splitter settings used at ingestion time (window 1000, overlap 100 by
/// default).
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    assert!(chunk_size > 0, "chunk_size must be positive");
    assert!(overlap < chunk_size, "overlap must be smaller than chunk_size");

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let hard_end = (start + chunk_size).min(chars.len());
        let end = if hard_end == chars.len() { hard_end } else { break_point(&chars, start, hard_end) };

        let byte_start = chars[start].0;
        let byte_end = if end == chars.len() { text.len() } else { chars[end].0 };
        let content = text[byte_start..byte_end].trim();
        if !content.is_empty() {
            // Offset of the trimmed content, not the raw window.
            let leading = text[byte_start..byte_end].len() - text[byte_start..byte_end].trim_start().len();
            chunks.push(TextChunk {
                content: content.to_string(),
                start_offset: byte_start + leading,
            });
        }

        if end == chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Find a whitespace boundary at or before `hard_end`, falling back to the
/// hard cut when the window contains no whitespace in its trailing part.
fn break_point(chars: &[(usize, char)], start: usize, hard_end: usize) -> usize {
    let search_floor = start + (hard_end - start) / 2;
    let mut candidate = hard_end;
    while candidate > search_floor {
        if chars[candidate - 1].1.is_whitespace() {
            return candidate;
        }
        candidate -= 1;
    }
    hard_end
}
