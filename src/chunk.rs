//! Sentence-aware windowed text chunker.
//!
//! Walks normalized document text in windows of `chunk_size` characters.
//! When a window ends mid-text, the cut is moved back to the last
//! sentence-ending punctuation or newline, provided that break falls past
//! the window's midpoint; this avoids mid-sentence splits without
//! degenerating into tiny chunks. Consecutive windows overlap by `overlap`
//! characters, clamped forward so the walk always makes progress.
//!
//! Empty documents yield zero chunks; a document shorter than `chunk_size`
//! yields exactly one.

/// Characters treated as sentence boundaries when searching for a cut point.
const SENTENCE_BREAKS: [char; 4] = ['.', '!', '?', '\n'];

/// Split text into bounded, overlapping, sentence-aware segments.
///
/// `overlap` must be `< chunk_size`; it is clamped internally as a guard.
/// Offsets are in characters, not bytes, so multi-byte text never splits
/// inside a code point.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if chunk_size == 0 {
        return Vec::new();
    }
    let overlap = overlap.min(chunk_size - 1);

    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let chars: Vec<char> = normalized.chars().collect();

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());

        // Not at the text's end: prefer cutting at the last sentence break
        // inside the window, if it lies past the midpoint.
        if end < chars.len() {
            if let Some(pos) = chars[start..end]
                .iter()
                .rposition(|c| SENTENCE_BREAKS.contains(c))
            {
                let cut = start + pos;
                if cut > start + chunk_size / 2 {
                    end = cut + 1;
                }
            }
        }

        let segment: String = chars[start..end].iter().collect();
        let trimmed = segment.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= chars.len() {
            break;
        }

        // Overlap the next window, clamped forward so the same window is
        // never re-emitted.
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 1000, 150).is_empty());
        assert!(chunk_text("   \n  ", 1000, 150).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("A gentle cleanser suits most skin types.", 1000, 150);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "A gentle cleanser suits most skin types.");
    }

    #[test]
    fn test_chunks_respect_size_bound() {
        let text = "abcdefghij".repeat(500); // 5000 chars, no sentence breaks
        let chunks = chunk_text(&text, 1000, 150);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
    }

    #[test]
    fn test_2400_chars_default_params_three_chunks() {
        let text = "x".repeat(2400);
        let chunks = chunk_text(&text, 1000, 150);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
    }

    #[test]
    fn test_adjacent_chunks_share_overlap() {
        let text = "abcdefghij".repeat(240); // 2400 chars
        let chunks = chunk_text(&text, 1000, 150);
        assert!(chunks.len() >= 2);
        let tail: String = chunks[0].chars().rev().take(150).collect::<String>();
        let tail: String = tail.chars().rev().collect();
        assert!(chunks[1].starts_with(&tail));
    }

    #[test]
    fn test_cut_prefers_sentence_boundary() {
        // A period at position 80 of a 100-char window (past midpoint 50)
        // should become the cut point.
        let mut text = "a".repeat(80);
        text.push('.');
        text.push_str(&"b".repeat(120));
        let chunks = chunk_text(&text, 100, 0);
        assert!(chunks[0].ends_with('.'));
        assert_eq!(chunks[0].chars().count(), 81);
    }

    #[test]
    fn test_break_before_midpoint_ignored() {
        // Period at position 10 of a 100-char window is before the midpoint,
        // so the raw boundary is used instead.
        let mut text = "a".repeat(10);
        text.push('.');
        text.push_str(&"b".repeat(200));
        let chunks = chunk_text(&text, 100, 0);
        assert_eq!(chunks[0].chars().count(), 100);
    }

    #[test]
    fn test_progress_with_large_overlap() {
        // Sentence-heavy text plus near-maximal overlap must still terminate
        // and never re-emit a window.
        let text = "One. Two. Three. Four. Five. Six. Seven. Eight. Nine. Ten. ".repeat(20);
        let chunks = chunk_text(&text, 40, 39);
        assert!(!chunks.is_empty());
        assert!(chunks.len() < text.len()); // sanity: finite and bounded
    }

    #[test]
    fn test_coverage_reconstructs_content() {
        // With zero overlap every character of the trimmed text appears
        // exactly once across the chunks.
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(60);
        let chunks = chunk_text(&text, 200, 0);
        let rejoined: String = chunks.join(" ");
        let original_words: Vec<&str> = text.split_whitespace().collect();
        let rejoined_words: Vec<&str> = rejoined.split_whitespace().collect();
        assert_eq!(original_words, rejoined_words);
    }

    #[test]
    fn test_line_endings_normalized() {
        let chunks = chunk_text("first line\r\nsecond line\rthird line", 1000, 0);
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].contains('\r'));
    }

    #[test]
    fn test_multibyte_text_safe() {
        let text = "Da khô cần dưỡng ẩm sâu. ".repeat(100);
        let chunks = chunk_text(&text, 100, 20);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
        }
    }
}
