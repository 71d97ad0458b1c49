/// Sentence-boundary separators, tried in this order. The search prefers a
/// period boundary over an exclamation or question mark.
const SEPARATORS: [&str; 6] = [". ", ".\n", "! ", "!\n", "? ", "?\n"];

/// A contiguous slice of page text. Offsets are in characters, not bytes,
/// so they are safe to compare against `text.chars().count()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub start_char: usize,
    pub end_char: usize,
}

/// Split `text` into overlapping windows of at most `chunk_size` characters.
///
/// Each window tries to end just after a sentence separator found in the
/// last 20% of the window. The next window starts `overlap` characters
/// before the previous end; if that would not advance past the previous
/// window's start, it starts at the previous end instead so the walk always
/// terminates. Whitespace-only windows are dropped.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if text.trim().is_empty() {
        return Vec::new();
    }
    if len <= chunk_size {
        return vec![Chunk {
            content: text.trim().to_string(),
            start_char: 0,
            end_char: len,
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = (start + chunk_size).min(len);

        if end < len {
            let search_from = start + (chunk_size * 4) / 5;
            if let Some(boundary) = rightmost_separator(&chars, search_from, end) {
                end = boundary;
            }
        }

        let content: String = chars[start..end].iter().collect();
        let trimmed = content.trim();
        if !trimmed.is_empty() {
            chunks.push(Chunk {
                content: trimmed.to_string(),
                start_char: start,
                end_char: end,
            });
        }

        if end >= len {
            break;
        }

        let mut next = end.saturating_sub(overlap);
        if next <= start {
            next = end;
        }
        start = next;
    }

    chunks
}

/// Rightmost occurrence of the highest-priority separator within
/// `[from, to)`. Returns the position just past the separator.
fn rightmost_separator(chars: &[char], from: usize, to: usize) -> Option<usize> {
    for sep in SEPARATORS {
        let sep_chars: Vec<char> = sep.chars().collect();
        if to < sep_chars.len() {
            continue;
        }
        let mut i = to - sep_chars.len();
        loop {
            if i < from {
                break;
            }
            if chars[i..i + sep_chars.len()] == sep_chars[..] {
                return Some(i + sep_chars.len());
            }
            if i == 0 {
                break;
            }
            i -= 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_one_chunk() {
        let chunks = chunk_text("hello world", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "hello world");
        assert_eq!(chunks[0].start_char, 0);
        assert_eq!(chunks[0].end_char, 11);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(chunk_text("", 1000, 200).is_empty());
        assert!(chunk_text("   \n  ", 1000, 200).is_empty());
    }

    #[test]
    fn windows_are_dense_and_bounded() {
        let text = "word ".repeat(500);
        let chunks = chunk_text(&text, 100, 20);
        let total_chars = text.chars().count();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.start_char < chunk.end_char);
            assert!(chunk.end_char <= total_chars);
            assert!(chunk.end_char - chunk.start_char <= 100);
        }
        // consecutive windows overlap by the configured amount
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_char - pair[1].start_char, 20);
        }
        // last window reaches the end of the text
        assert_eq!(chunks.last().unwrap().end_char, total_chars);
    }

    #[test]
    fn window_snaps_to_sentence_boundary() {
        // a period lands inside the last 20% of the first 100-char window
        let first = format!("{}. ", "a".repeat(88));
        let text = format!("{}{}", first, "b".repeat(200));
        let chunks = chunk_text(&text, 100, 20);
        assert_eq!(chunks[0].end_char, 90);
        assert!(chunks[0].content.ends_with('.'));
    }

    #[test]
    fn period_preferred_over_question_mark() {
        // both separators sit in the tail region; ". " wins even though
        // "? " is further right
        let text = format!("{}. xx? y{}", "a".repeat(85), "b".repeat(200));
        let chunks = chunk_text(&text, 100, 20);
        assert_eq!(chunks[0].end_char, 87);
    }

    #[test]
    fn progress_guard_terminates_on_large_overlap() {
        let text = "x".repeat(300);
        // overlap >= chunk_size would loop forever without the guard
        let chunks = chunk_text(&text, 100, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start_char, 0);
        assert_eq!(chunks[1].start_char, 100);
        assert_eq!(chunks[2].start_char, 200);
    }

    #[test]
    fn multibyte_text_uses_char_offsets() {
        let text = "héllo wörld ü ".repeat(30);
        let chunks = chunk_text(&text, 50, 10);
        let total_chars = text.chars().count();
        for chunk in &chunks {
            assert!(chunk.end_char <= total_chars);
            assert!(!chunk.content.is_empty());
        }
    }
}
