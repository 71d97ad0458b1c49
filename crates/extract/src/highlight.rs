use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_MAX_HIGHLIGHTS: usize = 3;
pub const DEFAULT_WINDOW_CHARS: usize = 150;

/// Sentence boundary: terminal punctuation followed by whitespace. The
/// punctuation stays with the preceding sentence.
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("static regex"));

/// Pull up to `max_highlights` sentences out of `content` that mention the
/// most query terms. Ties go to the earlier sentence. Sentences longer than
/// `2 * window` characters are truncated with a trailing ellipsis.
pub fn highlights(
    content: &str,
    query: &str,
    max_highlights: usize,
    window: usize,
) -> Vec<String> {
    if content.is_empty() || query.is_empty() {
        return Vec::new();
    }

    let terms: Vec<String> = query.to_lowercase().split_whitespace().map(String::from).collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, usize, &str)> = Vec::new();
    for (position, sentence) in split_sentences(content).into_iter().enumerate() {
        let lowered = sentence.to_lowercase();
        let score = terms.iter().filter(|t| lowered.contains(t.as_str())).count();
        if score > 0 {
            scored.push((score, position, sentence));
        }
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    scored
        .into_iter()
        .take(max_highlights)
        .map(|(_, _, sentence)| truncate(sentence.trim(), window * 2))
        .collect()
}

/// Split on `[.!?]` + whitespace, keeping the punctuation with its sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last = 0;
    for m in SENTENCE_BOUNDARY.find_iter(text) {
        // the punctuation char is ASCII, so +1 stays on a char boundary
        let end = m.start() + 1;
        if end > last {
            sentences.push(&text[last..end]);
        }
        last = m.end();
    }
    if last < text.len() {
        sentences.push(&text[last..]);
    }
    sentences
}

fn truncate(sentence: &str, max_chars: usize) -> String {
    if sentence.chars().count() <= max_chars {
        return sentence.to_string();
    }
    let mut cut: String = sentence.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_by_term_count() {
        let content = "Rust is fast. Rust is safe and fast. Python is slow.";
        let hits = highlights(content, "rust fast", 2, 150);
        assert_eq!(hits.len(), 2);
        // two terms beat one term
        assert_eq!(hits[0], "Rust is fast.");
        assert_eq!(hits[1], "Rust is safe and fast.");
    }

    #[test]
    fn zero_score_sentences_dropped() {
        let content = "Alpha beta. Gamma delta. Epsilon zeta.";
        let hits = highlights(content, "gamma", 5, 150);
        assert_eq!(hits, vec!["Gamma delta."]);
    }

    #[test]
    fn ties_break_by_position() {
        let content = "fox runs! fox sleeps? fox eats.";
        let hits = highlights(content, "fox", 2, 150);
        assert_eq!(hits, vec!["fox runs!", "fox sleeps?"]);
    }

    #[test]
    fn long_sentences_truncated_with_ellipsis() {
        let long = format!("fox {}.", "word ".repeat(100));
        let hits = highlights(&long, "fox", 1, 10);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].ends_with("..."));
        assert_eq!(hits[0].chars().count(), 23);
    }

    #[test]
    fn empty_inputs() {
        assert!(highlights("", "query", 3, 150).is_empty());
        assert!(highlights("some text.", "", 3, 150).is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let hits = highlights("The Quick Brown FOX.", "fox", 1, 150);
        assert_eq!(hits.len(), 1);
    }
}
