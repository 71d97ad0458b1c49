pub mod content;
pub mod highlight;
pub mod html;

use url::Url;

use websift_core::ExtractedDocument;

pub use highlight::{highlights, DEFAULT_MAX_HIGHLIGHTS, DEFAULT_WINDOW_CHARS};

/// Pure HTML-to-document extractor. Performs no I/O; the crawler hands it
/// rendered HTML and it hands back structured fields.
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, url: &Url, html: &str) -> ExtractedDocument {
        let meta = html::parse_metadata(html);
        let main = content::extract_main_content(url, html);

        let word_count = main
            .text
            .as_deref()
            .map(|t| t.split_whitespace().count())
            .unwrap_or(0);

        ExtractedDocument {
            title: meta.title,
            description: meta.description,
            content: main.text,
            markdown: main.markdown,
            author: meta.author,
            published_at: meta.published_at,
            language: meta.language,
            links: meta.links,
            word_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_combines_metadata_and_content() {
        let html = r#"
            <html lang="en"><head>
                <title>Alpha</title>
                <meta name="description" content="A test page" />
            </head><body>
            <article>
                <p>The quick brown fox jumps over the lazy dog. Plenty of body
                text here so the content extractor has something to keep.</p>
            </article>
            <a href="/next">next</a>
            </body></html>
        "#;
        let url = Url::parse("https://example.test/").unwrap();
        let doc = ContentExtractor::new().extract(&url, html);

        assert_eq!(doc.title.as_deref(), Some("Alpha"));
        assert_eq!(doc.description.as_deref(), Some("A test page"));
        assert_eq!(doc.language.as_deref(), Some("en"));
        assert_eq!(doc.links, vec!["/next"]);
        assert!(doc.word_count > 0);
    }

    #[test]
    fn word_count_zero_without_content() {
        let url = Url::parse("https://example.test/").unwrap();
        let doc = ContentExtractor::new().extract(&url, "<html><body></body></html>");
        assert!(doc.content.is_none());
        assert_eq!(doc.word_count, 0);
    }
}
