use readability::extractor;
use tracing::debug;
use url::Url;

pub struct MainContent {
    pub text: Option<String>,
    pub markdown: Option<String>,
}

/// Run the boilerplate-stripping extractor over raw HTML. Returns None for
/// both fields when no article body could be isolated; callers must tolerate
/// that (such pages are stored but never indexed).
pub fn extract_main_content(url: &Url, html: &str) -> MainContent {
    let mut reader = html.as_bytes();
    match extractor::extract(&mut reader, url) {
        Ok(product) => {
            let text = non_empty(product.text);
            // Markdown is rendered from the cleaned article HTML, not the raw page
            let markdown = non_empty(html2md::parse_html(&product.content));
            MainContent { text, markdown }
        }
        Err(e) => {
            debug!(url = %url, error = %e, "main content extraction failed");
            MainContent {
                text: None,
                markdown: None,
            }
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_article_text() {
        let html = r#"
            <html><head><title>T</title></head><body>
            <nav><a href="/">home</a><a href="/about">about</a></nav>
            <article>
                <h1>Headline</h1>
                <p>The quick brown fox jumps over the lazy dog. This paragraph
                carries the actual article body and should survive extraction
                while the navigation chrome around it is stripped away.</p>
                <p>A second paragraph keeps the extractor from treating the
                page as boilerplate-only.</p>
            </article>
            <footer>copyright</footer>
            </body></html>
        "#;
        let url = Url::parse("https://example.test/post").unwrap();
        let content = extract_main_content(&url, html);
        let text = content.text.expect("text extracted");
        assert!(text.contains("quick brown fox"));
    }

    #[test]
    fn empty_input_yields_none() {
        let url = Url::parse("https://example.test/").unwrap();
        let content = extract_main_content(&url, "<html><body></body></html>");
        assert!(content.text.is_none());
    }
}
