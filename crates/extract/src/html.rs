use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::{Html, Selector};

/// Longest href we consider a real link; beyond this it is almost always a
/// data URI or serialized state.
const MAX_HREF_LEN: usize = 2000;

pub struct HtmlMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub links: Vec<String>,
}

pub fn parse_metadata(html_str: &str) -> HtmlMeta {
    let document = Html::parse_document(html_str);

    HtmlMeta {
        title: extract_title(&document),
        description: extract_description(&document),
        author: extract_author(&document),
        published_at: extract_date(&document),
        language: extract_language(&document),
        links: extract_links(&document),
    }
}

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

fn element_text(document: &Html, sel: &str) -> Option<String> {
    selector(sel)
        .and_then(|s| document.select(&s).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn meta_content(document: &Html, sel: &str) -> Option<String> {
    selector(sel)
        .and_then(|s| document.select(&s).next())
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn extract_title(document: &Html) -> Option<String> {
    meta_content(document, "meta[property='og:title']")
        .or_else(|| element_text(document, "title"))
        .or_else(|| element_text(document, "h1"))
}

fn extract_description(document: &Html) -> Option<String> {
    meta_content(document, "meta[property='og:description']")
        .or_else(|| meta_content(document, "meta[name='description']"))
}

fn extract_author(document: &Html) -> Option<String> {
    if let Some(author) = meta_content(document, "meta[name='author']")
        .or_else(|| meta_content(document, "meta[property='article:author']"))
    {
        return Some(author);
    }

    // Schema.org markup: prefer a nested itemprop=name over the element's own text
    let author_el = selector("[itemprop='author']").and_then(|s| document.select(&s).next())?;
    if let Some(name_sel) = selector("[itemprop='name']") {
        if let Some(name_el) = author_el.select(&name_sel).next() {
            let name = name_el.text().collect::<String>().trim().to_string();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    let text = author_el.text().collect::<String>().trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn extract_date(document: &Html) -> Option<DateTime<Utc>> {
    let candidates = [
        "meta[property='article:published_time']",
        "meta[property='og:published_time']",
        "meta[name='date']",
        "meta[name='pubdate']",
        "meta[itemprop='datePublished']",
    ];

    let mut date_str = candidates.iter().find_map(|sel| meta_content(document, sel));

    if date_str.is_none() {
        date_str = selector("time[datetime]")
            .and_then(|s| document.select(&s).next())
            .and_then(|el| el.value().attr("datetime"))
            .map(|d| d.to_string());
    }

    date_str.as_deref().and_then(parse_date)
}

/// Parse a publish date against the format ladder. Returns None when no
/// format matches.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s: String = raw.trim().chars().take(30).collect();

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&s, fmt) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}

fn extract_language(document: &Html) -> Option<String> {
    let from_html = selector("html")
        .and_then(|s| document.select(&s).next())
        .and_then(|el| el.value().attr("lang"))
        .map(|l| l.to_string());

    let lang = from_html
        .or_else(|| meta_content(document, "meta[http-equiv='content-language']"))?;

    lang.split('-')
        .next()
        .map(|code| code.trim().to_lowercase())
        .filter(|code| !code.is_empty())
}

fn extract_links(document: &Html) -> Vec<String> {
    let Some(sel) = selector("a[href]") else {
        return Vec::new();
    };

    document
        .select(&sel)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
            {
                return None;
            }
            if href.len() > MAX_HREF_LEN {
                return None;
            }
            Some(href.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn title_prefers_open_graph() {
        let html = r#"
            <html><head>
                <meta property="og:title" content="OG Title" />
                <title>Tag Title</title>
            </head><body><h1>Heading</h1></body></html>
        "#;
        let meta = parse_metadata(html);
        assert_eq!(meta.title.as_deref(), Some("OG Title"));
    }

    #[test]
    fn title_falls_back_to_tag_then_h1() {
        let meta = parse_metadata("<html><head><title>  Tag Title  </title></head></html>");
        assert_eq!(meta.title.as_deref(), Some("Tag Title"));

        let meta = parse_metadata("<html><body><h1>Only Heading</h1></body></html>");
        assert_eq!(meta.title.as_deref(), Some("Only Heading"));
    }

    #[test]
    fn author_prefers_nested_schema_name() {
        let html = r#"
            <div itemprop="author">
                <span itemprop="name">Jane Doe</span>
                <span>contributor</span>
            </div>
        "#;
        let meta = parse_metadata(html);
        assert_eq!(meta.author.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn date_format_ladder() {
        let with_tz = parse_date("2024-03-01T10:30:00+02:00").unwrap();
        assert_eq!(with_tz.year(), 2024);

        let zulu = parse_date("2024-03-01T10:30:00Z").unwrap();
        assert_eq!(zulu.month(), 3);

        let naive = parse_date("2024-03-01T10:30:00").unwrap();
        assert_eq!(naive.day(), 1);

        let date_only = parse_date("2024-03-01").unwrap();
        assert_eq!(date_only.day(), 1);

        let long_month = parse_date("March 1, 2024").unwrap();
        assert_eq!(long_month.month(), 3);

        let short_month = parse_date("Mar 1, 2024").unwrap();
        assert_eq!(short_month.month(), 3);

        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn language_first_segment_lowercased() {
        let meta = parse_metadata(r#"<html lang="en-US"><body></body></html>"#);
        assert_eq!(meta.language.as_deref(), Some("en"));
    }

    #[test]
    fn links_skip_non_crawlable_schemes() {
        let html = r##"
            <a href="/relative">a</a>
            <a href="https://other.test/page">b</a>
            <a href="#section">c</a>
            <a href="javascript:void(0)">d</a>
            <a href="mailto:x@y.test">e</a>
            <a href="tel:+15551234">f</a>
        "##;
        let meta = parse_metadata(html);
        assert_eq!(meta.links, vec!["/relative", "https://other.test/page"]);
    }

    #[test]
    fn links_skip_oversized_hrefs() {
        let long = format!(r#"<a href="/{}">x</a>"#, "a".repeat(2100));
        let meta = parse_metadata(&long);
        assert!(meta.links.is_empty());
    }
}
