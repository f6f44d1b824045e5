//! HTML to plain text.

use scraper::{Html, Selector};

/// Elements whose text never reaches the output.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header", "noscript"];

/// Reduce an HTML document to its visible body text.
///
/// Text inside chrome elements is removed and whitespace runs collapse to a
/// single space.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .unwrap_or_else(|| doc.root_element());

    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if !skipped {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

/// Truncate to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Text of the first element matching `selector`, whitespace-collapsed.
pub(crate) fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    let text = el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_chrome_and_collapses_whitespace() {
        let html = r#"<html><head><title>T</title><style>p{}</style></head>
            <body><header>Top bar</header><nav>Menu</nav>
            <p>Acme   builds
            rockets.</p><script>var x = 1;</script><footer>(c) Acme</footer></body></html>"#;
        assert_eq!(html_to_text(html), "Acme builds rockets.");
    }

    #[test]
    fn fragment_without_body_still_yields_text() {
        assert_eq!(html_to_text("<p>Hello <b>world</b></p>"), "Hello world");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn first_text_finds_selector() {
        let doc = Html::parse_document("<h1> Jane   Doe </h1><h1>Other</h1>");
        assert_eq!(first_text(&doc, "h1").as_deref(), Some("Jane Doe"));
        assert!(first_text(&doc, "h2").is_none());
    }
}
