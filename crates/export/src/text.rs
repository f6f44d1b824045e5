//! Plain text with the memo's block structure kept as line breaks.

use memoforge_core::{Artifact, ExportError, ExportFormat, ExportedDocument, Exporter};
use scraper::{ElementRef, Html, Node};

use crate::{document, memo_body};

const SKIPPED: &[&str] = &["script", "style", "head", "title", "noscript"];
const BLOCKS: &[&str] = &[
    "p", "div", "section", "article", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li",
    "table", "tr", "blockquote", "pre", "br", "hr",
];

pub struct TextExporter;

fn walk(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let raw: &str = text;
                let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                if raw.starts_with(char::is_whitespace) && needs_space(out) {
                    out.push(' ');
                }
                if collapsed.is_empty() {
                    continue;
                }
                out.push_str(&collapsed);
                if raw.ends_with(char::is_whitespace) {
                    out.push(' ');
                }
            }
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCKS.contains(&name);
                if block {
                    break_line(out);
                }
                if name == "li" {
                    out.push_str("- ");
                }
                walk(child, out);
                if block {
                    break_line(out);
                }
                if matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn needs_space(out: &str) -> bool {
    !out.is_empty() && !out.ends_with('\n') && !out.ends_with(' ')
}

fn break_line(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Render HTML as text, one block per line.
pub fn html_to_plain_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut out = String::new();
    walk(doc.root_element(), &mut out);

    // At most one blank line in a row.
    let mut text = String::with_capacity(out.len());
    let mut blank = 0;
    for line in out.lines().map(str::trim_end) {
        if line.is_empty() {
            blank += 1;
            if blank > 1 {
                continue;
            }
        } else {
            blank = 0;
        }
        text.push_str(line);
        text.push('\n');
    }
    text.trim().to_string()
}

impl Exporter for TextExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn export(&self, artifact: &Artifact, title: &str) -> Result<ExportedDocument, ExportError> {
        let body = html_to_plain_text(memo_body(artifact)?);
        let output = if title.trim().is_empty() {
            format!("{body}\n")
        } else {
            let title = title.trim();
            format!("{title}\n{}\n\n{body}\n", "=".repeat(title.chars().count()))
        };
        Ok(document(ExportFormat::Text, output.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_become_lines() {
        let text = html_to_plain_text(
            "<h2>Team</h2><p>Two   founders,\n both technical.</p><ul><li>CEO</li><li>CTO</li></ul>",
        );
        assert_eq!(text, "Team\n\nTwo founders, both technical.\n- CEO\n- CTO");
    }

    #[test]
    fn inline_markup_stays_on_one_line() {
        let text = html_to_plain_text("<p>Revenue is <strong>$2M</strong> ARR.</p>");
        assert_eq!(text, "Revenue is $2M ARR.");
    }

    #[test]
    fn scripts_are_skipped() {
        let text = html_to_plain_text("<script>alert(1)</script><p>Safe</p>");
        assert_eq!(text, "Safe");
    }

    #[test]
    fn title_is_underlined() {
        let doc = TextExporter
            .export(&Artifact::new("<p>Body</p>", "m"), "Acme")
            .unwrap();
        assert_eq!(String::from_utf8(doc.bytes).unwrap(), "Acme\n====\n\nBody\n");
    }
}
