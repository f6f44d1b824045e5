//! HTML → Markdown via `htmd`.

use memoforge_core::{Artifact, ExportError, ExportFormat, ExportedDocument, Exporter};
use tracing::debug;

use crate::{document, memo_body};

pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn export(&self, artifact: &Artifact, title: &str) -> Result<ExportedDocument, ExportError> {
        let body = memo_body(artifact)?;
        let converter = htmd::HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style", "head", "title", "iframe", "noscript", "svg"])
            .build();
        let markdown = converter
            .convert(body)
            .map_err(|e| ExportError::Conversion(format!("htmd conversion failed: {e}")))?;
        debug!(html_len = body.len(), markdown_len = markdown.len(), "Markdown conversion complete");

        let markdown = markdown.trim();
        // Memo bodies start at <h2>; give the file a top-level heading.
        let output = if title.trim().is_empty() || markdown.starts_with("# ") {
            format!("{markdown}\n")
        } else {
            format!("# {}\n\n{markdown}\n", title.trim())
        };
        Ok(document(ExportFormat::Markdown, output.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export(html: &str, title: &str) -> String {
        let doc = MarkdownExporter.export(&Artifact::new(html, "m"), title).unwrap();
        String::from_utf8(doc.bytes).unwrap()
    }

    #[test]
    fn headings_and_lists_convert() {
        let md = export(
            "<h2>Risk Analysis</h2><ul><li>Churn</li><li>Regulation</li></ul>",
            "Acme Memo",
        );
        assert!(md.starts_with("# Acme Memo\n\n"));
        assert!(md.contains("## Risk Analysis"));
        assert!(md.contains("Churn"));
        assert!(md.contains("Regulation"));
        assert!(!md.contains("<li>"));
    }

    #[test]
    fn existing_title_heading_is_kept() {
        let md = export("<h1>Memo</h1><p>Body</p>", "Other");
        assert!(md.starts_with("# Memo"));
        assert!(!md.contains("Other"));
    }

    #[test]
    fn styles_are_dropped() {
        let md = export("<style>p { color: red }</style><p>Visible</p>", "");
        assert!(md.contains("Visible"));
        assert!(!md.contains("color"));
    }
}
