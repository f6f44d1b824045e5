//! Standalone HTML document.

use memoforge_core::{Artifact, ExportError, ExportFormat, ExportedDocument, Exporter};

use crate::{document, memo_body};

const STYLE: &str = "body { font-family: Georgia, serif; max-width: 52rem; margin: 2rem auto; line-height: 1.5; color: #222; }\n\
h1, h2, h3 { font-family: Helvetica, Arial, sans-serif; }\n\
table { border-collapse: collapse; }\n\
td, th { border: 1px solid #ccc; padding: 0.3rem 0.6rem; }";

/// Wraps the memo in a complete `<html>` document. Markup that already is a
/// full document passes through unchanged.
pub struct HtmlExporter;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl Exporter for HtmlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn export(&self, artifact: &Artifact, title: &str) -> Result<ExportedDocument, ExportError> {
        let body = memo_body(artifact)?;
        if body.to_ascii_lowercase().contains("<html") {
            return Ok(document(ExportFormat::Html, body.as_bytes().to_vec()));
        }

        let page = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"generator\" content=\"{model}\">\n<title>{title}</title>\n<style>\n{STYLE}\n</style>\n\
</head>\n<body>\n{body}\n</body>\n</html>\n",
            model = escape(&artifact.model),
            title = escape(title),
        );
        Ok(document(ExportFormat::Html, page.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_fragment_with_escaped_title() {
        let artifact = Artifact::new("<h2>Team</h2>", "gpt-4o");
        let doc = HtmlExporter.export(&artifact, "Acme & Co <Seed>").unwrap();
        let page = String::from_utf8(doc.bytes).unwrap();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Acme &amp; Co &lt;Seed&gt;</title>"));
        assert!(page.contains("<body>\n<h2>Team</h2>\n</body>"));
        assert!(page.contains("content=\"gpt-4o\""));
    }

    #[test]
    fn full_documents_pass_through() {
        let full = "<html><body><p>done</p></body></html>";
        let doc = HtmlExporter.export(&Artifact::new(full, "m"), "ignored").unwrap();
        assert_eq!(doc.bytes, full.as_bytes());
    }
}
