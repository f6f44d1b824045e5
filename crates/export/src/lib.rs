//! # memoforge export
//!
//! Renders a generated memorandum into a downloadable document. Exporters
//! only consume artifacts; nothing here feeds back into the pipeline.

pub mod html;
pub mod markdown;
pub mod text;

use memoforge_core::{Artifact, ExportError, ExportFormat, ExportedDocument, Exporter};
use std::path::{Path, PathBuf};
use tracing::info;

pub use html::HtmlExporter;
pub use markdown::MarkdownExporter;
pub use text::TextExporter;

/// Base name of every exported file.
pub const DEFAULT_FILE_STEM: &str = "investment_memorandum";

/// The exporter for a format.
pub fn exporter_for(format: ExportFormat) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Html => Box::new(HtmlExporter),
        ExportFormat::Markdown => Box::new(MarkdownExporter),
        ExportFormat::Text => Box::new(TextExporter),
    }
}

/// Export an artifact in the given format.
pub fn export(artifact: &Artifact, format: ExportFormat, title: &str) -> Result<ExportedDocument, ExportError> {
    exporter_for(format).export(artifact, title)
}

/// Write a document into `dir` under its file name. Returns the full path.
pub fn write_document(document: &ExportedDocument, dir: &Path) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&document.file_name);
    std::fs::write(&path, &document.bytes)?;
    info!(path = %path.display(), bytes = document.bytes.len(), format = %document.format, "Memo exported");
    Ok(path)
}

/// The memo markup with any surrounding code fence removed. Errors when
/// nothing is left.
pub(crate) fn memo_body(artifact: &Artifact) -> Result<&str, ExportError> {
    let mut body = artifact.html.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string ("html") on the opening fence line.
        body = rest.split_once('\n').map_or("", |(_, after)| after);
        body = body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    }
    if body.is_empty() {
        return Err(ExportError::EmptyArtifact);
    }
    Ok(body)
}

pub(crate) fn document(format: ExportFormat, bytes: Vec<u8>) -> ExportedDocument {
    ExportedDocument {
        format,
        file_name: format!("{DEFAULT_FILE_STEM}.{}", format.extension()),
        bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(html: &str) -> Artifact {
        Artifact::new(html, "test-model")
    }

    #[test]
    fn code_fences_are_stripped() {
        let a = artifact("```html\n<h2>Executive Summary</h2>\n```\n");
        assert_eq!(memo_body(&a).unwrap(), "<h2>Executive Summary</h2>");
        let plain = artifact("  <p>x</p> ");
        assert_eq!(memo_body(&plain).unwrap(), "<p>x</p>");
    }

    #[test]
    fn empty_artifacts_are_rejected() {
        assert!(matches!(memo_body(&artifact("  ")), Err(ExportError::EmptyArtifact)));
        assert!(matches!(memo_body(&artifact("```html\n```")), Err(ExportError::EmptyArtifact)));
    }

    #[test]
    fn every_format_has_an_exporter() {
        for format in [ExportFormat::Html, ExportFormat::Markdown, ExportFormat::Text] {
            let doc = export(&artifact("<h2>Team</h2><p>Two founders.</p>"), format, "Acme").unwrap();
            assert_eq!(doc.format, format);
            assert_eq!(doc.file_name, format!("investment_memorandum.{}", format.extension()));
            assert!(!doc.bytes.is_empty());
        }
    }

    #[test]
    fn write_document_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = export(&artifact("<p>hello</p>"), ExportFormat::Text, "t").unwrap();
        let path = write_document(&doc, &dir.path().join("out")).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap().trim(), "hello");
    }
}
