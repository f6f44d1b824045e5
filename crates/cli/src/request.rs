//! Request files: the TOML a user writes to describe one memo run.
//!
//! ```toml
//! session_id = "acme-seed"
//! title = "Acme Inc. Seed"
//! profiles = ["jdoe"]
//!
//! [deal_terms]
//! current_round = "Seed"
//! proposed_valuation = "$12M"
//!
//! [[documents]]
//! path = "deck.pdf"
//!
//! [[urls]]
//! url = "https://acme.io"
//! label = "website"
//! ```

use memoforge_core::{DealTerms, EnrichmentTarget, Provenance, RawSource};
use memoforge_pipeline::MemoRequest;
use memoforge_providers::router::DOCX_MEDIA_TYPE;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_TITLE: &str = "Investment Memorandum";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestFile {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub deal_terms: DealTerms,
    #[serde(default)]
    pub documents: Vec<DocumentSpec>,
    #[serde(default)]
    pub urls: Vec<UrlSpec>,
    #[serde(default)]
    pub profiles: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentSpec {
    /// Relative paths resolve against the request file's directory.
    pub path: PathBuf,
    /// Guessed from the extension when absent.
    #[serde(default)]
    pub media_type: Option<String>,
    /// Route through OCR regardless of media type.
    #[serde(default)]
    pub ocr: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlSpec {
    pub url: String,
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_label() -> String {
    "other".into()
}

/// A parsed request ready for the pipeline.
#[derive(Debug)]
pub struct LoadedRequest {
    pub request: MemoRequest,
    pub title: String,
}

/// Media type for a file extension. Images are OCR material.
pub fn guess_media_type(path: &Path) -> (&'static str, bool) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => ("application/pdf", false),
        "docx" => (DOCX_MEDIA_TYPE, false),
        "txt" => ("text/plain", false),
        "md" | "markdown" => ("text/markdown", false),
        "html" | "htm" => ("text/html", false),
        "png" => ("image/png", true),
        "jpg" | "jpeg" => ("image/jpeg", true),
        "tif" | "tiff" => ("image/tiff", true),
        _ => ("application/octet-stream", false),
    }
}

/// Read a request file and every document it lists.
pub fn load(path: &Path) -> Result<LoadedRequest, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read request file {}: {e}", path.display()))?;
    let file: RequestFile = toml::from_str(&content)
        .map_err(|e| format!("Failed to parse request file {}: {e}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    resolve(file, base)
}

fn resolve(file: RequestFile, base: &Path) -> Result<LoadedRequest, Box<dyn std::error::Error>> {
    let mut sources = Vec::with_capacity(file.documents.len());
    for doc in &file.documents {
        let full = if doc.path.is_absolute() {
            doc.path.clone()
        } else {
            base.join(&doc.path)
        };
        let bytes = std::fs::read(&full)
            .map_err(|e| format!("Failed to read document {}: {e}", full.display()))?;
        let (guessed, image) = guess_media_type(&full);
        let media_type = doc.media_type.clone().unwrap_or_else(|| guessed.to_string());
        let provenance = if doc.ocr || image {
            Provenance::OcrUpload
        } else {
            Provenance::Upload
        };
        let id = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| full.display().to_string());
        sources.push(RawSource::new(id, media_type, provenance, bytes));
    }

    let mut targets: Vec<EnrichmentTarget> = file
        .urls
        .into_iter()
        .map(|u| EnrichmentTarget::web_page(u.url, u.label))
        .collect();
    targets.extend(file.profiles.into_iter().map(EnrichmentTarget::profile));

    Ok(LoadedRequest {
        title: file.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        request: MemoRequest {
            session_id: file.session_id,
            sources,
            targets,
            deal_terms: file.deal_terms,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoforge_core::EnrichmentKind;

    #[test]
    fn loads_documents_relative_to_request_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "# Acme\nWe sell shovels.").unwrap();
        std::fs::write(dir.path().join("scan.png"), [0x89, b'P', b'N', b'G']).unwrap();
        let request_path = dir.path().join("request.toml");
        std::fs::write(
            &request_path,
            r#"
title = "Acme Seed"
profiles = ["jdoe"]

[deal_terms]
current_round = "Seed"

[[documents]]
path = "notes.md"

[[documents]]
path = "scan.png"

[[urls]]
url = "https://acme.io"
label = "website"
"#,
        )
        .unwrap();

        let loaded = load(&request_path).unwrap();
        assert_eq!(loaded.title, "Acme Seed");
        let request = loaded.request;
        assert_eq!(request.sources.len(), 2);
        assert_eq!(request.sources[0].id, "notes.md");
        assert_eq!(request.sources[0].media_type, "text/markdown");
        assert_eq!(request.sources[0].provenance, Provenance::Upload);
        assert_eq!(request.sources[1].provenance, Provenance::OcrUpload);
        assert_eq!(request.targets.len(), 2);
        assert_eq!(request.targets[0].kind, EnrichmentKind::WebPage);
        assert_eq!(request.targets[1].kind, EnrichmentKind::Profile);
        assert_eq!(request.deal_terms.current_round.as_deref(), Some("Seed"));
        assert!(request.session_id.is_none());
    }

    #[test]
    fn missing_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let request_path = dir.path().join("request.toml");
        std::fs::write(&request_path, "[[documents]]\npath = \"gone.pdf\"\n").unwrap();
        let err = load(&request_path).unwrap_err();
        assert!(err.to_string().contains("gone.pdf"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let request_path = dir.path().join("request.toml");
        std::fs::write(&request_path, "titel = \"typo\"\n").unwrap();
        assert!(load(&request_path).is_err());
    }

    #[test]
    fn media_types_follow_extensions() {
        assert_eq!(guess_media_type(Path::new("a.PDF")), ("application/pdf", false));
        assert_eq!(guess_media_type(Path::new("a.docx")).0, DOCX_MEDIA_TYPE);
        assert!(guess_media_type(Path::new("a.jpeg")).1);
        assert_eq!(guess_media_type(Path::new("a")).0, "application/octet-stream");
    }
}
