//! Raw sources and the extraction collaborator.
//!
//! A [`RawSource`] is an opaque payload handed to the pipeline by the caller.
//! Extractors turn it into plain text; the [`ExtractorRegistry`] picks the
//! extractor for a source by provenance first, then by media type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ExtractionError;

/// Where a raw source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// A document uploaded for direct text extraction.
    Upload,
    /// A scanned document that needs OCR.
    OcrUpload,
    /// Content fetched from a URL.
    Url,
    /// Third-party profile data.
    ProfileLookup,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provenance::Upload => "upload",
            Provenance::OcrUpload => "ocr_upload",
            Provenance::Url => "url",
            Provenance::ProfileLookup => "profile_lookup",
        })
    }
}

/// An opaque, immutable payload awaiting extraction.
#[derive(Clone)]
pub struct RawSource {
    /// Unique identifier within a run (usually the file name).
    pub id: String,
    /// Declared media type, e.g. `application/pdf`.
    pub media_type: String,
    pub provenance: Provenance,
    pub bytes: Arc<[u8]>,
}

impl RawSource {
    pub fn new(
        id: impl Into<String>,
        media_type: impl Into<String>,
        provenance: Provenance,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: id.into(),
            media_type: media_type.into(),
            provenance,
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Convenience constructor for an uploaded UTF-8 text payload.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, "text/plain", Provenance::Upload, text.into().into_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for RawSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSource")
            .field("id", &self.id)
            .field("media_type", &self.media_type)
            .field("provenance", &self.provenance)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Turns a raw source into text.
///
/// Implementations must not block indefinitely on their own; the stage
/// executor imposes the deadline.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extractor name for logs (e.g. "plain_text", "pdf_command").
    fn name(&self) -> &str;

    /// Extract text from the source.
    async fn extract(&self, source: &RawSource) -> std::result::Result<String, ExtractionError>;
}

/// Extractors keyed by media type, with a dedicated slot for OCR.
#[derive(Default, Clone)]
pub struct ExtractorRegistry {
    by_media_type: HashMap<String, Arc<dyn Extractor>>,
    ocr: Option<Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extractor for a media type. Replaces any existing entry.
    pub fn register(&mut self, media_type: impl Into<String>, extractor: Arc<dyn Extractor>) {
        self.by_media_type
            .insert(media_type.into().to_ascii_lowercase(), extractor);
    }

    /// Register the extractor used for every [`Provenance::OcrUpload`] source.
    pub fn register_ocr(&mut self, extractor: Arc<dyn Extractor>) {
        self.ocr = Some(extractor);
    }

    /// Resolve the extractor for a source.
    pub fn resolve(&self, source: &RawSource) -> Option<Arc<dyn Extractor>> {
        if source.provenance == Provenance::OcrUpload {
            return self.ocr.clone();
        }
        let media_type = source
            .media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.by_media_type.get(&media_type).cloned()
    }

    /// Registered media types, sorted.
    pub fn media_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.by_media_type.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn has_ocr(&self) -> bool {
        self.ocr.is_some()
    }
}
