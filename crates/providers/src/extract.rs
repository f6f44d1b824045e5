//! Built-in extractors.
//!
//! Plain text and HTML are handled in-process. Binary formats (PDF, DOCX,
//! scanned images) go through an external command that reads the payload on
//! stdin and writes text on stdout.

use async_trait::async_trait;
use memoforge_config::CommandConfig;
use memoforge_core::error::ExtractionError;
use memoforge_core::{Extractor, RawSource};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::html::html_to_text;

/// UTF-8 text (lossy) passed through unchanged.
pub struct PlainTextExtractor;

#[async_trait]
impl Extractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain_text"
    }

    async fn extract(&self, source: &RawSource) -> Result<String, ExtractionError> {
        if source.is_empty() {
            return Err(ExtractionError::Empty(source.id.clone()));
        }
        Ok(String::from_utf8_lossy(&source.bytes).into_owned())
    }
}

/// HTML reduced to visible body text.
pub struct HtmlExtractor;

#[async_trait]
impl Extractor for HtmlExtractor {
    fn name(&self) -> &str {
        "html"
    }

    async fn extract(&self, source: &RawSource) -> Result<String, ExtractionError> {
        if source.is_empty() {
            return Err(ExtractionError::Empty(source.id.clone()));
        }
        Ok(html_to_text(&String::from_utf8_lossy(&source.bytes)))
    }
}

/// Runs an external program with the payload on stdin.
///
/// The child is killed if the extraction future is dropped, which is what
/// happens when the stage executor abandons it on timeout.
pub struct CommandExtractor {
    name: String,
    command: CommandConfig,
    magic: Option<&'static [u8]>,
    media_type: String,
}

impl CommandExtractor {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, command: CommandConfig) -> Self {
        Self {
            name: name.into(),
            command,
            magic: None,
            media_type: media_type.into(),
        }
    }

    /// Reject payloads that do not start with `magic`.
    pub fn with_magic(mut self, magic: &'static [u8]) -> Self {
        self.magic = Some(magic);
        self
    }

    /// PDF extractor: payloads must start with `%PDF`.
    pub fn pdf(command: CommandConfig) -> Self {
        Self::new("pdf_command", "application/pdf", command).with_magic(b"%PDF")
    }
}

#[async_trait]
impl Extractor for CommandExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, source: &RawSource) -> Result<String, ExtractionError> {
        if source.is_empty() {
            return Err(ExtractionError::Empty(source.id.clone()));
        }
        if let Some(magic) = self.magic {
            if !source.bytes.starts_with(magic) {
                return Err(ExtractionError::Malformed {
                    media_type: self.media_type.clone(),
                    reason: format!(
                        "payload does not start with {}",
                        String::from_utf8_lossy(magic)
                    ),
                });
            }
        }

        debug!(extractor = %self.name, program = %self.command.program, source = %source.id, "Spawning extractor");

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractionError::Command(format!("{}: {e}", self.command.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let bytes = source.bytes.clone();
            // Feed stdin concurrently so a chatty child cannot deadlock on a full pipe.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&bytes).await {
                    debug!(error = %e, "Extractor stdin closed early");
                }
            });
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExtractionError::Command(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(extractor = %self.name, status = %output.status, "Extractor exited with failure");
            return Err(ExtractionError::Command(format!(
                "{} exited with {}: {}",
                self.command.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoforge_core::Provenance;

    fn cat() -> CommandConfig {
        CommandConfig {
            program: "cat".into(),
            args: vec![],
        }
    }

    #[tokio::test]
    async fn plain_text_is_passed_through() {
        let source = RawSource::text("notes.txt", "Acme builds rockets.");
        let text = PlainTextExtractor.extract(&source).await.unwrap();
        assert_eq!(text, "Acme builds rockets.");
    }

    #[tokio::test]
    async fn empty_payload_is_an_error() {
        let source = RawSource::new("empty.txt", "text/plain", Provenance::Upload, Vec::new());
        let err = PlainTextExtractor.extract(&source).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Empty(id) if id == "empty.txt"));
    }

    #[tokio::test]
    async fn html_extractor_strips_markup() {
        let source = RawSource::new(
            "page.html",
            "text/html",
            Provenance::Upload,
            b"<body><nav>x</nav><p>Deck text</p></body>".to_vec(),
        );
        assert_eq!(HtmlExtractor.extract(&source).await.unwrap(), "Deck text");
    }

    #[tokio::test]
    async fn pdf_requires_magic_header() {
        let extractor = CommandExtractor::pdf(cat());
        let source = RawSource::new("deck.pdf", "application/pdf", Provenance::Upload, b"not a pdf".to_vec());
        let err = extractor.extract(&source).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }));
    }

    #[tokio::test]
    async fn command_output_is_the_text() {
        let extractor = CommandExtractor::pdf(cat());
        let source = RawSource::new("deck.pdf", "application/pdf", Provenance::Upload, b"%PDF-1.7 body".to_vec());
        assert_eq!(extractor.extract(&source).await.unwrap(), "%PDF-1.7 body");
    }

    #[tokio::test]
    async fn missing_program_is_a_command_error() {
        let extractor = CommandExtractor::new(
            "docx_command",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            CommandConfig {
                program: "memoforge-definitely-not-installed".into(),
                args: vec![],
            },
        );
        let source = RawSource::new("a.docx", "application/octet-stream", Provenance::Upload, b"PK".to_vec());
        assert!(matches!(
            extractor.extract(&source).await.unwrap_err(),
            ExtractionError::Command(_)
        ));
    }
}
