//! Stub collaborators for pipeline tests.

use async_trait::async_trait;
use memoforge_core::error::{ExtractionError, FetchError, GenerationError, ModerationError};
use memoforge_core::{
    Artifact, Collaborators, Enrichment, Extractor, ExtractorRegistry, FetchStrategy, Generator,
    MarketAnalysis, MarketResearch, ModerationVerdict, Moderator, PromptPayload, RawSource,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns the payload as UTF-8. Sources whose id contains "corrupt" fail,
/// "crash" panics.
pub struct EchoExtractor;

#[async_trait]
impl Extractor for EchoExtractor {
    fn name(&self) -> &str {
        "echo"
    }

    async fn extract(&self, source: &RawSource) -> Result<String, ExtractionError> {
        if source.id.contains("corrupt") {
            return Err(ExtractionError::Malformed {
                media_type: source.media_type.clone(),
                reason: "bad xref table".into(),
            });
        }
        if source.id.contains("crash") {
            panic!("decoder crashed on {}", source.id);
        }
        Ok(String::from_utf8_lossy(&source.bytes).into_owned())
    }
}

/// Flags text containing `marker` with the given categories, and records
/// every text it was shown.
pub struct StubModerator {
    marker: Option<(String, Vec<String>)>,
    fail: bool,
    pub seen: Mutex<Vec<String>>,
}

impl StubModerator {
    pub fn clean() -> Self {
        Self {
            marker: None,
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn flagging(marker: &str, categories: &[&str]) -> Self {
        Self {
            marker: Some((
                marker.to_string(),
                categories.iter().map(|c| c.to_string()).collect(),
            )),
            ..Self::clean()
        }
    }

    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::clean()
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Moderator for StubModerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, ModerationError> {
        self.seen.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(ModerationError::Request("connection refused".into()));
        }
        match &self.marker {
            Some((marker, categories)) if text.contains(marker.as_str()) => {
                Ok(ModerationVerdict::flagged(categories.iter().cloned()))
            }
            _ => Ok(ModerationVerdict::clean()),
        }
    }
}

/// Identifiers containing "broken" fail, "slow" never return in time.
pub struct StubFetcher;

#[async_trait]
impl FetchStrategy for StubFetcher {
    fn name(&self) -> &str {
        "stub_fetch"
    }

    async fn fetch(&self, identifier: &str) -> Result<Enrichment, FetchError> {
        if identifier.contains("broken") {
            return Err(FetchError::Network("connection reset".into()));
        }
        if identifier.contains("slow") {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(Enrichment::Text {
            text: format!("The website at {identifier} describes a logistics platform for small retailers."),
        })
    }
}

/// Generator that echoes the compacted text into a tiny memo.
pub struct StubGenerator {
    delay: Option<Duration>,
    fail: bool,
    pub last_payload: Mutex<Option<PromptPayload>>,
}

impl StubGenerator {
    pub fn ok() -> Self {
        Self {
            delay: None,
            fail: false,
            last_payload: Mutex::new(None),
        }
    }

    pub fn hanging() -> Self {
        Self {
            delay: Some(Duration::from_secs(24 * 3600)),
            ..Self::ok()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }
}

#[async_trait]
impl Generator for StubGenerator {
    fn name(&self) -> &str {
        "stub_generator"
    }

    async fn generate(&self, payload: PromptPayload) -> Result<Artifact, GenerationError> {
        *self.last_payload.lock().unwrap() = Some(payload.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(GenerationError::Api {
                status_code: 500,
                message: "upstream exploded".into(),
            });
        }
        Ok(Artifact::new(
            format!("<h1>Memo</h1><p>{}</p>", payload.compacted_text.len()),
            "stub-model",
        ))
    }
}

/// Market research returning fixed values.
pub struct StubResearch {
    pub fail_analysis: bool,
}

#[async_trait]
impl MarketResearch for StubResearch {
    fn name(&self) -> &str {
        "stub_research"
    }

    async fn summarize_opportunity(&self, _text: &str, _trace_id: &str) -> Result<String, GenerationError> {
        Ok("Inventory software for independent retailers".into())
    }

    async fn analyze(&self, _opportunity: &str, _trace_id: &str) -> Result<MarketAnalysis, GenerationError> {
        if self.fail_analysis {
            return Err(GenerationError::Process("exit status 1".into()));
        }
        Ok(MarketAnalysis {
            decision: Some("Invest".into()),
            ..MarketAnalysis::default()
        })
    }
}

/// Collaborators built from the given moderator and generator.
pub fn collaborators(moderator: Arc<StubModerator>, generator: Arc<StubGenerator>) -> Collaborators {
    let mut extractors = ExtractorRegistry::new();
    extractors.register("text/plain", Arc::new(EchoExtractor));
    Collaborators {
        extractors,
        moderator,
        web: Arc::new(StubFetcher),
        profile: Arc::new(StubFetcher),
        generator,
        market_research: None,
    }
}
