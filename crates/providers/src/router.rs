//! Collaborator wiring: builds every external capability from config.

use memoforge_config::AppConfig;
use memoforge_core::error::{FetchError, GenerationError};
use memoforge_core::{Collaborators, ExtractorRegistry, MarketResearch, Moderator};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::extract::{CommandExtractor, HtmlExtractor, PlainTextExtractor};
use crate::fallback::FallbackFetcher;
use crate::keyword::KeywordModerator;
use crate::market::MarketAnalysisCommand;
use crate::openai_compat::{OpenAiClient, OpenAiGenerator, OpenAiMarketResearch, OpenAiModerator};
use crate::profile::{ProfileApiStrategy, PublicProfilePageStrategy};
use crate::web::WebPageFetcher;

/// Media type of Word documents.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("LLM API key missing: set llm.api_key or MEMOFORGE_API_KEY")]
    MissingApiKey,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Extractors for the built-in text formats plus any configured commands.
pub fn extractor_registry(config: &AppConfig) -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::new();
    let plain: Arc<PlainTextExtractor> = Arc::new(PlainTextExtractor);
    registry.register("text/plain", plain.clone());
    registry.register("text/markdown", plain);
    registry.register("text/html", Arc::new(HtmlExtractor));

    if let Some(pdf) = &config.extractors.pdf {
        registry.register("application/pdf", Arc::new(CommandExtractor::pdf(pdf.clone())));
    }
    if let Some(docx) = &config.extractors.docx {
        registry.register(
            DOCX_MEDIA_TYPE,
            Arc::new(CommandExtractor::new("docx_command", DOCX_MEDIA_TYPE, docx.clone())),
        );
    }
    if let Some(ocr) = &config.extractors.ocr {
        registry.register_ocr(Arc::new(CommandExtractor::new("ocr_command", "image/*", ocr.clone())));
    }
    registry
}

/// Profile lookup chain: structured API first (when keyed), then the public page.
pub fn profile_fetcher(config: &AppConfig) -> Result<FallbackFetcher, FetchError> {
    let timeouts = &config.timeouts;
    let mut chain = FallbackFetcher::new("profile");
    if let Some(key) = &config.profile.api_key {
        chain = chain.add(
            Arc::new(ProfileApiStrategy::new(
                config.profile.api_url.clone(),
                key.clone(),
                timeouts.profile_api_attempt(),
            )?),
            timeouts.profile_api_attempt(),
        );
    }
    if config.profile.public_page_fallback {
        chain = chain.add(
            Arc::new(PublicProfilePageStrategy::new(timeouts.profile_page_attempt())?),
            timeouts.profile_page_attempt(),
        );
    }
    Ok(chain)
}

/// Build all collaborators from configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Collaborators, SetupError> {
    let api_key = config.llm.api_key.clone().ok_or(SetupError::MissingApiKey)?;
    let client = OpenAiClient::new(config.llm.api_url.clone(), api_key)?;

    let moderator: Arc<dyn Moderator> = match config.moderation.provider.as_str() {
        "keyword" => Arc::new(KeywordModerator::new(config.moderation.deny_terms.clone())),
        _ => Arc::new(OpenAiModerator::new(client.clone(), config.llm.moderation_model.clone())),
    };

    let market_research: Option<Arc<dyn MarketResearch>> =
        config.market_analysis.clone().map(|command| {
            Arc::new(OpenAiMarketResearch::new(
                client.clone(),
                config.llm.model.clone(),
                Some(MarketAnalysisCommand::new(command)),
            )) as Arc<dyn MarketResearch>
        });

    let profile = profile_fetcher(config)?;
    info!(
        moderation = moderator.name(),
        profile_strategies = profile.len(),
        market_research = market_research.is_some(),
        model = %config.llm.model,
        "Collaborators configured"
    );

    Ok(Collaborators {
        extractors: extractor_registry(config),
        moderator,
        web: Arc::new(WebPageFetcher::new(config.timeouts.url_fetch())?),
        profile: Arc::new(profile),
        generator: Arc::new(OpenAiGenerator::new(
            client,
            config.llm.model.clone(),
            config.llm.temperature,
            config.llm.max_tokens,
        )),
        market_research,
    })
}
