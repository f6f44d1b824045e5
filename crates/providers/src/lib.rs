//! Collaborator implementations for memoforge.
//!
//! Everything here implements a trait from `memoforge_core`: extractors,
//! moderators, fetch strategies and generators. [`router::build_from_config`]
//! wires them from an `AppConfig`.

pub mod extract;
pub mod fallback;
pub mod html;
pub mod keyword;
pub mod market;
pub mod openai_compat;
pub mod profile;
pub mod prompt;
pub mod router;
pub mod web;

pub use extract::{CommandExtractor, HtmlExtractor, PlainTextExtractor};
pub use fallback::FallbackFetcher;
pub use html::html_to_text;
pub use keyword::KeywordModerator;
pub use market::{MarketAnalysisCommand, parse_analysis_output};
pub use openai_compat::{OpenAiClient, OpenAiGenerator, OpenAiMarketResearch, OpenAiModerator};
pub use profile::{ProfileApiStrategy, PublicProfilePageStrategy, normalize_profile_url};
pub use router::{SetupError, build_from_config};
pub use web::WebPageFetcher;
