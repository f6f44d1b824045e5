//! Generation collaborators: the memo generator and the optional market
//! research precursor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

const NOT_PROVIDED: &str = "Not provided";

/// Structured deal-term fields supplied with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealTerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_round: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_valuation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation_date: Option<String>,
}

impl DealTerms {
    pub fn email_or_default(&self) -> &str {
        self.email.as_deref().unwrap_or(NOT_PROVIDED)
    }

    pub fn current_round_or_default(&self) -> &str {
        self.current_round.as_deref().unwrap_or(NOT_PROVIDED)
    }

    pub fn proposed_valuation_or_default(&self) -> &str {
        self.proposed_valuation.as_deref().unwrap_or(NOT_PROVIDED)
    }

    pub fn valuation_date_or_default(&self) -> &str {
        self.valuation_date.as_deref().unwrap_or(NOT_PROVIDED)
    }

    /// Render the contact + deal-terms block that joins the fragment pool.
    pub fn render(&self) -> String {
        format!(
            "Email: {}\nCurrent Deal Terms:\nCurrent Funding Round: {}\nProposed Valuation: {}\nAnalysis Date: {}",
            self.email_or_default(),
            self.current_round_or_default(),
            self.proposed_valuation_or_default(),
            self.valuation_date_or_default(),
        )
    }
}

/// Output of the market analysis step. Every field is optional because the
/// analysis process may return a partial document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    #[serde(default)]
    pub industry_analysis: Option<String>,
    #[serde(default)]
    pub market_analysis: Option<String>,
    #[serde(default)]
    pub competitor_analysis: Option<String>,
    #[serde(default)]
    pub timing_analysis: Option<String>,
    #[serde(default)]
    pub regional_analysis: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
    /// Set when the output could not be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Everything the generation collaborator receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPayload {
    pub trace_id: String,
    /// Compacted, moderation-approved material.
    pub compacted_text: String,
    pub deal_terms: DealTerms,
    #[serde(default)]
    pub market_opportunity: Option<String>,
    #[serde(default)]
    pub market_analysis: Option<MarketAnalysis>,
}

/// The final generated memorandum (HTML).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub html: String,
    /// Model that produced it.
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(html: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            model: model.into(),
            generated_at: Utc::now(),
        }
    }
}

/// Produces the final artifact from the compacted material.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, payload: PromptPayload) -> std::result::Result<Artifact, GenerationError>;
}

/// Optional precursor: summarize the market opportunity, then analyse it.
#[async_trait]
pub trait MarketResearch: Send + Sync {
    fn name(&self) -> &str;

    /// One-line description of the market the company addresses.
    async fn summarize_opportunity(
        &self,
        extracted_text: &str,
        trace_id: &str,
    ) -> std::result::Result<String, GenerationError>;

    /// Long-running analysis of a market opportunity.
    async fn analyze(
        &self,
        opportunity: &str,
        trace_id: &str,
    ) -> std::result::Result<MarketAnalysis, GenerationError>;
}
