//! OpenAI-compatible collaborators.
//!
//! Works with OpenAI and any endpoint exposing `/chat/completions` and
//! `/moderations` in the same shape (OpenRouter, vLLM, gateways).
//!
//! Provides:
//! - [`OpenAiModerator`]: moderation checkpoint
//! - [`OpenAiGenerator`]: memorandum generation
//! - [`OpenAiMarketResearch`]: market opportunity summary plus the optional
//!   analysis subprocess

use async_trait::async_trait;
use memoforge_core::error::{GenerationError, ModerationError};
use memoforge_core::{
    Artifact, Generator, MarketAnalysis, MarketResearch, ModerationVerdict, Moderator,
    PromptPayload,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::market::MarketAnalysisCommand;
use crate::prompt::{MEMO_SYSTEM_PROMPT, OPPORTUNITY_SYSTEM_PROMPT, memo_prompt, opportunity_prompt};

/// Transport ceiling; stage deadlines are enforced by the pipeline.
const HTTP_TIMEOUT: Duration = Duration::from_secs(180);

/// Shared HTTP plumbing for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        trace_id: Option<&str>,
    ) -> Result<reqwest::Response, GenerationError> {
        let url = format!("{}/{path}", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(trace_id) = trace_id {
            request = request.header("x-trace-id", trace_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Endpoint returned error");
            return Err(GenerationError::Api {
                status_code: status,
                message: error_body,
            });
        }
        Ok(response)
    }

    /// One chat completion; returns the first choice's content.
    pub async fn chat(&self, request: ChatRequest<'_>) -> Result<String, GenerationError> {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
            "stream": false,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(model = %request.model, trace_id = ?request.trace_id, "Sending completion request");

        let response = self.post("chat/completions", &body, request.trace_id).await?;
        let api_response: ChatResponse = response.json().await.map_err(|e| GenerationError::Api {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GenerationError::EmptyCompletion(request.model.to_string()))
    }
}

/// Inputs of a single chat completion.
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub trace_id: Option<&'a str>,
}

// ── Moderation ────────────────────────────────────────────────────────────

/// Moderation through the `/moderations` endpoint.
pub struct OpenAiModerator {
    client: OpenAiClient,
    model: String,
}

impl OpenAiModerator {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Moderator for OpenAiModerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, ModerationError> {
        let body = serde_json::json!({ "model": self.model, "input": text });
        let response = self
            .client
            .post("moderations", &body, None)
            .await
            .map_err(|e| ModerationError::Request(e.to_string()))?;

        let parsed: ModerationResponse = response
            .json()
            .await
            .map_err(|e| ModerationError::Malformed(e.to_string()))?;
        let result = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ModerationError::Malformed("no results in response".into()))?;

        if !result.flagged {
            return Ok(ModerationVerdict::clean());
        }
        Ok(ModerationVerdict::flagged(
            result
                .categories
                .into_iter()
                .filter_map(|(name, hit)| hit.then_some(name)),
        ))
    }
}

// ── Generation ────────────────────────────────────────────────────────────

/// Memorandum generation through chat completions.
pub struct OpenAiGenerator {
    client: OpenAiClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(client: OpenAiClient, model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, payload: PromptPayload) -> Result<Artifact, GenerationError> {
        let user = memo_prompt(&payload);
        let html = self
            .client
            .chat(ChatRequest {
                model: &self.model,
                system: MEMO_SYSTEM_PROMPT,
                user: &user,
                temperature: Some(self.temperature),
                max_tokens: Some(self.max_tokens),
                trace_id: Some(&payload.trace_id),
            })
            .await?;
        debug!(chars = html.len(), "Memorandum generated");
        Ok(Artifact::new(html, self.model.clone()))
    }
}

// ── Market research ───────────────────────────────────────────────────────

/// Opportunity summary by chat completion; analysis by subprocess.
pub struct OpenAiMarketResearch {
    client: OpenAiClient,
    model: String,
    analysis: Option<MarketAnalysisCommand>,
}

impl OpenAiMarketResearch {
    pub fn new(client: OpenAiClient, model: impl Into<String>, analysis: Option<MarketAnalysisCommand>) -> Self {
        Self {
            client,
            model: model.into(),
            analysis,
        }
    }
}

#[async_trait]
impl MarketResearch for OpenAiMarketResearch {
    fn name(&self) -> &str {
        "openai"
    }

    async fn summarize_opportunity(&self, extracted_text: &str, trace_id: &str) -> Result<String, GenerationError> {
        let user = opportunity_prompt(extracted_text);
        let answer = self
            .client
            .chat(ChatRequest {
                model: &self.model,
                system: OPPORTUNITY_SYSTEM_PROMPT,
                user: &user,
                temperature: None,
                max_tokens: None,
                trace_id: Some(trace_id),
            })
            .await?;
        Ok(clean_opportunity(&answer))
    }

    async fn analyze(&self, opportunity: &str, trace_id: &str) -> Result<MarketAnalysis, GenerationError> {
        match &self.analysis {
            Some(command) => command.run(opportunity, trace_id).await,
            None => Err(GenerationError::NotConfigured(
                "no market analysis command configured".into(),
            )),
        }
    }
}

/// First non-empty line with list markers and quotes removed.
fn clean_opportunity(answer: &str) -> String {
    answer
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .trim_start_matches(['-', '*', ' '])
        .trim_matches(['\'', '"'])
        .to_string()
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: BTreeMap<String, bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoforge_core::DealTerms;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "model": "gpt-4o",
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn generator_returns_artifact() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o", "max_tokens": 6000})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("<h2>Executive Summary</h2>")))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "sk-test").unwrap();
        let generator = OpenAiGenerator::new(client, "gpt-4o", 0.7, 6000);
        let artifact = generator
            .generate(PromptPayload {
                trace_id: "t1".into(),
                compacted_text: "Acme".into(),
                deal_terms: DealTerms::default(),
                market_opportunity: None,
                market_analysis: None,
            })
            .await
            .unwrap();
        assert_eq!(artifact.html, "<h2>Executive Summary</h2>");
        assert_eq!(artifact.model, "gpt-4o");
    }

    #[tokio::test]
    async fn api_errors_carry_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "k").unwrap();
        let err = OpenAiGenerator::new(client, "gpt-4o", 0.7, 100)
            .generate(PromptPayload {
                trace_id: "t".into(),
                compacted_text: String::new(),
                deal_terms: DealTerms::default(),
                market_opportunity: None,
                market_analysis: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Api { status_code: 500, .. }));
    }

    #[tokio::test]
    async fn moderator_reports_flagged_categories() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/moderations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "flagged": true,
                    "categories": {"violence": true, "hate": false, "harassment": true}
                }]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "k").unwrap();
        let verdict = OpenAiModerator::new(client, "omni-moderation-latest")
            .moderate("text")
            .await
            .unwrap();
        assert!(verdict.flagged);
        assert_eq!(
            verdict.categories.into_iter().collect::<Vec<_>>(),
            vec!["harassment".to_string(), "violence".to_string()]
        );
    }

    #[tokio::test]
    async fn moderator_clean_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"flagged": false, "categories": {"violence": false}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "k").unwrap();
        let verdict = OpenAiModerator::new(client, "m").moderate("fine").await.unwrap();
        assert_eq!(verdict, ModerationVerdict::clean());
    }

    #[tokio::test]
    async fn opportunity_is_cleaned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("- 'AI budgeting platform for CFOs'\n")))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "k").unwrap();
        let research = OpenAiMarketResearch::new(client, "gpt-4o", None);
        let opportunity = research.summarize_opportunity("We help CFOs", "t").await.unwrap();
        assert_eq!(opportunity, "AI budgeting platform for CFOs");
        assert!(matches!(
            research.analyze(&opportunity, "t").await.unwrap_err(),
            GenerationError::NotConfigured(_)
        ));
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  ")))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "k").unwrap();
        let err = client
            .chat(ChatRequest {
                model: "m",
                system: "s",
                user: "u",
                temperature: None,
                max_tokens: None,
                trace_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyCompletion(m) if m == "m"));
    }
}
