//! Profile lookup strategies.
//!
//! Two ways to learn about a founder, tried in order by a
//! [`FallbackFetcher`](crate::fallback::FallbackFetcher):
//!
//! 1. [`ProfileApiStrategy`]: a structured enrichment API.
//! 2. [`PublicProfilePageStrategy`]: scrape the public profile page.

use async_trait::async_trait;
use memoforge_core::enrich::{Education, Experience};
use memoforge_core::error::FetchError;
use memoforge_core::{Enrichment, FetchStrategy, ProfileData};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::html::first_text;
use crate::web::{USER_AGENT, map_reqwest};

const PROFILE_BASE: &str = "https://www.linkedin.com/in/";

/// Normalise a profile identifier to a full profile URL.
///
/// Anything already starting with `http://` or `https://` is kept as is;
/// bare handles and scheme-less profile URLs become `https://www.linkedin.com/in/<handle>`.
pub fn normalize_profile_url(identifier: &str) -> Result<String, FetchError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidIdentifier("empty profile identifier".into()));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.to_string());
    }
    let handle = trimmed.strip_prefix("www.").unwrap_or(trimmed);
    let handle = handle.strip_prefix("linkedin.com/").unwrap_or(handle);
    let handle = handle.strip_prefix("in/").unwrap_or(handle);
    Ok(format!("{PROFILE_BASE}{handle}"))
}

// ── Structured API ────────────────────────────────────────────────────────

/// Wire shape of the profile API. Every list may be `null`.
#[derive(Debug, Deserialize)]
struct ApiProfile {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    occupation: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    experiences: Option<Vec<Experience>>,
    #[serde(default)]
    education: Option<Vec<Education>>,
    #[serde(default)]
    skills: Option<Vec<String>>,
}

/// Looks a profile up through a Bearer-authenticated enrichment API.
pub struct ProfileApiStrategy {
    api_url: String,
    api_key: String,
    client: Client,
}

impl ProfileApiStrategy {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl FetchStrategy for ProfileApiStrategy {
    fn name(&self) -> &str {
        "profile_api"
    }

    async fn fetch(&self, identifier: &str) -> Result<Enrichment, FetchError> {
        let url = normalize_profile_url(identifier)?;
        debug!(url = %url, "Querying profile API");

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("url", url.as_str()), ("use_cache", "if-present")])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status_code: status,
                message,
            });
        }

        let body: ApiProfile = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        if let Some(error) = body.error {
            let message = error
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| error.to_string());
            return Err(FetchError::Upstream(message));
        }

        Ok(Enrichment::Profile {
            profile: ProfileData {
                full_name: body.full_name,
                occupation: body.occupation,
                summary: body.summary,
                experiences: body.experiences.unwrap_or_default(),
                education: body.education.unwrap_or_default(),
                skills: body.skills.unwrap_or_default(),
                profile_url: Some(url),
            },
        })
    }
}

// ── Public page ───────────────────────────────────────────────────────────

const HEADLINE_SELECTOR: &str = ".text-body-medium.break-words";

/// Scrapes name and headline from the public profile page.
pub struct PublicProfilePageStrategy {
    client: Client,
}

impl PublicProfilePageStrategy {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchStrategy for PublicProfilePageStrategy {
    fn name(&self) -> &str {
        "public_page"
    }

    async fn fetch(&self, identifier: &str) -> Result<Enrichment, FetchError> {
        let url = normalize_profile_url(identifier)?;
        let response = self.client.get(&url).send().await.map_err(map_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status_code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }
        let body = response.text().await.map_err(map_reqwest)?;

        let doc = scraper::Html::parse_document(&body);
        let profile = ProfileData {
            full_name: first_text(&doc, "h1"),
            occupation: first_text(&doc, HEADLINE_SELECTOR),
            summary: None,
            profile_url: Some(url),
            ..ProfileData::default()
        };
        if profile.full_name.is_none() && profile.occupation.is_none() {
            return Err(FetchError::Parse("no profile details on public page".into()));
        }
        Ok(Enrichment::Profile { profile })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn normalizes_handles_and_partial_urls() {
        assert_eq!(
            normalize_profile_url("jane-doe").unwrap(),
            "https://www.linkedin.com/in/jane-doe"
        );
        assert_eq!(
            normalize_profile_url("linkedin.com/in/jane-doe").unwrap(),
            "https://www.linkedin.com/in/jane-doe"
        );
        assert_eq!(
            normalize_profile_url("www.linkedin.com/in/jane-doe").unwrap(),
            "https://www.linkedin.com/in/jane-doe"
        );
        assert_eq!(
            normalize_profile_url("https://example.com/p/1").unwrap(),
            "https://example.com/p/1"
        );
        assert!(normalize_profile_url("  ").is_err());
    }

    #[tokio::test]
    async fn api_strategy_maps_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("url", "https://www.linkedin.com/in/jane"))
            .and(query_param("use_cache", "if-present"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "full_name": "Jane Doe",
                "occupation": "CEO at Acme",
                "experiences": [{"title": "CEO", "company": "Acme"}],
                "education": null,
                "skills": ["Rust"]
            })))
            .mount(&server)
            .await;

        let strategy = ProfileApiStrategy::new(server.uri(), "secret", Duration::from_secs(5)).unwrap();
        let Enrichment::Profile { profile } = strategy.fetch("jane").await.unwrap() else {
            panic!("expected profile");
        };
        assert_eq!(profile.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(profile.experiences.len(), 1);
        assert!(profile.education.is_empty());
        assert_eq!(profile.profile_url.as_deref(), Some("https://www.linkedin.com/in/jane"));
    }

    #[tokio::test]
    async fn api_error_payload_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "quota exceeded"})),
            )
            .mount(&server)
            .await;

        let strategy = ProfileApiStrategy::new(server.uri(), "k", Duration::from_secs(5)).unwrap();
        let err = strategy.fetch("jane").await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream(msg) if msg == "quota exceeded"));
    }

    #[tokio::test]
    async fn public_page_scrapes_name_and_headline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><h1> Jane Doe </h1><div class="text-body-medium break-words">Founder, Acme</div></body></html>"#,
            ))
            .mount(&server)
            .await;

        let strategy = PublicProfilePageStrategy::new(Duration::from_secs(5)).unwrap();
        let Enrichment::Profile { profile } = strategy.fetch(&server.uri()).await.unwrap() else {
            panic!("expected profile");
        };
        assert_eq!(profile.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(profile.occupation.as_deref(), Some("Founder, Acme"));
    }
}
