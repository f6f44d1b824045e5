//! Web page fetch strategy.

use async_trait::async_trait;
use memoforge_core::error::FetchError;
use memoforge_core::{Enrichment, FetchStrategy};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::html::{html_to_text, truncate_chars};

/// User agent sent with every outbound page fetch.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; MemoGenerator/1.0)";

/// Maximum characters kept from a fetched page.
pub const MAX_PAGE_CHARS: usize = 5000;

const MAX_REDIRECTS: usize = 3;

/// Fetches a URL and reduces it to body text.
pub struct WebPageFetcher {
    client: Client,
}

impl WebPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchStrategy for WebPageFetcher {
    fn name(&self) -> &str {
        "web_page"
    }

    async fn fetch(&self, identifier: &str) -> Result<Enrichment, FetchError> {
        let url = reqwest::Url::parse(identifier)
            .map_err(|e| FetchError::InvalidIdentifier(format!("{identifier}: {e}")))?;

        let response = self.client.get(url).send().await.map_err(map_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status_code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }

        let body = response.text().await.map_err(map_reqwest)?;
        let text = truncate_chars(&html_to_text(&body), MAX_PAGE_CHARS);
        debug!(url = identifier, chars = text.chars().count(), "Page fetched");
        Ok(Enrichment::Text { text })
    }
}

/// Map a transport error, keeping timeouts distinguishable.
pub(crate) fn map_reqwest(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(e.to_string())
    } else {
        FetchError::Network(e.to_string())
    }
}
