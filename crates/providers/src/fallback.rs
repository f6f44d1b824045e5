//! Fetch fallback: ordered strategy chain with per-attempt timeouts.
//!
//! When a strategy fails (error, upstream error payload, timeout), the next
//! strategy in the chain is tried. The first successful result wins; results
//! of different attempts are never mixed.

use async_trait::async_trait;
use memoforge_core::error::FetchError;
use memoforge_core::{Enrichment, FetchStrategy};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A strategy that wraps an ordered list of strategies and falls back on failure.
pub struct FallbackFetcher {
    name: String,
    chain: Vec<FallbackEntry>,
}

/// A single entry in the fallback chain.
struct FallbackEntry {
    strategy: Arc<dyn FetchStrategy>,
    timeout: Duration,
}

impl FallbackFetcher {
    /// Create a new fallback fetcher with no entries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Add a strategy bounded by its own timeout.
    pub fn add(mut self, strategy: Arc<dyn FetchStrategy>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry {
            strategy,
            timeout,
        });
        self
    }

    /// Number of strategies in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl FetchStrategy for FallbackFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, identifier: &str) -> Result<Enrichment, FetchError> {
        let mut last_error = FetchError::NoStrategies;

        for (i, entry) in self.chain.iter().enumerate() {
            let strategy_name = entry.strategy.name().to_string();

            info!(
                strategy = %strategy_name,
                attempt = i + 1,
                total = self.chain.len(),
                "Fallback: trying strategy"
            );

            let outcome = match tokio::time::timeout(entry.timeout, entry.strategy.fetch(identifier)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(format!(
                    "Strategy '{}' timed out after {}s",
                    strategy_name,
                    entry.timeout.as_secs()
                ))),
            };

            match outcome {
                Ok(enrichment) => return Ok(enrichment),
                Err(e) => {
                    warn!(
                        strategy = %strategy_name,
                        error = %e,
                        "Fallback: strategy failed, trying next"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
