// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Provider Clients
//!
//! The narrow external-provider boundary spec.md §6 calls for: `search`,
//! `get`, `chat`, and rate-limit signalling, with no provider SDK type
//! leaking past this module. Concrete vendor clients (web-knowledge,
//! places, video-social, chat-completion) are out of scope per spec.md §1;
//! what lives here is the trait contract plus a deterministic fake used by
//! the worker pool's tests and as a safe default when no real client is
//! wired in.

use async_trait::async_trait;
use std::collections::HashMap;
use wayfarer_pipeline_domain::entities::RawCandidate;
use wayfarer_pipeline_domain::error::PipelineError;

/// One page of results from a provider's search endpoint.
#[derive(Debug, Clone)]
pub struct ProviderSearchResult {
    pub candidates: Vec<RawCandidate>,
    /// `true` when the provider itself signalled a rate limit (HTTP 429
    /// or an equivalent); distinct from a hard error so callers can
    /// classify it via [`RetryableKind::from_status`](crate::infrastructure::concurrency::RetryableKind::from_status).
    pub rate_limited: bool,
}

/// A single external-provider client as consumed by the stage-3 worker
/// pool. Every provider (web-knowledge, places, video-social) implements
/// this with its own query semantics behind `search`.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<ProviderSearchResult, PipelineError>;
}

/// The chat-completion endpoint consumed by stage 9's aggregator.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, prompt: &NarrativeRequest) -> Result<NarrativeResponse, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct NarrativeRequest {
    pub session_title: String,
    pub candidate_titles: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NarrativeResponse {
    pub introduction: String,
    pub conclusion: Option<String>,
    pub tokens_used: u64,
}

/// The fact-check endpoint consumed by stage 7's validator.
#[async_trait]
pub trait FactChecker: Send + Sync {
    async fn check(&self, title: &str, summary: &str) -> Result<FactCheckResult, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct FactCheckResult {
    pub status: wayfarer_pipeline_domain::entities::ValidationStatus,
    pub notes: Option<String>,
    pub sources: Vec<String>,
}

/// Deterministic stand-in for a real provider, keyed by query so tests can
/// assert on exact output. Never rate-limits, never errors, unless
/// explicitly configured to via [`FakeProviderClient::failing`].
pub struct FakeProviderClient {
    name: String,
    fixtures: HashMap<String, Vec<RawCandidate>>,
    fail: bool,
}

impl FakeProviderClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixtures: HashMap::new(),
            fail: false,
        }
    }

    pub fn with_fixture(mut self, query: impl Into<String>, candidates: Vec<RawCandidate>) -> Self {
        self.fixtures.insert(query.into(), candidates);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl ProviderClient for FakeProviderClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<ProviderSearchResult, PipelineError> {
        if self.fail {
            return Err(PipelineError::ExternalProviderError(format!("{} unavailable", self.name)));
        }
        let candidates = self
            .fixtures
            .get(query)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(max_results)
            .collect();
        Ok(ProviderSearchResult { candidates, rate_limited: false })
    }
}

/// Deterministic narrative generator: concatenates candidate titles into a
/// stable introduction so aggregator tests don't depend on an LLM.
pub struct FakeNarrativeGenerator {
    fail: bool,
}

impl FakeNarrativeGenerator {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for FakeNarrativeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NarrativeGenerator for FakeNarrativeGenerator {
    async fn generate(&self, prompt: &NarrativeRequest) -> Result<NarrativeResponse, PipelineError> {
        if self.fail {
            return Err(PipelineError::ExternalProviderError("narrative generator unavailable".into()));
        }
        Ok(NarrativeResponse {
            introduction: format!("A trip plan for {}: {}", prompt.session_title, prompt.candidate_titles.join(", ")),
            conclusion: Some("Enjoy the trip.".to_string()),
            tokens_used: (prompt.candidate_titles.len() as u64 + 1) * 20,
        })
    }
}

/// Deterministic fact-checker: verifies anything with a non-empty summary,
/// otherwise flags unverified.
pub struct FakeFactChecker {
    fail: bool,
}

impl FakeFactChecker {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for FakeFactChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FactChecker for FakeFactChecker {
    async fn check(&self, _title: &str, summary: &str) -> Result<FactCheckResult, PipelineError> {
        if self.fail {
            return Err(PipelineError::ExternalProviderError("fact-check service unavailable".into()));
        }
        let status = if summary.is_empty() {
            wayfarer_pipeline_domain::entities::ValidationStatus::Unverified
        } else {
            wayfarer_pipeline_domain::entities::ValidationStatus::Verified
        };
        Ok(FactCheckResult { status, notes: None, sources: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_provider_returns_fixture_for_matching_query() {
        let candidate = RawCandidate {
            title: "Tokyo Tower".into(),
            summary: "A landmark".into(),
            location_text: Some("Minato, Tokyo".into()),
            lat: None,
            lng: None,
            tags: vec![],
            source_url: None,
            publisher: None,
            snippet: None,
            metadata: HashMap::new(),
        };
        let client = FakeProviderClient::new("web").with_fixture("tokyo landmarks", vec![candidate]);
        let result = client.search("tokyo landmarks", 10).await.unwrap();
        assert_eq!(result.candidates.len(), 1);
        assert!(!result.rate_limited);
    }

    #[tokio::test]
    async fn fake_provider_unknown_query_returns_empty() {
        let client = FakeProviderClient::new("web");
        let result = client.search("nothing here", 10).await.unwrap();
        assert!(result.candidates.is_empty());
    }

    #[tokio::test]
    async fn failing_provider_errors() {
        let client = FakeProviderClient::new("web").failing();
        assert!(client.search("anything", 10).await.is_err());
    }
}
