//! Page fetching against the remote search endpoint
//!
//! One fetch covers one (partition, page) pair. Retry with exponential
//! backoff happens *inside* the fetch, so callers only ever see the terminal
//! [`FetchOutcome`]: records, an empty page, or a page that exhausted its
//! retry budget. Fetches share no mutable state; each call is a pure
//! function of its inputs plus the network.

use crate::config::{Config, EndpointConfig, RetryConfig};
use crate::error::{Error, FetchError, Result};
use crate::retry::fetch_with_retry;
use crate::types::{FetchFailure, FetchOutcome, PageRequest, PartitionToken, RawRecord};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Source of pages for walkers and the orchestrator
///
/// The production implementation is [`HttpPageFetcher`]; tests inject fakes
/// so pagination and orchestration logic run without any network I/O.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page of one partition, retrying transient failures
    /// internally, and report the terminal outcome.
    async fn fetch(&self, partition: &PartitionToken, page: u32) -> FetchOutcome;
}

/// One document from the search response
///
/// Every field is optional in the wire format; absent fields deserialize to
/// empty strings.
#[derive(Debug, Deserialize)]
struct SearchDoc {
    #[serde(default)]
    title: String,
    #[serde(default, rename = "displayName")]
    display_name: String,
    #[serde(default)]
    email: String,
    #[serde(default, rename = "roleTitle")]
    role_title: String,
    #[serde(default)]
    url: String,
}

/// Top-level search response shape
///
/// A response missing the `docs` array deserializes to an empty list, which
/// downstream reads as partition exhaustion, the safe default for a
/// malformed-but-parsable body.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

impl SearchDoc {
    /// Map a wire document to a raw record under the given partition tag
    fn into_record(self, partition: &PartitionToken) -> RawRecord {
        // The portal serves the name under `title` for most documents and
        // `displayName` for some older profiles.
        let name = if self.title.is_empty() {
            self.display_name
        } else {
            self.title
        };

        RawRecord {
            name,
            email: self.email,
            position: self.role_title,
            profile_url: self.url,
            partition: partition.clone(),
        }
    }
}

/// HTTP implementation of [`PageFetcher`] backed by reqwest
pub struct HttpPageFetcher {
    client: reqwest::Client,
    endpoint: EndpointConfig,
    retry: RetryConfig,
    request_timeout: Duration,
}

impl HttpPageFetcher {
    /// Create a fetcher from the harvest configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch.request_timeout)
            .user_agent(config.endpoint.user_agent.clone())
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            retry: config.retry.clone(),
            request_timeout: config.fetch.request_timeout,
        })
    }

    /// Perform a single attempt for one page request
    async fn attempt(&self, request: &PageRequest) -> std::result::Result<Vec<RawRecord>, FetchError> {
        let params = request.query_params(&self.endpoint.category, &self.endpoint.sort);

        let response = self
            .client
            .get(&self.endpoint.base_url)
            .header("Accept", "application/json")
            .query(&params)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        // The portal labels its JSON with assorted content types, so the
        // body is read as text and parsed explicitly.
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.request_timeout))?;

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::InvalidBody(e.to_string()))?;

        Ok(parsed
            .docs
            .into_iter()
            .map(|doc| doc.into_record(&request.partition))
            .collect())
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, partition: &PartitionToken, page: u32) -> FetchOutcome {
        let request = PageRequest::new(partition.clone(), page);

        // Count actual tries so a non-retryable failure reports 1, not the
        // full budget.
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result = fetch_with_retry(&self.retry, || {
            attempts.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.attempt(&request)
        })
        .await;

        match result {
            Ok(records) if records.is_empty() => {
                tracing::debug!(partition = %partition, page, "empty page, partition exhausted");
                FetchOutcome::EmptyPage
            }
            Ok(records) => {
                tracing::debug!(partition = %partition, page, records = records.len(), "page fetched");
                FetchOutcome::Success(records)
            }
            Err(e) => {
                tracing::warn!(partition = %partition, page, error = %e, "page failed after retries");
                FetchOutcome::Failed(FetchFailure {
                    attempts: attempts.load(std::sync::atomic::Ordering::Relaxed),
                    last_error: e.to_string(),
                })
            }
        }
    }
}
