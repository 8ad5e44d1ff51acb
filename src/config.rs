//! Configuration types for staff-harvest

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Search endpoint configuration (URL, query shape, identity)
///
/// Groups settings that describe the remote search API being harvested.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the search endpoint (query parameters are appended)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Search category filter (default: "employee")
    #[serde(default = "default_category")]
    pub category: String,

    /// Sort order requested from the endpoint (default: "alpha")
    ///
    /// Alphabetical sorting keeps each partition's pages stable between
    /// requests, which pagination depends on.
    #[serde(default = "default_sort")]
    pub sort: String,

    /// First page index of a partition (default: 1)
    #[serde(default = "default_first_page")]
    pub first_page: u32,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Institution label stamped onto every canonical record (default: "NTNU")
    #[serde(default = "default_institution")]
    pub institution: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            category: default_category(),
            sort: default_sort(),
            first_page: default_first_page(),
            user_agent: default_user_agent(),
            institution: default_institution(),
        }
    }
}

/// Fetch behavior configuration (concurrency, timeouts, pacing)
///
/// Groups settings for how aggressively the harvester drives the remote
/// service. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum partitions fetching concurrently (default: 10)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Timeout for a single page request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Courtesy delay between consecutive pages of one partition
    /// (default: 1 second)
    ///
    /// Local to each walker; partitions do not share this pacing.
    #[serde(default = "default_inter_page_delay", with = "duration_serde")]
    pub inter_page_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            request_timeout: default_request_timeout(),
            inter_page_delay: default_inter_page_delay(),
        }
    }
}

/// Retry configuration for transient fetch failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Export configuration for the canonical record set
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Path the CSV export is written to (default: "employees.csv")
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

/// Main configuration for a harvest run
///
/// Fields are organized into logical sub-configs:
/// - [`endpoint`](EndpointConfig) - the remote search API and query shape
/// - [`fetch`](FetchConfig) - concurrency cap, timeouts, pacing
/// - [`retry`](RetryConfig) - backoff policy for transient failures
/// - [`export`](ExportConfig) - where the canonical set is written
///
/// All sub-config fields are flattened for serialization, so the JSON format
/// stays flat with no nesting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote search API settings
    #[serde(flatten)]
    pub endpoint: EndpointConfig,

    /// Concurrency, timeout, and pacing settings
    #[serde(flatten)]
    pub fetch: FetchConfig,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Export settings
    #[serde(flatten)]
    pub export: ExportConfig,
}

impl Config {
    /// Validate the configuration before a run
    ///
    /// Checks that the base URL parses and that the concurrency cap is
    /// non-zero (a zero cap would deadlock every walker at the gate).
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.endpoint.base_url).map_err(|e| Error::Config {
            message: format!("base_url '{}' is not a valid URL: {}", self.endpoint.base_url, e),
            key: Some("endpoint.base_url".to_string()),
        })?;

        if self.fetch.max_concurrency == 0 {
            return Err(Error::Config {
                message: "max_concurrency must be at least 1".to_string(),
                key: Some("fetch.max_concurrency".to_string()),
            });
        }

        Ok(())
    }
}

// Default value functions

fn default_base_url() -> String {
    // Liferay search portlet endpoint; the resource parameters select the
    // JSON search resource rather than a rendered page.
    "https://www.ntnu.edu/sok?p_p_id=ntnusearchpage_WAR_ntnusearchportlet\
     &p_p_lifecycle=2&p_p_state=normal&p_p_mode=view&p_p_resource_id=search\
     &p_p_cacheability=cacheLevelPage"
        .to_string()
}

fn default_category() -> String {
    "employee".to_string()
}

fn default_sort() -> String {
    "alpha".to_string()
}

fn default_first_page() -> u32 {
    1
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36"
        .to_string()
}

fn default_institution() -> String {
    "NTNU".to_string()
}

fn default_max_concurrency() -> usize {
    10
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_inter_page_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_output_path() -> PathBuf {
    PathBuf::from("employees.csv")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
