//! Core types for staff-harvest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One independently fetchable slice of the search space: a single
/// starting-letter query token.
///
/// Partitions are enumerated once at the start of a harvest, consumed by
/// exactly one walker each, and discarded after their records are merged.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionToken(pub String);

impl PartitionToken {
    /// Create a new partition token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The standard a–z partition set covering an alphabetically sorted
    /// directory.
    pub fn alphabet() -> Vec<Self> {
        (b'a'..=b'z')
            .map(|c| Self((c as char).to_string()))
            .collect()
    }
}

impl From<&str> for PartitionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl std::fmt::Display for PartitionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single page request: one (partition, page) pair plus the query
/// parameters derived from it.
///
/// Constructed by the walker, consumed by the fetcher, ephemeral.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// The partition being paged through
    pub partition: PartitionToken,
    /// 1-based page index within the partition
    pub page: u32,
}

impl PageRequest {
    /// Create a request for one page of one partition
    pub fn new(partition: PartitionToken, page: u32) -> Self {
        Self { partition, page }
    }

    /// Derive the query-parameter list for the search endpoint
    ///
    /// `category` and `sort` come from the endpoint configuration; the
    /// partition token and page index come from this request.
    pub fn query_params(&self, category: &str, sort: &str) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.partition.0.clone()),
            ("category", category.to_string()),
            ("pageNr", self.page.to_string()),
            ("sort", sort.to_string()),
        ]
    }
}

/// A record as extracted from one API document, before reconciliation.
///
/// Absent document fields become empty strings. The partition tag records
/// which query slice produced the record; overlapping partitions mean the
/// same person can appear under several tags until the reconciler runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Person's display name
    pub name: String,
    /// Email address, possibly empty
    pub email: String,
    /// Position / role title
    pub position: String,
    /// Profile page URL
    pub profile_url: String,
    /// The partition this record was fetched under
    pub partition: PartitionToken,
}

/// A final, deduplicated, normalized output record.
///
/// Created only by the reconciler; immutable once produced. Email is trimmed
/// and lowercased, the profile URL is trimmed, and the institution label is
/// stamped from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Person's display name
    pub name: String,
    /// Normalized (trimmed, lowercased) email address, possibly empty
    pub email: String,
    /// Position / role title
    pub position: String,
    /// Trimmed profile page URL
    pub profile_url: String,
    /// Institution label for the export boundary
    pub institution: String,
}

/// Terminal failure for one page after the retry budget is exhausted.
///
/// Non-fatal to the run: the partition stops at this page boundary and the
/// failure is carried in the partition's report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    /// Total attempts made for this page (initial try + retries)
    pub attempts: u32,
    /// Display text of the last attempt's error
    pub last_error: String,
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "gave up after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

/// Tagged result of fetching one page
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page returned one or more documents
    Success(Vec<RawRecord>),
    /// The page returned no documents, so the partition is exhausted
    EmptyPage,
    /// All attempts for this page failed
    Failed(FetchFailure),
}

/// How a partition's pagination ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionStatus {
    /// Walked to natural exhaustion (an empty page)
    Complete,
    /// Stopped early at a page that failed all retry attempts
    Failed {
        /// The page that could not be fetched
        page: u32,
        /// Why the page failed
        reason: String,
    },
    /// Stopped early because the harvest was cancelled
    Cancelled {
        /// The page the walker was about to fetch when cancelled
        page: u32,
    },
}

impl PartitionStatus {
    /// Whether the partition reached natural exhaustion
    pub fn is_complete(&self) -> bool {
        matches!(self, PartitionStatus::Complete)
    }
}

/// Per-partition outcome reported after its walk finishes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionReport {
    /// The partition this report covers
    pub partition: PartitionToken,
    /// Number of pages successfully fetched
    pub pages_fetched: u32,
    /// Number of raw records gathered from those pages
    pub records: usize,
    /// How the walk ended
    pub status: PartitionStatus,
}

/// Aggregate totals for one harvest run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarvestSummary {
    /// Partitions that walked to natural exhaustion
    pub partitions_complete: usize,
    /// Partitions that stopped early (failed or cancelled)
    pub partitions_failed: usize,
    /// Total raw records gathered across all partitions
    pub total_records: usize,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

/// Combined result of an orchestrated harvest: the raw record stream plus
/// the per-partition reports and aggregate summary.
#[derive(Clone, Debug)]
pub struct HarvestOutput {
    /// All raw records, in partition-task completion order
    pub records: Vec<RawRecord>,
    /// One report per partition, in the enumeration order of the input
    pub reports: Vec<PartitionReport>,
    /// Aggregate totals
    pub summary: HarvestSummary,
}

/// Event emitted during a harvest run
///
/// Events are broadcast to all subscribers; if nobody is listening they are
/// silently dropped and the pipeline continues.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A partition's walker acquired a slot and started fetching
    PartitionStarted {
        /// The partition that started
        partition: PartitionToken,
    },

    /// One page was fetched successfully
    PageFetched {
        /// The partition the page belongs to
        partition: PartitionToken,
        /// 1-based page index
        page: u32,
        /// Number of records extracted from the page
        records: usize,
    },

    /// A partition walked to natural exhaustion
    PartitionComplete {
        /// The partition that completed
        partition: PartitionToken,
        /// Pages fetched before the empty page
        pages: u32,
        /// Records gathered from the partition
        records: usize,
    },

    /// A partition stopped early at a failed page boundary
    PartitionFailed {
        /// The partition that failed
        partition: PartitionToken,
        /// The page that exhausted its retry budget
        page: u32,
        /// Why the page failed
        reason: String,
    },

    /// The whole run finished (fan-in barrier passed)
    HarvestComplete {
        /// Partitions that walked to natural exhaustion
        partitions_complete: usize,
        /// Partitions that stopped early
        partitions_failed: usize,
        /// Total raw records gathered
        total_records: usize,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_covers_all_26_letters_in_order() {
        let partitions = PartitionToken::alphabet();

        assert_eq!(partitions.len(), 26);
        assert_eq!(partitions[0].as_str(), "a");
        assert_eq!(partitions[25].as_str(), "z");

        let mut sorted = partitions.clone();
        sorted.sort();
        assert_eq!(sorted, partitions, "alphabet should already be sorted");
    }

    #[test]
    fn page_request_derives_expected_query_params() {
        let request = PageRequest::new(PartitionToken::from("ab"), 7);

        let params = request.query_params("employee", "alpha");

        assert_eq!(
            params,
            vec![
                ("query", "ab".to_string()),
                ("category", "employee".to_string()),
                ("pageNr", "7".to_string()),
                ("sort", "alpha".to_string()),
            ]
        );
    }

    #[test]
    fn partition_token_serializes_transparently() {
        let token = PartitionToken::from("q");

        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"q\"", "newtype must serialize as the bare string");

        let restored: PartitionToken = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, token);
    }

    #[test]
    fn partition_status_serializes_with_tag() {
        let status = PartitionStatus::Failed {
            page: 3,
            reason: "gave up after 4 attempts: HTTP status 503".to_string(),
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["page"], 3);

        assert!(!status.is_complete());
        assert!(PartitionStatus::Complete.is_complete());
        assert!(!PartitionStatus::Cancelled { page: 2 }.is_complete());
    }

    #[test]
    fn fetch_failure_display_includes_attempts_and_error() {
        let failure = FetchFailure {
            attempts: 4,
            last_error: "request timed out".to_string(),
        };

        let text = failure.to_string();
        assert!(text.contains("4 attempts"));
        assert!(text.contains("request timed out"));
    }

    #[test]
    fn event_serializes_with_snake_case_tag() {
        let event = Event::PartitionComplete {
            partition: PartitionToken::from("c"),
            pages: 5,
            records: 42,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "partition_complete");
        assert_eq!(json["partition"], "c");
        assert_eq!(json["pages"], 5);
        assert_eq!(json["records"], 42);
    }
}
