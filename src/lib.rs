//! # staff-harvest
//!
//! Concurrent harvester library for paginated staff directory search APIs.
//!
//! ## Design Philosophy
//!
//! staff-harvest is designed to be:
//! - **Failure-containing** - attempt, page, and partition failures stay at
//!   the smallest possible scope; a bad partition never aborts its siblings
//! - **Polite by default** - bounded concurrency, retry with backoff, and a
//!   courtesy delay between pages of the same partition
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - consumers subscribe to progress events, no polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use staff_harvest::{Config, export, harvest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let output_path = config.export.output_path.clone();
//!
//!     let run = harvest(config).await?;
//!
//!     for report in &run.reports {
//!         println!("{}: {} pages, {:?}", report.partition, report.pages_fetched, report.status);
//!     }
//!
//!     export::write_csv(&run.records, &output_path)?;
//!     Ok(())
//! }
//! ```
//!
//! For finer control (custom partition sets, progress events, cancellation),
//! build an [`Orchestrator`] directly over an [`HttpPageFetcher`] and run the
//! [`Reconciler`] on its output.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// CSV export of the canonical record set
pub mod export;
/// Page fetching against the remote search endpoint
pub mod fetcher;
/// Bounded concurrency gate
pub mod gate;
/// Fan-out/fan-in harvest orchestration
pub mod orchestrator;
/// Deduplication and normalization
pub mod reconciler;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Sequential per-partition pagination
pub mod walker;

// Re-export commonly used types
pub use config::{Config, EndpointConfig, ExportConfig, FetchConfig, RetryConfig};
pub use error::{Error, FetchError, Result};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use gate::{ConcurrencyGate, GatePermit};
pub use orchestrator::Orchestrator;
pub use reconciler::Reconciler;
pub use types::{
    CanonicalRecord, Event, FetchFailure, FetchOutcome, HarvestOutput, HarvestSummary,
    PartitionReport, PartitionStatus, PartitionToken, RawRecord,
};
pub use walker::{PartitionHarvest, PartitionWalker};

use std::sync::Arc;

/// Result of a complete harvest run: the canonical record set plus the
/// per-partition reports and aggregate summary.
#[derive(Clone, Debug)]
pub struct HarvestRun {
    /// Deduplicated, normalized records in stable output order
    pub records: Vec<CanonicalRecord>,
    /// One report per partition, in enumeration order
    pub reports: Vec<PartitionReport>,
    /// Aggregate totals and timestamps
    pub summary: HarvestSummary,
}

/// Run a full harvest over the standard a–z partition set
///
/// Validates the configuration, fetches every partition under the configured
/// concurrency cap, and reconciles the combined stream into the canonical
/// record set. Partial failures are carried in the reports; the call only
/// errors when the configuration is invalid, the HTTP client cannot be
/// built, or no partition succeeded at all.
pub async fn harvest(config: Config) -> Result<HarvestRun> {
    config.validate()?;

    let institution = config.endpoint.institution.clone();
    let fetcher = Arc::new(HttpPageFetcher::new(&config)?);
    let orchestrator = Orchestrator::new(fetcher, config);

    let output = orchestrator.run(&PartitionToken::alphabet()).await?;

    let records = Reconciler::new(institution).reconcile(output.records);

    Ok(HarvestRun {
        records,
        reports: output.reports,
        summary: output.summary,
    })
}
