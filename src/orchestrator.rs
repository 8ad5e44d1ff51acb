//! Fan-out/fan-in harvest orchestration
//!
//! The orchestrator enumerates the partition set up front, launches one
//! walker task per partition under the concurrency gate, waits for every
//! task at the fan-in barrier, and merges the per-task results into one
//! combined record stream plus a per-partition report. Each task returns its
//! own harvest; aggregation happens only at the single join step, so no
//! record collection is ever mutated concurrently.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;
use crate::gate::ConcurrencyGate;
use crate::types::{
    Event, HarvestOutput, HarvestSummary, PartitionReport, PartitionStatus, PartitionToken,
};
use crate::walker::PartitionWalker;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
///
/// Subscribers lagging behind by more than this many events receive a
/// `Lagged` error rather than stalling the pipeline.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Runs the whole harvest: fan-out over partitions, fan-in, aggregation
pub struct Orchestrator {
    fetcher: Arc<dyn PageFetcher>,
    gate: ConcurrencyGate,
    config: Arc<Config>,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator over the given page source
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: Config) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            fetcher,
            gate: ConcurrencyGate::new(config.fetch.max_concurrency),
            config: Arc::new(config),
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to harvest progress events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. With no subscriber, events are silently dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that aborts the run when cancelled
    ///
    /// Callers wire an external full-run timeout to this. Partitions not
    /// fully walked when it fires are reported as cancelled, never dropped.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The gate limiting concurrent partition fetching
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Harvest every partition and merge the results
    ///
    /// All walker tasks are launched logically in parallel, subject to the
    /// gate; the call returns only after every task has finished. A single
    /// partition's failure never aborts its siblings: the run proceeds with
    /// whatever partitions succeeded and reports the failed ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllPartitionsFailed`] only when not a single
    /// partition completed and no records were gathered at all.
    pub async fn run(&self, partitions: &[PartitionToken]) -> Result<HarvestOutput> {
        let started_at = Utc::now();

        tracing::info!(
            partitions = partitions.len(),
            max_concurrency = self.gate.capacity(),
            "harvest starting"
        );

        let handles: Vec<_> = partitions
            .iter()
            .cloned()
            .map(|partition| {
                let gate = self.gate.clone();
                let cancel = self.cancel.clone();
                let event_tx = self.event_tx.clone();
                let walker = PartitionWalker::new(
                    Arc::clone(&self.fetcher),
                    self.config.endpoint.first_page,
                    self.config.fetch.inter_page_delay,
                    self.event_tx.clone(),
                );

                tokio::spawn(async move {
                    let _permit = gate.acquire().await;
                    event_tx
                        .send(Event::PartitionStarted {
                            partition: partition.clone(),
                        })
                        .ok();
                    walker.walk(&partition, &cancel).await
                })
            })
            .collect();

        // Fan-in barrier: every partition joins exactly once, here.
        let results = futures::future::join_all(handles).await;

        let mut records = Vec::new();
        let mut reports = Vec::with_capacity(partitions.len());

        for (partition, result) in partitions.iter().zip(results) {
            match result {
                Ok(harvest) => {
                    self.emit_partition_event(&harvest.report);
                    records.extend(harvest.records);
                    reports.push(harvest.report);
                }
                Err(join_err) => {
                    // A panicked walker is contained as that partition's
                    // failure; siblings are unaffected.
                    tracing::error!(
                        partition = %partition,
                        error = %join_err,
                        "partition task panicked"
                    );
                    let report = PartitionReport {
                        partition: partition.clone(),
                        pages_fetched: 0,
                        records: 0,
                        status: PartitionStatus::Failed {
                            page: self.config.endpoint.first_page,
                            reason: format!("partition task panicked: {join_err}"),
                        },
                    };
                    self.emit_partition_event(&report);
                    reports.push(report);
                }
            }
        }

        let partitions_complete = reports.iter().filter(|r| r.status.is_complete()).count();
        let partitions_failed = reports.len() - partitions_complete;

        self.event_tx
            .send(Event::HarvestComplete {
                partitions_complete,
                partitions_failed,
                total_records: records.len(),
            })
            .ok();

        tracing::info!(
            partitions_complete,
            partitions_failed,
            total_records = records.len(),
            "harvest finished"
        );

        if !partitions.is_empty() && partitions_complete == 0 && records.is_empty() {
            return Err(Error::AllPartitionsFailed {
                attempted: partitions.len(),
            });
        }

        let summary = HarvestSummary {
            partitions_complete,
            partitions_failed,
            total_records: records.len(),
            started_at,
            finished_at: Utc::now(),
        };

        Ok(HarvestOutput {
            records,
            reports,
            summary,
        })
    }

    fn emit_partition_event(&self, report: &PartitionReport) {
        let event = match &report.status {
            PartitionStatus::Complete => Event::PartitionComplete {
                partition: report.partition.clone(),
                pages: report.pages_fetched,
                records: report.records,
            },
            PartitionStatus::Failed { page, reason } => Event::PartitionFailed {
                partition: report.partition.clone(),
                page: *page,
                reason: reason.clone(),
            },
            PartitionStatus::Cancelled { page } => Event::PartitionFailed {
                partition: report.partition.clone(),
                page: *page,
                reason: "harvest cancelled".to_string(),
            },
        };
        self.event_tx.send(event).ok();
    }
}
