//! Sequential pagination of a single partition
//!
//! A walker owns one partition for the duration of a run. Pages are fetched
//! strictly in order (page *n+1* is never requested before page *n*'s
//! outcome is known) and a courtesy delay paces consecutive requests so a
//! single partition never hammers the remote service. Partitions pace
//! themselves independently; the delay is not shared.

use crate::fetcher::PageFetcher;
use crate::types::{
    Event, FetchOutcome, PartitionReport, PartitionStatus, PartitionToken, RawRecord,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Everything one partition produced: its records and how the walk ended
#[derive(Debug)]
pub struct PartitionHarvest {
    /// Records accumulated across the partition's pages, in page order
    pub records: Vec<RawRecord>,
    /// How far the walk got and how it stopped
    pub report: PartitionReport,
}

/// Drives pagination for one partition using an injected [`PageFetcher`]
///
/// The walk is finite and non-restartable: it halts on the first empty page
/// (natural exhaustion), on a page that exhausted its retry budget (partial
/// failure), or on cancellation. A failure never raises; the report carries
/// the last successful page count and the reason.
pub struct PartitionWalker {
    fetcher: Arc<dyn PageFetcher>,
    first_page: u32,
    inter_page_delay: Duration,
    event_tx: broadcast::Sender<Event>,
}

impl PartitionWalker {
    /// Create a walker
    ///
    /// # Arguments
    /// * `fetcher` - page source (HTTP in production, fakes in tests)
    /// * `first_page` - the partition's first page index
    /// * `inter_page_delay` - courtesy delay between consecutive pages
    /// * `event_tx` - broadcast channel for per-page progress events
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        first_page: u32,
        inter_page_delay: Duration,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            fetcher,
            first_page,
            inter_page_delay,
            event_tx,
        }
    }

    /// Walk the partition's pages until exhaustion, failure, or cancellation
    pub async fn walk(
        &self,
        partition: &PartitionToken,
        cancel: &CancellationToken,
    ) -> PartitionHarvest {
        let mut records: Vec<RawRecord> = Vec::new();
        let mut page = self.first_page;
        let mut pages_fetched: u32 = 0;

        let status = loop {
            if cancel.is_cancelled() {
                tracing::info!(partition = %partition, page, "walk cancelled");
                break PartitionStatus::Cancelled { page };
            }

            match self.fetcher.fetch(partition, page).await {
                FetchOutcome::Success(batch) => {
                    pages_fetched += 1;
                    self.event_tx
                        .send(Event::PageFetched {
                            partition: partition.clone(),
                            page,
                            records: batch.len(),
                        })
                        .ok();
                    records.extend(batch);
                    page += 1;

                    // Courtesy delay before the next page; a cancellation
                    // during the pause ends the walk without another fetch.
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            tracing::info!(partition = %partition, page, "walk cancelled");
                            break PartitionStatus::Cancelled { page };
                        }
                        _ = tokio::time::sleep(self.inter_page_delay) => {}
                    }
                }
                FetchOutcome::EmptyPage => {
                    tracing::debug!(
                        partition = %partition,
                        pages = pages_fetched,
                        "partition exhausted"
                    );
                    break PartitionStatus::Complete;
                }
                FetchOutcome::Failed(failure) => {
                    tracing::warn!(
                        partition = %partition,
                        page,
                        error = %failure,
                        "partition stopped at failed page"
                    );
                    break PartitionStatus::Failed {
                        page,
                        reason: failure.to_string(),
                    };
                }
            }
        };

        PartitionHarvest {
            report: PartitionReport {
                partition: partition.clone(),
                pages_fetched,
                records: records.len(),
                status,
            },
            records,
        }
    }
}
