// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Poll cycle scheduling and record set publication.
//!
//! Every poll cycle is tagged with a monotonically increasing epoch. A cycle
//! publishes its record set only if no newer cycle has published already, so
//! a slow response can never regress what consumers see. Publication goes
//! through a `watch` channel, which makes the swap of the whole record set
//! atomic from the consumer's point of view.
//!
//! After each publication an enrichment sweep runs over the head of the new
//! record set. The sweep belongs to the epoch that started it and stops as
//! soon as a newer record set has been published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::enrichment::{self, EnrichmentCache, EnrichmentView, SharedEnrichment};
use crate::record::{normalize, FlightRecord};
use crate::source::{SourceError, TrafficSource};

/// Default time between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
/// Default number of records at the head of each set that get enriched.
pub const DEFAULT_ENRICHMENT_SAMPLE_SIZE: usize = 10;

/// Configuration for the polling scheduler.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Fixed cadence of poll cycles, independent of how long a fetch takes.
    pub poll_interval: Duration,
    /// How many records from the head of each set are enriched.
    pub enrichment_sample_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            enrichment_sample_size: DEFAULT_ENRICHMENT_SAMPLE_SIZE,
        }
    }
}

/// The record set currently published to consumers.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    /// Epoch of the cycle that produced `records`; 0 before the first success.
    pub epoch: u64,
    pub records: Arc<[FlightRecord]>,
    /// Message of the most recent failed cycle, cleared by the next success.
    pub error: Option<String>,
    /// When `records` was published.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self {
            epoch: 0,
            records: Vec::new().into(),
            error: None,
            updated_at: None,
        }
    }
}

impl FeedSnapshot {
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

struct Shared {
    source: Arc<dyn TrafficSource>,
    config: FeedConfig,
    cycle: AtomicU64,
    snapshot_tx: watch::Sender<FeedSnapshot>,
    enrichment: SharedEnrichment,
    cancel_token: CancellationToken,
}

impl Shared {
    /// Run one poll cycle: fetch, normalize, publish, then enrich.
    async fn run_cycle(self: &Arc<Self>) {
        let epoch = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Poll cycle {} started", epoch);

        let result = self.source.fetch_state_vectors().await;

        if self.cancel_token.is_cancelled() {
            debug!("Discarding result of poll cycle {} after shutdown", epoch);
            return;
        }

        match result {
            Ok(raw) => {
                let records: Arc<[FlightRecord]> = normalize(&raw).into();
                if self.publish(epoch, Arc::clone(&records)) {
                    info!("Published {} flights (cycle {})", records.len(), epoch);
                    self.spawn_sweep(epoch, records);
                } else {
                    debug!("Discarding stale result of poll cycle {}", epoch);
                }
            }
            Err(e) => self.record_failure(epoch, &e),
        }
    }

    fn publish(&self, epoch: u64, records: Arc<[FlightRecord]>) -> bool {
        self.snapshot_tx.send_if_modified(|snapshot| {
            if epoch <= snapshot.epoch {
                return false;
            }
            *snapshot = FeedSnapshot {
                epoch,
                records,
                error: None,
                updated_at: Some(Utc::now()),
            };
            true
        })
    }

    fn record_failure(&self, epoch: u64, error: &SourceError) {
        warn!("Poll cycle {} failed: {}", epoch, error);
        let message = error.to_string();
        self.snapshot_tx.send_if_modified(|snapshot| {
            if epoch <= snapshot.epoch {
                return false;
            }
            snapshot.error = Some(message);
            true
        });
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.cancel_token.is_cancelled() && self.snapshot_tx.borrow().epoch == epoch
    }

    fn spawn_sweep(self: &Arc<Self>, epoch: u64, records: Arc<[FlightRecord]>) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            enrichment::sweep(
                shared.source.as_ref(),
                &shared.enrichment,
                &records,
                shared.config.enrichment_sample_size,
                || shared.is_current(epoch),
            )
            .await;
        });
    }
}

/// Drives the repeating poll cycle against a [`TrafficSource`].
#[derive(Debug)]
pub struct PollingScheduler;

impl PollingScheduler {
    /// Start polling in a background task.
    ///
    /// The first cycle starts immediately. Must be called from within a
    /// tokio runtime.
    #[must_use]
    pub fn spawn(source: Arc<dyn TrafficSource>, config: FeedConfig) -> FeedHandle {
        let mut handle = FeedHandle::new(source, config);

        let shared = Arc::clone(&handle.shared);
        handle.task = Some(tokio::spawn(async move {
            poll_loop(shared).await;
        }));

        handle
    }
}

async fn poll_loop(shared: Arc<Shared>) {
    let mut interval = tokio::time::interval(shared.config.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Cycles may overlap; each runs in its own task.
                let cycle_shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    cycle_shared.run_cycle().await;
                });
            }
            () = shared.cancel_token.cancelled() => {
                info!("Polling stopped");
                return;
            }
        }
    }
}

/// Handle to a running (or manually driven) feed.
///
/// Dropping the handle stops polling and discards any in-flight results.
pub struct FeedHandle {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedHandle")
            .field("cycle", &self.shared.cycle.load(Ordering::SeqCst))
            .field("polling", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

impl FeedHandle {
    /// Create a feed without a timer; cycles run only through [`FeedHandle::poll_now`].
    #[must_use]
    pub fn new(source: Arc<dyn TrafficSource>, config: FeedConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(FeedSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                source,
                config,
                cycle: AtomicU64::new(0),
                snapshot_tx,
                enrichment: Arc::new(RwLock::new(EnrichmentCache::new())),
                cancel_token: CancellationToken::new(),
            }),
            task: None,
        }
    }

    /// Run one poll cycle inline. The enrichment sweep it triggers still runs
    /// in the background.
    pub async fn poll_now(&self) {
        self.shared.run_cycle().await;
    }

    /// Current published record set.
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Subscribe to record set publications and error changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Read-only view of the enrichment cache.
    #[must_use]
    pub fn enrichment(&self) -> EnrichmentView {
        EnrichmentView::new(Arc::clone(&self.shared.enrichment))
    }

    /// Number of poll cycles started so far.
    #[must_use]
    pub fn cycles_started(&self) -> u64 {
        self.shared.cycle.load(Ordering::SeqCst)
    }

    /// Stop polling. Results of fetches still in flight are discarded.
    pub fn shutdown(&self) {
        self.shared.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.cancel_token.is_cancelled()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.shared.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{route, state_vector, FakeSource};

    fn manual_feed(source: &Arc<FakeSource>) -> FeedHandle {
        FeedHandle::new(source.clone(), FeedConfig::default())
    }

    #[tokio::test]
    async fn test_successful_cycle_publishes_records() {
        let source = Arc::new(FakeSource::default());
        source.push_states(Duration::ZERO, Ok(vec![state_vector("abc", "UAL1"), state_vector("def", " ")]));
        let feed = manual_feed(&source);

        feed.poll_now().await;

        let snapshot = feed.snapshot();
        assert_eq!(snapshot.epoch, 1);
        assert_eq!(snapshot.records.len(), 1);
        assert!(snapshot.updated_at.is_some());
        assert!(!snapshot.has_error());
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_records_and_sets_error() {
        let source = Arc::new(FakeSource::default());
        source.push_states(Duration::ZERO, Ok(vec![state_vector("abc", "UAL1")]));
        source.push_states(Duration::ZERO, Err(502));
        source.push_states(Duration::ZERO, Ok(vec![state_vector("xyz", "DAL2"), state_vector("uvw", "DAL3")]));
        let feed = manual_feed(&source);

        feed.poll_now().await;
        let before = feed.snapshot();

        feed.poll_now().await;
        let failed = feed.snapshot();
        assert!(failed.has_error());
        assert_eq!(failed.epoch, before.epoch);
        assert!(Arc::ptr_eq(&failed.records, &before.records));

        feed.poll_now().await;
        let recovered = feed.snapshot();
        assert!(!recovered.has_error());
        assert_eq!(recovered.epoch, 3);
        assert_eq!(recovered.records.len(), 2);
        assert_eq!(recovered.records[0].icao24, "xyz");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cycle_result_discarded() {
        let source = Arc::new(FakeSource::default());
        source.push_states(Duration::from_secs(90), Ok(vec![state_vector("old", "UAL1")]));
        source.push_states(Duration::ZERO, Ok(vec![state_vector("new", "UAL2")]));
        let feed = PollingScheduler::spawn(source.clone(), FeedConfig::default());

        // Cycle 1 starts at t=0 and answers at t=90; cycle 2 starts and answers at t=60.
        tokio::time::sleep(Duration::from_secs(100)).await;

        let snapshot = feed.snapshot();
        assert_eq!(snapshot.epoch, 2);
        assert_eq!(snapshot.records[0].icao24, "new");
        assert_eq!(feed.cycles_started(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_follow_fixed_interval() {
        let source = Arc::new(FakeSource::default());
        let feed = PollingScheduler::spawn(
            source,
            FeedConfig {
                poll_interval: Duration::from_secs(15),
                ..FeedConfig::default()
            },
        );

        tokio::time::sleep(Duration::from_secs(46)).await;

        // t = 0, 15, 30, 45
        assert_eq!(feed.cycles_started(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_in_flight_result() {
        let source = Arc::new(FakeSource::default());
        source.push_states(Duration::from_secs(10), Ok(vec![state_vector("abc", "UAL1")]));
        let feed = PollingScheduler::spawn(source, FeedConfig::default());

        tokio::time::sleep(Duration::from_secs(1)).await;
        feed.shutdown();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(feed.is_shut_down());
        assert_eq!(feed.snapshot().epoch, 0);
        assert!(feed.snapshot().records.is_empty());
        assert_eq!(feed.cycles_started(), 1);
    }

    #[tokio::test]
    async fn test_publication_triggers_enrichment() {
        let source = Arc::new(FakeSource::default());
        source.set_route("abc", Ok(Some(route("abc", "KLAX", "KSEA"))));
        source.push_states(Duration::ZERO, Ok(vec![state_vector("ABC", "ASA1")]));
        let feed = manual_feed(&source);

        feed.poll_now().await;
        for _ in 0..10 {
            if !feed.enrichment().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        let entry = feed.enrichment().get("abc").unwrap();
        assert_eq!(entry.route().and_then(|r| r.destination()), Some("KSEA"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_enrichment_writes() {
        let source = Arc::new(FakeSource::default());
        source.set_route_delay(Duration::from_secs(10));
        source.set_route("a1", Ok(Some(route("a1", "KLAX", "KSEA"))));
        source.push_states(
            Duration::ZERO,
            Ok(vec![state_vector("a1", "UAL1"), state_vector("a2", "UAL2"), state_vector("a3", "UAL3")]),
        );
        let feed = manual_feed(&source);

        feed.poll_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(source.recent_call_count(), 1);

        feed.shutdown();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(feed.snapshot().epoch, 1);
        assert!(feed.enrichment().is_empty());
        assert_eq!(source.recent_call_count(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_whole_record_sets() {
        let source = Arc::new(FakeSource::default());
        source.push_states(Duration::ZERO, Ok(vec![state_vector("a", "UAL1"), state_vector("b", "UAL2")]));
        let feed = manual_feed(&source);
        let mut rx = feed.subscribe();

        feed.poll_now().await;

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.records.len(), 2);
    }
}
