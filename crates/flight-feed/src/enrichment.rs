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

//! Route enrichment cache and the opportunistic sweep that fills it.
//!
//! The cache maps an aircraft's icao24 to the outcome of its recent-flight
//! lookup. An absent key means the lookup is still pending. Once a key holds
//! a route or an explicit no-data marker it is never overwritten, and nothing
//! is ever evicted.
//!
//! The sweep walks a bounded sample of the published records one lookup at a
//! time, so at most one enrichment request is outstanding per sweep.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{debug, warn};

use crate::record::FlightRecord;
use crate::source::{RouteSummary, TrafficSource};

/// Outcome of a recent-flight lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentEntry {
    Route(RouteSummary),
    /// The lookup completed (or failed) without usable data.
    NoData,
}

impl EnrichmentEntry {
    #[must_use]
    pub fn route(&self) -> Option<&RouteSummary> {
        match self {
            Self::Route(route) => Some(route),
            Self::NoData => None,
        }
    }
}

/// Accumulate-only mapping from icao24 to enrichment outcome.
#[derive(Debug, Default)]
pub struct EnrichmentCache {
    entries: HashMap<String, EnrichmentEntry>,
}

impl EnrichmentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, icao24: &str) -> Option<&EnrichmentEntry> {
        self.entries.get(icao24)
    }

    /// Whether a lookup for this aircraft has already settled.
    #[must_use]
    pub fn contains(&self, icao24: &str) -> bool {
        self.entries.contains_key(icao24)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store an outcome unless one is already present. Returns whether it was stored.
    pub fn insert_if_absent(&mut self, icao24: &str, entry: EnrichmentEntry) -> bool {
        if self.entries.contains_key(icao24) {
            return false;
        }
        self.entries.insert(icao24.to_string(), entry);
        true
    }
}

pub(crate) type SharedEnrichment = Arc<RwLock<EnrichmentCache>>;

/// Read-only handle on the enrichment cache for rendering code.
#[derive(Debug, Clone)]
pub struct EnrichmentView {
    inner: SharedEnrichment,
}

impl EnrichmentView {
    pub(crate) fn new(inner: SharedEnrichment) -> Self {
        Self { inner }
    }

    /// Entry for an aircraft, `None` while the lookup is pending.
    #[must_use]
    pub fn get(&self, icao24: &str) -> Option<EnrichmentEntry> {
        self.inner
            .read()
            .ok()
            .and_then(|cache| cache.get(icao24).cloned())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().map(|cache| cache.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all settled entries.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, EnrichmentEntry> {
        self.inner
            .read()
            .map(|cache| cache.entries.clone())
            .unwrap_or_default()
    }
}

/// What a sweep did before it finished or was cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Lookups issued.
    pub fetched: usize,
    /// Outcomes written to the cache.
    pub stored: usize,
    /// Whether the sweep stopped because its record set was superseded.
    pub cancelled: bool,
}

fn is_settled(cache: &SharedEnrichment, icao24: &str) -> bool {
    cache.read().map(|c| c.contains(icao24)).unwrap_or(true)
}

/// Enrich the first `sample_size` records that have no settled entry yet.
///
/// Lookups run strictly one after another. Membership is re-checked against
/// the live cache before every lookup. `is_current` is consulted before every
/// lookup and before every write; once it returns `false` the sweep stops
/// without writing anything further.
pub async fn sweep<F>(
    source: &dyn TrafficSource,
    cache: &SharedEnrichment,
    records: &[FlightRecord],
    sample_size: usize,
    is_current: F,
) -> SweepOutcome
where
    F: Fn() -> bool,
{
    let mut outcome = SweepOutcome::default();

    for record in records.iter().take(sample_size) {
        let icao24 = record.icao24.as_str();
        if icao24.is_empty() {
            continue;
        }
        if !is_current() {
            outcome.cancelled = true;
            break;
        }
        if is_settled(cache, icao24) {
            continue;
        }

        outcome.fetched += 1;
        let entry = match source.fetch_recent_flight(icao24).await {
            Ok(flight) => flight.latest.map_or(EnrichmentEntry::NoData, EnrichmentEntry::Route),
            Err(e) => {
                warn!("Recent flight lookup for {} failed: {}", icao24, e);
                EnrichmentEntry::NoData
            }
        };

        if !is_current() {
            outcome.cancelled = true;
            break;
        }

        if let Ok(mut cache) = cache.write() {
            if cache.insert_if_absent(icao24, entry) {
                outcome.stored += 1;
            }
        }
    }

    if outcome.cancelled {
        debug!(
            "Enrichment sweep superseded after {} lookups ({} stored)",
            outcome.fetched, outcome.stored
        );
    } else {
        debug!(
            "Enrichment sweep finished: {} lookups, {} stored",
            outcome.fetched, outcome.stored
        );
    }

    outcome
}
