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

//! Live flight-state aggregation, enrichment and track overlay pipeline.
//!
//! This library polls a live traffic feed for aircraft state vectors, turns
//! them into typed [`FlightRecord`]s, opportunistically enriches a bounded
//! sample with route information and arbitrates viewport clicks into track
//! overlays and detail navigation. It is organised in layers that can be used
//! on their own or wired together:
//!
//! - **Source layer**: the [`TrafficSource`] contract and the HTTP-backed
//!   [`OpenSkyClient`]
//! - **Record layer**: state vector normalization and callsign resolution
//! - **Pipeline layer**: the [`PollingScheduler`] with its epoch-guarded
//!   publication and the enrichment sweep
//! - **Interaction layer**: gesture arbitration and the track overlay
//! - **View layer**: pure projections from records to display rows
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use flight_feed::{FeedConfig, OpenSkyClient, PollingScheduler};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = OpenSkyClient::new("https://opensky-network.org/api", Duration::from_secs(20))
//!         .expect("http client");
//!     let feed = PollingScheduler::spawn(Arc::new(source), FeedConfig::default());
//!
//!     let mut updates = feed.subscribe();
//!     while updates.changed().await.is_ok() {
//!         let snapshot = updates.borrow_and_update().clone();
//!         println!("{} flights (epoch {})", snapshot.records.len(), snapshot.epoch);
//!     }
//! }
//! ```
//!
//! # Using Individual Layers
//!
//! ```
//! use flight_feed::record::normalize;
//! use flight_feed::source::RawStateVector;
//!
//! let raw: Vec<RawStateVector> = serde_json::from_str(
//!     r#"[["a1b2c3", "UAL123  ", "United States", 0, 0, -118.4, 33.9, 10000.0, false, 230.0, 90.0]]"#,
//! ).unwrap();
//!
//! let records = normalize(&raw);
//! assert_eq!(records[0].airline_name, "United Airlines");
//! ```

pub mod callsign;
pub mod enrichment;
pub mod layover;
pub mod overlay;
pub mod record;
pub mod scheduler;
pub mod source;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

pub use callsign::{airline_name, parse_callsign, ParsedCallsign};
pub use enrichment::{EnrichmentCache, EnrichmentEntry, EnrichmentView, SweepOutcome};
pub use layover::{
    search_airports, submit_layover, terminal_list_for, AirportOption, LayoverClient,
    LayoverError, LayoverForm, LayoverOutcome, LayoverPrediction, LayoverRequest, LayoverService,
    TerminalList, ValidationError,
};
pub use overlay::{
    ActiveOverlay, ClickOutcome, DoubleClickPolicy, Gesture, GestureArbiter, NavigationRequest,
    OverlayConfig, TrackFetchOutcome, TrackOverlay, TrackOverlayController, ViewportEvent,
};
pub use record::{normalize, FlightRecord};
pub use scheduler::{FeedConfig, FeedHandle, FeedSnapshot, PollingScheduler};
pub use source::opensky::OpenSkyClient;
pub use source::{
    RawStateVector, RecentFlight, RouteSummary, SourceError, Track, TrackSample, TrafficSource,
};
pub use view::{FlightDetailView, FlightView, MapEntity};
