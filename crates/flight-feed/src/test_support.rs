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

//! In-memory traffic source for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::source::{
    RawStateVector, RecentFlight, RouteSummary, SourceError, Track, TrackSample, TrafficSource,
};

/// Scripted responses; failures are given as HTTP status codes.
#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    states: Mutex<VecDeque<(Duration, Result<Vec<RawStateVector>, u16>)>>,
    routes: Mutex<HashMap<String, Result<Option<RouteSummary>, u16>>>,
    tracks: Mutex<VecDeque<(Duration, Result<Vec<TrackSample>, u16>)>>,
    route_delay: Mutex<Duration>,
    pub recent_calls: Mutex<Vec<String>>,
    pub track_calls: Mutex<Vec<(String, Duration)>>,
}

impl FakeSource {
    pub fn push_states(&self, delay: Duration, states: Result<Vec<RawStateVector>, u16>) {
        self.states.lock().unwrap().push_back((delay, states));
    }

    pub fn set_route(&self, icao24: &str, route: Result<Option<RouteSummary>, u16>) {
        self.routes.lock().unwrap().insert(icao24.to_string(), route);
    }

    /// Delay applied to every recent flight lookup.
    pub fn set_route_delay(&self, delay: Duration) {
        *self.route_delay.lock().unwrap() = delay;
    }

    pub fn push_track(&self, delay: Duration, path: Result<Vec<TrackSample>, u16>) {
        self.tracks.lock().unwrap().push_back((delay, path));
    }

    pub fn recent_call_count(&self) -> usize {
        self.recent_calls.lock().unwrap().len()
    }

    pub fn track_call_count(&self) -> usize {
        self.track_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TrafficSource for FakeSource {
    async fn fetch_state_vectors(&self) -> Result<Vec<RawStateVector>, SourceError> {
        let next = self.states.lock().unwrap().pop_front();
        let (delay, result) = next.unwrap_or((Duration::ZERO, Ok(Vec::new())));
        tokio::time::sleep(delay).await;
        result.map_err(SourceError::Status)
    }

    async fn fetch_recent_flight(&self, icao24: &str) -> Result<RecentFlight, SourceError> {
        self.recent_calls.lock().unwrap().push(icao24.to_string());
        let route = self.routes.lock().unwrap().get(icao24).cloned().unwrap_or(Ok(None));
        let delay = *self.route_delay.lock().unwrap();
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
        route
            .map(|latest| RecentFlight { latest })
            .map_err(SourceError::Status)
    }

    async fn fetch_track(&self, icao24: &str, lookback: Duration) -> Result<Track, SourceError> {
        self.track_calls.lock().unwrap().push((icao24.to_string(), lookback));
        let next = self.tracks.lock().unwrap().pop_front();
        let (delay, result) = next.unwrap_or((Duration::ZERO, Ok(Vec::new())));
        tokio::time::sleep(delay).await;
        result
            .map(|path| Track {
                icao24: icao24.to_string(),
                path,
            })
            .map_err(SourceError::Status)
    }
}

pub(crate) fn state_vector(icao24: &str, callsign: &str) -> RawStateVector {
    serde_json::from_value(json!([
        icao24, callsign, "United States", 0, 0, -118.4, 33.9, 10_000.0, false, 230.0, 90.0, 0.0,
        null, 10_100.0, "1200"
    ]))
    .unwrap()
}

pub(crate) fn route(icao24: &str, from: &str, to: &str) -> RouteSummary {
    RouteSummary {
        icao24: icao24.to_string(),
        callsign: Some("UAL123".to_string()),
        origin_airport: Some(from.to_string()),
        dest_airport: Some(to.to_string()),
        first_seen: Some(1_700_000_000),
        last_seen: Some(1_700_003_600),
    }
}
