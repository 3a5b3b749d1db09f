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

//! Traffic source contract and wire types.
//!
//! The pipeline only talks to the outside world through [`TrafficSource`].
//! The shapes here mirror what the live traffic feed delivers: state vectors
//! are positional arrays whose fields may be null, route lookups may come back
//! empty, and tracks are sequences of `[time, lon, lat, baro_altitude]` samples.

pub mod opensky;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while talking to a traffic source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

// Field positions inside a state vector as delivered by the feed.
const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_VELOCITY: usize = 9;
const IDX_TRUE_TRACK: usize = 10;
const IDX_GEO_ALTITUDE: usize = 13;
const IDX_SQUAWK: usize = 14;

/// One aircraft's state vector: a fixed-position array of heterogeneous fields.
///
/// Accessors never fail. A field that is missing, null or of the wrong type
/// reads as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RawStateVector(pub Vec<Value>);

impl RawStateVector {
    fn str_at(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).and_then(Value::as_str)
    }

    fn f64_at(&self, idx: usize) -> Option<f64> {
        self.0.get(idx).and_then(Value::as_f64)
    }

    #[must_use]
    pub fn icao24(&self) -> Option<&str> {
        self.str_at(IDX_ICAO24)
    }

    #[must_use]
    pub fn callsign(&self) -> Option<&str> {
        self.str_at(IDX_CALLSIGN)
    }

    #[must_use]
    pub fn origin_country(&self) -> Option<&str> {
        self.str_at(IDX_ORIGIN_COUNTRY)
    }

    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.f64_at(IDX_LONGITUDE)
    }

    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.f64_at(IDX_LATITUDE)
    }

    /// Barometric altitude in meters.
    #[must_use]
    pub fn baro_altitude(&self) -> Option<f64> {
        self.f64_at(IDX_BARO_ALTITUDE)
    }

    /// Ground speed in m/s.
    #[must_use]
    pub fn velocity(&self) -> Option<f64> {
        self.f64_at(IDX_VELOCITY)
    }

    /// True track in degrees clockwise from north.
    #[must_use]
    pub fn true_track(&self) -> Option<f64> {
        self.f64_at(IDX_TRUE_TRACK)
    }

    /// Geometric altitude in meters.
    #[must_use]
    pub fn geo_altitude(&self) -> Option<f64> {
        self.f64_at(IDX_GEO_ALTITUDE)
    }

    #[must_use]
    pub fn squawk(&self) -> Option<&str> {
        self.str_at(IDX_SQUAWK)
    }
}

impl From<Vec<Value>> for RawStateVector {
    fn from(fields: Vec<Value>) -> Self {
        Self(fields)
    }
}

/// Route summary for an aircraft's most recent flight.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteSummary {
    pub icao24: String,

    #[serde(default)]
    pub callsign: Option<String>,

    #[serde(rename = "estDepartureAirport", default)]
    pub origin_airport: Option<String>,

    #[serde(rename = "estArrivalAirport", default)]
    pub dest_airport: Option<String>,

    /// Unix seconds.
    #[serde(rename = "firstSeen", default)]
    pub first_seen: Option<i64>,

    /// Unix seconds.
    #[serde(rename = "lastSeen", default)]
    pub last_seen: Option<i64>,
}

impl RouteSummary {
    /// Origin airport, if present and non-blank.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        non_blank(self.origin_airport.as_deref())
    }

    /// Destination airport, if present and non-blank.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        non_blank(self.dest_airport.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Result of a recent-flight lookup. `latest` is `None` when the source has
/// no flight on record for the aircraft.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RecentFlight {
    pub latest: Option<RouteSummary>,
}

/// A single historical position of an aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackSample {
    /// Unix seconds.
    pub time: i64,
    pub lon: f64,
    pub lat: f64,
    /// Barometric altitude in meters.
    pub baro_altitude: Option<f64>,
}

impl TrackSample {
    #[must_use]
    pub fn new(time: i64, lon: f64, lat: f64, baro_altitude: Option<f64>) -> Self {
        Self {
            time,
            lon,
            lat,
            baro_altitude,
        }
    }
}

/// Time-ordered positions of one aircraft over a bounded lookback window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub icao24: String,
    pub path: Vec<TrackSample>,
}

/// External traffic source consumed by the pipeline.
///
/// Every call is a suspension point. Implementations must not panic on
/// malformed upstream data; they report it as [`SourceError::Decode`].
#[async_trait]
pub trait TrafficSource: Send + Sync {
    /// Fetch the current state vectors of all visible aircraft.
    async fn fetch_state_vectors(&self) -> Result<Vec<RawStateVector>, SourceError>;

    /// Fetch the most recent flight (route summary) of one aircraft.
    async fn fetch_recent_flight(&self, icao24: &str) -> Result<RecentFlight, SourceError>;

    /// Fetch the position track of one aircraft over the given lookback.
    async fn fetch_track(&self, icao24: &str, lookback: Duration) -> Result<Track, SourceError>;
}
