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

//! State vector normalization.
//!
//! Turns the positional state vectors of one poll cycle into typed
//! [`FlightRecord`]s. Records are rebuilt wholesale every cycle and are never
//! mutated afterwards.

use log::debug;
use serde::Serialize;

use crate::callsign::{airline_name, parse_callsign};
use crate::source::RawStateVector;

/// One aircraft as published to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightRecord {
    /// Position in the published record set, starting at 0.
    pub id: usize,
    /// Lower-cased ICAO 24-bit address. Sole key for enrichment and tracks.
    pub icao24: String,
    /// Trimmed callsign, never empty.
    pub callsign: String,
    pub cleaned_callsign: String,
    pub airline_icao: String,
    /// Empty when the operator prefix is unknown.
    pub airline_name: String,
    /// Empty when the callsign has no operator prefix.
    pub flight_number: String,
    pub country: String,
    /// Degrees.
    pub longitude: Option<f64>,
    /// Degrees.
    pub latitude: Option<f64>,
    /// Barometric altitude in meters.
    pub altitude: Option<f64>,
    /// Geometric altitude in meters.
    pub geo_altitude: Option<f64>,
    /// Ground speed in m/s.
    pub velocity: Option<f64>,
    /// Degrees clockwise from north.
    pub heading: Option<f64>,
    pub squawk: String,
}

impl FlightRecord {
    /// Build a record from a state vector.
    ///
    /// Returns `None` when the callsign is missing or blank, since such an
    /// aircraft can be neither displayed nor correlated.
    #[must_use]
    pub fn from_state_vector(id: usize, raw: &RawStateVector) -> Option<Self> {
        let callsign = raw.callsign().map(str::trim).filter(|c| !c.is_empty())?;
        let parsed = parse_callsign(callsign);
        let airline_name = airline_name(&parsed.airline_icao).unwrap_or_default();

        Some(Self {
            id,
            icao24: raw.icao24().map(|s| s.trim().to_lowercase()).unwrap_or_default(),
            callsign: callsign.to_string(),
            cleaned_callsign: parsed.cleaned_callsign,
            airline_icao: parsed.airline_icao,
            airline_name: airline_name.to_string(),
            flight_number: parsed.flight_number,
            country: raw.origin_country().unwrap_or_default().to_string(),
            longitude: raw.longitude(),
            latitude: raw.latitude(),
            altitude: raw.baro_altitude(),
            geo_altitude: raw.geo_altitude(),
            velocity: raw.velocity(),
            heading: raw.true_track(),
            squawk: raw.squawk().unwrap_or_default().to_string(),
        })
    }
}

/// Normalize one poll cycle's state vectors.
///
/// Order is preserved and ids are reassigned sequentially over the kept
/// records. Entries without a usable callsign are dropped; no other field is
/// required.
#[must_use]
pub fn normalize(raw: &[RawStateVector]) -> Vec<FlightRecord> {
    let records: Vec<FlightRecord> = raw
        .iter()
        .filter(|sv| sv.callsign().is_some_and(|c| !c.trim().is_empty()))
        .enumerate()
        .filter_map(|(id, sv)| FlightRecord::from_state_vector(id, sv))
        .collect();

    let dropped = raw.len() - records.len();
    if dropped > 0 {
        debug!("Dropped {} of {} state vectors without callsign", dropped, raw.len());
    }

    records
}
