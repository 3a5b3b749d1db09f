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

//! Display projections of records and enrichment entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::enrichment::EnrichmentEntry;
use crate::record::FlightRecord;
use crate::source::RouteSummary;

const MS_TO_KNOTS: f64 = 1.94384;
/// Altitude assumed for map entities that report none.
pub const DEFAULT_MAP_ALTITUDE_M: f64 = 3000.0;

const UNKNOWN: &str = "unknown";
const PLACEHOLDER: &str = "—";

fn or_unknown<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| v.to_string())
}

#[allow(clippy::cast_possible_truncation, reason = "display values are far inside i64 range")]
fn round(value: Option<f64>) -> Option<i64> {
    value.filter(|v| v.is_finite()).map(|v| v.round() as i64)
}

/// One row of the flight list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightView {
    pub icao24: String,
    pub title: String,
    /// `DEP → ARR`, only when both airports are known.
    pub route: Option<String>,
    pub country: String,
    pub altitude_m: Option<i64>,
    pub speed_kt: Option<i64>,
    pub heading_deg: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl FlightView {
    #[must_use]
    pub fn project(record: &FlightRecord, enrichment: Option<&EnrichmentEntry>) -> Self {
        let title = if !record.airline_name.is_empty() && !record.flight_number.is_empty() {
            format!("{} {}", record.airline_name, record.flight_number)
        } else {
            record.cleaned_callsign.clone()
        };

        let route = enrichment
            .and_then(EnrichmentEntry::route)
            .and_then(|r| Some(format!("{} → {}", r.origin()?, r.destination()?)));

        Self {
            icao24: record.icao24.clone(),
            title,
            route,
            country: record.country.clone(),
            altitude_m: round(record.geo_altitude.or(record.altitude)),
            speed_kt: round(record.velocity.map(|v| v * MS_TO_KNOTS)),
            heading_deg: round(record.heading),
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }

    #[must_use]
    pub fn altitude_or_zero(&self) -> i64 {
        self.altitude_m.unwrap_or(0)
    }

    #[must_use]
    pub fn speed_kt_or_zero(&self) -> i64 {
        self.speed_kt.unwrap_or(0)
    }

    /// `lat, lon` with two decimals.
    #[must_use]
    pub fn position(&self) -> String {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => format!("{lat:.2}, {lon:.2}"),
            _ => UNKNOWN.to_string(),
        }
    }
}

impl fmt::Display for FlightView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.icao24)?;
        if let Some(route) = &self.route {
            write!(f, " {route}")?;
        }
        write!(
            f,
            " | Origin country: {} | Alt: {} m | Pos: {} | Speed: {} kt | Heading: {}°",
            self.country,
            or_unknown(self.altitude_m),
            self.position(),
            or_unknown(self.speed_kt),
            or_unknown(self.heading_deg),
        )
    }
}

/// An aircraft placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapEntity {
    pub icao24: String,
    pub callsign: String,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude_m: f64,
    pub heading_deg: f64,
}

impl MapEntity {
    /// `None` when the record has no usable position.
    #[must_use]
    pub fn from_record(record: &FlightRecord) -> Option<Self> {
        let longitude = record.longitude.filter(|v| v.is_finite())?;
        let latitude = record.latitude.filter(|v| v.is_finite())?;

        let callsign = if record.callsign.is_empty() {
            "Unknown".to_string()
        } else {
            record.callsign.clone()
        };

        Some(Self {
            icao24: record.icao24.clone(),
            callsign,
            longitude,
            latitude,
            altitude_m: record
                .geo_altitude
                .or(record.altitude)
                .unwrap_or(DEFAULT_MAP_ALTITUDE_M),
            heading_deg: record.heading.unwrap_or(0.0),
        })
    }
}

/// Detail page for one aircraft's latest flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightDetailView {
    pub icao24: String,
    pub callsign: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departed: String,
    pub arrival_estimate: String,
}

fn format_epoch(seconds: Option<i64>) -> String {
    seconds
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map_or_else(
            || PLACEHOLDER.to_string(),
            |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
}

impl FlightDetailView {
    /// `None` when there is no flight to show.
    #[must_use]
    pub fn project(icao24: &str, latest: Option<&RouteSummary>) -> Option<Self> {
        let latest = latest?;
        let icao24 = if latest.icao24.trim().is_empty() {
            icao24.to_lowercase()
        } else {
            latest.icao24.clone()
        };

        Some(Self {
            icao24,
            callsign: latest
                .callsign
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(PLACEHOLDER)
                .to_string(),
            departure_airport: latest.origin().unwrap_or("Unknown").to_string(),
            arrival_airport: latest.destination().unwrap_or("Unknown").to_string(),
            departed: format_epoch(latest.first_seen),
            arrival_estimate: format_epoch(latest.last_seen),
        })
    }
}

impl fmt::Display for FlightDetailView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Flight {}", self.icao24)?;
        writeln!(f, "  Route: {} → {}", self.departure_airport, self.arrival_airport)?;
        writeln!(f, "  Departure: {}", self.departed)?;
        writeln!(f, "  Arrival (est): {}", self.arrival_estimate)?;
        write!(f, "  Callsign: {}", self.callsign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::normalize;
    use crate::test_support::{route, state_vector};
    use serde_json::json;

    fn record(raw: serde_json::Value) -> FlightRecord {
        normalize(&[serde_json::from_value(raw).unwrap()]).remove(0)
    }

    #[test]
    fn test_title_prefers_airline_and_number() {
        let united = record(json!(["abc", "UAL123"]));
        assert_eq!(FlightView::project(&united, None).title, "United Airlines 123");

        let unknown_airline = record(json!(["abc", "XYZ999"]));
        assert_eq!(FlightView::project(&unknown_airline, None).title, "XYZ999");

        let private = record(json!(["abc", "N12345 "]));
        assert_eq!(FlightView::project(&private, None).title, "N12345");
    }

    #[test]
    fn test_route_only_when_both_airports_known() {
        let rec = normalize(&[state_vector("abc", "UAL123")]).remove(0);

        let full = EnrichmentEntry::Route(route("abc", "KSFO", "KJFK"));
        assert_eq!(FlightView::project(&rec, Some(&full)).route.as_deref(), Some("KSFO → KJFK"));

        let half = EnrichmentEntry::Route(route("abc", "KSFO", ""));
        assert_eq!(FlightView::project(&rec, Some(&half)).route, None);
        assert_eq!(FlightView::project(&rec, Some(&EnrichmentEntry::NoData)).route, None);
        assert_eq!(FlightView::project(&rec, None).route, None);
    }

    #[test]
    fn test_numeric_projection() {
        let rec = normalize(&[state_vector("abc", "UAL123")]).remove(0);
        let view = FlightView::project(&rec, None);

        assert_eq!(view.altitude_m, Some(10_100));
        assert_eq!(view.speed_kt, Some(447));
        assert_eq!(view.heading_deg, Some(90));
        assert_eq!(view.position(), "33.90, -118.40");
    }

    #[test]
    fn test_missing_values_render_unknown() {
        let rec = record(json!(["abc", "UAL1", "United States", null, null, null, null, null]));
        let view = FlightView::project(&rec, None);

        assert_eq!(view.altitude_or_zero(), 0);
        assert_eq!(view.speed_kt_or_zero(), 0);
        let line = view.to_string();
        assert!(line.contains("Alt: unknown m"));
        assert!(line.contains("Speed: unknown kt"));
        assert!(line.contains("Pos: unknown"));
    }

    #[test]
    fn test_baro_altitude_fallback() {
        let rec = record(json!(["abc", "UAL1", "", 0, 0, 1.0, 2.0, 1234.6]));
        assert_eq!(FlightView::project(&rec, None).altitude_m, Some(1235));
    }

    #[test]
    fn test_map_entity_defaults() {
        let rec = record(json!(["abc", "UAL1", "", 0, 0, 1.0, 2.0]));
        let entity = MapEntity::from_record(&rec).unwrap();

        assert_eq!(entity.altitude_m, DEFAULT_MAP_ALTITUDE_M);
        assert_eq!(entity.heading_deg, 0.0);
        assert_eq!(entity.callsign, "UAL1");

        let unplaced = record(json!(["abc", "UAL1", "", 0, 0, null, 2.0]));
        assert!(MapEntity::from_record(&unplaced).is_none());
    }

    #[test]
    fn test_detail_view_placeholders() {
        let summary = RouteSummary {
            icao24: String::new(),
            callsign: Some("  ".to_string()),
            origin_airport: None,
            dest_airport: Some("KJFK".to_string()),
            first_seen: Some(0),
            last_seen: None,
        };

        let detail = FlightDetailView::project("ABC123", Some(&summary)).unwrap();

        assert_eq!(detail.icao24, "abc123");
        assert_eq!(detail.callsign, "—");
        assert_eq!(detail.departure_airport, "Unknown");
        assert_eq!(detail.arrival_airport, "KJFK");
        assert_eq!(detail.departed, "1970-01-01 00:00:00 UTC");
        assert_eq!(detail.arrival_estimate, "—");
        assert!(FlightDetailView::project("abc123", None).is_none());
    }
}
