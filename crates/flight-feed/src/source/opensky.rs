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

//! OpenSky Network REST client.
//!
//! Implements [`TrafficSource`] against the public OpenSky API:
//! `/states/all` for live state vectors, `/flights/aircraft` for the most
//! recent flight of an aircraft and `/tracks/all` for its position track.
//! OpenSky answers 404 when it has no data for a query, which is reported
//! as an empty result rather than an error.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{
    RawStateVector, RecentFlight, RouteSummary, SourceError, Track, TrackSample, TrafficSource,
};

/// Default lookback for the recent-flight query.
pub const DEFAULT_RECENT_FLIGHT_LOOKBACK: Duration = Duration::from_secs(48 * 3600);

#[derive(Debug, Deserialize)]
struct StatesResponse {
    states: Option<Vec<RawStateVector>>,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    icao24: Option<String>,
    #[serde(default)]
    path: Vec<Vec<Value>>,
}

/// HTTP client for the OpenSky Network API.
#[derive(Debug, Clone)]
pub struct OpenSkyClient {
    http: reqwest::Client,
    base_url: String,
    recent_flight_lookback: Duration,
}

impl OpenSkyClient {
    /// Create a client for the given API base URL (e.g. `https://opensky-network.org/api`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            recent_flight_lookback: DEFAULT_RECENT_FLIGHT_LOOKBACK,
        })
    }

    /// Override how far back the recent-flight query searches.
    #[must_use]
    pub fn with_recent_flight_lookback(mut self, lookback: Duration) -> Self {
        self.recent_flight_lookback = lookback;
        self
    }

    /// GET a JSON document. Returns `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self.http.get(&url).query(query).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TrafficSource for OpenSkyClient {
    async fn fetch_state_vectors(&self) -> Result<Vec<RawStateVector>, SourceError> {
        let response: Option<StatesResponse> = self.get_json("/states/all", &[]).await?;
        Ok(response.and_then(|r| r.states).unwrap_or_default())
    }

    async fn fetch_recent_flight(&self, icao24: &str) -> Result<RecentFlight, SourceError> {
        let end = Utc::now().timestamp();
        let lookback = i64::try_from(self.recent_flight_lookback.as_secs()).unwrap_or(i64::MAX);
        let begin = end.saturating_sub(lookback);

        let flights: Option<Vec<RouteSummary>> = self
            .get_json(
                "/flights/aircraft",
                &[
                    ("icao24", icao24.to_lowercase()),
                    ("begin", begin.to_string()),
                    ("end", end.to_string()),
                ],
            )
            .await?;

        let latest = flights
            .unwrap_or_default()
            .into_iter()
            .max_by_key(|f| f.last_seen.or(f.first_seen).unwrap_or(i64::MIN));

        Ok(RecentFlight { latest })
    }

    async fn fetch_track(&self, icao24: &str, lookback: Duration) -> Result<Track, SourceError> {
        let icao24 = icao24.to_lowercase();
        let response: Option<TrackResponse> = self
            .get_json("/tracks/all", &[("icao24", icao24.clone()), ("time", "0".to_string())])
            .await?;

        let Some(response) = response else {
            return Ok(Track {
                icao24,
                path: Vec::new(),
            });
        };

        let lookback = i64::try_from(lookback.as_secs()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp().saturating_sub(lookback);
        let path = response
            .path
            .iter()
            .filter_map(|waypoint| parse_waypoint(waypoint))
            .filter(|sample| sample.time >= cutoff)
            .collect();

        Ok(Track {
            icao24: response.icao24.unwrap_or(icao24),
            path,
        })
    }
}

/// OpenSky waypoints are `[time, latitude, longitude, baro_altitude, true_track, on_ground]`.
fn parse_waypoint(waypoint: &[Value]) -> Option<TrackSample> {
    let time = waypoint.first()?.as_i64()?;
    let lat = waypoint.get(1)?.as_f64()?;
    let lon = waypoint.get(2)?.as_f64()?;
    let baro_altitude = waypoint.get(3).and_then(Value::as_f64);
    Some(TrackSample::new(time, lon, lat, baro_altitude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_waypoint_reorders_lat_lon() {
        let waypoint = vec![json!(1_700_000_000), json!(33.9), json!(-118.4), json!(1200.0), json!(90.0), json!(false)];
        let sample = parse_waypoint(&waypoint).unwrap();

        assert_eq!(sample, TrackSample::new(1_700_000_000, -118.4, 33.9, Some(1200.0)));
    }

    #[test]
    fn test_parse_waypoint_missing_altitude() {
        let waypoint = vec![json!(10), json!(1.0), json!(2.0), Value::Null];
        let sample = parse_waypoint(&waypoint).unwrap();
        assert_eq!(sample.baro_altitude, None);
    }

    #[test]
    fn test_parse_waypoint_rejects_missing_position() {
        assert!(parse_waypoint(&[json!(10), Value::Null, json!(2.0)]).is_none());
        assert!(parse_waypoint(&[]).is_none());
    }

    #[test]
    fn test_states_response_with_null_states() {
        let response: StatesResponse = serde_json::from_value(json!({"time": 1, "states": null})).unwrap();
        assert!(response.states.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenSkyClient::new("https://example.org/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "https://example.org/api");
    }
}
