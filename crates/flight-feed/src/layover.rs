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

//! Layover probability requests.
//!
//! Form input is validated locally before anything touches the network. A
//! valid form costs exactly one terminal lookup, at most one walk lookup and
//! exactly one prediction request. Airport search is separate and only feeds
//! the airport fields of the form.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::SourceError;

pub const MIN_LAYOVER_MINUTES: i64 = 10;
pub const MIN_SEAT_ROW: i64 = 1;

const MCT_MINUTES: u32 = 45;
const DEFAULT_AIRLINE_OTP: f64 = 0.8;
const TIME_OF_DAY: u32 = 14;
const DAY_OF_WEEK: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select both departure and arrival airports.")]
    MissingAirport,

    #[error("Layover must be at least 10 minutes.")]
    LayoverTooShort,

    #[error("Seat row must be 1 or higher.")]
    InvalidSeatRow,
}

#[derive(Debug, Error)]
pub enum LayoverError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Prediction service unavailable: {0}")]
    Source(#[from] SourceError),
}

/// User input, as entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoverForm {
    pub departure: String,
    pub arrival: String,
    pub layover_time: String,
    pub seat_row: String,
    pub arr_terminal: Option<String>,
    pub dep_terminal: Option<String>,
    /// Used only when no real terminal list exists for the airport.
    pub same_terminal_flag: bool,
}

impl Default for LayoverForm {
    fn default() -> Self {
        Self {
            departure: String::new(),
            arrival: String::new(),
            layover_time: String::new(),
            seat_row: String::new(),
            arr_terminal: None,
            dep_terminal: None,
            same_terminal_flag: true,
        }
    }
}

/// Validated form values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedInput {
    pub connection_minutes: i64,
    pub seat_row: i64,
}

/// Parse the leading integer of `input`, ignoring leading whitespace and any
/// trailing non-digits (`"45min"` is 45). `None` when no digits lead.
#[must_use]
pub fn parse_leading_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl LayoverForm {
    /// Check the form without any network access.
    pub fn validate(&self) -> Result<ValidatedInput, ValidationError> {
        if self.departure.trim().is_empty() || self.arrival.trim().is_empty() {
            return Err(ValidationError::MissingAirport);
        }

        let connection_minutes = parse_leading_int(&self.layover_time)
            .filter(|m| *m >= MIN_LAYOVER_MINUTES)
            .ok_or(ValidationError::LayoverTooShort)?;
        let seat_row = parse_leading_int(&self.seat_row)
            .filter(|r| *r >= MIN_SEAT_ROW)
            .ok_or(ValidationError::InvalidSeatRow)?;

        Ok(ValidatedInput {
            connection_minutes,
            seat_row,
        })
    }

    fn terminals(&self) -> Option<(&str, &str)> {
        Some((non_empty(self.arr_terminal.as_ref())?, non_empty(self.dep_terminal.as_ref())?))
    }

    /// Same-terminal flag for the prediction. With a real terminal list it is
    /// derived from the chosen terminals, otherwise the user's answer is used.
    #[must_use]
    pub fn same_terminal(&self, has_real_terminal_list: bool) -> bool {
        if has_real_terminal_list {
            self.terminals().is_some_and(|(arr, dep)| arr == dep)
        } else {
            self.same_terminal_flag
        }
    }
}

/// Prediction request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoverRequest {
    pub connection_minutes: i64,
    pub seat_row: i64,
    pub walking_minutes: f64,
    pub mct_minutes: u32,
    pub same_terminal: u8,
    pub dep_otp_airline: f64,
    pub arr_otp_airline: f64,
    pub time_of_day: u32,
    pub dow: u32,
}

impl LayoverRequest {
    #[must_use]
    pub fn new(input: ValidatedInput, walking_minutes: f64, same_terminal: bool) -> Self {
        Self {
            connection_minutes: input.connection_minutes,
            seat_row: input.seat_row,
            walking_minutes,
            mct_minutes: MCT_MINUTES,
            same_terminal: u8::from(same_terminal),
            dep_otp_airline: DEFAULT_AIRLINE_OTP,
            arr_otp_airline: DEFAULT_AIRLINE_OTP,
            time_of_day: TIME_OF_DAY,
            dow: DAY_OF_WEEK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayoverPrediction {
    #[serde(default)]
    pub probability_make_layover: Option<f64>,
}

/// Terminal options for an airport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalList {
    pub terminals: Vec<String>,
    /// Fetched successfully and non-empty.
    pub is_real: bool,
}

/// An airport offered for the departure or arrival field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AirportOption {
    pub iata: String,
    #[serde(default)]
    pub name: String,
}

impl AirportOption {
    /// `IATA - Name`, as shown in the airport picker.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} - {}", self.iata, self.name)
    }
}

/// A prediction together with the terminal list it was computed against.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoverOutcome {
    pub prediction: LayoverPrediction,
    pub terminals: TerminalList,
}

/// Backend services used to answer a layover request.
#[async_trait]
pub trait LayoverService: Send + Sync {
    /// Airports matching a free-text query.
    async fn airports(&self, query: &str) -> Result<Vec<AirportOption>, SourceError>;

    /// Walking time between two terminals of an airport.
    async fn walking_minutes(&self, airport: &str, from: &str, to: &str) -> Result<f64, SourceError>;

    async fn terminals(&self, airport: &str) -> Result<Vec<String>, SourceError>;

    async fn predict(&self, request: &LayoverRequest) -> Result<LayoverPrediction, SourceError>;
}

/// Airports matching `query`. A blank query issues no request and a failed
/// lookup yields no options.
pub async fn search_airports(service: &dyn LayoverService, query: &str) -> Vec<AirportOption> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    service.airports(query).await.unwrap_or_else(|e| {
        debug!("Airport search for {:?} failed: {}", query, e);
        Vec::new()
    })
}

pub async fn terminal_list_for(service: &dyn LayoverService, airport: &str) -> TerminalList {
    match service.terminals(airport).await {
        Ok(terminals) if !terminals.is_empty() => TerminalList {
            terminals,
            is_real: true,
        },
        Ok(_) => TerminalList::default(),
        Err(e) => {
            debug!("Terminal lookup for {} failed: {}", airport, e);
            TerminalList::default()
        }
    }
}

/// Validate the form and request a layover prediction.
///
/// The terminal list of the departure airport is fetched once and returned
/// with the prediction.
pub async fn submit_layover(
    service: &dyn LayoverService,
    form: &LayoverForm,
) -> Result<LayoverOutcome, LayoverError> {
    let input = form.validate()?;
    let departure = form.departure.trim();

    let terminal_list = terminal_list_for(service, departure).await;

    let walking_minutes = match form.terminals() {
        Some((from, to)) => service
            .walking_minutes(departure, from, to)
            .await
            .unwrap_or_else(|e| {
                warn!("Walk lookup at {} failed: {}", departure, e);
                0.0
            }),
        None => 0.0,
    };

    let request = LayoverRequest::new(input, walking_minutes, form.same_terminal(terminal_list.is_real));
    info!(
        "Requesting layover prediction: {} min, row {}",
        request.connection_minutes, request.seat_row
    );

    let prediction = service.predict(&request).await?;
    Ok(LayoverOutcome {
        prediction,
        terminals: terminal_list,
    })
}

#[derive(Debug, Deserialize)]
struct WalkResponse {
    #[serde(default)]
    minutes: Option<f64>,
}

/// HTTP implementation of [`LayoverService`].
#[derive(Debug, Clone)]
pub struct LayoverClient {
    http: reqwest::Client,
    api_base: String,
    prediction_url: String,
}

impl LayoverClient {
    pub fn new(
        api_base: impl Into<String>,
        prediction_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            prediction_url: prediction_url.into(),
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, SourceError> {
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LayoverService for LayoverClient {
    async fn airports(&self, query: &str) -> Result<Vec<AirportOption>, SourceError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .get(format!("{}/airports", self.api_base))
            .query(&[("q", query)])
            .send()
            .await?;
        if !response.status().is_success() {
            debug!("Airport search answered {}", response.status());
            return Ok(Vec::new());
        }
        Self::decode(response).await
    }

    async fn walking_minutes(&self, airport: &str, from: &str, to: &str) -> Result<f64, SourceError> {
        let response = self
            .http
            .get(format!("{}/airport-walk", self.api_base))
            .query(&[("airport", airport), ("from", from), ("to", to)])
            .send()
            .await?;
        let walk: WalkResponse = Self::decode(response).await?;
        Ok(walk.minutes.unwrap_or(0.0))
    }

    async fn terminals(&self, airport: &str) -> Result<Vec<String>, SourceError> {
        let response = self
            .http
            .get(format!("{}/terminals", self.api_base))
            .query(&[("airport", airport)])
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn predict(&self, request: &LayoverRequest) -> Result<LayoverPrediction, SourceError> {
        let response = self.http.post(&self.prediction_url).json(request).send().await?;
        Self::decode(response).await
    }
}
