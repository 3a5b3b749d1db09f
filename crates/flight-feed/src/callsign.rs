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

//! Callsign decomposition and airline name lookup.
//!
//! Airline callsigns are a 2-3 letter operator prefix followed by a flight
//! number (`UAL123`, `DLH4AB`). General aviation traffic typically squawks its
//! registration instead (`N12345`, `GABCD`), which has no operator prefix.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref AIRLINE_CALLSIGN_RE: Regex = Regex::new(r"^([A-Z]{2,3})(\d[A-Z0-9]*)$").unwrap();

    static ref AIRLINES: HashMap<&'static str, &'static str> = [
        ("AAL", "American Airlines"),
        ("ACA", "Air Canada"),
        ("AFR", "Air France"),
        ("AIC", "Air India"),
        ("ANA", "All Nippon Airways"),
        ("ASA", "Alaska Airlines"),
        ("AUA", "Austrian Airlines"),
        ("AVA", "Avianca"),
        ("AZA", "ITA Airways"),
        ("BAW", "British Airways"),
        ("CCA", "Air China"),
        ("CES", "China Eastern Airlines"),
        ("CPA", "Cathay Pacific"),
        ("CSN", "China Southern Airlines"),
        ("DAL", "Delta Air Lines"),
        ("DLH", "Lufthansa"),
        ("EIN", "Aer Lingus"),
        ("EJA", "NetJets"),
        ("ETD", "Etihad Airways"),
        ("EZY", "easyJet"),
        ("FDX", "FedEx"),
        ("FFT", "Frontier Airlines"),
        ("IBE", "Iberia"),
        ("JAL", "Japan Airlines"),
        ("JBU", "JetBlue"),
        ("KAL", "Korean Air"),
        ("KLM", "KLM Royal Dutch Airlines"),
        ("NKS", "Spirit Airlines"),
        ("QFA", "Qantas"),
        ("QTR", "Qatar Airways"),
        ("RYR", "Ryanair"),
        ("SAS", "Scandinavian Airlines"),
        ("SIA", "Singapore Airlines"),
        ("SKW", "SkyWest Airlines"),
        ("SWA", "Southwest Airlines"),
        ("SWR", "Swiss International Air Lines"),
        ("THY", "Turkish Airlines"),
        ("UAE", "Emirates"),
        ("UAL", "United Airlines"),
        ("UPS", "UPS Airlines"),
        ("VIR", "Virgin Atlantic"),
        ("VOZ", "Virgin Australia"),
        ("WJA", "WestJet"),
        ("WZZ", "Wizz Air"),
    ]
    .into_iter()
    .collect();
}

/// Components derived from a raw callsign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCallsign {
    /// Operator prefix, empty when the callsign has none.
    pub airline_icao: String,
    /// Flight number suffix, empty when the callsign has no operator prefix.
    pub flight_number: String,
    /// Upper-cased callsign without internal whitespace.
    pub cleaned_callsign: String,
}

/// Split a callsign into operator prefix and flight number.
///
/// Never fails: empty input, registrations and purely numeric identifiers
/// yield an empty prefix and flight number with the cleaned callsign intact.
#[must_use]
pub fn parse_callsign(raw: &str) -> ParsedCallsign {
    let cleaned: String = raw
        .split_whitespace()
        .collect::<String>()
        .to_uppercase();

    match AIRLINE_CALLSIGN_RE.captures(&cleaned) {
        Some(caps) => {
            let airline_icao = caps[1].to_string();
            let flight_number = caps[2].to_string();
            ParsedCallsign {
                cleaned_callsign: format!("{airline_icao}{flight_number}"),
                airline_icao,
                flight_number,
            }
        }
        None => ParsedCallsign {
            airline_icao: String::new(),
            flight_number: String::new(),
            cleaned_callsign: cleaned,
        },
    }
}

/// Human-readable airline name for an operator prefix.
#[must_use]
pub fn airline_name(airline_icao: &str) -> Option<&'static str> {
    if airline_icao.is_empty() {
        return None;
    }
    AIRLINES.get(airline_icao.to_uppercase().as_str()).copied()
}
