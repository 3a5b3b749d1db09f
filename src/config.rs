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

//! Application configuration management.
//!
//! Configuration is stored as TOML through `confy`. Every field has a serde
//! default so older or hand-edited files keep loading as new fields appear.

use std::time::Duration;

use flight_feed::{DoubleClickPolicy, FeedConfig, OverlayConfig};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "flightline";
const CONFIG_NAME: &str = "config";

/// Default OpenSky API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://opensky-network.org/api";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Traffic feed API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Seconds between poll cycles
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Records enriched per poll cycle
    #[serde(default = "default_enrichment_sample_size")]
    pub enrichment_sample_size: usize,

    #[serde(default = "default_track_lookback_hours")]
    pub track_lookback_hours: u64,

    /// Maximum gap between two clicks of a double click
    #[serde(default = "default_double_click_window_ms")]
    pub double_click_window_ms: u64,

    #[serde(default)]
    pub double_click_policy: DoubleClickPolicy,

    /// How far back the recent-flight lookup searches
    #[serde(default = "default_recent_flight_lookback_hours")]
    pub recent_flight_lookback_hours: u64,

    /// Layover prediction endpoint
    #[serde(default = "default_prediction_url")]
    pub prediction_url: String,

    /// Base URL for airport search, terminal and walking-time lookups
    #[serde(default = "default_layover_api_base")]
    pub layover_api_base: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_enrichment_sample_size() -> usize {
    10
}

fn default_track_lookback_hours() -> u64 {
    12
}

fn default_double_click_window_ms() -> u64 {
    400
}

fn default_recent_flight_lookback_hours() -> u64 {
    48
}

fn default_prediction_url() -> String {
    "http://localhost:8000/predict".to_string()
}

fn default_layover_api_base() -> String {
    "http://localhost:3001/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            api_base_url: default_api_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            enrichment_sample_size: default_enrichment_sample_size(),
            track_lookback_hours: default_track_lookback_hours(),
            double_click_window_ms: default_double_click_window_ms(),
            double_click_policy: DoubleClickPolicy::default(),
            recent_flight_lookback_hours: default_recent_flight_lookback_hours(),
            prediction_url: default_prediction_url(),
            layover_api_base: default_layover_api_base(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn recent_flight_lookback(&self) -> Duration {
        Duration::from_secs(self.recent_flight_lookback_hours.saturating_mul(3600))
    }

    /// Scheduler settings. A zero interval is raised to one second.
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            enrichment_sample_size: self.enrichment_sample_size,
        }
    }

    pub fn overlay_config(&self) -> OverlayConfig {
        OverlayConfig {
            double_click_window: Duration::from_millis(self.double_click_window_ms),
            double_click_policy: self.double_click_policy,
            track_lookback: Duration::from_secs(self.track_lookback_hours.saturating_mul(3600)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.double_click_policy, DoubleClickPolicy::SameAircraft);
    }

    #[test]
    fn test_policy_names() {
        let config: AppConfig =
            serde_json::from_str(r#"{"double_click_policy": "any_aircraft"}"#).unwrap();
        assert_eq!(config.double_click_policy, DoubleClickPolicy::AnyAircraft);
    }

    #[test]
    fn test_library_configs() {
        let config = AppConfig {
            poll_interval_secs: 0,
            ..AppConfig::default()
        };

        assert_eq!(config.feed_config().poll_interval, Duration::from_secs(1));
        assert_eq!(config.feed_config().enrichment_sample_size, 10);

        let overlay = config.overlay_config();
        assert_eq!(overlay.double_click_window, Duration::from_millis(400));
        assert_eq!(overlay.track_lookback, Duration::from_secs(43_200));
        assert_eq!(config.recent_flight_lookback(), Duration::from_secs(172_800));
    }

    #[test]
    fn test_huge_lookbacks_saturate() {
        let config = AppConfig {
            track_lookback_hours: u64::MAX,
            recent_flight_lookback_hours: u64::MAX / 2,
            ..AppConfig::default()
        };

        assert_eq!(config.overlay_config().track_lookback, Duration::from_secs(u64::MAX));
        assert_eq!(config.recent_flight_lookback(), Duration::from_secs(u64::MAX));
    }
}
