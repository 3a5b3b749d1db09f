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

//! Command line interface.

use clap::{Args, Parser, Subcommand, ValueEnum};
use flight_feed::LayoverForm;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "flightline", version, about = "Live flight tracking from the OpenSky feed")]
pub struct Cli {
    /// Override the traffic feed API base URL
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Override the poll interval in seconds
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll the feed and print every published record set until Ctrl-C
    Watch {
        /// Click an aircraft once the first record set is published; repeat
        /// the same id to double click
        #[arg(long = "click", value_name = "ICAO24")]
        clicks: Vec<String>,

        /// Rows printed per record set
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Fetch and print the recent track of an aircraft
    Track { icao24: String },

    /// Show the latest flight of an aircraft
    Details { icao24: String },

    /// Estimate the chance of making a layover
    Layover(LayoverArgs),

    /// Search airports by code or name
    Airports { query: String },

    /// Print the config file path and effective configuration
    Config {
        /// Write the effective configuration back to disk
        #[arg(long)]
        save: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

#[derive(Args, Debug)]
pub struct LayoverArgs {
    #[arg(long, default_value = "")]
    pub departure: String,

    #[arg(long, default_value = "")]
    pub arrival: String,

    #[arg(long, default_value = "")]
    pub layover_minutes: String,

    #[arg(long, default_value = "")]
    pub seat_row: String,

    #[arg(long)]
    pub arr_terminal: Option<String>,

    #[arg(long)]
    pub dep_terminal: Option<String>,

    /// Used when the airport has no terminal list
    #[arg(long, value_enum, default_value_t = YesNo::Yes)]
    pub same_terminal: YesNo,
}

impl From<LayoverArgs> for LayoverForm {
    fn from(args: LayoverArgs) -> Self {
        Self {
            departure: args.departure,
            arrival: args.arrival,
            layover_time: args.layover_minutes,
            seat_row: args.seat_row,
            arr_terminal: args.arr_terminal,
            dep_terminal: args.dep_terminal,
            same_terminal_flag: args.same_terminal == YesNo::Yes,
        }
    }
}

impl Cli {
    /// Apply command line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(api_base) = &self.api_base {
            config.api_base_url.clone_from(api_base);
        }
        if let Some(interval) = self.poll_interval {
            config.poll_interval_secs = interval;
        }
    }
}
