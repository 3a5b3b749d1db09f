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

mod cli;
mod config;
mod console;

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use flight_feed::{
    search_airports, submit_layover, FlightDetailView, LayoverClient, LayoverError, LayoverForm,
    LayoverOutcome, OpenSkyClient, PollingScheduler, TrackFetchOutcome, TrackOverlayController,
    TrafficSource, ViewportEvent,
};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Command};
use config::AppConfig;

type CommandResult = Result<(), Box<dyn Error>>;

#[tokio::main]
async fn main() -> CommandResult {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    cli.apply_overrides(&mut config);

    match cli.command {
        Command::Watch { clicks, limit } => watch(&config, clicks, limit).await,
        Command::Track { icao24 } => track(&config, &icao24).await,
        Command::Details { icao24 } => {
            let source = traffic_source(&config)?;
            show_details(source.as_ref(), &icao24).await;
            Ok(())
        }
        Command::Layover(args) => layover(&config, args.into()).await,
        Command::Airports { query } => airports(&config, &query).await,
        Command::Config { save } => show_config(&config, save),
    }
}

fn traffic_source(config: &AppConfig) -> Result<Arc<dyn TrafficSource>, Box<dyn Error>> {
    let client = OpenSkyClient::new(config.api_base_url.as_str(), config.request_timeout())?
        .with_recent_flight_lookback(config.recent_flight_lookback());
    Ok(Arc::new(client))
}

async fn watch(config: &AppConfig, clicks: Vec<String>, limit: usize) -> CommandResult {
    let source = traffic_source(config)?;
    info!(
        "Polling {} every {}s",
        config.api_base_url,
        config.feed_config().poll_interval.as_secs()
    );

    let feed = PollingScheduler::spawn(Arc::clone(&source), config.feed_config());
    let (controller, mut navigation) =
        TrackOverlayController::new(Arc::clone(&source), config.overlay_config());

    let cancel_token = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::channel(16);
    let runner = controller.clone();
    let runner_token = cancel_token.clone();
    tokio::spawn(async move { runner.run(events_rx, runner_token).await });

    let mut snapshots = feed.subscribe();
    let mut overlays = controller.subscribe();
    let mut pending_clicks = Some(clicks);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                for line in console::render_snapshot(&snapshot, &feed.enrichment(), limit) {
                    println!("{line}");
                }

                if !snapshot.records.is_empty() {
                    for icao24 in pending_clicks.take().unwrap_or_default() {
                        events_tx.send(ViewportEvent::Click { icao24 }).await?;
                    }
                }
            }
            changed = overlays.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(overlay) = overlays.borrow_and_update().overlay.clone() {
                    println!("{}", console::render_overlay(&overlay));
                }
            }
            Some(request) = navigation.recv() => {
                show_details(source.as_ref(), &request.icao24).await;
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    cancel_token.cancel();
    feed.shutdown();
    Ok(())
}

async fn track(config: &AppConfig, icao24: &str) -> CommandResult {
    let source = traffic_source(config)?;
    let (controller, _navigation) = TrackOverlayController::new(source, config.overlay_config());

    let Some(fetch) = controller.handle_click(icao24).track_fetch else {
        println!("No aircraft identifier given");
        return Ok(());
    };

    match fetch.await? {
        TrackFetchOutcome::Installed { .. } => {
            if let Some(overlay) = controller.overlay() {
                println!("{}", console::render_overlay(&overlay));
            }
        }
        TrackFetchOutcome::TooShort { samples } => {
            println!("Track for {icao24} has {samples} sample(s), nothing to draw");
        }
        TrackFetchOutcome::Failed(message) => println!("Track unavailable: {message}"),
        TrackFetchOutcome::Superseded => {}
    }
    Ok(())
}

async fn show_details(source: &dyn TrafficSource, icao24: &str) {
    match source.fetch_recent_flight(icao24).await {
        Ok(flight) => match FlightDetailView::project(icao24, flight.latest.as_ref()) {
            Some(detail) => println!("{detail}"),
            None => println!("No data"),
        },
        Err(e) => {
            warn!("Detail lookup for {} failed: {}", icao24, e);
            println!("No data");
        }
    }
}

fn layover_client(config: &AppConfig) -> Result<LayoverClient, Box<dyn Error>> {
    Ok(LayoverClient::new(
        config.layover_api_base.as_str(),
        config.prediction_url.as_str(),
        config.request_timeout(),
    )?)
}

async fn layover(config: &AppConfig, form: LayoverForm) -> CommandResult {
    let client = layover_client(config)?;

    match submit_layover(&client, &form).await {
        Ok(LayoverOutcome {
            prediction,
            terminals,
        }) => {
            if terminals.is_real {
                println!("Terminals at {}: {}", form.departure.trim(), terminals.terminals.join(", "));
            }
            match prediction.probability_make_layover {
                Some(p) => println!("Chance of making the connection: {:.0}%", p * 100.0),
                None => println!("Prediction returned no probability"),
            }
        }
        Err(LayoverError::Validation(e)) => println!("{e}"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn airports(config: &AppConfig, query: &str) -> CommandResult {
    let client = layover_client(config)?;

    let options = search_airports(&client, query).await;
    if options.is_empty() {
        println!("No airports match {query:?}");
    }
    for option in options {
        println!("{}", option.label());
    }
    Ok(())
}

fn show_config(config: &AppConfig, save: bool) -> CommandResult {
    println!("Config file: {}", AppConfig::get_config_path()?.display());
    if save {
        config.save()?;
        println!("Configuration saved");
    }
    println!("{config:#?}");
    Ok(())
}
