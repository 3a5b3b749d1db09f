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

//! Click arbitration and the track overlay.
//!
//! Every click on an aircraft fetches its recent track and, when it lands
//! within the double-click window of the previous click, also requests
//! navigation to the aircraft's detail view. Both happen for the same click.
//!
//! Track fetches can complete out of order. Each click gets a sequence
//! number and a fetch result only replaces the overlay if no later click has
//! installed one already.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::source::{Track, TrackSample, TrafficSource};

pub const DEFAULT_DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
pub const DEFAULT_TRACK_LOOKBACK: Duration = Duration::from_secs(12 * 3600);
/// Altitude used for track samples that report none.
pub const MISSING_ALTITUDE_PLACEHOLDER_M: f64 = 1000.0;

/// Which pairs of clicks may form a double click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubleClickPolicy {
    /// Both clicks must hit the same aircraft.
    #[default]
    SameAircraft,
    /// Timing alone decides, regardless of which aircraft was clicked.
    AnyAircraft,
}

/// Configuration for the track overlay controller.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub double_click_window: Duration,
    pub double_click_policy: DoubleClickPolicy,
    pub track_lookback: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            double_click_window: DEFAULT_DOUBLE_CLICK_WINDOW,
            double_click_policy: DoubleClickPolicy::default(),
            track_lookback: DEFAULT_TRACK_LOOKBACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Single,
    Double,
}

/// Tracks the last click to tell single from double clicks.
#[derive(Debug, Clone)]
pub struct GestureArbiter {
    window: Duration,
    policy: DoubleClickPolicy,
    last_click: Option<(Instant, String)>,
}

impl GestureArbiter {
    #[must_use]
    pub fn new(window: Duration, policy: DoubleClickPolicy) -> Self {
        Self {
            window,
            policy,
            last_click: None,
        }
    }

    /// Classify a click and remember it as the last one.
    pub fn register(&mut self, icao24: &str, now: Instant) -> Gesture {
        let gesture = match &self.last_click {
            Some((at, last_icao24))
                if now.saturating_duration_since(*at) < self.window
                    && (self.policy == DoubleClickPolicy::AnyAircraft || last_icao24 == icao24) =>
            {
                Gesture::Double
            }
            _ => Gesture::Single,
        };

        self.last_click = Some((now, icao24.to_string()));
        gesture
    }
}

/// Renderable path of one aircraft's track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackOverlay {
    pub icao24: String,
    /// Flat `lon, lat, altitude` triples.
    pub positions: Vec<f64>,
    pub start: TrackSample,
    pub end: TrackSample,
}

impl TrackOverlay {
    /// Build an overlay from a track. Tracks with fewer than two samples
    /// cannot form a path and yield `None`.
    #[must_use]
    pub fn from_track(icao24: &str, track: &Track) -> Option<Self> {
        let (start, end) = match track.path.as_slice() {
            [first, .., last] => (*first, *last),
            _ => return None,
        };

        let positions = track
            .path
            .iter()
            .flat_map(|s| [s.lon, s.lat, s.baro_altitude.unwrap_or(MISSING_ALTITUDE_PLACEHOLDER_M)])
            .collect();

        Some(Self {
            icao24: icao24.to_string(),
            positions,
            start,
            end,
        })
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// The overlay currently shown, tagged with the click that produced it.
#[derive(Debug, Clone, Default)]
pub struct ActiveOverlay {
    pub click_seq: u64,
    pub overlay: Option<Arc<TrackOverlay>>,
}

/// Events reported by the viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewportEvent {
    Click { icao24: String },
}

/// Request to open the detail view of an aircraft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Lower-cased icao24.
    pub icao24: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackFetchOutcome {
    Installed { points: usize },
    /// Fewer than two samples; the overlay was left as it was.
    TooShort { samples: usize },
    /// A later click already installed its overlay.
    Superseded,
    Failed(String),
}

/// What a click triggered.
#[derive(Debug)]
pub struct ClickOutcome {
    pub gesture: Gesture,
    pub navigation: Option<NavigationRequest>,
    pub track_fetch: Option<JoinHandle<TrackFetchOutcome>>,
}

struct ControllerInner {
    source: Arc<dyn TrafficSource>,
    config: OverlayConfig,
    arbiter: Mutex<GestureArbiter>,
    click_seq: AtomicU64,
    overlay_tx: watch::Sender<ActiveOverlay>,
    nav_tx: mpsc::UnboundedSender<NavigationRequest>,
}

impl ControllerInner {
    async fn fetch_track(&self, seq: u64, icao24: String) -> TrackFetchOutcome {
        let track = match self.source.fetch_track(&icao24, self.config.track_lookback).await {
            Ok(track) => track,
            Err(e) => {
                warn!("Track fetch for {} failed: {}", icao24, e);
                return TrackFetchOutcome::Failed(e.to_string());
            }
        };

        let Some(overlay) = TrackOverlay::from_track(&icao24, &track) else {
            debug!("Track for {} has {} samples, keeping overlay", icao24, track.path.len());
            return TrackFetchOutcome::TooShort {
                samples: track.path.len(),
            };
        };

        let points = overlay.point_count();
        let installed = self.overlay_tx.send_if_modified(|active| {
            if seq <= active.click_seq {
                return false;
            }
            *active = ActiveOverlay {
                click_seq: seq,
                overlay: Some(Arc::new(overlay)),
            };
            true
        });

        if installed {
            info!("Track overlay for {} installed ({} points)", icao24, points);
            TrackFetchOutcome::Installed { points }
        } else {
            debug!("Track for {} superseded by a later click", icao24);
            TrackFetchOutcome::Superseded
        }
    }
}

/// Turns viewport clicks into track overlays and navigation requests.
#[derive(Clone)]
pub struct TrackOverlayController {
    inner: Arc<ControllerInner>,
}

impl std::fmt::Debug for TrackOverlayController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackOverlayController")
            .field("config", &self.inner.config)
            .field("clicks", &self.inner.click_seq.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl TrackOverlayController {
    /// Create a controller. Navigation requests are delivered on the returned receiver.
    #[must_use]
    pub fn new(
        source: Arc<dyn TrafficSource>,
        config: OverlayConfig,
    ) -> (Self, mpsc::UnboundedReceiver<NavigationRequest>) {
        let (nav_tx, nav_rx) = mpsc::unbounded_channel();
        let (overlay_tx, _) = watch::channel(ActiveOverlay::default());
        let arbiter = GestureArbiter::new(config.double_click_window, config.double_click_policy);

        let controller = Self {
            inner: Arc::new(ControllerInner {
                source,
                config,
                arbiter: Mutex::new(arbiter),
                click_seq: AtomicU64::new(0),
                overlay_tx,
                nav_tx,
            }),
        };

        (controller, nav_rx)
    }

    /// Handle a click on an aircraft.
    ///
    /// The track fetch runs in the background; await the returned handle to
    /// observe its outcome. Must be called from within a tokio runtime.
    pub fn handle_click(&self, icao24: &str) -> ClickOutcome {
        let icao24 = icao24.trim().to_lowercase();
        let now = Instant::now();

        let gesture = self
            .inner
            .arbiter
            .lock()
            .map(|mut arbiter| arbiter.register(&icao24, now))
            .unwrap_or(Gesture::Single);
        let seq = self.inner.click_seq.fetch_add(1, Ordering::SeqCst) + 1;

        if icao24.is_empty() {
            debug!("Click without aircraft identifier ignored");
            return ClickOutcome {
                gesture,
                navigation: None,
                track_fetch: None,
            };
        }

        let navigation = (gesture == Gesture::Double).then(|| NavigationRequest {
            icao24: icao24.clone(),
        });
        if let Some(request) = &navigation {
            info!("Double click on {}, requesting detail view", icao24);
            if self.inner.nav_tx.send(request.clone()).is_err() {
                debug!("Navigation receiver dropped, request for {} not delivered", icao24);
            }
        }

        let inner = Arc::clone(&self.inner);
        let track_fetch = tokio::spawn(async move { inner.fetch_track(seq, icao24).await });

        ClickOutcome {
            gesture,
            navigation,
            track_fetch: Some(track_fetch),
        }
    }

    /// Process viewport events until the channel closes or `cancel_token` fires.
    pub async fn run(&self, mut events: mpsc::Receiver<ViewportEvent>, cancel_token: CancellationToken) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(ViewportEvent::Click { icao24 }) => {
                        self.handle_click(&icao24);
                    }
                    None => return,
                },
                () = cancel_token.cancelled() => return,
            }
        }
    }

    /// Overlay currently shown, if any.
    #[must_use]
    pub fn overlay(&self) -> Option<Arc<TrackOverlay>> {
        self.inner.overlay_tx.borrow().overlay.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ActiveOverlay> {
        self.inner.overlay_tx.subscribe()
    }

    /// Remove the overlay. Fetches from earlier clicks will not bring it back.
    pub fn clear(&self) {
        let latest = self.inner.click_seq.load(Ordering::SeqCst);
        self.inner.overlay_tx.send_modify(|active| {
            active.click_seq = active.click_seq.max(latest);
            active.overlay = None;
        });
    }
}
