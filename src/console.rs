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

//! Text rendering of feed snapshots and track overlays.

use flight_feed::{EnrichmentView, FeedSnapshot, FlightView, MapEntity, TrackOverlay};

/// Lines describing one published record set. At most `limit` flights are listed.
pub fn render_snapshot(snapshot: &FeedSnapshot, enrichment: &EnrichmentView, limit: usize) -> Vec<String> {
    let placed = snapshot.records.iter().filter_map(MapEntity::from_record).count();
    let updated = snapshot
        .updated_at
        .map_or_else(|| "never".to_string(), |t| t.format("%H:%M:%S UTC").to_string());

    let mut lines = vec![format!(
        "━━ {} flights ({} on map, {} enriched) updated {} ━━",
        snapshot.records.len(),
        placed,
        enrichment.len(),
        updated
    )];

    if let Some(error) = &snapshot.error {
        lines.push(format!("⚠ Feed error, showing last good data: {error}"));
    }

    lines.extend(
        snapshot
            .records
            .iter()
            .take(limit)
            .map(|record| FlightView::project(record, enrichment.get(&record.icao24).as_ref()).to_string()),
    );

    if snapshot.records.len() > limit {
        lines.push(format!("… {} more", snapshot.records.len() - limit));
    }

    lines
}

pub fn render_overlay(overlay: &TrackOverlay) -> String {
    format!(
        "Track {}: {} points from ({:.2}, {:.2}) to ({:.2}, {:.2})",
        overlay.icao24,
        overlay.point_count(),
        overlay.start.lat,
        overlay.start.lon,
        overlay.end.lat,
        overlay.end.lon
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use flight_feed::{FeedConfig, FeedHandle, OpenSkyClient, Track, TrackSample};

    #[test]
    fn test_empty_snapshot() {
        let source = OpenSkyClient::new("http://localhost", Duration::from_secs(1)).unwrap();
        let feed = FeedHandle::new(Arc::new(source), FeedConfig::default());

        let lines = render_snapshot(&feed.snapshot(), &feed.enrichment(), 5);

        assert_eq!(lines, vec!["━━ 0 flights (0 on map, 0 enriched) updated never ━━"]);
    }

    #[test]
    fn test_overlay_line() {
        let track = Track {
            icao24: "abc".to_string(),
            path: vec![
                TrackSample::new(0, 10.0, 20.0, Some(500.0)),
                TrackSample::new(60, 11.0, 21.0, None),
            ],
        };
        let overlay = TrackOverlay::from_track("abc", &track).unwrap();

        assert_eq!(
            render_overlay(&overlay),
            "Track abc: 2 points from (20.00, 10.00) to (21.00, 11.00)"
        );
    }
}
