//! Map viewport ownership: automatic marker following vs. user gestures.

use std::time::Duration;

use serde::Serialize;
use shared::domain::Coordinate;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct MapViewSettings {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    pub initial_zoom: f64,
    pub initial_center: Coordinate,
    pub override_window: Duration,
}

impl Default for MapViewSettings {
    fn default() -> Self {
        Self {
            min_zoom: 3.0,
            max_zoom: 18.0,
            zoom_step: 1.0,
            initial_zoom: 13.0,
            initial_center: Coordinate::new(0.0, 0.0),
            override_window: Duration::from_secs(4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowMode {
    Automatic,
    UserOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Recentered,
    Suppressed,
}

#[derive(Debug)]
pub struct MapViewController {
    settings: MapViewSettings,
    viewport: Viewport,
    override_until: Option<Instant>,
}

impl MapViewController {
    pub fn new(settings: MapViewSettings) -> Self {
        let zoom = settings
            .initial_zoom
            .clamp(settings.min_zoom, settings.max_zoom);
        let viewport = Viewport {
            center: settings.initial_center,
            zoom,
        };
        Self {
            settings,
            viewport,
            override_until: None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn settings(&self) -> &MapViewSettings {
        &self.settings
    }

    pub fn follow_mode(&self) -> FollowMode {
        match self.override_until {
            Some(until) if Instant::now() < until => FollowMode::UserOverride,
            _ => FollowMode::Automatic,
        }
    }

    /// Recenters on the marker, keeping zoom, unless a user gesture is recent.
    pub fn follow_marker(&mut self, coordinate: Coordinate) -> FollowOutcome {
        match self.follow_mode() {
            FollowMode::UserOverride => {
                debug!(?coordinate, "marker follow suppressed by user override");
                FollowOutcome::Suppressed
            }
            FollowMode::Automatic => {
                self.override_until = None;
                self.viewport.center = coordinate;
                FollowOutcome::Recentered
            }
        }
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.zoom_by(self.settings.zoom_step)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.zoom_by(-self.settings.zoom_step)
    }

    /// External override, e.g. the map widget reporting a drag.
    pub fn set_viewport(&mut self, center: Coordinate, zoom: f64) {
        self.viewport = Viewport {
            center,
            zoom: self.clamp_zoom(zoom),
        };
        self.open_override_window();
    }

    fn zoom_by(&mut self, delta: f64) -> f64 {
        self.viewport.zoom = self.clamp_zoom(self.viewport.zoom + delta);
        self.open_override_window();
        self.viewport.zoom
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.viewport.zoom;
        }
        zoom.clamp(self.settings.min_zoom, self.settings.max_zoom)
    }

    // Debounce: every gesture pushes the expiry out, it never stacks.
    fn open_override_window(&mut self) {
        self.override_until = Some(Instant::now() + self.settings.override_window);
    }
}

#[cfg(test)]
#[path = "tests/map_view_tests.rs"]
mod tests;
