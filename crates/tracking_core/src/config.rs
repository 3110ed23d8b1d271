use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use shared::domain::Coordinate;
use tracing::warn;

use crate::map_view::MapViewSettings;

pub const DEFAULT_CONFIG_FILE: &str = "tracker.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    pub initial_zoom: f64,
    pub override_window_ms: u64,
    pub feed_latency_ms: u64,
    pub poll_interval_ms: u64,
    pub progress_step: u8,
    pub default_tracking_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_zoom: 3.0,
            max_zoom: 18.0,
            zoom_step: 1.0,
            initial_zoom: 13.0,
            override_window_ms: 4_000,
            feed_latency_ms: 1_000,
            poll_interval_ms: 2_000,
            progress_step: 5,
            default_tracking_id: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    min_zoom: Option<f64>,
    max_zoom: Option<f64>,
    zoom_step: Option<f64>,
    initial_zoom: Option<f64>,
    override_window_ms: Option<u64>,
    feed_latency_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    progress_step: Option<u8>,
    default_tracking_id: Option<String>,
}

impl Settings {
    pub fn map_view_settings(&self, initial_center: Coordinate) -> MapViewSettings {
        MapViewSettings {
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            zoom_step: self.zoom_step,
            initial_zoom: self.initial_zoom,
            initial_center,
            override_window: Duration::from_millis(self.override_window_ms),
        }
    }

    pub fn feed_latency(&self) -> Duration {
        Duration::from_millis(self.feed_latency_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn merge_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.min_zoom {
            self.min_zoom = v;
        }
        if let Some(v) = file_cfg.max_zoom {
            self.max_zoom = v;
        }
        if let Some(v) = file_cfg.zoom_step {
            self.zoom_step = v;
        }
        if let Some(v) = file_cfg.initial_zoom {
            self.initial_zoom = v;
        }
        if let Some(v) = file_cfg.override_window_ms {
            self.override_window_ms = v;
        }
        if let Some(v) = file_cfg.feed_latency_ms {
            self.feed_latency_ms = v;
        }
        if let Some(v) = file_cfg.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if let Some(v) = file_cfg.progress_step {
            self.progress_step = v;
        }
        if file_cfg.default_tracking_id.is_some() {
            self.default_tracking_id = file_cfg.default_tracking_id;
        }
    }

    fn merge_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            let raw = lookup(key)?;
            match raw.trim().parse::<T>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(key, value = %raw, "ignoring unparsable setting");
                    None
                }
            }
        }

        if let Some(v) = parsed(&lookup, "APP__MIN_ZOOM") {
            self.min_zoom = v;
        }
        if let Some(v) = parsed(&lookup, "APP__MAX_ZOOM") {
            self.max_zoom = v;
        }
        if let Some(v) = parsed(&lookup, "APP__ZOOM_STEP") {
            self.zoom_step = v;
        }
        if let Some(v) = parsed(&lookup, "APP__INITIAL_ZOOM") {
            self.initial_zoom = v;
        }
        if let Some(v) = parsed(&lookup, "APP__OVERRIDE_WINDOW_MS") {
            self.override_window_ms = v;
        }
        if let Some(v) = parsed(&lookup, "APP__FEED_LATENCY_MS") {
            self.feed_latency_ms = v;
        }
        if let Some(v) = parsed(&lookup, "APP__POLL_INTERVAL_MS") {
            self.poll_interval_ms = v;
        }
        if let Some(v) = parsed(&lookup, "APP__PROGRESS_STEP") {
            self.progress_step = v;
        }
        if let Some(v) = lookup("APP__DEFAULT_TRACKING_ID") {
            let v = v.trim();
            self.default_tracking_id = (!v.is_empty()).then(|| v.to_string());
        }
    }

    /// Restores defaults for values the map controller cannot work with.
    pub fn sanitize(mut self) -> Self {
        let defaults = Settings::default();
        let finite = self.min_zoom.is_finite() && self.max_zoom.is_finite();
        if !finite || self.min_zoom > self.max_zoom {
            warn!(
                min_zoom = self.min_zoom,
                max_zoom = self.max_zoom,
                "invalid zoom bounds, using defaults"
            );
            self.min_zoom = defaults.min_zoom;
            self.max_zoom = defaults.max_zoom;
        }
        if !self.zoom_step.is_finite() || self.zoom_step <= 0.0 {
            warn!(zoom_step = self.zoom_step, "invalid zoom step, using default");
            self.zoom_step = defaults.zoom_step;
        }
        if !self.initial_zoom.is_finite() {
            self.initial_zoom = defaults.initial_zoom;
        }
        self.initial_zoom = self.initial_zoom.clamp(self.min_zoom, self.max_zoom);
        if self.progress_step == 0 {
            warn!("progress step of 0 would stall the simulation, using default");
            self.progress_step = defaults.progress_step;
        }
        self
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then `path` if it exists and parses, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => settings.merge_file(file_cfg),
            Err(err) => warn!(path = %path.display(), %err, "ignoring malformed config file"),
        }
    }

    settings.merge_env(env);
    settings.sanitize()
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn temp_config(contents: &str) -> std::path::PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("tracker_config_test_{suffix}.toml"));
        fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = load_settings_from(Path::new("/nonexistent/tracker.toml"), |_| None);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn file_values_override_defaults_and_env_overrides_file() {
        let path = temp_config("max_zoom = 16.0\noverride_window_ms = 2500\nprogress_step = 10\n");
        let vars: HashMap<&str, &str> = HashMap::from([
            ("APP__OVERRIDE_WINDOW_MS", "1500"),
            ("APP__DEFAULT_TRACKING_ID", "TRK-1"),
        ]);

        let settings = load_settings_from(&path, |key| vars.get(key).map(|v| v.to_string()));
        fs::remove_file(&path).expect("cleanup");

        assert_eq!(settings.max_zoom, 16.0);
        assert_eq!(settings.progress_step, 10);
        assert_eq!(settings.override_window_ms, 1500);
        assert_eq!(settings.default_tracking_id.as_deref(), Some("TRK-1"));
    }

    #[test]
    fn malformed_file_is_ignored() {
        let path = temp_config("max_zoom = \"lots\"");
        let settings = load_settings_from(&path, |_| None);
        fs::remove_file(&path).expect("cleanup");
        assert_eq!(settings.max_zoom, Settings::default().max_zoom);
    }

    #[test]
    fn unparsable_env_value_is_ignored() {
        let settings = load_settings_from(Path::new("/nonexistent/tracker.toml"), |key| {
            (key == "APP__ZOOM_STEP").then(|| "fast".to_string())
        });
        assert_eq!(settings.zoom_step, 1.0);
    }

    #[test]
    fn inverted_zoom_bounds_fall_back_to_defaults() {
        let settings = Settings {
            min_zoom: 12.0,
            max_zoom: 4.0,
            zoom_step: -1.0,
            progress_step: 0,
            ..Settings::default()
        }
        .sanitize();
        assert_eq!(settings.min_zoom, 3.0);
        assert_eq!(settings.max_zoom, 18.0);
        assert_eq!(settings.zoom_step, 1.0);
        assert_eq!(settings.progress_step, 5);
    }

    #[test]
    fn map_settings_carry_override_window() {
        let settings = Settings {
            override_window_ms: 750,
            ..Settings::default()
        };
        let map = settings.map_view_settings(Coordinate::new(1.0, 2.0));
        assert_eq!(map.override_window, Duration::from_millis(750));
        assert_eq!(map.initial_center, Coordinate::new(1.0, 2.0));
    }
}
