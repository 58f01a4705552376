//! Config module.
//! Endpoint URLs, poll cadence and display surface settings.
//! Layered: built-in defaults < JSON file < environment < CLI flags (applied in main).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::display::OutOfBoundsPolicy;

pub const DEFAULT_CALIBRATION_URL: &str = "http://localhost:8000/api/map-config/";
pub const DEFAULT_MARKERS_URL: &str = "http://localhost:8000/api/get-marker-positions/";
const DEFAULT_POLL_MS: u64 = 5_000;
const MIN_POLL_MS: u64 = 100;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub calibration_url: String,
    pub markers_url: String,
    pub poll_interval_ms: u64,
    /// Per-request timeout; unset means requests are never cut short here.
    pub request_timeout_secs: Option<u64>,
    pub display_width: f64,
    /// Derived from the board aspect ratio when unset.
    pub display_height: Option<f64>,
    pub out_of_bounds: OutOfBoundsPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calibration_url: DEFAULT_CALIBRATION_URL.to_string(),
            markers_url: DEFAULT_MARKERS_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_MS,
            request_timeout_secs: None,
            display_width: crate::convert::DEFAULT_BASE_WIDTH,
            display_height: None,
            out_of_bounds: OutOfBoundsPolicy::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Defaults (or `path`, when given) overlaid with `TABLEMAP_*` environment variables.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        Self::load_layered(path, |key| std::env::var(key).ok())
    }

    fn load_layered(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        base.with_env(lookup)
    }

    /// Applies `TABLEMAP_CALIBRATION_URL`, `TABLEMAP_MARKERS_URL` and
    /// `TABLEMAP_POLL_MS` as looked up by `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup("TABLEMAP_CALIBRATION_URL") {
            self.calibration_url = url;
        }
        if let Some(url) = lookup("TABLEMAP_MARKERS_URL") {
            self.markers_url = url;
        }
        if let Some(ms) = lookup("TABLEMAP_POLL_MS") {
            self.poll_interval_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("TABLEMAP_POLL_MS is not a number: {ms}"))?;
        }
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_MS))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
