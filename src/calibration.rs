//! Calibration store.
//! Loads the physical board's size (cm) and its real-world corners from the
//! map-config endpoint, caches the result for the lifetime of the store and
//! substitutes a fixed fallback board whenever the endpoint is unusable.
//!
//! Rendering code always gets *some* calibration: load failures are logged
//! and absorbed, never returned.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

pub const FALLBACK_WIDTH_CM: f64 = 35.0;
pub const FALLBACK_HEIGHT_CM: f64 = 23.0;
pub const FALLBACK_VERSION: &str = "fallback";

/// Corners of the park the fallback board represents.
pub const FALLBACK_BOUNDS: GeographicBounds = GeographicBounds {
    top_left: GeoPoint { lat: 32.561065, lng: -117.083997 },
    top_right: GeoPoint { lat: 32.561065, lng: -117.075475 },
    bottom_right: GeoPoint { lat: 32.558361, lng: -117.075475 },
    bottom_left: GeoPoint { lat: 32.558361, lng: -117.083997 },
};

// *************** Types ***************

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Real-world position of each physical board corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographicBounds {
    pub top_left: GeoPoint,
    pub top_right: GeoPoint,
    pub bottom_right: GeoPoint,
    pub bottom_left: GeoPoint,
}

impl GeographicBounds {
    pub fn corners(&self) -> [GeoPoint; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }
}

/// Board dimensions in centimeters plus optional geographic corners.
///
/// A loaded value is never mutated; reloading replaces it wholesale.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    pub width: f64,
    pub height: f64,
    pub geographic_bounds: Option<GeographicBounds>,
    pub version: String,
}

impl Calibration {
    /// Builds a calibration, rejecting non-positive or non-finite dimensions.
    pub fn new(
        width: f64,
        height: f64,
        geographic_bounds: Option<GeographicBounds>,
        version: impl Into<String>,
    ) -> Result<Self, CalibrationError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(CalibrationError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            geographic_bounds,
            version: version.into(),
        })
    }

    /// The board used whenever the endpoint cannot be reached or answers garbage.
    pub fn fallback() -> Self {
        Self {
            width: FALLBACK_WIDTH_CM,
            height: FALLBACK_HEIGHT_CM,
            geographic_bounds: Some(FALLBACK_BOUNDS),
            version: FALLBACK_VERSION.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.version == FALLBACK_VERSION
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Geographic corners, or the fallback park when this board has none.
    pub fn bounds_or_fallback(&self) -> GeographicBounds {
        self.geographic_bounds.unwrap_or(FALLBACK_BOUNDS)
    }
}

/// What the consumer needs from the calibration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CalibrationUse {
    /// Width/height only (schematic overlay).
    #[default]
    Dimensions,
    /// Width/height plus geographic corners (geographic map).
    Geographic,
}

/// Map-config payload exactly as the endpoint sends it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawCalibration {
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub geographic_bounds: Option<GeographicBounds>,
    #[serde(default)]
    pub config_version: Option<String>,
}

impl RawCalibration {
    /// Validates the payload for the given use.
    pub fn into_calibration(self, usage: CalibrationUse) -> Result<Calibration, CalibrationError> {
        let (Some(width), Some(height)) = (self.width, self.height) else {
            return Err(CalibrationError::MissingDimensions);
        };
        if usage == CalibrationUse::Geographic && self.geographic_bounds.is_none() {
            return Err(CalibrationError::MissingBounds);
        }
        let version = self.config_version.unwrap_or_else(|| "unknown".to_string());
        Calibration::new(width, height, self.geographic_bounds, version)
    }
}

// *************** Sources ***************

/// Where calibration payloads come from.
pub trait CalibrationSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<RawCalibration, CalibrationError>> + Send;
}

/// Fetches the map config over HTTP.
#[derive(Clone, Debug)]
pub struct HttpCalibrationSource {
    client: Client,
    url: String,
}

impl HttpCalibrationSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Builds a dedicated client; `timeout` of `None` leaves requests unbounded.
    pub fn with_timeout(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, CalibrationError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(builder.build()?, url))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CalibrationSource for HttpCalibrationSource {
    async fn fetch(&self) -> Result<RawCalibration, CalibrationError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalibrationError::Status { status });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

// *************** Store ***************

/// Lazily filled, explicitly clearable calibration cache.
///
/// At most one load is in flight at a time: concurrent first callers wait on
/// the same fill instead of issuing their own request.
pub struct CalibrationStore<S> {
    source: S,
    usage: CalibrationUse,
    cached: Mutex<Option<Arc<Calibration>>>,
    fill: tokio::sync::Mutex<()>,
}

impl<S: CalibrationSource> CalibrationStore<S> {
    pub fn new(source: S, usage: CalibrationUse) -> Self {
        Self {
            source,
            usage,
            cached: Mutex::new(None),
            fill: tokio::sync::Mutex::new(()),
        }
    }

    pub fn usage(&self) -> CalibrationUse {
        self.usage
    }

    /// Fetches a fresh calibration, falling back to [`Calibration::fallback`]
    /// on any failure. Does not touch the cache.
    pub async fn load(&self) -> Calibration {
        let result = match self.source.fetch().await {
            Ok(raw) => raw.into_calibration(self.usage),
            Err(err) => Err(err),
        };
        match result {
            Ok(calibration) => {
                info!(
                    "Loaded calibration {}x{} cm (version {})",
                    calibration.width, calibration.height, calibration.version
                );
                calibration
            }
            Err(err) => {
                warn!("Error loading map configuration, using fallback: {}", err);
                Calibration::fallback()
            }
        }
    }

    /// Returns the cached calibration, loading it on first use.
    pub async fn get(&self) -> Arc<Calibration> {
        if let Some(calibration) = self.current() {
            return calibration;
        }

        let _fill = self.fill.lock().await;
        // Another caller may have filled the cache while we waited.
        if let Some(calibration) = self.current() {
            return calibration;
        }

        let calibration = Arc::new(self.load().await);
        *self.lock_cache() = Some(Arc::clone(&calibration));
        calibration
    }

    /// Cached value, if any, without triggering a load.
    pub fn current(&self) -> Option<Arc<Calibration>> {
        self.lock_cache().clone()
    }

    /// Drops the cache; the next [`get`](Self::get) loads again.
    pub fn clear(&self) {
        *self.lock_cache() = None;
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, Option<Arc<Calibration>>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// *************** Tests ***************

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        calls: AtomicUsize,
        delay: Duration,
        payload: Option<RawCalibration>,
    }

    impl FakeSource {
        fn ok(payload: RawCalibration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                payload: Some(payload),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                payload: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CalibrationSource for FakeSource {
        async fn fetch(&self) -> Result<RawCalibration, CalibrationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.payload.clone().ok_or(CalibrationError::MissingDimensions)
        }
    }

    fn board(width: f64, height: f64, bounds: bool) -> RawCalibration {
        RawCalibration {
            width: Some(width),
            height: Some(height),
            geographic_bounds: bounds.then_some(FALLBACK_BOUNDS),
            config_version: Some("v2".to_string()),
        }
    }

    #[tokio::test]
    async fn test_load_falls_back_when_source_errors() {
        let store = CalibrationStore::new(FakeSource::failing(), CalibrationUse::Geographic);
        let calibration = store.load().await;
        assert_eq!(calibration.width, 35.0);
        assert_eq!(calibration.height, 23.0);
        assert_eq!(calibration.version, "fallback");
        assert_eq!(calibration.geographic_bounds, Some(FALLBACK_BOUNDS));
        assert!(calibration.is_fallback());
    }

    #[tokio::test]
    async fn test_load_falls_back_on_missing_height() {
        let mut raw = board(40.0, 30.0, true);
        raw.height = None;
        let store = CalibrationStore::new(FakeSource::ok(raw), CalibrationUse::Dimensions);
        assert!(store.load().await.is_fallback());
    }

    #[tokio::test]
    async fn test_missing_bounds_only_matters_for_geographic_use() {
        let schematic = CalibrationStore::new(FakeSource::ok(board(40.0, 30.0, false)), CalibrationUse::Dimensions);
        let calibration = schematic.load().await;
        assert_eq!(calibration.width, 40.0);
        assert_eq!(calibration.version, "v2");
        assert!(calibration.geographic_bounds.is_none());

        let geographic = CalibrationStore::new(FakeSource::ok(board(40.0, 30.0, false)), CalibrationUse::Geographic);
        assert!(geographic.load().await.is_fallback());
    }

    #[tokio::test]
    async fn test_zero_width_is_rejected() {
        let store = CalibrationStore::new(FakeSource::ok(board(0.0, 30.0, true)), CalibrationUse::Dimensions);
        assert!(store.load().await.is_fallback());
    }

    #[tokio::test]
    async fn test_get_loads_once_and_returns_same_value() {
        let store = CalibrationStore::new(FakeSource::ok(board(40.0, 30.0, true)), CalibrationUse::Geographic);
        assert!(store.current().is_none());

        let first = store.get().await;
        let second = store.get().await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_first_gets_share_one_load() {
        let mut source = FakeSource::ok(board(40.0, 30.0, true));
        source.delay = Duration::from_millis(200);
        let store = CalibrationStore::new(source, CalibrationUse::Geographic);

        let (a, b, c) = tokio::join!(store.get(), store.get(), store.get());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert_eq!(store.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_forces_reload() {
        let store = CalibrationStore::new(FakeSource::ok(board(40.0, 30.0, true)), CalibrationUse::Geographic);
        let first = store.get().await;
        store.clear();
        assert!(store.current().is_none());

        let second = store.get().await;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(store.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_fallback_is_cached_too() {
        let store = CalibrationStore::new(FakeSource::failing(), CalibrationUse::Geographic);
        assert!(store.get().await.is_fallback());
        assert!(store.get().await.is_fallback());
        assert_eq!(store.source.calls(), 1);
    }

    #[test]
    fn test_raw_payload_parses_endpoint_shape() {
        let json = r#"{
            "width": 35,
            "height": 23,
            "geographic_bounds": {
                "topLeft": {"lat": 32.561065, "lng": -117.083997},
                "topRight": {"lat": 32.561065, "lng": -117.075475},
                "bottomRight": {"lat": 32.558361, "lng": -117.075475},
                "bottomLeft": {"lat": 32.558361, "lng": -117.083997}
            },
            "config_version": "2024-10"
        }"#;
        let raw: RawCalibration = serde_json::from_str(json).unwrap();
        let calibration = raw.into_calibration(CalibrationUse::Geographic).unwrap();
        assert_eq!(calibration.geographic_bounds, Some(FALLBACK_BOUNDS));
        assert_eq!(calibration.version, "2024-10");
    }

    #[test]
    fn test_missing_version_becomes_unknown() {
        let raw: RawCalibration = serde_json::from_str(r#"{"width": 10, "height": 5}"#).unwrap();
        let calibration = raw.into_calibration(CalibrationUse::Dimensions).unwrap();
        assert_eq!(calibration.version, "unknown");
        assert_eq!(calibration.aspect_ratio(), 2.0);
        assert_eq!(calibration.bounds_or_fallback(), FALLBACK_BOUNDS);
    }
}
