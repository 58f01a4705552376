//! Display adapter.
//! Turns a feed snapshot into render-ready entities for either surface.
//! Widgets themselves live elsewhere; this only fixes where and how big.

use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::convert::{self, DEFAULT_BASE_WIDTH, DisplaySize, DisplaySurface};
use crate::geo;
use crate::marker::MarkerRecord;

/// What to do with markers reported outside the calibrated board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfBoundsPolicy {
    /// Keep them, pinned to the board edge on the geographic map.
    #[default]
    Clamp,
    /// Leave them out of the render.
    Hide,
}

/// Marker positioned on the schematic overlay (pixels).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchematicEntity {
    pub id: i64,
    pub label: String,
    pub asset_type: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

/// Marker positioned on the geographic map.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeoEntity {
    pub id: i64,
    pub label: String,
    pub asset_type: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub rotation: f64,
}

/// Size on the 600 px base canvas used when the backend sent no physical footprint.
pub fn default_display_size(asset_type: Option<&str>) -> DisplaySize {
    let (width, height) = match asset_type.map(str::to_lowercase).as_deref() {
        Some("playground") => (80.0, 40.0),
        Some("dogpark" | "dog park") => (100.0, 100.0),
        Some("restroom") => (55.0, 30.0),
        Some("baseball" | "baseball field") => (90.0, 90.0),
        _ => (60.0, 60.0),
    };
    DisplaySize { width, height }
}

/// [`default_display_size`] rescaled from the board's base canvas onto `surface`.
pub fn default_size_on(asset_type: Option<&str>, calibration: &Calibration, surface: DisplaySurface) -> DisplaySize {
    let base = DisplaySurface::for_calibration(calibration, DEFAULT_BASE_WIDTH);
    let size = default_display_size(asset_type);
    DisplaySize {
        width: size.width * (surface.width / base.width),
        height: size.height * (surface.height / base.height),
    }
}

pub fn is_on_board(marker: &MarkerRecord, calibration: &Calibration) -> bool {
    (0.0..=calibration.width).contains(&marker.x) && (0.0..=calibration.height).contains(&marker.y)
}

pub fn to_schematic(marker: &MarkerRecord, calibration: &Calibration, surface: DisplaySurface) -> SchematicEntity {
    let position = convert::to_display(marker.x, marker.y, calibration, surface.width, surface.height);
    let size = match marker.physical_size() {
        Some((w, h)) => convert::to_display_size(w, h, calibration, surface),
        None => default_size_on(marker.asset_type.as_deref(), calibration, surface),
    };
    SchematicEntity {
        id: marker.id,
        label: marker.asset_name.clone(),
        asset_type: marker.asset_type.clone(),
        x: position.x,
        y: position.y,
        width: size.width,
        height: size.height,
        rotation: marker.rotation_degrees,
    }
}

pub fn to_geo(marker: &MarkerRecord, calibration: &Calibration) -> GeoEntity {
    let position = geo::to_geographic(marker.x, marker.y, calibration);
    GeoEntity {
        id: marker.id,
        label: marker.asset_name.clone(),
        asset_type: marker.asset_type.clone(),
        lat: position.lat,
        lng: position.lng,
        rotation: marker.rotation_degrees,
    }
}

pub fn schematic_entities(
    markers: &[MarkerRecord],
    calibration: &Calibration,
    surface: DisplaySurface,
    policy: OutOfBoundsPolicy,
) -> Vec<SchematicEntity> {
    markers
        .iter()
        .filter(|m| policy == OutOfBoundsPolicy::Clamp || is_on_board(m, calibration))
        .map(|m| to_schematic(m, calibration, surface))
        .collect()
}

pub fn geo_entities(markers: &[MarkerRecord], calibration: &Calibration, policy: OutOfBoundsPolicy) -> Vec<GeoEntity> {
    markers
        .iter()
        .filter(|m| policy == OutOfBoundsPolicy::Clamp || is_on_board(m, calibration))
        .map(|m| to_geo(m, calibration))
        .collect()
}
