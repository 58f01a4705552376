//! Marker records as reported by the tracking backend.

use serde::{Deserialize, Serialize};

/// One tracked physical marker. Positions are in board centimeters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "rotation", default)]
    pub rotation_degrees: f64,
    pub asset_name: String,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub physical_width: Option<f64>,
    #[serde(default)]
    pub physical_height: Option<f64>,
}

impl MarkerRecord {
    /// Physical footprint when the backend reported both extents.
    pub fn physical_size(&self) -> Option<(f64, f64)> {
        self.physical_width.zip(self.physical_height)
    }
}

/// Parses a marker-endpoint body (a JSON array of markers).
pub fn parse_markers(body: &[u8]) -> serde_json::Result<Vec<MarkerRecord>> {
    serde_json::from_slice(body)
}
