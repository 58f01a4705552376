//! Error types for the two network boundaries.
//! Neither error reaches rendering code: the calibration store swaps in the
//! fallback board and the marker feed turns failures into an advisory string.

use reqwest::StatusCode;

/// Why a calibration load did not produce a usable board.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("calibration request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("calibration endpoint returned HTTP {status}")]
    Status { status: StatusCode },
    #[error("calibration response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid map configuration: missing width/height")]
    MissingDimensions,
    #[error("invalid map configuration: dimensions must be positive (width={width}, height={height})")]
    InvalidDimensions { width: f64, height: f64 },
    #[error("invalid map configuration: missing geographic_bounds")]
    MissingBounds,
}

/// Why a single marker poll cycle failed.
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("marker request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error! status: {status}")]
    Status { status: StatusCode },
    #[error("marker response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
