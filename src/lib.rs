//! Projects tracked tabletop markers onto a schematic overlay and a
//! geographic map.
//!
//! Pipeline: [`feed`] polls marker positions (board cm) -> [`convert`] or
//! [`geo`] projects them using the board [`calibration`] -> [`display`]
//! yields render-ready entities.

pub mod calibration;
pub mod config;
pub mod convert;
pub mod display;
pub mod error;
pub mod feed;
pub mod geo;
pub mod logging;
pub mod marker;

pub use calibration::{Calibration, CalibrationStore, CalibrationUse, GeoPoint, GeographicBounds};
pub use convert::{Dimension, DisplayPoint, DisplaySurface};
pub use error::{CalibrationError, FeedError};
pub use feed::{FeedHandle, FeedReader, FeedState, FeedStatus, MarkerFeed};
pub use geo::NormalizedPoint;
pub use marker::MarkerRecord;
