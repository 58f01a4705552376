//! Linear space converter.
//! Scales physical board coordinates (cm) into an arbitrary pixel surface.
//! Width and height scale independently, so a surface whose aspect ratio
//! differs from the board's stretches rather than letterboxes.
//! No clamping: off-board input yields off-surface output.

use serde::Serialize;

use crate::calibration::Calibration;

/// Width of the schematic surface when the caller does not pick one.
pub const DEFAULT_BASE_WIDTH: f64 = 600.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

/// Axis a size is measured along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
}

/// Pixel extent of a render target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DisplaySurface {
    pub width: f64,
    pub height: f64,
}

impl DisplaySurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Surface `base_width` pixels wide with the board's aspect ratio,
    /// height rounded to whole pixels (600 wide -> 394 high for a 35x23 board).
    pub fn for_calibration(calibration: &Calibration, base_width: f64) -> Self {
        let height = (base_width / calibration.aspect_ratio()).round();
        Self::new(base_width, height)
    }

    /// Inclusive bounds check.
    pub fn contains(&self, point: DisplayPoint) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }
}

/// Maps a physical point onto a `target_width` x `target_height` surface.
pub fn to_display(
    physical_x: f64,
    physical_y: f64,
    calibration: &Calibration,
    target_width: f64,
    target_height: f64,
) -> DisplayPoint {
    DisplayPoint {
        x: physical_x * (target_width / calibration.width),
        y: physical_y * (target_height / calibration.height),
    }
}

/// Scales a single physical extent along `dimension`.
pub fn scale_size(
    physical_size: f64,
    dimension: Dimension,
    calibration: &Calibration,
    target_width: f64,
    target_height: f64,
) -> f64 {
    match dimension {
        Dimension::Width => physical_size * (target_width / calibration.width),
        Dimension::Height => physical_size * (target_height / calibration.height),
    }
}

/// Scales a physical footprint on both axes.
pub fn to_display_size(
    physical_width: f64,
    physical_height: f64,
    calibration: &Calibration,
    surface: DisplaySurface,
) -> DisplaySize {
    DisplaySize {
        width: scale_size(physical_width, Dimension::Width, calibration, surface.width, surface.height),
        height: scale_size(physical_height, Dimension::Height, calibration, surface.width, surface.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn board() -> Calibration {
        Calibration::fallback()
    }

    #[test]
    fn test_corners_map_to_surface_corners() {
        let cal = board();
        assert_eq!(to_display(0.0, 0.0, &cal, 600.0, 394.0), DisplayPoint { x: 0.0, y: 0.0 });
        let far = to_display(35.0, 23.0, &cal, 600.0, 394.0);
        assert_abs_diff_eq!(far.x, 600.0, epsilon = 1e-9);
        assert_abs_diff_eq!(far.y, 394.0, epsilon = 1e-9);
    }

    #[test]
    fn test_on_board_points_stay_on_surface() {
        let cal = board();
        let surface = DisplaySurface::new(800.0, 300.0);
        for i in 0..=10 {
            for j in 0..=10 {
                let x = cal.width * i as f64 / 10.0;
                let y = cal.height * j as f64 / 10.0;
                let p = to_display(x, y, &cal, surface.width, surface.height);
                assert!(
                    p.x >= 0.0 && p.x <= surface.width + 1e-9 && p.y >= 0.0 && p.y <= surface.height + 1e-9,
                    "({x}, {y}) -> {p:?} left the surface"
                );
            }
        }
    }

    #[test]
    fn test_off_board_points_pass_through() {
        let cal = board();
        let p = to_display(-3.5, 46.0, &cal, 350.0, 230.0);
        assert_abs_diff_eq!(p.x, -35.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 460.0, epsilon = 1e-9);
        assert!(!DisplaySurface::new(350.0, 230.0).contains(p));
    }

    #[test]
    fn test_scale_size_uses_per_axis_ratio() {
        let cal = board();
        // 700x230 stretches x twice as much as y.
        assert_abs_diff_eq!(scale_size(3.5, Dimension::Width, &cal, 700.0, 230.0), 70.0, epsilon = 1e-9);
        assert_abs_diff_eq!(scale_size(3.5, Dimension::Height, &cal, 700.0, 230.0), 35.0, epsilon = 1e-9);

        let size = to_display_size(7.0, 2.3, &cal, DisplaySurface::new(700.0, 230.0));
        assert_abs_diff_eq!(size.width, 140.0, epsilon = 1e-9);
        assert_abs_diff_eq!(size.height, 23.0, epsilon = 1e-9);
    }

    #[test]
    fn test_surface_follows_board_aspect() {
        let surface = DisplaySurface::for_calibration(&board(), DEFAULT_BASE_WIDTH);
        assert_eq!(surface, DisplaySurface::new(600.0, 394.0));
        assert!(surface.contains(DisplayPoint { x: 600.0, y: 394.0 }));
    }

    #[test]
    fn test_zero_width_calibration_is_not_defended() {
        let mut cal = board();
        cal.width = 0.0;
        assert!(to_display(1.0, 1.0, &cal, 600.0, 394.0).x.is_infinite());
        assert!(to_display(0.0, 1.0, &cal, 600.0, 394.0).x.is_nan());
    }
}
