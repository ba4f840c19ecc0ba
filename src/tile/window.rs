//! Projected bounding box to raster pixel window.

use std::fmt;

use serde::Serialize;

use super::address::BBox;
use crate::raster::GeoTransform;

/// Offsets within this many pixels of an integer are treated as that integer.
///
/// Absorbs floating-point noise from the tile and geotransform math so that a
/// tile edge landing exactly on a pixel boundary does not pull in an extra
/// row or column.
pub const SNAP_EPSILON: f64 = 1e-6;

/// Half-open pixel rectangle `[left, right) x [top, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PixelWindow {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelWindow {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Number of pixels covered.
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// True when the window covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Clamp every bound to `[0, width]` / `[0, height]`.
    ///
    /// Idempotent: clamping twice gives the same window.
    pub fn clamp(self, width: u32, height: u32) -> Self {
        Self {
            left: self.left.min(width),
            top: self.top.min(height),
            right: self.right.min(width),
            bottom: self.bottom.min(height),
        }
    }
}

impl fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.left, self.top, self.right, self.bottom)
    }
}

/// Resolve a projected bounding box to the raster pixels it covers.
///
/// Left and top are floored, right and bottom are ceiled, so every pixel
/// partly covered by the box is included. The result is clamped to the raster.
/// Returns `None` when nothing remains, e.g. when the box lies entirely
/// outside the raster.
pub fn bbox_to_pixel_window(
    bbox: &BBox,
    geotransform: &GeoTransform,
    raster_width: u32,
    raster_height: u32,
) -> Option<PixelWindow> {
    let (left, top) = geotransform.world_to_pixel(bbox.min_x, bbox.max_y);
    let (right, bottom) = geotransform.world_to_pixel(bbox.max_x, bbox.min_y);

    let window = PixelWindow {
        left: to_offset(snap(left).floor()),
        top: to_offset(snap(top).floor()),
        right: to_offset(snap(right).ceil()),
        bottom: to_offset(snap(bottom).ceil()),
    }
    .clamp(raster_width, raster_height);

    if window.is_empty() {
        None
    } else {
        Some(window)
    }
}

fn snap(value: f64) -> f64 {
    let nearest = value.round();
    if (value - nearest).abs() < SNAP_EPSILON {
        nearest
    } else {
        value
    }
}

/// Saturate an already-rounded offset into `u32`; NaN and negatives become 0.
fn to_offset(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= u32::MAX as f64 {
        u32::MAX
    } else {
        value as u32
    }
}
