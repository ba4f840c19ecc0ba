use serde::Serialize;

use crate::error::RasterError;
use crate::tile::BBox;

/// North-up affine transform between pixel space and projected coordinates.
///
/// `origin_x`/`origin_y` locate the outer corner of pixel (0, 0), i.e. the
/// raster's top-left corner. `pixel_height` is a positive magnitude: moving
/// one row down decreases projected Y by `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Build a transform, rejecting non-positive or non-finite resolutions.
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        pixel_width: f64,
        pixel_height: f64,
    ) -> Result<Self, RasterError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !origin_x.is_finite() || !origin_y.is_finite() {
            return Err(RasterError::MissingGeoreference(format!(
                "non-finite origin ({}, {})",
                origin_x, origin_y
            )));
        }
        if !valid(pixel_width) || !valid(pixel_height) {
            return Err(RasterError::MissingGeoreference(format!(
                "invalid pixel size {} x {}",
                pixel_width, pixel_height
            )));
        }
        Ok(Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        })
    }

    /// From GeoTIFF `ModelPixelScaleTag` and `ModelTiepointTag`.
    ///
    /// Only the first tiepoint is used; it may tie any raster position
    /// `(i, j)` to world `(x, y)`.
    pub fn from_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Result<Self, RasterError> {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(RasterError::MissingGeoreference(format!(
                "pixel scale has {} values and tiepoint has {}",
                scale.len(),
                tiepoint.len()
            )));
        }
        let (scale_x, scale_y) = (scale[0], scale[1]);
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);

        Self::new(x - i * scale_x, y + j * scale_y, scale_x, scale_y)
    }

    /// From a GeoTIFF `ModelTransformationTag` (row-major 4x4 matrix).
    ///
    /// Rotated or south-up matrices are rejected.
    pub fn from_transformation(matrix: &[f64]) -> Result<Self, RasterError> {
        if matrix.len() < 8 {
            return Err(RasterError::MissingGeoreference(format!(
                "transformation matrix has {} values",
                matrix.len()
            )));
        }
        let (a, b, d) = (matrix[0], matrix[1], matrix[3]);
        let (e, f, h) = (matrix[4], matrix[5], matrix[7]);

        if b != 0.0 || e != 0.0 {
            return Err(RasterError::MissingGeoreference(
                "rotated rasters are not supported".to_string(),
            ));
        }
        if f >= 0.0 {
            return Err(RasterError::MissingGeoreference(
                "south-up rasters are not supported".to_string(),
            ));
        }

        Self::new(d, h, a, -f)
    }

    /// Continuous pixel coordinates `(column, row)` of a projected point.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (self.origin_y - y) / self.pixel_height,
        )
    }

    /// Projected coordinates of a (continuous) pixel position.
    pub fn pixel_to_world(&self, column: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + column * self.pixel_width,
            self.origin_y - row * self.pixel_height,
        )
    }

    /// Projected extent of a `width` x `height` raster.
    pub fn bounds(&self, width: u32, height: u32) -> BBox {
        let (max_x, min_y) = self.pixel_to_world(width as f64, height as f64);
        BBox {
            min_x: self.origin_x,
            min_y,
            max_x,
            max_y: self.origin_y,
        }
    }
}
