//! XYZ tile addressing.
//!
//! Maps a `(zoom, column, row)` address to its bounding box in the tiling
//! scheme's projected coordinates. Rows grow southward while projected Y grows
//! northward, so row 0 touches `+half_extent`.

use std::fmt;

use serde::Serialize;

use crate::error::TileError;

/// Half the Web Mercator (EPSG:3857) extent in meters.
pub const WEB_MERCATOR_HALF_EXTENT: f64 = 20_037_508.342_789_244;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Highest zoom level accepted from requests.
pub const MAX_ZOOM: u8 = 30;

// =============================================================================
// Bounding Box
// =============================================================================

/// Axis-aligned box in projected units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

// =============================================================================
// Tile Address
// =============================================================================

/// A tile in the XYZ pyramid.
///
/// `column` and `row` are signed and unchecked at parse time. Addresses
/// outside `[0, 2^zoom)` are off the grid and the tile service reports them
/// as empty windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileAddress {
    pub zoom: u8,
    pub column: i64,
    pub row: i64,
}

impl TileAddress {
    pub fn new(zoom: u8, column: i64, row: i64) -> Self {
        Self { zoom, column, row }
    }

    /// Parse an address from raw path segments.
    ///
    /// Fails with `BadAddress` when any part is not an integer, when zoom is
    /// negative, or when zoom exceeds [`MAX_ZOOM`].
    pub fn parse(zoom: &str, column: &str, row: &str) -> Result<Self, TileError> {
        let zoom_value = parse_integer("zoom", zoom)?;
        if zoom_value < 0 {
            return Err(TileError::BadAddress {
                message: format!("zoom must be non-negative, got {}", zoom_value),
            });
        }
        if zoom_value > MAX_ZOOM as i64 {
            return Err(TileError::BadAddress {
                message: format!("zoom {} exceeds maximum {}", zoom_value, MAX_ZOOM),
            });
        }

        Ok(Self {
            zoom: zoom_value as u8,
            column: parse_integer("column", column)?,
            row: parse_integer("row", row)?,
        })
    }

    /// Whether column and row are inside `[0, 2^zoom)`.
    pub fn is_in_range(&self) -> bool {
        let n = 1i64 << self.zoom;
        (0..n).contains(&self.column) && (0..n).contains(&self.row)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
    }
}

fn parse_integer(name: &str, value: &str) -> Result<i64, TileError> {
    value.parse::<i64>().map_err(|_| TileError::BadAddress {
        message: format!("{} '{}' is not an integer", name, value),
    })
}

// =============================================================================
// Tile Scheme
// =============================================================================

/// Process-wide tiling constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileScheme {
    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Half the projection's planar extent
    pub half_extent: f64,
}

impl TileScheme {
    /// 256px tiles over the full Web Mercator square.
    pub const WEB_MERCATOR: TileScheme = TileScheme {
        tile_size: DEFAULT_TILE_SIZE,
        half_extent: WEB_MERCATOR_HALF_EXTENT,
    };

    pub fn new(tile_size: u32, half_extent: f64) -> Self {
        Self {
            tile_size,
            half_extent,
        }
    }

    /// Projected units per pixel at `zoom`.
    pub fn resolution(&self, zoom: u8) -> f64 {
        resolution(zoom, self.tile_size, self.half_extent)
    }

    /// Bounding box of `address`.
    pub fn tile_bbox(&self, address: &TileAddress) -> BBox {
        tile_to_bbox(
            address.zoom,
            address.column,
            address.row,
            self.tile_size,
            self.half_extent,
        )
    }
}

impl Default for TileScheme {
    fn default() -> Self {
        Self::WEB_MERCATOR
    }
}

/// `(2 * half_extent) / (tile_size * 2^zoom)`
pub fn resolution(zoom: u8, tile_size: u32, half_extent: f64) -> f64 {
    (2.0 * half_extent) / (tile_size as f64 * 2f64.powi(zoom as i32))
}

/// Bounding box of tile `(zoom, column, row)` in projected units.
///
/// Columns advance eastward from `-half_extent`; rows advance southward from
/// `+half_extent`. No clamping is applied.
pub fn tile_to_bbox(zoom: u8, column: i64, row: i64, tile_size: u32, half_extent: f64) -> BBox {
    let span = tile_size as f64 * resolution(zoom, tile_size, half_extent);

    // Shared edges of neighbouring tiles come from the same expression, so
    // they are bit-identical.
    let x_edge = |n: i64| n as f64 * span - half_extent;
    let y_edge = |n: i64| half_extent - n as f64 * span;

    BBox {
        min_x: x_edge(column),
        max_x: x_edge(column.saturating_add(1)),
        max_y: y_edge(row),
        min_y: y_edge(row.saturating_add(1)),
    }
}

// =============================================================================
// Tests
// =============================================================================
