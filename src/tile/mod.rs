//! Tile service layer.
//!
//! This module turns XYZ tile addresses into encoded images cut from a
//! georeferenced raster.
//!
//! # Architecture
//!
//! The tile service sits between the HTTP layer and the raster source:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  address ─► bbox ─► pixel window        │
//! │        ─► bands ─► pixels ─► PNG/JPEG   │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │      RasterSource + GeoTiffRaster       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileAddress`], [`TileScheme`], [`tile_to_bbox`]: XYZ addressing
//! - [`bbox_to_pixel_window`]: projected bounds to clamped raster pixels
//! - [`read_window`]: decode through a [`RasterAccessor`] and check band shape
//! - [`composite`]: interleave RGB(A) pixels with opaque alpha
//! - [`ImageTileEncoder`]: PNG/JPEG output
//! - [`TileService`]: orchestrates the full pipeline per request
//!
//! # Example
//!
//! ```
//! use geotile_streamer::tile::{tile_to_bbox, TileAddress, WEB_MERCATOR_HALF_EXTENT};
//!
//! let address = TileAddress::parse("1", "0", "0").unwrap();
//! let bbox = tile_to_bbox(address.zoom, address.column, address.row, 256, WEB_MERCATOR_HALF_EXTENT);
//!
//! // Row 0 is the northern half
//! assert_eq!(bbox.max_y, WEB_MERCATOR_HALF_EXTENT);
//! assert_eq!(bbox.min_y, 0.0);
//! ```
//!
//! [`RasterAccessor`]: crate::raster::RasterAccessor

mod address;
mod compositor;
mod encoder;
mod reader;
mod service;
mod window;

pub use address::{
    resolution, tile_to_bbox, BBox, TileAddress, TileScheme, DEFAULT_TILE_SIZE, MAX_ZOOM,
    WEB_MERCATOR_HALF_EXTENT,
};
pub use compositor::{composite, ChannelLayout, PackedPixelBuffer, OPAQUE_ALPHA, REQUIRED_BANDS};
pub use encoder::{
    clamp_quality, is_valid_quality, EncodedTile, ImageTileEncoder, TileFormat,
    DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use reader::{read_window, validate_band_set};
pub use service::{RasterMetadata, TileRequest, TileResponse, TileService};
pub use window::{bbox_to_pixel_window, PixelWindow, SNAP_EPSILON};
