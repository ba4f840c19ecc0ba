//! Tile Service for orchestrating tile generation.
//!
//! The TileService is the main entry point for tile requests. It orchestrates:
//! - Request validation
//! - Raster access via the source
//! - Tile to pixel-window resolution
//! - Window decoding and compositing
//! - PNG/JPEG encoding
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                              │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    get_tile()                           │    │
//! │  │  1. Validate quality  4. Resolve pixel window           │    │
//! │  │  2. Open raster       5. Read + composite bands         │    │
//! │  │  3. Tile bbox         6. Encode                         │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │            │
//! │           ▼                    ▼                    ▼            │
//! │    ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐  │
//! │    │ RasterSource │   │ GeoTiffRaster │   │ ImageTileEncoder │  │
//! │    └──────────────┘   └───────────────┘   └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is shared between requests except the source's client handle: each
//! request opens its own raster accessor and drops it when done.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::error::{IoError, RasterError, TileError};
use crate::io::{DEFAULT_BLOCK_CAPACITY, DEFAULT_BLOCK_SIZE};
use crate::raster::{GeoTiffRaster, GeoTransform, RasterAccessor};
use crate::source::RasterSource;

use super::address::{BBox, TileAddress, TileScheme};
use super::compositor::{composite, REQUIRED_BANDS};
use super::encoder::{is_valid_quality, EncodedTile, ImageTileEncoder, TileFormat, DEFAULT_JPEG_QUALITY};
use super::reader::read_window;
use super::window::{bbox_to_pixel_window, PixelWindow};

// =============================================================================
// Tile Request
// =============================================================================

/// A request for a tile.
#[derive(Debug, Clone)]
pub struct TileRequest {
    /// Raster identifier (object key relative to the source prefix)
    pub raster_id: String,

    /// XYZ address
    pub address: TileAddress,

    /// Output format (PNG by default)
    pub format: TileFormat,

    /// JPEG quality (1-100, defaults to 80)
    pub quality: u8,
}

impl TileRequest {
    /// Create a PNG tile request with default quality.
    pub fn new(raster_id: impl Into<String>, address: TileAddress) -> Self {
        Self {
            raster_id: raster_id.into(),
            address,
            format: TileFormat::default(),
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_format(mut self, format: TileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// Response from the tile service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The encoded image
    pub data: Bytes,

    /// MIME type of `data`
    pub content_type: &'static str,

    /// Raster pixels the tile was rendered from
    pub window: PixelWindow,
}

/// Descriptive facts about a raster, served by the metadata endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RasterMetadata {
    pub raster_id: String,
    pub width: u32,
    pub height: u32,
    pub band_count: usize,
    pub geotransform: GeoTransform,
    pub bounds: BBox,
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service for rendering XYZ tiles from rasters.
///
/// # Type Parameters
///
/// * `S` - The raster source type (e.g., S3-based source)
///
/// # Example
///
/// ```ignore
/// use geotile_streamer::tile::{TileAddress, TileRequest, TileService};
///
/// let service = TileService::new(source);
///
/// let request = TileRequest::new("ortho.tif", TileAddress::new(12, 2200, 1343));
/// let response = service.get_tile(request).await?;
///
/// println!("{} bytes from window {}", response.data.len(), response.window);
/// ```
pub struct TileService<S: RasterSource> {
    /// Source for raster range readers
    source: Arc<S>,

    /// Tiling constants
    scheme: TileScheme,

    /// PNG/JPEG encoder
    encoder: ImageTileEncoder,

    /// Range-request block size for raster reads
    block_size: usize,

    /// Blocks kept per open raster
    block_capacity: usize,
}

impl<S: RasterSource> TileService<S> {
    /// Create a service with the Web Mercator scheme and default block cache.
    pub fn new(source: S) -> Self {
        Self::with_shared_source(Arc::new(source))
    }

    /// Create a service over a shared source.
    pub fn with_shared_source(source: Arc<S>) -> Self {
        Self {
            source,
            scheme: TileScheme::default(),
            encoder: ImageTileEncoder::new(),
            block_size: DEFAULT_BLOCK_SIZE,
            block_capacity: DEFAULT_BLOCK_CAPACITY,
        }
    }

    pub fn with_scheme(mut self, scheme: TileScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Configure the per-request block cache used while decoding.
    pub fn with_block_cache(mut self, block_size: usize, block_capacity: usize) -> Self {
        self.block_size = block_size;
        self.block_capacity = block_capacity;
        self
    }

    pub fn scheme(&self) -> &TileScheme {
        &self.scheme
    }

    /// Get a reference to the underlying source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Render one tile.
    ///
    /// # Errors
    ///
    /// - `InvalidQuality` if the JPEG quality is outside 1-100
    /// - `RasterNotFound` if the source has no such raster
    /// - `EmptyWindow` if the tile is off the grid or does not overlap the raster
    /// - `InsufficientBands`, `Decode`, `BandLengthMismatch`, `BandShapeMismatch`
    ///   or `Encode` when a later stage fails
    pub async fn get_tile(&self, request: TileRequest) -> Result<TileResponse, TileError> {
        if !is_valid_quality(request.quality) {
            return Err(TileError::InvalidQuality {
                quality: request.quality.to_string(),
            });
        }
        if !request.address.is_in_range() {
            return Err(empty_window(&request.address));
        }

        let raster = self.open_raster(&request.raster_id).await?;
        let (tile, window) = self
            .render_tile(&raster, &request.address, request.format, request.quality)
            .await?;

        Ok(TileResponse {
            data: tile.data,
            content_type: tile.content_type,
            window,
        })
    }

    /// Run the address-to-image pipeline against an already open raster.
    pub async fn render_tile<A>(
        &self,
        raster: &A,
        address: &TileAddress,
        format: TileFormat,
        quality: u8,
    ) -> Result<(EncodedTile, PixelWindow), TileError>
    where
        A: RasterAccessor + ?Sized,
    {
        if !address.is_in_range() {
            return Err(empty_window(address));
        }

        let bbox = self.scheme.tile_bbox(address);
        debug!(
            tile = %address,
            min_x = bbox.min_x,
            min_y = bbox.min_y,
            max_x = bbox.max_x,
            max_y = bbox.max_y,
            "Computed tile bounds"
        );

        let window =
            bbox_to_pixel_window(&bbox, &raster.geotransform(), raster.width(), raster.height())
                .ok_or_else(|| empty_window(address))?;
        debug!(tile = %address, window = %window, "Resolved pixel window");

        if raster.band_count() < REQUIRED_BANDS {
            return Err(TileError::InsufficientBands {
                required: REQUIRED_BANDS,
                available: raster.band_count(),
            });
        }

        let bands = read_window(raster, &window).await?;
        let pixels = composite(&bands, window.width(), window.height(), format.layout())?;
        let tile = self.encoder.encode(&pixels, format, quality)?;

        debug!(
            tile = %address,
            format = format.extension(),
            bytes = tile.data.len(),
            "Encoded tile"
        );

        Ok((tile, window))
    }

    /// Size, band count and georeferencing of a raster.
    pub async fn raster_metadata(&self, raster_id: &str) -> Result<RasterMetadata, TileError> {
        let raster = self.open_raster(raster_id).await?;
        let geotransform = raster.geotransform();

        Ok(RasterMetadata {
            raster_id: raster_id.to_string(),
            width: raster.width(),
            height: raster.height(),
            band_count: raster.band_count(),
            geotransform,
            bounds: geotransform.bounds(raster.width(), raster.height()),
        })
    }

    /// Open a raster accessor for one request.
    async fn open_raster(&self, raster_id: &str) -> Result<GeoTiffRaster<S::Reader>, TileError> {
        let not_found = || TileError::RasterNotFound {
            raster_id: raster_id.to_string(),
        };

        let reader = self
            .source
            .create_reader(raster_id)
            .await
            .map_err(|e| match e {
                IoError::NotFound(_) => not_found(),
                other => TileError::Decode(RasterError::Io(other)),
            })?;

        GeoTiffRaster::open_with_cache(reader, self.block_size, self.block_capacity)
            .await
            .map_err(|e| match e {
                RasterError::Io(IoError::NotFound(_)) => not_found(),
                other => TileError::Decode(other),
            })
    }
}

fn empty_window(address: &TileAddress) -> TileError {
    TileError::EmptyWindow {
        zoom: address.zoom,
        column: address.column,
        row: address.row,
    }
}

// =============================================================================
// Tests
// =============================================================================
