//! # GeoTile Streamer
//!
//! An XYZ map tile server for georeferenced rasters stored in S3-compatible
//! object storage.
//!
//! Each tile request is mapped from its `(zoom, column, row)` address to a
//! projected bounding box, then to the raster pixels it covers. Only those
//! pixels are read (via HTTP range requests on a presigned URL), composited
//! into RGB(A) and encoded as PNG or JPEG. Nothing is downloaded up front and
//! nothing is cached across requests.
//!
//! ## Features
//!
//! - **Range-based streaming**: Fetches only the internal tiles/strips a window touches
//! - **GeoTIFF support**: Strip or tiled GeoTIFF, u8/u16/float samples
//! - **Presigned access**: Short-lived S3 URLs per request; no credentials in the read path
//! - **PNG and JPEG output**: Opaque RGBA PNG by default, RGB JPEG with quality control
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`io`] - Range readers, block coalescing and a blocking adapter
//! - [`source`] - Raster id to range reader (S3 presigned URLs)
//! - [`raster`] - GeoTIFF decoding and georeferencing
//! - [`tile`] - Tile addressing, window resolution, compositing, encoding
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use geotile_streamer::{create_router, create_s3_client, RouterConfig, S3RasterSource, TileService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = create_s3_client(None, "us-east-1").await;
//!     let source = S3RasterSource::new(client, "imagery".to_string());
//!
//!     let router = create_router(TileService::new(source), RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod raster;
pub mod server;
pub mod source;
pub mod tile;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, ServeConfig, StorageArgs};
pub use error::{IoError, RasterError, TileError};
pub use io::{BlockCache, BlockingReader, HttpRangeReader, MemoryReader, RangeReader};
pub use raster::{BandSet, GeoTiffRaster, GeoTransform, RasterAccessor};
pub use server::{
    create_router, health_handler, raster_metadata_handler, tile_handler, AppState,
    ErrorResponse, HealthResponse, RouterConfig,
};
pub use source::{create_s3_client, RasterSource, S3RasterSource};
pub use tile::{
    bbox_to_pixel_window, composite, tile_to_bbox, BBox, ChannelLayout, ImageTileEncoder,
    PixelWindow, RasterMetadata, TileAddress, TileFormat, TileRequest, TileResponse, TileScheme,
    TileService,
};
