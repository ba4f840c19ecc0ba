//! HTTP server layer for GeoTile Streamer.
//!
//! This module provides the HTTP API for serving XYZ tiles cut from rasters.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │           GET /tiles/{raster_id}/{z}/{x}/{y}.png                │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │          routes             │  │
//! │  │ (requests, error JSON)   │  │ (router, CORS, tracing)     │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    default_tile_handler, error_status, health_handler, parse_tile_filename,
    raster_metadata_handler, tile_handler, AppState, DefaultTilePathParams, ErrorResponse,
    HealthResponse, TilePathParams, TileQueryParams, TILE_WINDOW_HEADER,
};
pub use routes::{create_router, RouterConfig};
