//! Router configuration for GeoTile Streamer.
//!
//! This module defines the HTTP routes and applies middleware for CORS and
//! request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                                  - Health check
//! /tiles/{raster_id}/{z}/{x}/{y}[.ext]     - Tile endpoint
//! /tiles/{z}/{x}/{y}[.ext]                 - Tile endpoint, default raster
//! /rasters/{raster_id}                     - Raster metadata
//! ```
//!
//! # Example
//!
//! ```ignore
//! use geotile_streamer::server::routes::{create_router, RouterConfig};
//! use geotile_streamer::tile::TileService;
//!
//! let tile_service = TileService::new(source);
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://maps.example.com".to_string()])
//!     .with_default_raster(Some("ortho/2024.tif".to_string()));
//!
//! let router = create_router(tile_service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::{HeaderName, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    default_tile_handler, health_handler, raster_metadata_handler, tile_handler, AppState,
    TILE_WINDOW_HEADER,
};
use crate::source::RasterSource;
use crate::tile::{TileService, DEFAULT_JPEG_QUALITY};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age for tiles, in seconds
    pub cache_max_age: u32,

    /// Whether to add the request tracing layer
    pub enable_tracing: bool,

    /// Raster served by `/tiles/{z}/{x}/{y}`
    pub default_raster: Option<String>,

    /// JPEG quality when the request has none
    pub default_quality: u8,
}

impl RouterConfig {
    /// Create a config with any-origin CORS, 1 hour caching and tracing on.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
            default_raster: None,
            default_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    pub fn with_default_raster(mut self, raster_id: Option<String>) -> Self {
        self.default_raster = raster_id;
        self
    }

    pub fn with_default_quality(mut self, quality: u8) -> Self {
        self.default_quality = quality;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
pub fn create_router<S>(tile_service: TileService<S>, config: RouterConfig) -> Router
where
    S: RasterSource + 'static,
{
    let app_state = AppState::new(tile_service)
        .with_cache_max_age(config.cache_max_age)
        .with_default_raster(config.default_raster.clone())
        .with_default_quality(config.default_quality);

    let cors = build_cors_layer(&config);

    // Uses {filename} to capture "{y}", "{y}.png" and "{y}.jpg"
    let router = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/tiles/{raster_id}/{z}/{x}/{filename}",
            get(tile_handler::<S>),
        )
        .route("/tiles/{z}/{x}/{filename}", get(default_tile_handler::<S>))
        .route("/rasters/{raster_id}", get(raster_metadata_handler::<S>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(TILE_WINDOW_HEADER)])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        // No origins allowed - this effectively disables CORS
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
