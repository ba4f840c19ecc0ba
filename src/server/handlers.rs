//! HTTP request handlers for the GeoTile Streamer API.
//!
//! # Endpoints
//!
//! - `GET /tiles/{raster_id}/{z}/{x}/{y}[.png|.jpg]` - Serve a tile
//! - `GET /tiles/{z}/{x}/{y}[.png|.jpg]` - Serve a tile of the default raster
//! - `GET /rasters/{raster_id}` - Raster metadata
//! - `GET /health` - Health check endpoint
//!
//! Raster ids containing `/` must be percent-encoded (`%2F`) in the path.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{IoError, RasterError, TileError};
use crate::source::RasterSource;
use crate::tile::{
    RasterMetadata, TileAddress, TileFormat, TileRequest, TileService, DEFAULT_JPEG_QUALITY,
};

/// Response header carrying the resolved pixel window.
pub const TILE_WINDOW_HEADER: &str = "x-tile-window";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: RasterSource> {
    /// The tile service for processing tile requests
    pub tile_service: Arc<TileService<S>>,

    /// Cache control max-age in seconds (defaults to 1 hour)
    pub cache_max_age: u32,

    /// Raster served by the short `/tiles/{z}/{x}/{y}` route
    pub default_raster: Option<String>,

    /// JPEG quality used when the request has none
    pub default_quality: u8,
}

impl<S: RasterSource> AppState<S> {
    /// Create a new application state with the given tile service.
    pub fn new(tile_service: TileService<S>) -> Self {
        Self {
            tile_service: Arc::new(tile_service),
            cache_max_age: 3600,
            default_raster: None,
            default_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_cache_max_age(mut self, cache_max_age: u32) -> Self {
        self.cache_max_age = cache_max_age;
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

impl<S: RasterSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
            cache_max_age: self.cache_max_age,
            default_raster: self.default_raster.clone(),
            default_quality: self.default_quality,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/tiles/{raster_id}/{z}/{x}/{filename}`
/// where filename is `{y}`, `{y}.png` or `{y}.jpg`.
///
/// Coordinates stay strings here so malformed values surface as
/// `BadAddress` with a JSON body instead of an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub raster_id: String,
    pub z: String,
    pub x: String,
    pub filename: String,
}

/// Path parameters for the default-raster tile route.
#[derive(Debug, Deserialize)]
pub struct DefaultTilePathParams {
    pub z: String,
    pub x: String,
    pub filename: String,
}

/// Split `{y}[.ext]` into the row and output format.
///
/// A missing extension means PNG.
pub fn parse_tile_filename(filename: &str) -> Result<(&str, TileFormat), TileError> {
    match filename.rsplit_once('.') {
        None => Ok((filename, TileFormat::default())),
        Some((row, extension)) => {
            let format =
                TileFormat::from_extension(extension).ok_or_else(|| TileError::BadAddress {
                    message: format!("unsupported tile format '{}'", extension),
                })?;
            Ok((row, format))
        }
    }
}

/// Query parameters for tile requests.
///
/// `quality` is kept as raw text so that malformed values are reported as
/// `InvalidQuality` JSON errors instead of extractor rejections.
#[derive(Debug, Default, Deserialize)]
pub struct TileQueryParams {
    /// JPEG quality (1-100); the server default applies when absent
    #[serde(default)]
    pub quality: Option<String>,
}

impl TileQueryParams {
    /// The requested quality, or `default` when none was given.
    ///
    /// Range checking happens in the tile service; this only rejects values
    /// that are not an integer in `0..=255`.
    pub fn quality_or(&self, default: u8) -> Result<u8, TileError> {
        match self.quality.as_deref() {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .map_err(|_| TileError::InvalidQuality {
                    quality: raw.to_string(),
                }),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "bad_address")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Status code and error type identifier for a pipeline error.
pub fn error_status(err: &TileError) -> (StatusCode, &'static str) {
    match err {
        TileError::BadAddress { .. } => (StatusCode::BAD_REQUEST, "bad_address"),
        TileError::InvalidQuality { .. } => (StatusCode::BAD_REQUEST, "invalid_quality"),

        // Tiles outside the raster are reported as not found, without a body image
        TileError::EmptyWindow { .. } => (StatusCode::NOT_FOUND, "tile_not_found"),
        TileError::RasterNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),

        TileError::Decode(RasterError::Io(io_err)) => match io_err {
            IoError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            IoError::Connection(_) | IoError::Http { .. } => {
                (StatusCode::BAD_GATEWAY, "upstream_error")
            }
            IoError::S3(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            IoError::RangeOutOfBounds { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        },
        TileError::Decode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),

        TileError::InsufficientBands { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "insufficient_bands")
        }
        TileError::BandLengthMismatch { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "band_length_mismatch")
        }
        TileError::BandShapeMismatch { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "band_shape_mismatch")
        }
        TileError::Encode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
    }
}

/// Convert TileError to HTTP response.
///
/// - 5xx errors are logged at ERROR level
/// - 404s are logged at DEBUG level (common and expected)
/// - other 4xx errors are logged at WARN level
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = error_status(&self);
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Response
///
/// - `200 OK` with the encoded image, `Content-Type`, `Cache-Control` and
///   `X-Tile-Window: left,top,right,bottom`
/// - `400 Bad Request` for malformed addresses or quality
/// - `404 Not Found` for missing rasters and tiles outside the raster
/// - `5xx` for decode, encode and upstream failures
pub async fn tile_handler<S: RasterSource>(
    State(state): State<AppState<S>>,
    Path(params): Path<TilePathParams>,
    Query(query): Query<TileQueryParams>,
) -> Result<Response, TileError> {
    serve_tile(&state, params.raster_id, &params.z, &params.x, &params.filename, query).await
}

/// Handle tile requests against the configured default raster.
pub async fn default_tile_handler<S: RasterSource>(
    State(state): State<AppState<S>>,
    Path(params): Path<DefaultTilePathParams>,
    Query(query): Query<TileQueryParams>,
) -> Result<Response, TileError> {
    let raster_id = state
        .default_raster
        .clone()
        .ok_or_else(|| TileError::RasterNotFound {
            raster_id: "(no default raster configured)".to_string(),
        })?;

    serve_tile(&state, raster_id, &params.z, &params.x, &params.filename, query).await
}

async fn serve_tile<S: RasterSource>(
    state: &AppState<S>,
    raster_id: String,
    z: &str,
    x: &str,
    filename: &str,
    query: TileQueryParams,
) -> Result<Response, TileError> {
    let (y, format) = parse_tile_filename(filename)?;
    let address = TileAddress::parse(z, x, y)?;

    let request = TileRequest::new(raster_id, address)
        .with_format(format)
        .with_quality(query.quality_or(state.default_quality)?);

    let response = state.tile_service.get_tile(request).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, response.content_type.to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", state.cache_max_age),
            ),
            (
                HeaderName::from_static(TILE_WINDOW_HEADER),
                response.window.to_string(),
            ),
        ],
        response.data,
    )
        .into_response())
}

/// Health check endpoint.
///
/// Returns a simple JSON response indicating the service is healthy.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Raster metadata endpoint: size, band count, geotransform and bounds.
pub async fn raster_metadata_handler<S: RasterSource>(
    State(state): State<AppState<S>>,
    Path(raster_id): Path<String>,
) -> Result<Json<RasterMetadata>, TileError> {
    let metadata = state.tile_service.raster_metadata(&raster_id).await?;
    Ok(Json(metadata))
}

// =============================================================================
// Tests
// =============================================================================
