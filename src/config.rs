//! Configuration management for GeoTile Streamer.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `GEOTILE_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use geotile_streamer::config::{Cli, Command};
//!
//! match Cli::parse().command {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Check(config) => println!("Checking bucket {}", config.s3_bucket),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `GEOTILE_HOST` - Server bind address (default: 0.0.0.0)
//! - `GEOTILE_PORT` - Server port (default: 3000)
//! - `GEOTILE_S3_BUCKET` - S3 bucket name (required)
//! - `GEOTILE_S3_PREFIX` - Key prefix prepended to raster ids
//! - `GEOTILE_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `GEOTILE_S3_REGION` - AWS region (default: us-east-1)
//! - `GEOTILE_DEFAULT_RASTER` - Raster served by `/tiles/{z}/{x}/{y}`
//! - `GEOTILE_PRESIGN_TTL` - Presigned URL lifetime in seconds (default: 300)
//! - `GEOTILE_TILE_SIZE` - Tile edge length in pixels (default: 256)
//! - `GEOTILE_HALF_EXTENT` - Half the projected extent (default: Web Mercator)
//! - `GEOTILE_BLOCK_SIZE` - Range-request block size in bytes (default: 256KB)
//! - `GEOTILE_BLOCK_CAPACITY` - Blocks kept per open raster (default: 64)
//! - `GEOTILE_JPEG_QUALITY` - Default JPEG quality (default: 80)
//! - `GEOTILE_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `GEOTILE_CORS_ORIGINS` - Comma-separated allowed origins (default: any)

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::io::{DEFAULT_BLOCK_CAPACITY, DEFAULT_BLOCK_SIZE};
use crate::source::DEFAULT_PRESIGN_TTL_SECS;
use crate::tile::{
    is_valid_quality, TileScheme, DEFAULT_JPEG_QUALITY, DEFAULT_TILE_SIZE,
    WEB_MERCATOR_HALF_EXTENT,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Largest accepted tile edge length.
pub const MAX_TILE_SIZE: u32 = 4096;

/// Longest presign lifetime S3 accepts (7 days).
pub const MAX_PRESIGN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

const MIN_BLOCK_SIZE: usize = 1024;
const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// GeoTile Streamer - An XYZ tile server for georeferenced rasters.
///
/// Cuts map tiles on demand from (Cloud-Optimized) GeoTIFFs stored in S3 or
/// S3-compatible storage using HTTP range requests.
#[derive(Parser, Debug)]
#[command(name = "geotile-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the tile server
    Serve(ServeConfig),

    /// Check storage connectivity and optionally inspect a raster
    Check(CheckConfig),
}

/// Options shared by every command that talks to S3.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// S3 bucket name containing the raster files.
    #[arg(long, env = "GEOTILE_S3_BUCKET")]
    pub s3_bucket: String,

    /// Key prefix prepended to every raster id.
    #[arg(long, env = "GEOTILE_S3_PREFIX")]
    pub s3_prefix: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    ///
    /// If not specified, uses the default AWS S3 endpoint.
    #[arg(long, env = "GEOTILE_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "GEOTILE_S3_REGION")]
    pub s3_region: String,

    /// Lifetime of presigned raster URLs, in seconds.
    #[arg(long, default_value_t = DEFAULT_PRESIGN_TTL_SECS, env = "GEOTILE_PRESIGN_TTL")]
    pub presign_ttl: u64,
}

impl StorageArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.s3_bucket.trim().is_empty() {
            return Err(
                "S3 bucket name is required. Set --s3-bucket or GEOTILE_S3_BUCKET".to_string(),
            );
        }
        if self.presign_ttl == 0 || self.presign_ttl > MAX_PRESIGN_TTL_SECS {
            return Err(format!(
                "presign_ttl must be between 1 and {} seconds",
                MAX_PRESIGN_TTL_SECS
            ));
        }
        Ok(())
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl)
    }
}

/// Configuration for `geotile-streamer serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GEOTILE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GEOTILE_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Raster id served by the short `/tiles/{z}/{x}/{y}` route.
    #[arg(long, env = "GEOTILE_DEFAULT_RASTER")]
    pub default_raster: Option<String>,

    // =========================================================================
    // Tiling Configuration
    // =========================================================================
    /// Tile edge length in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "GEOTILE_TILE_SIZE")]
    pub tile_size: u32,

    /// Half the projected extent of the tiling scheme (Web Mercator by default).
    #[arg(long, default_value_t = WEB_MERCATOR_HALF_EXTENT, env = "GEOTILE_HALF_EXTENT")]
    pub half_extent: f64,

    /// Default JPEG quality for `.jpg` tiles (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "GEOTILE_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    // =========================================================================
    // Read Configuration
    // =========================================================================
    /// Block size in bytes for coalesced range reads.
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE, env = "GEOTILE_BLOCK_SIZE")]
    pub block_size: usize,

    /// Maximum number of blocks kept per open raster.
    #[arg(long, default_value_t = DEFAULT_BLOCK_CAPACITY, env = "GEOTILE_BLOCK_CAPACITY")]
    pub block_capacity: usize,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "GEOTILE_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "GEOTILE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;

        if self.tile_size == 0 || self.tile_size > MAX_TILE_SIZE {
            return Err(format!(
                "tile_size must be between 1 and {}",
                MAX_TILE_SIZE
            ));
        }

        if !self.half_extent.is_finite() || self.half_extent <= 0.0 {
            return Err("half_extent must be a positive finite number".to_string());
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.block_size < MIN_BLOCK_SIZE || self.block_size > MAX_BLOCK_SIZE {
            return Err("block_size must be between 1KB and 16MB".to_string());
        }
        if self.block_capacity == 0 {
            return Err("block_capacity must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tile_scheme(&self) -> TileScheme {
        TileScheme::new(self.tile_size, self.half_extent)
    }
}

/// Configuration for `geotile-streamer check`.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Open this raster and print its metadata.
    #[arg(long)]
    pub raster: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
