//! Raster source access.
//!
//! A [`RasterSource`] turns a stable raster identifier into a [`RangeReader`]
//! over the raster's bytes. The S3 implementation issues a short-lived
//! presigned GET URL per request and reads it with HTTP range requests; the
//! pipeline never sees credentials or expiry.
//!
//! ```text
//! raster_id ──► RasterSource::create_reader ──► RangeReader ──► GeoTiffRaster
//! ```

mod s3;

use async_trait::async_trait;

use crate::error::IoError;
use crate::io::RangeReader;

pub use s3::{create_s3_client, S3RasterSource, DEFAULT_PRESIGN_TTL_SECS};

/// Trait for opening range readers from raster identifiers.
///
/// Implementations hold only immutable, cloneable handles (e.g. an S3 client),
/// so one source can serve any number of concurrent requests.
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// The type of range reader this source creates.
    type Reader: RangeReader + 'static;

    /// Open a range reader for `raster_id`.
    ///
    /// Returns `IoError::NotFound` if the raster does not exist.
    async fn create_reader(&self, raster_id: &str) -> Result<Self::Reader, IoError>;
}
