//! Raster decoding collaborator.
//!
//! The tile pipeline only needs four facts about a source raster (size, band
//! count, geotransform) and one operation (decode a pixel window). Those are
//! captured by the [`RasterAccessor`] trait; [`GeoTiffRaster`] implements it for
//! (Cloud-Optimized) GeoTIFF files read through a [`RangeReader`].
//!
//! [`RangeReader`]: crate::io::RangeReader

mod geotiff;
mod geotransform;

use async_trait::async_trait;

use crate::error::RasterError;
use crate::tile::PixelWindow;

pub use geotiff::{normalize_samples, GeoTiffRaster};
pub use geotransform::GeoTransform;

/// Per-band pixel arrays for one decoded window.
///
/// Samples are always 8-bit. Sources with deeper samples are normalized on
/// decode (see [`normalize_samples`]). Each band is row-major, top-to-bottom,
/// and should hold `width * height` samples; the tile pipeline checks this
/// before compositing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandSet {
    width: u32,
    height: u32,
    bands: Vec<Vec<u8>>,
}

impl BandSet {
    pub fn new(width: u32, height: u32, bands: Vec<Vec<u8>>) -> Self {
        Self {
            width,
            height,
            bands,
        }
    }

    /// A band set where every band is filled with one constant value.
    pub fn filled(width: u32, height: u32, values: &[u8]) -> Self {
        let len = width as usize * height as usize;
        let bands = values.iter().map(|&v| vec![v; len]).collect();
        Self::new(width, height, bands)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Samples of band `index`, or `None` past the last band.
    pub fn band(&self, index: usize) -> Option<&[u8]> {
        self.bands.get(index).map(Vec::as_slice)
    }

    pub fn bands(&self) -> &[Vec<u8>] {
        &self.bands
    }
}

/// Format-agnostic access to a decoded raster.
///
/// One accessor is opened per tile request and dropped with it.
#[async_trait]
pub trait RasterAccessor: Send + Sync {
    /// Raster width in pixels.
    fn width(&self) -> u32;

    /// Raster height in pixels.
    fn height(&self) -> u32;

    /// Number of bands (samples per pixel).
    fn band_count(&self) -> usize;

    /// Affine mapping from pixel space to projected coordinates.
    fn geotransform(&self) -> GeoTransform;

    /// Decode `window` into one array per band.
    ///
    /// The window must lie inside the raster.
    async fn read_window(&self, window: &PixelWindow) -> Result<BandSet, RasterError>;
}
