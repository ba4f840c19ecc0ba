//! Window reads with band-shape validation.

use tracing::debug;

use super::window::PixelWindow;
use crate::error::TileError;
use crate::raster::{BandSet, RasterAccessor};

/// Decode `window` through `accessor` and check the result's shape.
///
/// The band set must declare the window's width and height, and every band
/// must hold exactly `window.width() * window.height()` samples. A mismatch is
/// reported as `BandShapeMismatch` or `BandLengthMismatch` rather than being
/// padded or truncated.
pub async fn read_window<A>(accessor: &A, window: &PixelWindow) -> Result<BandSet, TileError>
where
    A: RasterAccessor + ?Sized,
{
    let bands = accessor.read_window(window).await?;
    validate_band_set(&bands, window)?;

    debug!(
        window = %window,
        bands = bands.band_count(),
        "Read raster window"
    );

    Ok(bands)
}

/// Check that every band in `bands` covers `window` exactly.
pub fn validate_band_set(bands: &BandSet, window: &PixelWindow) -> Result<(), TileError> {
    if bands.width() != window.width() || bands.height() != window.height() {
        return Err(TileError::BandShapeMismatch {
            expected_width: window.width(),
            expected_height: window.height(),
            actual_width: bands.width(),
            actual_height: bands.height(),
        });
    }

    let expected = window.pixel_count();

    for (index, band) in bands.bands().iter().enumerate() {
        if band.len() != expected {
            return Err(TileError::BandLengthMismatch {
                band: index,
                expected,
                actual: band.len(),
            });
        }
    }

    Ok(())
}
