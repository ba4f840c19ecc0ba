//! Band compositing into interleaved pixel buffers.

use crate::error::TileError;
use crate::raster::BandSet;

/// Alpha written for every pixel in RGBA output.
pub const OPAQUE_ALPHA: u8 = 255;

/// Bands consumed by the compositor (red, green, blue).
pub const REQUIRED_BANDS: usize = 3;

/// Channel order of a packed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Rgb,
    Rgba,
}

impl ChannelLayout {
    pub fn channels(&self) -> usize {
        match self {
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
        }
    }
}

/// Interleaved 8-bit pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    layout: ChannelLayout,
}

impl PackedPixelBuffer {
    /// Wrap already-interleaved pixels. The length is checked at encode time.
    pub fn new(data: Vec<u8>, width: u32, height: u32, layout: ChannelLayout) -> Self {
        Self {
            data,
            width,
            height,
            layout,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Interleave the first three bands into a `width x height` buffer.
///
/// Bands beyond the third are ignored, so a source alpha band never leaks
/// into the output. With [`ChannelLayout::Rgba`] every pixel gets
/// [`OPAQUE_ALPHA`].
pub fn composite(
    bands: &BandSet,
    width: u32,
    height: u32,
    layout: ChannelLayout,
) -> Result<PackedPixelBuffer, TileError> {
    if bands.band_count() < REQUIRED_BANDS {
        return Err(TileError::InsufficientBands {
            required: REQUIRED_BANDS,
            available: bands.band_count(),
        });
    }

    let pixels = width as usize * height as usize;
    let mut planes: [&[u8]; REQUIRED_BANDS] = [&[]; REQUIRED_BANDS];
    for (index, plane) in planes.iter_mut().enumerate() {
        let band = bands.band(index).unwrap_or_default();
        if band.len() != pixels {
            return Err(TileError::BandLengthMismatch {
                band: index,
                expected: pixels,
                actual: band.len(),
            });
        }
        *plane = band;
    }
    let [red, green, blue] = planes;

    let mut data = Vec::with_capacity(pixels * layout.channels());
    let rgb = red.iter().zip(green).zip(blue);
    match layout {
        ChannelLayout::Rgb => {
            for ((&r, &g), &b) in rgb {
                data.extend_from_slice(&[r, g, b]);
            }
        }
        ChannelLayout::Rgba => {
            for ((&r, &g), &b) in rgb {
                data.extend_from_slice(&[r, g, b, OPAQUE_ALPHA]);
            }
        }
    }

    Ok(PackedPixelBuffer {
        data,
        width,
        height,
        layout,
    })
}
