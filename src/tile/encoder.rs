//! Tile image encoder.
//!
//! Turns a composited pixel buffer into PNG or JPEG bytes.
//!
//! # Design Decisions
//!
//! - **PNG by default**: PNG keeps the alpha channel and is lossless. JPEG
//!   drops alpha and is encoded from an RGB buffer.
//!
//! - **No resizing**: The encoded image has the buffer's dimensions, which are
//!   the dimensions of the resolved pixel window.
//!
//! - **Quality control**: JPEG quality is configurable per request. PNG
//!   ignores it.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::compositor::{ChannelLayout, PackedPixelBuffer};
use crate::error::TileError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Tile Format
// =============================================================================

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileFormat {
    #[default]
    Png,
    Jpeg,
}

impl TileFormat {
    /// Format for a file extension (`png`, `jpg`, `jpeg`), case-insensitive.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(TileFormat::Png),
            "jpg" | "jpeg" => Some(TileFormat::Jpeg),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TileFormat::Png => "image/png",
            TileFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpeg => "jpg",
        }
    }

    /// Channel layout the encoder expects for this format.
    pub fn layout(&self) -> ChannelLayout {
        match self {
            TileFormat::Png => ChannelLayout::Rgba,
            TileFormat::Jpeg => ChannelLayout::Rgb,
        }
    }
}

/// Encoded image bytes with their MIME type.
#[derive(Debug, Clone)]
pub struct EncodedTile {
    pub data: Bytes,
    pub content_type: &'static str,
}

// =============================================================================
// Encoder
// =============================================================================

/// Stateless PNG/JPEG encoder for composited tiles.
///
/// # Example
///
/// ```ignore
/// use geotile_streamer::tile::{ImageTileEncoder, TileFormat};
///
/// let encoder = ImageTileEncoder::new();
/// let tile = encoder.encode(&buffer, TileFormat::Jpeg, 85)?;
/// assert_eq!(tile.content_type, "image/jpeg");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImageTileEncoder {}

impl ImageTileEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Encode `buffer` as `format`.
    ///
    /// `quality` only applies to JPEG and is clamped to 1-100.
    ///
    /// # Errors
    ///
    /// Returns `TileError::Encode` if:
    /// - The buffer length does not match its dimensions and layout
    /// - JPEG is requested for an RGBA buffer
    /// - The underlying codec fails
    pub fn encode(
        &self,
        buffer: &PackedPixelBuffer,
        format: TileFormat,
        quality: u8,
    ) -> Result<EncodedTile, TileError> {
        let (width, height) = (buffer.width(), buffer.height());
        let expected = width as usize * height as usize * buffer.layout().channels();
        if buffer.data().len() != expected {
            return Err(TileError::Encode {
                message: format!(
                    "buffer holds {} bytes, {}x{} {:?} needs {}",
                    buffer.data().len(),
                    width,
                    height,
                    buffer.layout(),
                    expected
                ),
            });
        }

        let color_type = match buffer.layout() {
            ChannelLayout::Rgb => ExtendedColorType::Rgb8,
            ChannelLayout::Rgba => ExtendedColorType::Rgba8,
        };

        let mut output = Vec::new();
        match format {
            TileFormat::Png => {
                PngEncoder::new(&mut output)
                    .write_image(buffer.data(), width, height, color_type)
                    .map_err(|e| TileError::Encode {
                        message: e.to_string(),
                    })?;
            }
            TileFormat::Jpeg => {
                if buffer.layout() != ChannelLayout::Rgb {
                    return Err(TileError::Encode {
                        message: "JPEG output requires an RGB buffer".to_string(),
                    });
                }
                let mut encoder = JpegEncoder::new_with_quality(&mut output, clamp_quality(quality));
                encoder
                    .encode(buffer.data(), width, height, color_type)
                    .map_err(|e| TileError::Encode {
                        message: e.to_string(),
                    })?;
            }
        }

        Ok(EncodedTile {
            data: Bytes::from(output),
            content_type: format.content_type(),
        })
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
///
/// Values below 1 become 1, values above 100 become 100.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
