//! GeoTIFF raster accessor.
//!
//! Reads (Cloud-Optimized) GeoTIFF through a [`RangeReader`] with the `tiff`
//! crate decoder. Only the internal tiles or strips that intersect a requested
//! window are decoded.
//!
//! The decoder is synchronous, so header parsing and window decoding run on
//! tokio's blocking pool with a [`BlockingReader`] driving the async reads.
//! A per-raster [`BlockCache`] coalesces the decoder's small reads into
//! block-sized range requests.

use std::io::{Read, Seek};
use std::sync::Arc;

use async_trait::async_trait;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;
use tokio::runtime::Handle;
use tracing::debug;

use super::{BandSet, GeoTransform, RasterAccessor};
use crate::error::RasterError;
use crate::io::{BlockCache, BlockingReader, RangeReader, DEFAULT_BLOCK_CAPACITY, DEFAULT_BLOCK_SIZE};
use crate::tile::PixelWindow;

/// Layout facts read once from the TIFF header.
#[derive(Debug, Clone, Copy)]
struct Layout {
    width: u32,
    height: u32,
    samples_per_pixel: usize,
    chunk_width: u32,
    chunk_height: u32,
}

/// A GeoTIFF opened for windowed reads.
pub struct GeoTiffRaster<R> {
    reader: Arc<BlockCache<R>>,
    layout: Layout,
    geotransform: GeoTransform,
}

impl<R: RangeReader + 'static> GeoTiffRaster<R> {
    /// Open a raster with the default block size and capacity.
    pub async fn open(reader: R) -> Result<Self, RasterError> {
        Self::open_with_cache(reader, DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_CAPACITY).await
    }

    /// Open a raster, coalescing reads into `block_size`-byte blocks and
    /// holding at most `block_capacity` of them.
    pub async fn open_with_cache(
        reader: R,
        block_size: usize,
        block_capacity: usize,
    ) -> Result<Self, RasterError> {
        let reader = Arc::new(BlockCache::with_capacity(reader, block_size, block_capacity));

        let (layout, geotransform) = run_blocking(Arc::clone(&reader), |mut decoder| {
            let layout = read_layout(&mut decoder)?;
            let geotransform = read_geotransform(&mut decoder)?;
            Ok((layout, geotransform))
        })
        .await?;

        debug!(
            raster = reader.identifier(),
            width = layout.width,
            height = layout.height,
            bands = layout.samples_per_pixel,
            chunk_width = layout.chunk_width,
            chunk_height = layout.chunk_height,
            "Opened GeoTIFF"
        );

        Ok(Self {
            reader,
            layout,
            geotransform,
        })
    }

    /// Identifier of the underlying object.
    pub fn identifier(&self) -> &str {
        self.reader.identifier()
    }

    /// Internal tile (or strip) size as `(width, height)`.
    pub fn chunk_size(&self) -> (u32, u32) {
        (self.layout.chunk_width, self.layout.chunk_height)
    }
}

#[async_trait]
impl<R: RangeReader + 'static> RasterAccessor for GeoTiffRaster<R> {
    fn width(&self) -> u32 {
        self.layout.width
    }

    fn height(&self) -> u32 {
        self.layout.height
    }

    fn band_count(&self) -> usize {
        self.layout.samples_per_pixel
    }

    fn geotransform(&self) -> GeoTransform {
        self.geotransform
    }

    async fn read_window(&self, window: &PixelWindow) -> Result<BandSet, RasterError> {
        let layout = self.layout;
        if window.right > layout.width || window.bottom > layout.height {
            return Err(RasterError::WindowOutOfBounds {
                left: window.left,
                top: window.top,
                right: window.right,
                bottom: window.bottom,
                width: layout.width,
                height: layout.height,
            });
        }
        if window.is_empty() {
            return Ok(BandSet::new(
                window.width(),
                window.height(),
                vec![Vec::new(); layout.samples_per_pixel],
            ));
        }

        let fetches_before = self.reader.fetch_count();
        let window = *window;
        let bands = run_blocking(Arc::clone(&self.reader), move |mut decoder| {
            decode_window(&mut decoder, &layout, &window)
        })
        .await?;

        debug!(
            raster = self.reader.identifier(),
            window = %window,
            range_requests = self.reader.fetch_count() - fetches_before,
            "Decoded raster window"
        );

        Ok(BandSet::new(window.width(), window.height(), bands))
    }
}

/// Run `f` against a fresh decoder on the blocking pool.
async fn run_blocking<R, T, F>(reader: Arc<BlockCache<R>>, f: F) -> Result<T, RasterError>
where
    R: RangeReader + 'static,
    T: Send + 'static,
    F: FnOnce(Decoder<BlockingReader<BlockCache<R>>>) -> Result<T, RasterError> + Send + 'static,
{
    let handle = Handle::current();
    tokio::task::spawn_blocking(move || {
        let decoder = Decoder::new(BlockingReader::new(reader, handle))?;
        f(decoder)
    })
    .await
    .map_err(|e| RasterError::Task(e.to_string()))?
}

fn read_layout<T: Read + Seek>(decoder: &mut Decoder<T>) -> Result<Layout, RasterError> {
    let (width, height) = decoder.dimensions()?;

    let samples_per_pixel = match decoder.colortype()? {
        ColorType::Gray(_) => 1,
        ColorType::GrayA(_) => 2,
        ColorType::RGB(_) => 3,
        ColorType::RGBA(_) => 4,
        other => {
            return Err(RasterError::UnsupportedSampleFormat(format!(
                "color type {:?}",
                other
            )))
        }
    };

    let planar = decoder
        .find_tag(Tag::PlanarConfiguration)?
        .and_then(|v| v.into_u16().ok())
        .unwrap_or(1);
    if planar != 1 {
        return Err(RasterError::UnsupportedSampleFormat(
            "planar (band-sequential) layout".to_string(),
        ));
    }

    let (chunk_width, chunk_height) = decoder.chunk_dimensions();

    Ok(Layout {
        width,
        height,
        samples_per_pixel,
        chunk_width: chunk_width.max(1),
        chunk_height: chunk_height.max(1),
    })
}

fn read_geotransform<T: Read + Seek>(
    decoder: &mut Decoder<T>,
) -> Result<GeoTransform, RasterError> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok();
    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        return GeoTransform::from_tiepoint(&scale, &tiepoint);
    }

    if let Ok(matrix) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        return GeoTransform::from_transformation(&matrix);
    }

    Err(RasterError::MissingGeoreference(
        "no ModelPixelScale/ModelTiepoint or ModelTransformation tags".to_string(),
    ))
}

/// Decode the chunks covering `window` and split them into per-band arrays.
fn decode_window<T: Read + Seek>(
    decoder: &mut Decoder<T>,
    layout: &Layout,
    window: &PixelWindow,
) -> Result<Vec<Vec<u8>>, RasterError> {
    let spp = layout.samples_per_pixel;
    let out_width = window.width() as usize;
    let mut bands = vec![vec![0u8; out_width * window.height() as usize]; spp];

    let chunks_across = layout.width.div_ceil(layout.chunk_width);
    let first_col = window.left / layout.chunk_width;
    let last_col = (window.right - 1) / layout.chunk_width;
    let first_row = window.top / layout.chunk_height;
    let last_row = (window.bottom - 1) / layout.chunk_height;

    for chunk_row in first_row..=last_row {
        for chunk_col in first_col..=last_col {
            let index = chunk_row * chunks_across + chunk_col;
            let (data_width, data_height) = decoder.chunk_data_dimensions(index);
            let samples = normalize_samples(decoder.read_chunk(index)?)?;

            let chunk_x = chunk_col * layout.chunk_width;
            let chunk_y = chunk_row * layout.chunk_height;

            let x0 = window.left.max(chunk_x);
            let x1 = window.right.min(chunk_x + data_width);
            let y0 = window.top.max(chunk_y);
            let y1 = window.bottom.min(chunk_y + data_height);

            for y in y0..y1 {
                let src_row = (y - chunk_y) as usize * data_width as usize;
                let dst_row = (y - window.top) as usize * out_width;
                for x in x0..x1 {
                    let src = (src_row + (x - chunk_x) as usize) * spp;
                    let dst = dst_row + (x - window.left) as usize;
                    let pixel = samples.get(src..src + spp).ok_or_else(|| {
                        RasterError::Tiff(format!(
                            "chunk {} holds {} samples, too few for {}x{}",
                            index,
                            samples.len(),
                            data_width,
                            data_height
                        ))
                    })?;
                    for (band, &value) in bands.iter_mut().zip(pixel) {
                        band[dst] = value;
                    }
                }
            }
        }
    }

    Ok(bands)
}

/// Convert decoded samples to 8 bits.
///
/// - `u8` passes through.
/// - `u16` is rescaled linearly: `round(v * 255 / 65535)`.
/// - `f32`/`f64` are clipped to `[0, 255]` and rounded; NaN becomes 0.
///
/// Any other sample type is rejected.
pub fn normalize_samples(result: DecodingResult) -> Result<Vec<u8>, RasterError> {
    match result {
        DecodingResult::U8(data) => Ok(data),
        DecodingResult::U16(data) => Ok(data.into_iter().map(scale_u16).collect()),
        DecodingResult::F32(data) => Ok(data.into_iter().map(|v| clip_float(v as f64)).collect()),
        DecodingResult::F64(data) => Ok(data.into_iter().map(clip_float).collect()),
        _ => Err(RasterError::UnsupportedSampleFormat(
            "only u8, u16, f32 and f64 samples can be rendered".to_string(),
        )),
    }
}

#[inline]
fn scale_u16(value: u16) -> u8 {
    ((value as u32 * 255 + 32_767) / 65_535) as u8
}

#[inline]
fn clip_float(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.clamp(0.0, 255.0).round() as u8
    }
}
