//! Test utilities for integration tests.
//!
//! This module provides a mock raster source and helpers for writing small
//! synthetic GeoTIFFs and driving the router.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::RgbaImage;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tiff::encoder::{colortype, TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tower::ServiceExt;

use geotile_streamer::error::IoError;
use geotile_streamer::io::RangeReader;
use geotile_streamer::source::RasterSource;
use geotile_streamer::tile::{BBox, WEB_MERCATOR_HALF_EXTENT};

pub const H: f64 = WEB_MERCATOR_HALF_EXTENT;

// =============================================================================
// Mock Range Reader with Request Tracking
// =============================================================================

/// Shared counters for every reader a source hands out.
#[derive(Default)]
pub struct ReadStats {
    pub readers_opened: AtomicUsize,
    pub requests: AtomicUsize,
    pub bytes: AtomicU64,
}

/// A mock range reader that counts read requests and bytes served.
pub struct TrackingMockReader {
    data: Bytes,
    identifier: String,
    stats: Arc<ReadStats>,
}

#[async_trait]
impl RangeReader for TrackingMockReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.stats.requests.fetch_add(1, Ordering::SeqCst);
        self.stats.bytes.fetch_add(len as u64, Ordering::SeqCst);

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Mock Raster Source
// =============================================================================

/// A mock raster source that serves pre-configured raster files.
pub struct MockRasterSource {
    rasters: HashMap<String, Bytes>,
    stats: Arc<ReadStats>,
}

impl MockRasterSource {
    pub fn new() -> Self {
        Self {
            rasters: HashMap::new(),
            stats: Arc::new(ReadStats::default()),
        }
    }

    pub fn with_raster(mut self, raster_id: impl Into<String>, data: Vec<u8>) -> Self {
        self.rasters.insert(raster_id.into(), Bytes::from(data));
        self
    }

    pub fn stats(&self) -> Arc<ReadStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl RasterSource for MockRasterSource {
    type Reader = TrackingMockReader;

    async fn create_reader(&self, raster_id: &str) -> Result<Self::Reader, IoError> {
        let data = self
            .rasters
            .get(raster_id)
            .cloned()
            .ok_or_else(|| IoError::NotFound(format!("mock://{}", raster_id)))?;

        self.stats.readers_opened.fetch_add(1, Ordering::SeqCst);
        Ok(TrackingMockReader {
            data,
            identifier: format!("mock://{}", raster_id),
            stats: Arc::clone(&self.stats),
        })
    }
}

// =============================================================================
// GeoTIFF Builders
// =============================================================================

/// The full Web Mercator square.
pub fn world_bbox() -> BBox {
    BBox::new(-H, -H, H, H)
}

/// Write a strip GeoTIFF covering `bbox` with the given interleaved samples.
pub fn write_geotiff<C>(
    width: u32,
    height: u32,
    samples: &[C::Inner],
    bbox: BBox,
    rows_per_strip: u32,
) -> Vec<u8>
where
    C: colortype::ColorType,
    [C::Inner]: TiffValue,
{
    let scale = [
        bbox.width() / width as f64,
        bbox.height() / height as f64,
        0.0,
    ];
    let tiepoint = [0.0, 0.0, 0.0, bbox.min_x, bbox.max_y, 0.0];

    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).unwrap();
        let mut image = encoder.new_image::<C>(width, height).unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &scale[..])
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
            .unwrap();
        image.rows_per_strip(rows_per_strip).unwrap();
        image.write_data(samples).unwrap();
    }
    buf.into_inner()
}

/// RGB8 GeoTIFF where every pixel is `rgb`.
pub fn solid_rgb_geotiff(width: u32, height: u32, rgb: [u8; 3], bbox: BBox) -> Vec<u8> {
    let samples = rgb.repeat((width * height) as usize);
    write_geotiff::<colortype::RGB8>(width, height, &samples, bbox, 64)
}

/// RGB8 GeoTIFF where pixel (x, y) is `(x, y, x ^ y)` truncated to u8.
pub fn gradient_geotiff(width: u32, height: u32, bbox: BBox, rows_per_strip: u32) -> Vec<u8> {
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            samples.extend_from_slice(&[x as u8, y as u8, (x ^ y) as u8]);
        }
    }
    write_geotiff::<colortype::RGB8>(width, height, &samples, bbox, rows_per_strip)
}

/// Single-band 8-bit GeoTIFF.
pub fn gray_geotiff(width: u32, height: u32, value: u8, bbox: BBox) -> Vec<u8> {
    let samples = vec![value; (width * height) as usize];
    write_geotiff::<colortype::Gray8>(width, height, &samples, bbox, 64)
}

// =============================================================================
// Image Helpers
// =============================================================================

/// Check if data is a valid PNG (signature).
pub fn is_valid_png(data: &[u8]) -> bool {
    data.starts_with(b"\x89PNG\r\n\x1a\n")
}

/// Check if data is a valid JPEG (SOI and EOI markers).
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4
        && data[0] == 0xFF
        && data[1] == 0xD8
        && data[data.len() - 2] == 0xFF
        && data[data.len() - 1] == 0xD9
}

pub fn decode_rgba(data: &[u8]) -> RgbaImage {
    image::load_from_memory(data).unwrap().to_rgba8()
}

// =============================================================================
// Router Helpers
// =============================================================================

/// Issue a GET through the router and collect the whole response.
pub async fn get(router: Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

/// Parse a JSON error body and return its `error` field.
pub fn error_type(body: &[u8]) -> String {
    let json: serde_json::Value = serde_json::from_slice(body).unwrap();
    json["error"].as_str().unwrap().to_string()
}
