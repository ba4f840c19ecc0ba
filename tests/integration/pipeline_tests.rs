//! Tile pipeline integration tests.
//!
//! These exercise `TileService` directly: window clipping, pixel fidelity,
//! sample normalization, read efficiency and concurrent use.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tiff::encoder::colortype;

use geotile_streamer::error::TileError;
use geotile_streamer::tile::{
    BBox, PixelWindow, TileAddress, TileFormat, TileRequest, TileScheme, TileService,
};

use super::test_utils::*;

fn request(raster_id: &str, zoom: u8, column: i64, row: i64) -> TileRequest {
    TileRequest::new(raster_id, TileAddress::new(zoom, column, row))
}

// =============================================================================
// Window Clipping
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_partial_overlap_is_clipped() {
    // Raster covers only the north-east quadrant
    let source = MockRasterSource::new().with_raster(
        "ne.tif",
        solid_rgb_geotiff(128, 128, [200, 100, 50], BBox::new(0.0, 0.0, H, H)),
    );
    let service = TileService::new(source);

    let response = service.get_tile(request("ne.tif", 0, 0, 0)).await.unwrap();

    assert_eq!(response.window, PixelWindow::new(0, 0, 128, 128));
    let img = decode_rgba(&response.data);
    assert_eq!(img.dimensions(), (128, 128));
    assert_eq!(img.get_pixel(127, 127).0, [200, 100, 50, 255]);

    // The matching z1 tile covers the raster exactly
    let response = service.get_tile(request("ne.tif", 1, 1, 0)).await.unwrap();
    assert_eq!(response.window, PixelWindow::new(0, 0, 128, 128));

    // The opposite quadrant misses it
    let err = service
        .get_tile(request("ne.tif", 1, 0, 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TileError::EmptyWindow {
            zoom: 1,
            column: 0,
            row: 1
        }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tile_straddling_raster_edge() {
    // 100 px wide raster covering x in [0, H/2]; the z1 east tile sees all of it
    let bbox = BBox::new(0.0, 0.0, H / 2.0, H / 2.0);
    let source = MockRasterSource::new()
        .with_raster("small.tif", solid_rgb_geotiff(100, 100, [1, 1, 1], bbox));
    let service = TileService::new(source);

    let response = service.get_tile(request("small.tif", 1, 1, 0)).await.unwrap();
    assert_eq!(response.window, PixelWindow::new(0, 0, 100, 100));

    // z2 (2, 1) covers x in [0, H/2], y in [0, H/2]
    let response = service.get_tile(request("small.tif", 2, 2, 1)).await.unwrap();
    assert_eq!(response.window, PixelWindow::new(0, 0, 100, 100));

    // z2 (3, 1) starts exactly at the raster's right edge
    let err = service
        .get_tile(request("small.tif", 2, 3, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, TileError::EmptyWindow { .. }));
}

// =============================================================================
// Pixel Fidelity
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_gradient_pixels_survive_pipeline() {
    let source = MockRasterSource::new()
        .with_raster("gradient.tif", gradient_geotiff(1024, 1024, world_bbox(), 16));
    let service = TileService::new(source);

    // z2 tile (1, 2) is pixels [256, 512) x [512, 768)
    let response = service
        .get_tile(request("gradient.tif", 2, 1, 2))
        .await
        .unwrap();
    assert_eq!(response.window, PixelWindow::new(256, 512, 512, 768));

    let img = decode_rgba(&response.data);
    assert_eq!(img.dimensions(), (256, 256));
    for (x, y) in [(0u32, 0u32), (17, 200), (255, 3), (128, 255)] {
        let expected = [x as u8, y as u8, (x ^ y) as u8, 255];
        assert_eq!(img.get_pixel(x, y).0, expected, "pixel ({}, {})", x, y);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tiles_match_between_formats() {
    let source = MockRasterSource::new()
        .with_raster("solid.tif", solid_rgb_geotiff(256, 256, [120, 60, 30], world_bbox()));
    let service = TileService::new(source);

    let png = service.get_tile(request("solid.tif", 0, 0, 0)).await.unwrap();
    let jpeg = service
        .get_tile(
            request("solid.tif", 0, 0, 0)
                .with_format(TileFormat::Jpeg)
                .with_quality(100),
        )
        .await
        .unwrap();

    assert_eq!(png.content_type, "image/png");
    assert_eq!(jpeg.content_type, "image/jpeg");
    assert_eq!(png.window, jpeg.window);

    let png_px = decode_rgba(&png.data).get_pixel(100, 100).0;
    let jpeg_px = decode_rgba(&jpeg.data).get_pixel(100, 100).0;
    for channel in 0..3 {
        assert!((png_px[channel] as i32 - jpeg_px[channel] as i32).abs() <= 2);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_custom_tile_scheme() {
    let source = MockRasterSource::new()
        .with_raster("solid.tif", solid_rgb_geotiff(512, 512, [9, 9, 9], world_bbox()));
    let service = TileService::new(source).with_scheme(TileScheme::new(512, H));

    let response = service.get_tile(request("solid.tif", 1, 0, 0)).await.unwrap();
    assert_eq!(response.window, PixelWindow::new(0, 0, 256, 256));
}

// =============================================================================
// Sample Normalization
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_u16_samples_are_rescaled() {
    let samples: Vec<u16> = [0u16, 32768, 65535].repeat(64 * 64);
    let data = write_geotiff::<colortype::RGB16>(64, 64, &samples, world_bbox(), 16);
    let service = TileService::new(MockRasterSource::new().with_raster("u16.tif", data));

    let response = service.get_tile(request("u16.tif", 0, 0, 0)).await.unwrap();

    let img = decode_rgba(&response.data);
    assert_eq!(img.get_pixel(10, 10).0, [0, 128, 255, 255]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_float_samples_are_clipped() {
    let samples: Vec<f32> = [-5.0f32, 127.6, 300.0].repeat(64 * 64);
    let data = write_geotiff::<colortype::RGB32Float>(64, 64, &samples, world_bbox(), 16);
    let service = TileService::new(MockRasterSource::new().with_raster("f32.tif", data));

    let response = service.get_tile(request("f32.tif", 0, 0, 0)).await.unwrap();

    let img = decode_rgba(&response.data);
    assert_eq!(img.get_pixel(0, 63).0, [0, 128, 255, 255]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fourth_band_is_ignored() {
    let samples: Vec<u8> = [40u8, 50, 60, 0].repeat(64 * 64);
    let data = write_geotiff::<colortype::RGBA8>(64, 64, &samples, world_bbox(), 16);
    let service = TileService::new(MockRasterSource::new().with_raster("rgba.tif", data));

    let response = service.get_tile(request("rgba.tif", 0, 0, 0)).await.unwrap();

    // Source alpha is dropped and the output is fully opaque
    let img = decode_rgba(&response.data);
    assert_eq!(img.get_pixel(32, 32).0, [40, 50, 60, 255]);

    let metadata = service.raster_metadata("rgba.tif").await.unwrap();
    assert_eq!(metadata.band_count, 4);
}

// =============================================================================
// Read Efficiency
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_tile_reads_only_needed_bytes() {
    let data = gradient_geotiff(1024, 1024, world_bbox(), 16);
    let file_size = data.len() as u64;

    let source = MockRasterSource::new().with_raster("big.tif", data);
    let stats = source.stats();
    let service = TileService::new(source).with_block_cache(16 * 1024, 256);

    // Top-left z2 tile touches the first quarter of the strips
    let response = service.get_tile(request("big.tif", 2, 0, 0)).await.unwrap();
    assert_eq!(response.window, PixelWindow::new(0, 0, 256, 256));

    let fetched = stats.bytes.load(Ordering::SeqCst);
    assert!(fetched > 0);
    assert!(
        fetched < file_size / 2,
        "fetched {} of {} bytes",
        fetched,
        file_size
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_each_request_opens_its_own_reader() {
    let source = MockRasterSource::new()
        .with_raster("solid.tif", solid_rgb_geotiff(64, 64, [1, 2, 3], world_bbox()));
    let stats = source.stats();
    let service = TileService::new(source);

    for _ in 0..3 {
        service.get_tile(request("solid.tif", 0, 0, 0)).await.unwrap();
    }

    assert_eq!(stats.readers_opened.load(Ordering::SeqCst), 3);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tiles() {
    let source = MockRasterSource::new()
        .with_raster("gradient.tif", gradient_geotiff(1024, 1024, world_bbox(), 32));
    let service = Arc::new(TileService::new(source));

    let mut handles = Vec::new();
    for column in 0..4i64 {
        for row in 0..4i64 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let response = service
                    .get_tile(request("gradient.tif", 2, column, row))
                    .await
                    .unwrap();
                (column, row, response)
            }));
        }
    }

    for handle in handles {
        let (column, row, response) = handle.await.unwrap();
        let left = column as u32 * 256;
        let top = row as u32 * 256;
        assert_eq!(
            response.window,
            PixelWindow::new(left, top, left + 256, top + 256)
        );

        // Tile origins are multiples of 256, so local and global low bytes agree
        let img = decode_rgba(&response.data);
        assert_eq!(img.get_pixel(5, 9).0, [5, 9, 5 ^ 9, 255]);
    }
}

// =============================================================================
// Tile Seams
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_neighbouring_tiles_leave_no_gap() {
    // 1001 px does not divide evenly into 8 tiles, so edges fall mid-pixel
    let source = MockRasterSource::new()
        .with_raster("odd.tif", solid_rgb_geotiff(1001, 1001, [7, 7, 7], world_bbox()));
    let service = TileService::new(source);

    let mut windows = Vec::new();
    for column in 0..8 {
        let response = service.get_tile(request("odd.tif", 3, column, 5)).await.unwrap();
        windows.push(response.window);
    }

    assert_eq!(windows[0].left, 0);
    assert_eq!(windows[7].right, 1001);
    for pair in windows.windows(2) {
        assert!(pair[0].right >= pair[1].left, "gap between {} and {}", pair[0], pair[1]);
        assert!(pair[0].right - pair[1].left <= 1);
        assert_eq!(pair[0].top, pair[1].top);
        assert_eq!(pair[0].bottom, pair[1].bottom);
    }
}
