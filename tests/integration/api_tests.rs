//! HTTP API integration tests.
//!
//! These drive the full router against in-memory GeoTIFFs and check status
//! codes, headers and decoded tile contents.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use geotile_streamer::server::{create_router, RouterConfig};
use geotile_streamer::tile::{BBox, TileService};

use super::test_utils::*;

fn world_router(config: RouterConfig) -> Router {
    let source = MockRasterSource::new()
        .with_raster("world.tif", solid_rgb_geotiff(256, 256, [10, 20, 30], world_bbox()))
        .with_raster("gray.tif", gray_geotiff(256, 256, 99, world_bbox()))
        .with_raster("scenes/2024/world.tif", solid_rgb_geotiff(64, 64, [1, 2, 3], world_bbox()))
        .with_raster("corrupt.tif", b"definitely not a tiff".to_vec());

    create_router(TileService::new(source), config)
}

fn router() -> Router {
    world_router(RouterConfig::new())
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (status, headers, body) = get(router(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

// =============================================================================
// Tile Success Paths
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_world_tile_png() {
    let (status, headers, body) = get(router(), "/tiles/world.tif/0/0/0.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(headers["x-tile-window"], "0,0,256,256");
    assert!(is_valid_png(&body));

    let img = decode_rgba(&body);
    assert_eq!(img.dimensions(), (256, 256));
    assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 255]);
    assert_eq!(img.get_pixel(255, 255).0, [10, 20, 30, 255]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tile_without_extension_is_png() {
    let (status, headers, body) = get(router(), "/tiles/world.tif/1/1/1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers["x-tile-window"], "128,128,256,256");
    assert!(is_valid_png(&body));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_jpeg_tile_with_quality() {
    let (status, headers, body) = get(router(), "/tiles/world.tif/1/0/1.jpg?quality=95").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(headers["x-tile-window"], "0,128,128,256");
    assert!(is_valid_jpeg(&body));

    let img = decode_rgba(&body);
    assert_eq!(img.dimensions(), (128, 128));
    let [r, g, b, a] = img.get_pixel(64, 64).0;
    assert!((r as i32 - 10).abs() <= 3);
    assert!((g as i32 - 20).abs() <= 3);
    assert!((b as i32 - 30).abs() <= 3);
    assert_eq!(a, 255);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_jpeg_extension_alias() {
    let (status, headers, _) = get(router(), "/tiles/world.tif/0/0/0.jpeg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_higher_quality_gives_larger_jpeg() {
    let source = MockRasterSource::new().with_raster(
        "gradient.tif",
        gradient_geotiff(256, 256, world_bbox(), 32),
    );
    let router = create_router(TileService::new(source), RouterConfig::new());

    let (_, _, low) = get(router.clone(), "/tiles/gradient.tif/0/0/0.jpg?quality=10").await;
    let (_, _, high) = get(router, "/tiles/gradient.tif/0/0/0.jpg?quality=100").await;

    assert!(is_valid_jpeg(&low));
    assert!(is_valid_jpeg(&high));
    assert!(high.len() > low.len());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_percent_encoded_raster_id() {
    let (status, headers, body) = get(router(), "/tiles/scenes%2F2024%2Fworld.tif/0/0/0.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-tile-window"], "0,0,64,64");
    assert_eq!(decode_rgba(&body).get_pixel(0, 0).0, [1, 2, 3, 255]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_custom_cache_max_age() {
    let router = world_router(RouterConfig::new().with_cache_max_age(60));
    let (status, headers, _) = get(router, "/tiles/world.tif/0/0/0.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_default_quality_applies() {
    let router = world_router(RouterConfig::new().with_default_quality(0));

    // A zero default is rejected at render time, so the request must carry its own
    let (status, _, body) = get(router.clone(), "/tiles/world.tif/0/0/0.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_type(&body), "invalid_quality");

    let (status, _, _) = get(router, "/tiles/world.tif/0/0/0.jpg?quality=50").await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Default Raster Route
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_default_raster_route() {
    let router =
        world_router(RouterConfig::new().with_default_raster(Some("world.tif".to_string())));
    let (status, headers, body) = get(router, "/tiles/0/0/0.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-tile-window"], "0,0,256,256");
    assert_eq!(decode_rgba(&body).get_pixel(10, 10).0, [10, 20, 30, 255]);
}

#[tokio::test]
async fn test_default_raster_route_unconfigured() {
    let (status, _, body) = get(router(), "/tiles/0/0/0.png").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_type(&body), "not_found");
}

// =============================================================================
// Client Errors
// =============================================================================

#[tokio::test]
async fn test_invalid_quality_rejected() {
    for uri in [
        "/tiles/world.tif/0/0/0.jpg?quality=0",
        "/tiles/world.tif/0/0/0.jpg?quality=101",
        "/tiles/world.tif/0/0/0.jpg?quality=300",
        "/tiles/world.tif/0/0/0.jpg?quality=abc",
        "/tiles/world.tif/0/0/0.jpg?quality=1.5",
    ] {
        let (status, _, body) = get(router(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {}", uri);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "invalid_quality");
        assert_eq!(json["status"], 400);
        assert!(json["message"].as_str().unwrap().contains("quality"));
    }
}

#[tokio::test]
async fn test_bad_address_rejected() {
    for uri in [
        "/tiles/world.tif/a/0/0.png",
        "/tiles/world.tif/0/b/0.png",
        "/tiles/world.tif/0/0/c.png",
        "/tiles/world.tif/-1/0/0.png",
        "/tiles/world.tif/31/0/0.png",
        "/tiles/world.tif/0/0/0.webp",
    ] {
        let (status, _, body) = get(router(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {}", uri);
        assert_eq!(error_type(&body), "bad_address", "uri: {}", uri);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_out_of_range_indices_are_not_found() {
    // Structurally valid but outside the 2^z grid, so no raster pixels are covered
    for uri in [
        "/tiles/world.tif/1/2/0.png",
        "/tiles/world.tif/1/0/-1.png",
        "/tiles/world.tif/0/9223372036854775807/0.png",
        "/tiles/world.tif/0/0/9223372036854775807.png",
        "/tiles/world.tif/30/-9223372036854775808/0.png",
    ] {
        let (status, _, body) = get(router(), uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "uri: {}", uri);
        assert_eq!(error_type(&body), "tile_not_found", "uri: {}", uri);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tile_outside_raster_is_not_found() {
    let source = MockRasterSource::new().with_raster(
        "ne.tif",
        solid_rgb_geotiff(64, 64, [5, 5, 5], BBox::new(0.0, 0.0, H, H)),
    );
    let router = create_router(TileService::new(source), RouterConfig::new());

    let (status, headers, body) = get(router, "/tiles/ne.tif/1/0/0.png").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(error_type(&body), "tile_not_found");
}

#[tokio::test]
async fn test_missing_raster() {
    let (status, _, body) = get(router(), "/tiles/missing.tif/0/0/0.png").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
    assert!(json["message"].as_str().unwrap().contains("missing.tif"));
}

// =============================================================================
// Server Errors
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_single_band_raster_is_server_error() {
    let (status, _, body) = get(router(), "/tiles/gray.tif/0/0/0.png").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_type(&body), "insufficient_bands");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_corrupt_raster_is_decode_error() {
    let (status, _, body) = get(router(), "/tiles/corrupt.tif/0/0/0.png").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_type(&body), "decode_error");
}

// =============================================================================
// Metadata
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_raster_metadata_endpoint() {
    let (status, _, body) = get(router(), "/rasters/world.tif").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["raster_id"], "world.tif");
    assert_eq!(json["width"], 256);
    assert_eq!(json["height"], 256);
    assert_eq!(json["band_count"], 3);

    let min_x = json["bounds"]["min_x"].as_f64().unwrap();
    let max_y = json["bounds"]["max_y"].as_f64().unwrap();
    assert!((min_x + H).abs() < 1e-6);
    assert!((max_y - H).abs() < 1e-6);
}

#[tokio::test]
async fn test_raster_metadata_missing() {
    let (status, _, body) = get(router(), "/rasters/missing.tif").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_type(&body), "not_found");
}

// =============================================================================
// Routing and CORS
// =============================================================================

#[tokio::test]
async fn test_unknown_route() {
    let (status, _, _) = get(router(), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cors_headers_present() {
    let request = Request::builder()
        .uri("/tiles/world.tif/0/0/0.png")
        .header(header::ORIGIN, "https://maps.example.com")
        .body(Body::empty())
        .unwrap();

    let response = router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let exposed = response.headers()[header::ACCESS_CONTROL_EXPOSE_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("x-tile-window"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cors_restricted_origin() {
    let router = world_router(
        RouterConfig::new().with_cors_origins(vec!["https://allowed.example.com".to_string()]),
    );
    let request = Request::builder()
        .uri("/tiles/world.tif/0/0/0.png")
        .header(header::ORIGIN, "https://other.example.com")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
