//! GeoTile Streamer - An XYZ tile server for georeferenced rasters.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geotile_streamer::{
    config::{CheckConfig, Cli, Command, ServeConfig, StorageArgs},
    server::{create_router, RouterConfig},
    source::{create_s3_client, S3RasterSource},
    tile::TileService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let storage = &config.storage;

    info!("GeoTile Streamer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  S3 bucket: {}", storage.s3_bucket);
    if let Some(ref prefix) = storage.s3_prefix {
        info!("  S3 prefix: {}", prefix);
    }
    if let Some(ref endpoint) = storage.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", storage.s3_region);
    info!("  Presigned URL TTL: {}s", storage.presign_ttl);
    info!(
        "  Tiles: {}px over +/-{} projected units",
        config.tile_size, config.half_extent
    );
    info!(
        "  Reads: {}KB blocks, {} blocks/raster",
        config.block_size / 1024,
        config.block_capacity
    );
    if let Some(ref raster) = config.default_raster {
        info!("  Default raster: {}", raster);
    }

    let s3_client = create_s3_client(storage.s3_endpoint.as_deref(), &storage.s3_region).await;

    info!("Connecting to S3...");
    if let Err(e) = test_s3_connection(&s3_client, &storage.s3_bucket).await {
        error!("Failed to connect to S3: {}", e);
        error!("Please check:");
        error!("  - Your AWS credentials are configured correctly");
        error!("  - The bucket '{}' exists and is accessible", storage.s3_bucket);
        error!("  - The S3 endpoint is correct (if using MinIO/custom S3)");
        return ExitCode::FAILURE;
    }
    info!("  Connected successfully");

    let source = build_source(s3_client, storage);
    let tile_service = TileService::new(source)
        .with_scheme(config.tile_scheme())
        .with_block_cache(config.block_size, config.block_capacity);

    let router = create_router(tile_service, build_router_config(&config));

    let addr = config.bind_address();

    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}/health", addr);
    info!("  curl http://{}/rasters/<raster_id>", addr);
    info!("  curl http://{}/tiles/<raster_id>/0/0/0.png", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Check that the bucket exists and the credentials can reach it.
async fn test_s3_connection(client: &aws_sdk_s3::Client, bucket: &str) -> Result<(), String> {
    client
        .head_bucket()
        .bucket(bucket)
        .send()
        .await
        .map(|_| ())
        .map_err(|e| format!("{}", e))
}

fn build_source(client: aws_sdk_s3::Client, storage: &StorageArgs) -> S3RasterSource {
    let source = S3RasterSource::new(client, storage.s3_bucket.clone())
        .with_presign_ttl(storage.presign_ttl());

    match storage.s3_prefix {
        Some(ref prefix) => source.with_prefix(prefix.clone()),
        None => source,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "geotile_streamer=debug,tower_http=debug"
    } else {
        "geotile_streamer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_default_raster(config.default_raster.clone())
        .with_default_quality(config.jpeg_quality)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("GeoTile Streamer Configuration Check");
    println!("════════════════════════════════════");
    println!();

    if let Err(e) = config.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let storage = &config.storage;
    println!("✓ Bucket: {}", storage.s3_bucket);
    if let Some(ref prefix) = storage.s3_prefix {
        println!("✓ Prefix: {}", prefix);
    }
    if let Some(ref endpoint) = storage.s3_endpoint {
        println!("✓ Endpoint: {}", endpoint);
    }
    println!("✓ Region: {}", storage.s3_region);
    println!();

    print!("Testing S3 connection... ");

    let s3_client = create_s3_client(storage.s3_endpoint.as_deref(), &storage.s3_region).await;

    if let Err(e) = test_s3_connection(&s3_client, &storage.s3_bucket).await {
        println!("✗ failed");
        println!();
        println!("Error: {}", e);
        println!();
        println!("Please check:");
        println!("  - Your AWS credentials are configured correctly");
        println!("  - The bucket '{}' exists and is accessible", storage.s3_bucket);
        if storage.s3_endpoint.is_some() {
            println!("  - The S3 endpoint is correct and reachable");
        }
        return ExitCode::FAILURE;
    }
    println!("✓ success");

    if let Some(ref raster_id) = config.raster {
        println!();
        print!("Opening raster '{}'... ", raster_id);

        let service = TileService::new(build_source(s3_client, storage));
        match service.raster_metadata(raster_id).await {
            Ok(metadata) => {
                println!("✓ ok");
                println!("  Size: {} x {} px", metadata.width, metadata.height);
                println!("  Bands: {}", metadata.band_count);
                println!(
                    "  Pixel size: {} x {}",
                    metadata.geotransform.pixel_width, metadata.geotransform.pixel_height
                );
                println!(
                    "  Bounds: [{}, {}, {}, {}]",
                    metadata.bounds.min_x,
                    metadata.bounds.min_y,
                    metadata.bounds.max_x,
                    metadata.bounds.max_y
                );
            }
            Err(e) => {
                println!("✗ failed");
                println!();
                println!("  {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    println!();
    println!("════════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
