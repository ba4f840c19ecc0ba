//! S3-backed raster source.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use tracing::debug;

use super::RasterSource;
use crate::error::IoError;
use crate::io::HttpRangeReader;

/// Default lifetime of a presigned raster URL (5 minutes).
pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 300;

/// S3-backed implementation of `RasterSource`.
///
/// The raster id (with the optional prefix prepended) is the object key. Each
/// call presigns a GET for that key and opens an [`HttpRangeReader`] on the
/// resulting URL.
///
/// # Example
///
/// ```ignore
/// use geotile_streamer::source::{create_s3_client, S3RasterSource};
///
/// let client = create_s3_client(None, "us-east-1").await;
/// let source = S3RasterSource::new(client, "imagery".to_string());
///
/// // "ortho/2024.tif" becomes s3://imagery/ortho/2024.tif
/// let reader = source.create_reader("ortho/2024.tif").await?;
/// ```
#[derive(Clone)]
pub struct S3RasterSource {
    client: Client,
    http: reqwest::Client,
    bucket: String,
    prefix: Option<String>,
    presign_ttl: Duration,
}

impl S3RasterSource {
    /// Create a source for `bucket` with the default presign TTL and no prefix.
    pub fn new(client: Client, bucket: String) -> Self {
        Self {
            client,
            http: reqwest::Client::new(),
            bucket,
            prefix: None,
            presign_ttl: Duration::from_secs(DEFAULT_PRESIGN_TTL_SECS),
        }
    }

    /// Prepend `prefix` to every raster id when building the object key.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    /// Set how long presigned URLs stay valid.
    pub fn with_presign_ttl(mut self, ttl: Duration) -> Self {
        self.presign_ttl = ttl;
        self
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the presign TTL.
    pub fn presign_ttl(&self) -> Duration {
        self.presign_ttl
    }

    /// Object key for a raster id.
    pub fn object_key(&self, raster_id: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!(
                "{}/{}",
                prefix.trim_end_matches('/'),
                raster_id.trim_start_matches('/')
            ),
            None => raster_id.trim_start_matches('/').to_string(),
        }
    }

    /// Issue a presigned GET URL for a raster.
    pub async fn presign(&self, raster_id: &str) -> Result<String, IoError> {
        let key = self.object_key(raster_id);
        let config =
            PresigningConfig::expires_in(self.presign_ttl).map_err(|e| IoError::S3(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .presigned(config)
            .await
            .map_err(|e| IoError::S3(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

#[async_trait]
impl RasterSource for S3RasterSource {
    type Reader = HttpRangeReader;

    async fn create_reader(&self, raster_id: &str) -> Result<Self::Reader, IoError> {
        let key = self.object_key(raster_id);
        let identifier = format!("s3://{}/{}", self.bucket, key);

        let url = self.presign(raster_id).await?;
        debug!(
            object = %identifier,
            ttl_secs = self.presign_ttl.as_secs(),
            "Issued presigned URL"
        );

        HttpRangeReader::new(self.http.clone(), url, identifier).await
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
///
/// The client is created once at startup and cloned into every source; it
/// carries no per-request state.
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services generally need path-style addressing
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(endpoint_url.is_some())
        .build();

    Client::from_conf(s3_config)
}
