use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_RANGE, RANGE};
use http::StatusCode;
use reqwest::Client;
use tracing::debug;

use super::RangeReader;
use crate::error::IoError;

/// HTTP range reader over a (typically presigned) URL.
///
/// The object size is discovered once on creation with a one-byte ranged GET,
/// since presigned GET URLs do not authorize HEAD requests.
#[derive(Clone)]
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    identifier: String,
}

impl HttpRangeReader {
    /// Open `url`, probing the object size.
    ///
    /// `identifier` is used for logging and error messages so signed query
    /// strings never end up in logs.
    pub async fn new(
        client: Client,
        url: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Result<Self, IoError> {
        let url = url.into();
        let identifier = identifier.into();

        let resp = client
            .get(&url)
            .header(RANGE, "bytes=0-0")
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            // S3 answers 403 for missing keys when the signer lacks ListBucket
            return Err(IoError::NotFound(identifier));
        }
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            // Zero-length object
            return Ok(Self {
                client,
                url,
                size: 0,
                identifier,
            });
        }
        if !status.is_success() {
            return Err(IoError::Http {
                status: status.as_u16(),
                url: identifier,
            });
        }

        let size = match resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
        {
            Some(range) => parse_content_range_total(range).ok_or_else(|| {
                IoError::Connection(format!("Malformed Content-Range '{}'", range))
            })?,
            // Server ignored the range and sent the whole body
            None => resp.content_length().unwrap_or(0),
        };

        debug!(object = %identifier, size, "Opened HTTP range reader");

        Ok(Self {
            client,
            url,
            size,
            identifier,
        })
    }
}

#[async_trait]
impl RangeReader for HttpRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        if offset + len as u64 > self.size {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }
        if len == 0 {
            return Ok(Bytes::new());
        }

        // Inclusive on both ends
        let range = format!("bytes={}-{}", offset, offset + len as u64 - 1);

        let resp = self
            .client
            .get(&self.url)
            .header(RANGE, range)
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IoError::NotFound(self.identifier.clone()));
        }
        if !status.is_success() {
            return Err(IoError::Http {
                status: status.as_u16(),
                url: self.identifier.clone(),
            });
        }
        let partial = status == StatusCode::PARTIAL_CONTENT;

        let body = resp
            .bytes()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        // A 200 means the server ignored the Range header
        let body = if partial {
            body
        } else {
            let start = offset as usize;
            if body.len() < start + len {
                return Err(IoError::Connection(format!(
                    "Short body from {}: got {} bytes",
                    self.identifier,
                    body.len()
                )));
            }
            body.slice(start..start + len)
        };

        if body.len() != len {
            return Err(IoError::Connection(format!(
                "Short read from {}: expected {} bytes, got {}",
                self.identifier,
                len,
                body.len()
            )));
        }

        Ok(body)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Extract the total length from a `Content-Range: bytes a-b/total` header.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}
