use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use lru::LruCache;
use tokio::sync::Mutex;

use super::RangeReader;
use crate::error::IoError;

/// Default block size: 256KB
///
/// A COG header plus the first few internal tiles usually fit in one block.
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// Default number of blocks held per open raster (16MB at the default size).
pub const DEFAULT_BLOCK_CAPACITY: usize = 64;

/// Block-aligned read coalescing for a single open raster.
///
/// The TIFF decoder issues many small reads (IFD entries, tag arrays, tile
/// offsets) at scattered positions. Without coalescing each one would be a
/// separate HTTP range request. `BlockCache` rounds every read out to whole
/// blocks and keeps the most recently used blocks around.
///
/// A `BlockCache` is owned by one raster accessor and dropped together with
/// it at the end of the request, so nothing is shared between tile requests.
pub struct BlockCache<R> {
    inner: R,
    block_size: usize,
    blocks: Mutex<LruCache<u64, Bytes>>,
    fetches: AtomicU64,
    bytes_fetched: AtomicU64,
}

impl<R: RangeReader> BlockCache<R> {
    /// Wrap `inner` with the default block size and capacity.
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_CAPACITY)
    }

    /// Wrap `inner` with a custom block size (bytes) and capacity (blocks).
    ///
    /// A zero capacity is treated as one block.
    pub fn with_capacity(inner: R, block_size: usize, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            block_size: block_size.max(1),
            blocks: Mutex::new(LruCache::new(capacity)),
            fetches: AtomicU64::new(0),
            bytes_fetched: AtomicU64::new(0),
        }
    }

    /// Number of range requests issued to the underlying reader.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Total bytes pulled from the underlying reader.
    pub fn bytes_fetched(&self) -> u64 {
        self.bytes_fetched.load(Ordering::Relaxed)
    }

    /// Get the wrapped reader.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn block(&self, index: u64) -> Result<Bytes, IoError> {
        let mut blocks = self.blocks.lock().await;
        if let Some(data) = blocks.get(&index) {
            return Ok(data.clone());
        }

        let offset = index * self.block_size as u64;
        let size = self.inner.size();
        let remaining = size.saturating_sub(offset);
        if remaining == 0 {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: self.block_size as u64,
                size,
            });
        }

        let len = remaining.min(self.block_size as u64) as usize;
        let data = self.inner.read_exact_at(offset, len).await?;
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.bytes_fetched.fetch_add(len as u64, Ordering::Relaxed);

        blocks.put(index, data.clone());
        Ok(data)
    }
}

#[async_trait]
impl<R: RangeReader> RangeReader for BlockCache<R> {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let size = self.inner.size();
        if offset + len as u64 > size {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size,
            });
        }
        if len == 0 {
            return Ok(Bytes::new());
        }

        let block_size = self.block_size as u64;
        let first = offset / block_size;
        let last = (offset + len as u64 - 1) / block_size;

        if first == last {
            let block = self.block(first).await?;
            let start = (offset % block_size) as usize;
            return Ok(block.slice(start..start + len));
        }

        let mut out = BytesMut::with_capacity(len);
        let mut cursor = offset;
        for index in first..=last {
            let block = self.block(index).await?;
            let start = (cursor % block_size) as usize;
            let take = (block.len() - start).min(len - out.len());
            out.extend_from_slice(&block[start..start + take]);
            cursor += take as u64;
        }

        Ok(out.freeze())
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn identifier(&self) -> &str {
        self.inner.identifier()
    }
}
