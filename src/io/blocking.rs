use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use tokio::runtime::Handle;

use super::RangeReader;

/// Synchronous `Read + Seek` view over an async [`RangeReader`].
///
/// Each `read` is driven to completion on the captured runtime handle, so this
/// adapter must only be used from a blocking context (e.g. inside
/// `tokio::task::spawn_blocking`), never from an async task.
pub struct BlockingReader<R> {
    inner: Arc<R>,
    handle: Handle,
    position: u64,
}

impl<R: RangeReader> BlockingReader<R> {
    /// Create a reader positioned at offset 0.
    pub fn new(inner: Arc<R>, handle: Handle) -> Self {
        Self {
            inner,
            handle,
            position: 0,
        }
    }

    /// Current read position.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<R: RangeReader> Read for BlockingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.inner.size();
        if self.position >= size || buf.is_empty() {
            return Ok(0);
        }

        let len = (size - self.position).min(buf.len() as u64) as usize;
        let bytes = self
            .handle
            .block_on(self.inner.read_exact_at(self.position, len))
            .map_err(io::Error::other)?;

        buf[..bytes.len()].copy_from_slice(&bytes);
        self.position += bytes.len() as u64;
        Ok(bytes.len())
    }
}

impl<R: RangeReader> Seek for BlockingReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.inner.size().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };

        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}
