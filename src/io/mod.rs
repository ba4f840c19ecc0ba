mod block_cache;
mod blocking;
mod http_reader;
mod range_reader;

pub use block_cache::{BlockCache, DEFAULT_BLOCK_CAPACITY, DEFAULT_BLOCK_SIZE};
pub use blocking::BlockingReader;
pub use http_reader::HttpRangeReader;
pub use range_reader::{MemoryReader, RangeReader};
