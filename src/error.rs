use thiserror::Error;

/// I/O errors that can occur when reading from remote storage
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Unexpected HTTP response while reading a presigned URL
    #[error("HTTP error: status {status} for {url}")]
    Http { status: u16, url: String },

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Errors raised by the raster decoding collaborator.
#[derive(Debug, Clone, Error)]
pub enum RasterError {
    /// I/O error while reading raster bytes
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The TIFF decoder rejected the file
    #[error("TIFF decode error: {0}")]
    Tiff(String),

    /// No usable (non-rotated) georeferencing tags
    #[error("Missing georeference: {0}")]
    MissingGeoreference(String),

    /// Sample type has no normalization rule to 8 bits
    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    /// Requested window does not fit inside the raster
    #[error("Window ({left}, {top}, {right}, {bottom}) exceeds raster size {width}x{height}")]
    WindowOutOfBounds {
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
        width: u32,
        height: u32,
    },

    /// The blocking decode task panicked or was cancelled
    #[error("Decode task failed: {0}")]
    Task(String),
}

impl From<tiff::TiffError> for RasterError {
    fn from(err: tiff::TiffError) -> Self {
        match err {
            tiff::TiffError::IoError(io_err) => {
                RasterError::Io(IoError::Connection(io_err.to_string()))
            }
            other => RasterError::Tiff(other.to_string()),
        }
    }
}

/// Errors produced by the tile pipeline.
///
/// `BadAddress` and `InvalidQuality` are caller mistakes; `EmptyWindow` and
/// `RasterNotFound` are reported as not found. Everything else is a server-side
/// failure.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Zoom, column or row failed to parse or is structurally invalid
    #[error("Bad tile address: {message}")]
    BadAddress { message: String },

    /// JPEG quality outside 1-100
    #[error("Invalid quality: '{quality}' (must be an integer from 1 to 100)")]
    InvalidQuality { quality: String },

    /// Tile lies entirely outside the raster extent
    #[error("Tile {zoom}/{column}/{row} does not intersect the raster")]
    EmptyWindow { zoom: u8, column: i64, row: i64 },

    /// Source raster does not exist
    #[error("Raster not found: {raster_id}")]
    RasterNotFound { raster_id: String },

    /// Source raster has too few bands for RGB output
    #[error("Insufficient bands: need at least {required}, raster has {available}")]
    InsufficientBands { required: usize, available: usize },

    /// Raster collaborator failed to open or decode the window
    #[error("Decode failure: {0}")]
    Decode(#[from] RasterError),

    /// Raster reader returned a band of the wrong length
    #[error("Band {band} has {actual} samples, expected {expected}")]
    BandLengthMismatch {
        band: usize,
        expected: usize,
        actual: usize,
    },

    /// Raster reader returned a band set sized for a different window
    #[error("Band set is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    BandShapeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Image encoder failed
    #[error("Encode failure: {message}")]
    Encode { message: String },
}

impl TileError {
    /// Whether the failure was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TileError::BadAddress { .. }
                | TileError::InvalidQuality { .. }
                | TileError::EmptyWindow { .. }
                | TileError::RasterNotFound { .. }
        )
    }
}
