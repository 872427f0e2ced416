/// Google Street View static metadata endpoint (XML output).
pub const GSV_METADATA_URL: &str = "http://maps.google.com/cbk";

/// Pause between consecutive metadata requests, in milliseconds.
pub const DEFAULT_POINT_DELAY_MS: u64 = 50;

/// Pause between consecutive batches, in milliseconds.
pub const DEFAULT_BATCH_DELAY_MS: u64 = 1000;

/// Number of sample points written to one output unit.
pub const DEFAULT_BATCH_CAPACITY: usize = 1000;

/// HTTP timeout for metadata requests, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
