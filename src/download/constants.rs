//! Constants for the download module (timeouts, chunking, read units).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large chunks).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Chunk count used when the caller requests neither a count nor a size.
pub const DEFAULT_CHUNK_COUNT: u64 = 8;

/// Size of one read unit (256 KiB).
///
/// Workers stage body bytes into a buffer of this size and issue one
/// positional write plus one progress event per full unit.
pub const READ_UNIT_SIZE: usize = 256 * 1024;
