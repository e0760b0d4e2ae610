//! Data-block constants.

/// Largest permitted fragment size in bytes.
pub const MAX_FRAGMENT_SIZE: usize = 1024;
