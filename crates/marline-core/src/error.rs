//! Error types for the marline-core crate.

use core::fmt;

/// Errors raised by the bit-level serialization streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// A read ran past the end of the buffer.
    Overflow { requested: u32, available: usize },
    /// A value fell outside the range it was serialized against.
    ValueOutOfRange { value: u32, min: u32, max: u32 },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Overflow {
                requested,
                available,
            } => {
                write!(
                    f,
                    "stream overflow: requested {requested} bits, {available} remaining"
                )
            }
            StreamError::ValueOutOfRange { value, min, max } => {
                write!(f, "value {value} out of range [{min}, {max}]")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StreamError {}

/// Errors raised by [`SlidingWindow`](crate::window::SlidingWindow) inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    /// The slot for `sequence` is held by a different in-window entry.
    SlotOccupied { sequence: u16, occupied_by: u16 },
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::SlotOccupied {
                sequence,
                occupied_by,
            } => {
                write!(
                    f,
                    "slot for sequence {sequence} occupied by in-window entry {occupied_by}"
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WindowError {}
