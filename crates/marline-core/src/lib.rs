//! Wire-level primitives for the marline protocol stack.
//!
//! This crate defines the building blocks the protocol layer is assembled
//! from: 16-bit sequence arithmetic with wraparound, bit-exact serialization
//! streams (write, read, and a measure mode that counts bits without
//! producing output), the sequence-keyed sliding window, and the time base
//! supplied by the host loop.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod bitstream;
pub mod error;
pub mod sequence;
pub mod time;
pub mod window;

pub use bitstream::{bits_required, BitReader, BitWrite, BitWriter, MeasureStream};
pub use error::{StreamError, WindowError};
pub use sequence::{sequence_greater_than, sequence_less_than, SEQ_MAX, SEQ_MODULUS};
pub use time::TimeBase;
pub use window::SlidingWindow;
