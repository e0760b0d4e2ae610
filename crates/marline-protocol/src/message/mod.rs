//! Message abstraction: the unit the reliable channel carries.
//!
//! A message is an opaque, self-serializing value with a factory-declared
//! type id and a mutable 16-bit message id the channel assigns at send
//! time. Payload serialization is split into a write half (usable against
//! both the wire writer and the measure stream, so measured sizes are
//! exact) and a read half.

use core::any::Any;
use core::fmt;
use std::rc::Rc;

use marline_core::{BitReader, BitWrite, StreamError};

/// Reserved type id for the built-in [`BlockMessage`]. Factories that carry
/// small blocks must map this id to it.
pub const BLOCK_MESSAGE_TYPE: u16 = 0;

/// A value the reliable channel can queue, pack, and deliver.
///
/// Once queued a message is immutable; the channel captures its serialized
/// size at enqueue time and that size must hold for the lifetime of the
/// message.
pub trait Message: fmt::Debug {
    /// Factory-declared type id, at most `MessageFactory::max_type`.
    fn type_id(&self) -> u16;

    /// The 16-bit message id. Assigned by the channel on send; carried on
    /// the wire and restored on receive.
    fn id(&self) -> u16;

    fn set_id(&mut self, id: u16);

    /// Serialize the payload (excluding type id and message id, which the
    /// channel data layer owns).
    fn write_payload(&self, writer: &mut dyn BitWrite) -> Result<(), StreamError>;

    /// Deserialize the payload written by [`write_payload`](Self::write_payload).
    fn read_payload(&mut self, reader: &mut BitReader<'_>) -> Result<(), StreamError>;

    /// Downcasting hook for the host application.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to an in-flight message.
///
/// The send-queue slot is the long-lived owner; outbound channel data holds
/// transient clones while a packet is being serialized. Single-threaded by
/// design, hence `Rc` rather than `Arc`.
pub type MessageHandle = Rc<dyn Message>;

/// Constructs messages from wire type ids during deserialization.
pub trait MessageFactory {
    /// Construct an empty message of the given type, or `None` if the type
    /// id is not known to this factory.
    fn create(&self, type_id: u16) -> Option<Box<dyn Message>>;

    /// Largest type id this factory can construct.
    fn max_type(&self) -> u16;
}

/// Built-in message carrying a small opaque byte buffer.
///
/// Blocks above the channel's small-block limit go through fragmentation
/// and the [`DataBlockReceiver`](crate::block::DataBlockReceiver) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMessage {
    id: u16,
    max_size: usize,
    data: Vec<u8>,
}

impl BlockMessage {
    /// An empty block message that deserializes up to `max_size` bytes.
    pub fn new(max_size: usize) -> Self {
        Self {
            id: 0,
            max_size,
            data: Vec::new(),
        }
    }

    /// A block message carrying `data`. `data.len()` must be ≤ `max_size`.
    pub fn with_data(max_size: usize, data: Vec<u8>) -> Self {
        debug_assert!(data.len() <= max_size);
        Self {
            id: 0,
            max_size,
            data,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Message for BlockMessage {
    fn type_id(&self) -> u16 {
        BLOCK_MESSAGE_TYPE
    }

    fn id(&self) -> u16 {
        self.id
    }

    fn set_id(&mut self, id: u16) {
        self.id = id;
    }

    fn write_payload(&self, writer: &mut dyn BitWrite) -> Result<(), StreamError> {
        writer.write_int(self.data.len() as u32, 0, self.max_size as u32)?;
        writer.write_bytes(&self.data)
    }

    fn read_payload(&mut self, reader: &mut BitReader<'_>) -> Result<(), StreamError> {
        let len = reader.read_int(0, self.max_size as u32)? as usize;
        self.data = reader.read_bytes(len)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
