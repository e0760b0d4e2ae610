//! Per-packet channel payload: a serializable batch of messages.
//!
//! Wire layout, bit-exact and not byte-aligned:
//!
//! 1. `num_messages` in `bits_required(0, max_messages_per_packet)` bits.
//! 2. Per message, in packed order: `type_id` in
//!    `bits_required(0, max_type)` bits, `message_id` in 16 bits, then the
//!    message's own payload.
//!
//! Stream alignment, framing, and checksums belong to the outer packet
//! codec.

use std::rc::Rc;

use marline_core::{BitReader, BitWrite};

use super::constants::MESSAGE_ID_BITS;
use crate::error::ChannelError;
use crate::message::{MessageFactory, MessageHandle};

/// Batch of messages bound for (or decoded from) one packet.
///
/// Outbound, the handles are shared with the send queue while the packet is
/// in flight. Inbound, they are freshly constructed by the factory.
#[derive(Debug, Default)]
pub struct ChannelData {
    pub messages: Vec<MessageHandle>,
}

impl ChannelData {
    /// Serialize the batch. Works against the wire writer and the measure
    /// stream alike, so measured and produced sizes agree.
    pub fn write(
        &self,
        writer: &mut dyn BitWrite,
        factory: &dyn MessageFactory,
        max_messages_per_packet: usize,
    ) -> Result<(), ChannelError> {
        writer.write_int(self.messages.len() as u32, 0, max_messages_per_packet as u32)?;
        for message in &self.messages {
            writer.write_int(u32::from(message.type_id()), 0, u32::from(factory.max_type()))?;
            writer.write_bits(u32::from(message.id()), MESSAGE_ID_BITS)?;
            message.write_payload(writer)?;
        }
        tracing::trace!(
            num_messages = self.messages.len(),
            bits = writer.bits_written(),
            "wrote channel data"
        );
        Ok(())
    }

    /// Deserialize a batch, constructing each message through the factory.
    pub fn read(
        reader: &mut BitReader<'_>,
        factory: &dyn MessageFactory,
        max_messages_per_packet: usize,
    ) -> Result<Self, ChannelError> {
        let num_messages = reader.read_int(0, max_messages_per_packet as u32)?;
        let mut messages: Vec<MessageHandle> = Vec::with_capacity(num_messages as usize);
        for _ in 0..num_messages {
            let type_id = reader.read_int(0, u32::from(factory.max_type()))? as u16;
            let mut message = factory
                .create(type_id)
                .ok_or(ChannelError::UnknownMessageType(type_id))?;
            debug_assert_eq!(message.type_id(), type_id, "factory type id mismatch");
            let message_id = reader.read_bits(MESSAGE_ID_BITS)? as u16;
            message.set_id(message_id);
            message.read_payload(reader)?;
            messages.push(Rc::from(message));
        }
        tracing::trace!(num_messages, "read channel data");
        Ok(Self { messages })
    }
}
