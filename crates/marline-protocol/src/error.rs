//! Protocol error types.
//!
//! Per-message anomalies (late arrivals, inconsistent fragment metadata) are
//! counted and swallowed; only conditions the host must act on surface here.

use marline_core::StreamError;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The send window has no slot for the next message id. Arises only if
    /// the host ignores `can_send_message`.
    #[error("send queue overflow at message id {message_id}")]
    QueueOverflow { message_id: u16 },

    /// A received message lies beyond the receive window: sender and
    /// receiver state have diverged and the host is expected to tear the
    /// connection down.
    #[error("received message beyond the receive window")]
    EarlyMessage,

    /// A message's serialized payload exceeds the configured limit.
    #[error("message too large: {bits} bits (max {max_bits})")]
    MessageTooLarge { bits: usize, max_bits: usize },

    /// A block handed to `send_block` exceeds the small-block limit.
    #[error("block too large for a block message: {size} bytes (max {max})")]
    BlockTooLarge { size: usize, max: usize },

    /// The wire carried a type id the message factory cannot construct.
    #[error("unknown message type {0}")]
    UnknownMessageType(u16),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
}

/// Sticky error state of the data-block receiver. Once set, fragments are
/// consumed without effect until `clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("block too large: {size} bytes (max {max})")]
    BlockTooLarge { size: usize, max: usize },
}
