//! Reliable channel constants and configuration defaults.

/// Message ids are carried in exactly 16 bits on the wire.
pub const MESSAGE_ID_BITS: u32 = 16;

/// Default minimum delay before re-including an unacked message (seconds).
pub const DEFAULT_RESEND_RATE: f64 = 0.1;

/// Default send queue capacity in entries.
pub const DEFAULT_SEND_QUEUE_SIZE: usize = 1024;

/// Default receive queue capacity in entries.
pub const DEFAULT_RECEIVE_QUEUE_SIZE: usize = 256;

/// Default sent-packets sliding window capacity in entries.
pub const DEFAULT_SENT_PACKETS_SIZE: usize = 256;

/// Default cap on messages batched into one packet.
pub const DEFAULT_MAX_MESSAGES_PER_PACKET: usize = 32;

/// Default maximum serialized message payload size in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64;

/// Default maximum small block size in bytes; larger blocks go through
/// fragmentation.
pub const DEFAULT_MAX_SMALL_BLOCK_SIZE: usize = 64;

/// Default per-packet byte budget for this channel.
pub const DEFAULT_PACKET_BUDGET: usize = 128;

/// Default early-exit threshold: stop scanning for more messages once fewer
/// than this many bits remain in the budget.
pub const DEFAULT_GIVE_UP_BITS: u32 = 64;
