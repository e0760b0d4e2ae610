//! Reliable channel configuration.

use super::constants::*;

/// Tunables for a [`ReliableMessageChannel`](super::ReliableMessageChannel).
///
/// Window capacities must not exceed the 16-bit sequence space; in practice
/// they stay far below it.
#[derive(Debug, Clone)]
pub struct ReliableChannelConfig {
    /// Minimum delay before re-including an unacked message (seconds).
    pub resend_rate: f64,
    /// Send queue capacity in entries.
    pub send_queue_size: usize,
    /// Receive queue capacity in entries; also bounds how far past the
    /// oldest unacked message the packer will reach.
    pub receive_queue_size: usize,
    /// Sent-packets sliding window capacity in entries.
    pub sent_packets_size: usize,
    /// Hard cap on messages batched into one packet.
    pub max_messages_per_packet: usize,
    /// Maximum serialized message payload size in bytes.
    pub max_message_size: usize,
    /// Maximum small block size in bytes. Blocks above this limit are for
    /// the fragmentation path, not `send_block`.
    pub max_small_block_size: usize,
    /// Default per-packet byte budget, used by
    /// [`get_data_default`](super::ReliableMessageChannel::get_data_default).
    /// Hosts that apportion budget dynamically pass bits per call instead.
    pub packet_budget: usize,
    /// Stop packing once fewer than this many budget bits remain.
    pub give_up_bits: u32,
}

impl Default for ReliableChannelConfig {
    fn default() -> Self {
        Self {
            resend_rate: DEFAULT_RESEND_RATE,
            send_queue_size: DEFAULT_SEND_QUEUE_SIZE,
            receive_queue_size: DEFAULT_RECEIVE_QUEUE_SIZE,
            sent_packets_size: DEFAULT_SENT_PACKETS_SIZE,
            max_messages_per_packet: DEFAULT_MAX_MESSAGES_PER_PACKET,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_small_block_size: DEFAULT_MAX_SMALL_BLOCK_SIZE,
            packet_budget: DEFAULT_PACKET_BUDGET,
            give_up_bits: DEFAULT_GIVE_UP_BITS,
        }
    }
}
