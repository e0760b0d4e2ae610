//! Protocol state machines for the marline network stack.
//!
//! This crate layers reliable, ordered message delivery on top of an
//! unreliable, unordered packet transport that provides only per-packet
//! sequence numbers and acknowledgements. It contains the send/receive
//! sliding-window state machines, packet-budget-bounded message packing,
//! ack-driven retransmission, and the data-block fragment reassembly
//! receiver.
//!
//! Everything here is single-threaded and sans-I/O: the host network loop
//! owns a channel, feeds it time and incoming payloads, and harvests
//! outgoing payloads and delivered messages.

pub mod block;
pub mod channel;
pub mod error;
pub mod message;

pub use block::DataBlockReceiver;
pub use channel::{ChannelCounters, ChannelData, ReliableChannelConfig, ReliableMessageChannel};
pub use error::{BlockError, ChannelError};
pub use message::{BlockMessage, Message, MessageFactory, MessageHandle, BLOCK_MESSAGE_TYPE};
