//! Reliable ordered message channel.
//!
//! The channel batches queued messages into per-packet payloads under a bit
//! budget, retransmits unacked messages on a fixed cadence, and releases
//! send-queue slots as packet acks arrive. Delivery to the application is
//! strictly in message-id order, exactly once.

pub mod config;
pub mod constants;
pub mod data;
pub mod reliable;

pub use config::ReliableChannelConfig;
pub use data::ChannelData;
pub use reliable::{ChannelCounters, ReliableMessageChannel};
