//! The reliable ordered message channel state machine.
//!
//! Three sliding windows drive the channel. The send queue holds messages
//! from submission until their packet is acked, and the sent-packets
//! tracker maps packet ids to the message ids they carried. On the other
//! side the receive queue holds arrived messages until the application
//! drains them in order.
//!
//! Per message id the send side moves `queued → sent (one or more times) →
//! acked`; an acked slot is freed for a future id. Retransmission is paced
//! by `resend_rate` and continues until acked; the channel imposes no
//! deadline of its own.

use std::rc::Rc;

use marline_core::{
    bits_required, sequence_greater_than, sequence_less_than, BitReader, BitWrite, MeasureStream,
    SlidingWindow, TimeBase,
};

use super::config::ReliableChannelConfig;
use super::constants::MESSAGE_ID_BITS;
use super::data::ChannelData;
use crate::error::ChannelError;
use crate::message::{BlockMessage, Message, MessageFactory, MessageHandle};

/// Monotonic channel counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCounters {
    /// Messages accepted into the send queue.
    pub messages_sent: u64,
    /// Messages written into outgoing packet payloads (retransmissions
    /// count each time).
    pub messages_written: u64,
    /// Messages seen in incoming packet payloads.
    pub messages_read: u64,
    /// Messages delivered to the application.
    pub messages_received: u64,
    /// Incoming messages discarded as already delivered.
    pub messages_discarded_late: u64,
    /// Incoming messages discarded as beyond the receive window.
    pub messages_discarded_early: u64,
}

#[derive(Debug)]
struct SendQueueEntry {
    message: MessageHandle,
    /// Serialized size including id and type overhead, captured at enqueue
    /// time. Never changes: messages are immutable once queued.
    measured_bits: u16,
    time_last_sent: f64,
}

#[derive(Debug)]
struct SentPacketEntry {
    acked: bool,
    #[allow(dead_code)]
    time_sent: f64,
    message_ids: Vec<u16>,
}

#[derive(Debug)]
struct ReceiveQueueEntry {
    message: MessageHandle,
    #[allow(dead_code)]
    time_received: f64,
}

/// Reliable, ordered message delivery over an unreliable packet transport.
///
/// The host loop calls [`update`](Self::update) each tick, harvests a
/// payload with [`get_data`](Self::get_data), and feeds back incoming
/// payloads and delivered acks through [`process_data`](Self::process_data)
/// and [`process_ack`](Self::process_ack). The application submits with
/// [`send_message`](Self::send_message) and drains with
/// [`receive_message`](Self::receive_message).
pub struct ReliableMessageChannel {
    config: ReliableChannelConfig,
    factory: Rc<dyn MessageFactory>,
    time_base: TimeBase,
    /// Id for the next message added to the send queue.
    send_message_id: u16,
    /// Id for the next message to be delivered to the application.
    receive_message_id: u16,
    send_queue: SlidingWindow<SendQueueEntry>,
    sent_packets: SlidingWindow<SentPacketEntry>,
    receive_queue: SlidingWindow<ReceiveQueueEntry>,
    counters: ChannelCounters,
    /// Bits added to every message by the channel data layer: a 16-bit id
    /// plus the factory's type tag.
    message_overhead_bits: u32,
    /// Upper bound on a message's own serialized payload, in bits.
    max_payload_bits: usize,
}

impl ReliableMessageChannel {
    pub fn new(config: ReliableChannelConfig, factory: Rc<dyn MessageFactory>) -> Self {
        Self::from_parts(config, factory, 0, 0)
    }

    /// Construct a channel with explicit initial message ids.
    ///
    /// Both sides of a connection must agree on the initial ids; fresh
    /// connections start at zero via [`new`](Self::new).
    pub fn from_parts(
        config: ReliableChannelConfig,
        factory: Rc<dyn MessageFactory>,
        send_message_id: u16,
        receive_message_id: u16,
    ) -> Self {
        let message_overhead_bits =
            MESSAGE_ID_BITS + bits_required(0, u32::from(factory.max_type()));
        // A block message may exceed max_message_size by its length prefix.
        let max_payload_bits = (config.max_message_size * 8).max(
            config.max_small_block_size * 8
                + bits_required(0, config.max_small_block_size as u32) as usize,
        );
        tracing::debug!(
            send_queue_size = config.send_queue_size,
            receive_queue_size = config.receive_queue_size,
            sent_packets_size = config.sent_packets_size,
            message_overhead_bits,
            "channel: init"
        );
        Self {
            send_queue: SlidingWindow::new(config.send_queue_size),
            sent_packets: SlidingWindow::new(config.sent_packets_size),
            receive_queue: SlidingWindow::new(config.receive_queue_size),
            config,
            factory,
            time_base: TimeBase::default(),
            send_message_id,
            receive_message_id,
            counters: ChannelCounters::default(),
            message_overhead_bits,
            max_payload_bits,
        }
    }

    pub fn config(&self) -> &ReliableChannelConfig {
        &self.config
    }

    pub fn counters(&self) -> &ChannelCounters {
        &self.counters
    }

    /// Store the host's monotonic time for use by the packer.
    pub fn update(&mut self, time_base: TimeBase) {
        self.time_base = time_base;
    }

    // ------------------------------------------------------------------ //
    // Send side
    // ------------------------------------------------------------------ //

    /// True iff the send window has a slot for the next message id.
    pub fn can_send_message(&self) -> bool {
        self.send_queue.has_slot_available(self.send_message_id)
    }

    /// Queue a message for reliable delivery, assigning it the next id.
    pub fn send_message(&mut self, mut message: Box<dyn Message>) -> Result<(), ChannelError> {
        if !self.can_send_message() {
            return Err(ChannelError::QueueOverflow {
                message_id: self.send_message_id,
            });
        }

        let mut measure = MeasureStream::new();
        message.write_payload(&mut measure)?;
        let payload_bits = measure.bits_written();
        if payload_bits > self.max_payload_bits {
            return Err(ChannelError::MessageTooLarge {
                bits: payload_bits,
                max_bits: self.max_payload_bits,
            });
        }

        message.set_id(self.send_message_id);
        let measured_bits = payload_bits as u32 + self.message_overhead_bits;
        debug_assert!(measured_bits <= 0x7FFF);

        let entry = SendQueueEntry {
            message: Rc::from(message),
            measured_bits: measured_bits as u16,
            time_last_sent: f64::NEG_INFINITY,
        };
        if self.send_queue.insert(self.send_message_id, entry).is_err() {
            return Err(ChannelError::QueueOverflow {
                message_id: self.send_message_id,
            });
        }

        tracing::trace!(
            message_id = self.send_message_id,
            measured_bits,
            "channel: queued message"
        );
        self.counters.messages_sent += 1;
        self.send_message_id = self.send_message_id.wrapping_add(1);
        Ok(())
    }

    /// Queue a small block, wrapped in a [`BlockMessage`].
    pub fn send_block(&mut self, data: Vec<u8>) -> Result<(), ChannelError> {
        if data.len() > self.config.max_small_block_size {
            return Err(ChannelError::BlockTooLarge {
                size: data.len(),
                max: self.config.max_small_block_size,
            });
        }
        let message = BlockMessage::with_data(self.config.max_small_block_size, data);
        self.send_message(Box::new(message))
    }

    // ------------------------------------------------------------------ //
    // Receive side
    // ------------------------------------------------------------------ //

    /// Dequeue the next in-order message, if it has arrived.
    ///
    /// Delivery is strictly in increasing message id with no gaps and no
    /// duplicates; a missing id stalls delivery until it arrives.
    pub fn receive_message(&mut self) -> Option<MessageHandle> {
        let entry = self.receive_queue.remove(self.receive_message_id)?;
        debug_assert_eq!(entry.message.id(), self.receive_message_id);
        tracing::trace!(
            message_id = self.receive_message_id,
            "channel: delivered message"
        );
        self.counters.messages_received += 1;
        self.receive_message_id = self.receive_message_id.wrapping_add(1);
        Some(entry.message)
    }

    // ------------------------------------------------------------------ //
    // Packet payloads
    // ------------------------------------------------------------------ //

    /// An empty payload for the packet codec to deserialize into.
    pub fn create_data(&self) -> ChannelData {
        ChannelData::default()
    }

    /// Serialize a payload produced by [`get_data`](Self::get_data).
    pub fn write_data(
        &self,
        data: &ChannelData,
        writer: &mut dyn BitWrite,
    ) -> Result<(), ChannelError> {
        data.write(
            writer,
            self.factory.as_ref(),
            self.config.max_messages_per_packet,
        )
    }

    /// Deserialize a payload for [`process_data`](Self::process_data).
    pub fn read_data(&self, reader: &mut BitReader<'_>) -> Result<ChannelData, ChannelError> {
        ChannelData::read(
            reader,
            self.factory.as_ref(),
            self.config.max_messages_per_packet,
        )
    }

    /// Select messages for the outgoing packet `packet_sequence` under the
    /// config's default byte budget.
    pub fn get_data_default(&mut self, packet_sequence: u16) -> Option<ChannelData> {
        self.get_data(packet_sequence, (self.config.packet_budget * 8) as u32)
    }

    /// Select messages for the outgoing packet `packet_sequence`, spending
    /// at most `budget_bits` of serialized payload.
    ///
    /// Packs in ascending message id from the oldest unacked message,
    /// skipping entries sent less than `resend_rate` ago and entries that
    /// no longer fit. Returns `None` when nothing is eligible.
    pub fn get_data(&mut self, packet_sequence: u16, budget_bits: u32) -> Option<ChannelData> {
        let oldest_message_id = self.find_oldest_queued_id()?;

        let mut available_bits = budget_bits;
        let mut selected: Vec<u16> = Vec::with_capacity(self.config.max_messages_per_packet);

        // The scan never reaches past the remote receive window, so it is
        // bounded by the receive queue size, not the send queue size.
        for i in 0..self.config.receive_queue_size {
            // Without this cutoff the scan can walk the entire window
            // looking for a message that cannot possibly fit.
            if available_bits < self.config.give_up_bits {
                break;
            }
            let message_id = oldest_message_id.wrapping_add(i as u16);
            if let Some(entry) = self.send_queue.find_mut(message_id) {
                if entry.time_last_sent + self.config.resend_rate <= self.time_base.time
                    && u32::from(entry.measured_bits) <= available_bits
                {
                    selected.push(message_id);
                    entry.time_last_sent = self.time_base.time;
                    available_bits -= u32::from(entry.measured_bits);
                }
            }
            if selected.len() == self.config.max_messages_per_packet {
                break;
            }
        }

        if selected.is_empty() {
            return None;
        }

        tracing::trace!(
            packet_sequence,
            num_messages = selected.len(),
            spent_bits = budget_bits - available_bits,
            budget_bits,
            "channel: packed payload"
        );

        self.counters.messages_written += selected.len() as u64;

        let messages = selected
            .iter()
            .map(|&message_id| {
                let entry = self
                    .send_queue
                    .find(message_id)
                    .expect("selected id is in the send queue");
                Rc::clone(&entry.message)
            })
            .collect();

        self.sent_packets.insert_fast(
            packet_sequence,
            SentPacketEntry {
                acked: false,
                time_sent: self.time_base.time,
                message_ids: selected,
            },
        );

        Some(ChannelData { messages })
    }

    /// Oldest queued message id, scanning the send window under modular
    /// arithmetic. `None` when the queue is empty.
    fn find_oldest_queued_id(&self) -> Option<u16> {
        let base_id = self
            .send_message_id
            .wrapping_sub(self.config.send_queue_size as u16);
        let mut oldest: Option<u16> = None;
        for i in 0..self.config.send_queue_size {
            let message_id = base_id.wrapping_add(i as u16);
            if self.send_queue.find(message_id).is_some()
                && oldest.is_none_or(|current| sequence_less_than(message_id, current))
            {
                oldest = Some(message_id);
            }
        }
        oldest
    }

    /// Insert the messages of an incoming payload into the receive queue.
    ///
    /// Late messages are counted and dropped; duplicates re-insert
    /// idempotently. A message beyond the receive window means sender and
    /// receiver have diverged: the whole payload is still processed, then
    /// [`ChannelError::EarlyMessage`] surfaces so the host can tear the
    /// connection down.
    pub fn process_data(
        &mut self,
        packet_sequence: u16,
        data: ChannelData,
    ) -> Result<(), ChannelError> {
        let min_message_id = self.receive_message_id;
        let max_message_id = self
            .receive_message_id
            .wrapping_add(self.config.receive_queue_size as u16)
            .wrapping_sub(1);

        let mut early_message = false;

        for message in data.messages {
            let message_id = message.id();
            if sequence_less_than(message_id, min_message_id) {
                tracing::trace!(packet_sequence, message_id, "channel: late message");
                self.counters.messages_discarded_late += 1;
            } else if sequence_greater_than(message_id, max_message_id) {
                tracing::debug!(
                    packet_sequence,
                    message_id,
                    max_message_id,
                    "channel: early message"
                );
                early_message = true;
                self.counters.messages_discarded_early += 1;
            } else {
                let inserted = self.receive_queue.insert(
                    message_id,
                    ReceiveQueueEntry {
                        message,
                        time_received: self.time_base.time,
                    },
                );
                // In-window ids can only collide with themselves.
                debug_assert!(inserted.is_ok());
            }
            self.counters.messages_read += 1;
        }

        if early_message {
            return Err(ChannelError::EarlyMessage);
        }
        Ok(())
    }

    /// Release the send-queue slots of every message the acked packet
    /// carried. Unknown and already-acked packet ids are no-ops.
    ///
    /// A message may ride in several packets through retransmission; the
    /// first ack releases it and later acks find the slot already empty.
    pub fn process_ack(&mut self, packet_sequence: u16) {
        let Some(sent_packet) = self.sent_packets.find_mut(packet_sequence) else {
            return;
        };
        if sent_packet.acked {
            return;
        }
        sent_packet.acked = true;
        // Acked entries never consult their ids again.
        let message_ids = std::mem::take(&mut sent_packet.message_ids);

        for message_id in message_ids {
            if self.send_queue.remove(message_id).is_some() {
                tracing::trace!(packet_sequence, message_id, "channel: acked message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::any::Any;
    use marline_core::{BitWriter, StreamError};

    // ------------------------------------------------------------------ //
    // Test message & factory
    // ------------------------------------------------------------------ //

    const TEST_MESSAGE_TYPE: u16 = 1;

    #[derive(Debug, PartialEq, Eq)]
    struct TestMessage {
        id: u16,
        value: u32,
    }

    impl TestMessage {
        fn new(value: u32) -> Self {
            Self { id: 0, value }
        }
    }

    impl Message for TestMessage {
        fn type_id(&self) -> u16 {
            TEST_MESSAGE_TYPE
        }

        fn id(&self) -> u16 {
            self.id
        }

        fn set_id(&mut self, id: u16) {
            self.id = id;
        }

        fn write_payload(&self, writer: &mut dyn BitWrite) -> Result<(), StreamError> {
            writer.write_bits(self.value, 24)
        }

        fn read_payload(&mut self, reader: &mut BitReader<'_>) -> Result<(), StreamError> {
            self.value = reader.read_bits(24)?;
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct TestFactory;

    impl MessageFactory for TestFactory {
        fn create(&self, type_id: u16) -> Option<Box<dyn Message>> {
            match type_id {
                crate::message::BLOCK_MESSAGE_TYPE => Some(Box::new(BlockMessage::new(64))),
                TEST_MESSAGE_TYPE => Some(Box::new(TestMessage::new(0))),
                _ => None,
            }
        }

        fn max_type(&self) -> u16 {
            TEST_MESSAGE_TYPE
        }
    }

    fn channel(config: ReliableChannelConfig) -> ReliableMessageChannel {
        ReliableMessageChannel::new(config, Rc::new(TestFactory))
    }

    fn small_config() -> ReliableChannelConfig {
        ReliableChannelConfig {
            send_queue_size: 8,
            receive_queue_size: 8,
            sent_packets_size: 8,
            ..ReliableChannelConfig::default()
        }
    }

    fn value_of(message: &dyn Message) -> u32 {
        message
            .as_any()
            .downcast_ref::<TestMessage>()
            .expect("test message")
            .value
    }

    // ================================================================== //
    // Send queue
    // ================================================================== //

    #[test]
    fn send_assigns_sequential_ids() {
        let mut channel = channel(small_config());
        for value in 0..3 {
            channel
                .send_message(Box::new(TestMessage::new(value)))
                .unwrap();
        }
        assert_eq!(channel.counters().messages_sent, 3);

        let data = channel.get_data(0, 4096).unwrap();
        let ids: Vec<u16> = data.messages.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn send_overflow_when_window_full() {
        let mut channel = channel(small_config());
        for value in 0..8 {
            assert!(channel.can_send_message());
            channel
                .send_message(Box::new(TestMessage::new(value)))
                .unwrap();
        }
        assert!(!channel.can_send_message());
        let err = channel
            .send_message(Box::new(TestMessage::new(99)))
            .unwrap_err();
        assert!(matches!(
            err,
            ChannelError::QueueOverflow { message_id: 8 }
        ));
    }

    #[test]
    fn send_rejects_oversize_message() {
        #[derive(Debug)]
        struct HugeMessage;
        impl Message for HugeMessage {
            fn type_id(&self) -> u16 {
                TEST_MESSAGE_TYPE
            }
            fn id(&self) -> u16 {
                0
            }
            fn set_id(&mut self, _id: u16) {}
            fn write_payload(&self, writer: &mut dyn BitWrite) -> Result<(), StreamError> {
                writer.write_bytes(&[0u8; 200])
            }
            fn read_payload(&mut self, _reader: &mut BitReader<'_>) -> Result<(), StreamError> {
                Ok(())
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let mut channel = channel(small_config());
        let err = channel.send_message(Box::new(HugeMessage)).unwrap_err();
        assert!(matches!(err, ChannelError::MessageTooLarge { .. }));
        assert_eq!(channel.counters().messages_sent, 0);
    }

    // ================================================================== //
    // Packing
    // ================================================================== //

    #[test]
    fn get_data_empty_queue_returns_none() {
        let mut channel = channel(small_config());
        assert!(channel.get_data(0, 4096).is_none());
    }

    #[test]
    fn get_data_respects_budget() {
        // 24-bit payload + 17-bit overhead (16-bit id + 1-bit type) = 41.
        let config = ReliableChannelConfig {
            give_up_bits: 8,
            ..small_config()
        };
        let mut channel = channel(config);
        for value in 0..4 {
            channel
                .send_message(Box::new(TestMessage::new(value)))
                .unwrap();
        }
        // Budget for exactly two messages; the third no longer fits.
        let data = channel.get_data(0, 82).unwrap();
        assert_eq!(data.messages.len(), 2);
    }

    #[test]
    fn get_data_respects_message_cap() {
        let config = ReliableChannelConfig {
            max_messages_per_packet: 3,
            ..small_config()
        };
        let mut channel = channel(config);
        for value in 0..6 {
            channel
                .send_message(Box::new(TestMessage::new(value)))
                .unwrap();
        }
        let data = channel.get_data(0, 100_000).unwrap();
        assert_eq!(data.messages.len(), 3);
    }

    #[test]
    fn get_data_gives_up_below_threshold() {
        let config = ReliableChannelConfig {
            give_up_bits: 64,
            ..small_config()
        };
        let mut channel = channel(config);
        channel
            .send_message(Box::new(TestMessage::new(7)))
            .unwrap();
        // 50 bits is under the give-up threshold before anything is packed.
        assert!(channel.get_data(0, 50).is_none());
    }

    #[test]
    fn get_data_paces_resends() {
        let mut channel = channel(small_config());
        channel.update(TimeBase::new(10.0));
        channel
            .send_message(Box::new(TestMessage::new(1)))
            .unwrap();

        assert!(channel.get_data(0, 4096).is_some());
        // Same tick: resend delay not yet elapsed.
        assert!(channel.get_data(1, 4096).is_none());
        // Just before the resend delay elapses.
        channel.update(TimeBase::new(10.0 + 0.099));
        assert!(channel.get_data(2, 4096).is_none());
        // At the resend delay.
        channel.update(TimeBase::new(10.0 + 0.1));
        assert!(channel.get_data(3, 4096).is_some());
    }

    #[test]
    fn get_data_counts_written_messages() {
        let mut channel = channel(small_config());
        for value in 0..3 {
            channel
                .send_message(Box::new(TestMessage::new(value)))
                .unwrap();
        }
        channel.get_data(0, 4096).unwrap();
        assert_eq!(channel.counters().messages_written, 3);
        // Retransmission counts again.
        channel.update(TimeBase::new(1.0));
        channel.get_data(1, 4096).unwrap();
        assert_eq!(channel.counters().messages_written, 6);
    }

    // ================================================================== //
    // Acks
    // ================================================================== //

    #[test]
    fn ack_releases_send_queue_slots() {
        let mut channel = channel(small_config());
        for value in 0..8 {
            channel
                .send_message(Box::new(TestMessage::new(value)))
                .unwrap();
        }
        assert!(!channel.can_send_message());

        channel.get_data(0, 100_000).unwrap();
        channel.process_ack(0);
        assert!(channel.can_send_message());
        // The queue is empty again.
        assert!(channel.get_data(1, 100_000).is_none());
    }

    #[test]
    fn ack_unknown_packet_is_noop() {
        let mut channel = channel(small_config());
        channel
            .send_message(Box::new(TestMessage::new(1)))
            .unwrap();
        channel.process_ack(42);
        // Message still queued.
        assert!(channel.get_data(0, 4096).is_some());
    }

    #[test]
    fn duplicate_ack_is_noop() {
        let mut channel = channel(small_config());
        channel
            .send_message(Box::new(TestMessage::new(1)))
            .unwrap();
        channel.get_data(0, 4096).unwrap();
        channel.process_ack(0);
        channel.process_ack(0);
        assert!(channel.get_data(1, 4096).is_none());
    }

    #[test]
    fn ack_of_retransmission_releases_once() {
        let mut channel = channel(small_config());
        channel
            .send_message(Box::new(TestMessage::new(1)))
            .unwrap();

        channel.get_data(0, 4096).unwrap();
        channel.update(TimeBase::new(1.0));
        channel.get_data(1, 4096).unwrap();

        // Ack the retransmission first; the original ack is then a no-op.
        channel.process_ack(1);
        channel.update(TimeBase::new(2.0));
        assert!(channel.get_data(2, 4096).is_none());
        channel.process_ack(0);
        assert!(channel.get_data(3, 4096).is_none());
    }

    // ================================================================== //
    // Receive side
    // ================================================================== //

    /// Move one packed payload from `sender` into `receiver`.
    fn transfer(
        sender: &mut ReliableMessageChannel,
        receiver: &mut ReliableMessageChannel,
        packet_sequence: u16,
        budget_bits: u32,
    ) -> bool {
        let Some(data) = sender.get_data(packet_sequence, budget_bits) else {
            return false;
        };
        let mut writer = BitWriter::new();
        sender.write_data(&data, &mut writer).unwrap();
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        let decoded = receiver.read_data(&mut reader).unwrap();
        receiver.process_data(packet_sequence, decoded).unwrap();
        true
    }

    #[test]
    fn messages_deliver_in_order() {
        let mut sender = channel(small_config());
        let mut receiver = channel(small_config());
        for value in 10..15 {
            sender
                .send_message(Box::new(TestMessage::new(value)))
                .unwrap();
        }
        assert!(transfer(&mut sender, &mut receiver, 0, 100_000));

        for value in 10..15 {
            let message = receiver.receive_message().unwrap();
            assert_eq!(value_of(message.as_ref()), value);
        }
        assert!(receiver.receive_message().is_none());
        assert_eq!(receiver.counters().messages_received, 5);
        assert_eq!(receiver.counters().messages_read, 5);
    }

    #[test]
    fn out_of_order_delivery_stalls_until_gap_fills() {
        let config = small_config();
        let mut receiver = channel(config.clone());

        // Hand-build a payload containing only message id 1.
        let mut late_sender = channel(config);
        late_sender
            .send_message(Box::new(TestMessage::new(0)))
            .unwrap();
        late_sender
            .send_message(Box::new(TestMessage::new(1)))
            .unwrap();
        let data = late_sender.get_data(0, 100_000).unwrap();
        let only_second = ChannelData {
            messages: vec![Rc::clone(&data.messages[1])],
        };
        receiver.process_data(0, only_second).unwrap();

        // Id 0 is missing: nothing deliverable yet.
        assert!(receiver.receive_message().is_none());

        let only_first = ChannelData {
            messages: vec![Rc::clone(&data.messages[0])],
        };
        receiver.process_data(1, only_first).unwrap();

        assert_eq!(value_of(receiver.receive_message().unwrap().as_ref()), 0);
        assert_eq!(value_of(receiver.receive_message().unwrap().as_ref()), 1);
    }

    #[test]
    fn late_message_discarded_and_counted() {
        let mut sender = channel(small_config());
        let mut receiver = channel(small_config());
        sender
            .send_message(Box::new(TestMessage::new(5)))
            .unwrap();

        let data = sender.get_data(0, 4096).unwrap();
        let duplicate = ChannelData {
            messages: data.messages.clone(),
        };

        receiver.process_data(0, data).unwrap();
        assert!(receiver.receive_message().is_some());

        // The same message again, now behind the receive window.
        receiver.process_data(1, duplicate).unwrap();
        assert_eq!(receiver.counters().messages_discarded_late, 1);
        assert!(receiver.receive_message().is_none());
    }

    #[test]
    fn duplicate_in_window_message_is_idempotent() {
        let mut sender = channel(small_config());
        let mut receiver = channel(small_config());
        sender
            .send_message(Box::new(TestMessage::new(5)))
            .unwrap();

        let data = sender.get_data(0, 4096).unwrap();
        let duplicate = ChannelData {
            messages: data.messages.clone(),
        };

        receiver.process_data(0, data).unwrap();
        receiver.process_data(1, duplicate).unwrap();

        assert_eq!(value_of(receiver.receive_message().unwrap().as_ref()), 5);
        assert!(receiver.receive_message().is_none());
        assert_eq!(receiver.counters().messages_received, 1);
    }

    #[test]
    fn early_message_fails_and_counts() {
        let config = ReliableChannelConfig {
            receive_queue_size: 4,
            ..small_config()
        };
        let mut receiver = channel(config);

        let mut message = TestMessage::new(1);
        message.set_id(10);
        let data = ChannelData {
            messages: vec![Rc::new(message) as MessageHandle],
        };

        let err = receiver.process_data(0, data).unwrap_err();
        assert!(matches!(err, ChannelError::EarlyMessage));
        assert_eq!(receiver.counters().messages_discarded_early, 1);
        assert_eq!(receiver.counters().messages_read, 1);
        assert!(receiver.receive_message().is_none());
    }

    // ================================================================== //
    // Wraparound
    // ================================================================== //

    #[test]
    fn ids_wrap_across_sequence_boundary() {
        let mut sender = ReliableMessageChannel::from_parts(
            small_config(),
            Rc::new(TestFactory),
            65534,
            0,
        );
        let mut receiver = ReliableMessageChannel::from_parts(
            small_config(),
            Rc::new(TestFactory),
            0,
            65534,
        );

        for value in 0..3 {
            sender
                .send_message(Box::new(TestMessage::new(value)))
                .unwrap();
        }
        assert!(transfer(&mut sender, &mut receiver, 0, 100_000));
        sender.process_ack(0);

        let ids: Vec<u16> = (0..3)
            .map(|_| receiver.receive_message().unwrap().id())
            .collect();
        assert_eq!(ids, vec![65534, 65535, 0]);

        // The queue is clear and usable past the boundary.
        assert!(sender.can_send_message());
        assert!(sender.get_data(1, 100_000).is_none());
    }

    // ================================================================== //
    // Blocks
    // ================================================================== //

    #[test]
    fn small_block_roundtrip() {
        let mut sender = channel(small_config());
        let mut receiver = channel(small_config());

        sender.send_block(vec![0xAB; 40]).unwrap();
        assert!(transfer(&mut sender, &mut receiver, 0, 100_000));

        let message = receiver.receive_message().unwrap();
        let block = message
            .as_any()
            .downcast_ref::<BlockMessage>()
            .expect("block message");
        assert_eq!(block.data(), &[0xAB; 40][..]);
    }

    #[test]
    fn oversize_block_rejected() {
        let mut channel = channel(small_config());
        let err = channel.send_block(vec![0; 65]).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::BlockTooLarge { size: 65, max: 64 }
        ));
    }
}
