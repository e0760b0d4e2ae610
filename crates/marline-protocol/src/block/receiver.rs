//! Fragmented data-block reassembly.

use super::constants::MAX_FRAGMENT_SIZE;
use crate::error::BlockError;

/// Reassembles a large block from fixed-size fragments.
///
/// Fragments carry the block's total size, the fragment count, their own
/// index, and a byte slice. Metadata is adopted from the first admissible
/// fragment; fragments that contradict it are rejected and counted, not
/// surfaced. An oversize block sets a sticky error that consumes all
/// further fragments until [`clear`](Self::clear).
///
/// Every admissible fragment is acked through the caller-supplied callback,
/// duplicates included, so the sender converges even under packet loss.
#[derive(Debug)]
pub struct DataBlockReceiver {
    fragment_size: usize,
    max_block_size: usize,
    max_fragments: usize,
    data: Vec<u8>,
    received: Vec<bool>,
    /// Adopted from the first fragment; zero until then.
    block_size: usize,
    /// Adopted from the first fragment; zero until then.
    num_fragments: usize,
    num_received_fragments: usize,
    error: Option<BlockError>,
    fragments_rejected: u64,
}

impl DataBlockReceiver {
    /// Create a receiver for blocks up to `max_block_size` bytes, cut into
    /// `fragment_size`-byte fragments (the final fragment may be shorter).
    pub fn new(fragment_size: usize, max_block_size: usize) -> Self {
        assert!(fragment_size > 0, "fragment size must be non-zero");
        assert!(
            fragment_size <= MAX_FRAGMENT_SIZE,
            "fragment size exceeds MAX_FRAGMENT_SIZE"
        );
        assert!(max_block_size > 0, "max block size must be non-zero");

        let max_fragments = max_block_size.div_ceil(fragment_size);
        Self {
            fragment_size,
            max_block_size,
            max_fragments,
            data: vec![0; max_block_size],
            received: vec![false; max_fragments],
            block_size: 0,
            num_fragments: 0,
            num_received_fragments: 0,
            error: None,
            fragments_rejected: 0,
        }
    }

    /// Reset to the initial state: no adopted metadata, no fragments, no
    /// error.
    pub fn clear(&mut self) {
        self.block_size = 0;
        self.num_fragments = 0;
        self.num_received_fragments = 0;
        self.error = None;
        self.received.fill(false);
    }

    /// The sticky error, if one has been raised.
    pub fn error(&self) -> Option<BlockError> {
        self.error
    }

    /// Fragments rejected for inconsistent or out-of-range metadata.
    pub fn fragments_rejected(&self) -> u64 {
        self.fragments_rejected
    }

    pub fn num_received_fragments(&self) -> usize {
        self.num_received_fragments
    }

    /// True once every fragment of the adopted block has arrived.
    pub fn receive_completed(&self) -> bool {
        self.num_fragments > 0 && self.num_received_fragments == self.num_fragments
    }

    /// Process one incoming fragment, acking it through `send_ack` if it is
    /// admissible.
    pub fn process_fragment(
        &mut self,
        block_size: usize,
        num_fragments: usize,
        fragment_id: usize,
        fragment_data: &[u8],
        mut send_ack: impl FnMut(u16),
    ) {
        if block_size > self.max_block_size {
            tracing::debug!(
                block_size,
                max_block_size = self.max_block_size,
                "block receiver: block too large"
            );
            self.error = Some(BlockError::BlockTooLarge {
                size: block_size,
                max: self.max_block_size,
            });
            return;
        }

        if self.error.is_some() {
            return;
        }

        // Adopt the block metadata from the first fragment; later fragments
        // must agree with it.
        if self.block_size == 0 {
            self.block_size = block_size;
            tracing::debug!(block_size, "block receiver: adopted block size");
        }
        if self.block_size != block_size {
            self.reject(fragment_id, "block size mismatch");
            return;
        }

        if num_fragments > self.max_fragments {
            self.reject(fragment_id, "fragment count exceeds maximum");
            return;
        }
        if self.num_fragments == 0 {
            self.num_fragments = num_fragments;
            tracing::debug!(num_fragments, "block receiver: adopted fragment count");
        }
        if self.num_fragments != num_fragments {
            self.reject(fragment_id, "fragment count mismatch");
            return;
        }

        if fragment_id >= self.num_fragments {
            self.reject(fragment_id, "fragment id out of range");
            return;
        }

        let start = fragment_id * self.fragment_size;
        let end = start + fragment_data.len();
        if end > self.block_size {
            self.reject(fragment_id, "fragment extends past block end");
            return;
        }

        // Ack before the duplicate check: the sender needs acks for
        // retransmitted fragments too.
        send_ack(fragment_id as u16);

        if !self.received[fragment_id] {
            self.received[fragment_id] = true;
            self.num_received_fragments += 1;
            debug_assert!(self.num_received_fragments <= self.num_fragments);
            self.data[start..end].copy_from_slice(fragment_data);
            tracing::trace!(
                fragment_id,
                received = self.num_received_fragments,
                total = self.num_fragments,
                "block receiver: stored fragment"
            );
        }
    }

    /// The assembled block, once complete.
    ///
    /// The returned slice borrows the receiver's buffer; the receiver keeps
    /// the allocation and the view ends with the borrow.
    pub fn block(&self) -> Option<&[u8]> {
        if self.receive_completed() && self.block_size > 0 {
            Some(&self.data[..self.block_size])
        } else {
            None
        }
    }

    fn reject(&mut self, fragment_id: usize, reason: &'static str) {
        tracing::debug!(fragment_id, reason, "block receiver: rejected fragment");
        self.fragments_rejected += 1;
    }
}
