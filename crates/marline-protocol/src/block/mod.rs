//! Data-block fragmentation support.
//!
//! Blocks above the channel's small-block limit travel as fixed-size
//! fragments; [`DataBlockReceiver`] reassembles them and acks each
//! admissible fragment so the sender can converge.

pub mod constants;
pub mod receiver;

pub use receiver::DataBlockReceiver;
