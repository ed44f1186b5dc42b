//! Protocol segments exchanged between entity A and entity B.
//!
//! Every unit handed to the channel is a [`Segment`].  Segments are plain
//! values: the channel may corrupt the copy it carries, and the sender keeps
//! its own copy for verbatim retransmission.
//!
//! # Fields
//!
//! ```text
//!  +-----------+-----------+----------------+---------------------------+
//!  | seq (i32) | ack (i32) | checksum (i32) | payload (≤ MAX_PAYLOAD)   |
//!  +-----------+-----------+----------------+---------------------------+
//! ```
//!
//! `ack` is [`kind::DATA`] for data segments and [`kind::CONTROL`] for
//! acknowledgements.  A NACK is simply an ACK naming the last in-order
//! sequence number the receiver has delivered.

use std::fmt;

use crate::checksum;

/// Values of the `ack` field.
pub mod kind {
    /// Data segment carrying an application payload.
    pub const DATA: i32 = 0;
    /// Control segment (cumulative ACK or NACK).
    pub const CONTROL: i32 = 1;
}

/// One segment on the simulated wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Sequence number.  Data segments start at 1.
    pub seq: i32,
    /// [`kind::DATA`] or [`kind::CONTROL`].
    pub ack: i32,
    /// Complement of [`checksum::compute_sum`] at creation time.
    pub checksum: i32,
    /// Application payload; empty for control segments.
    pub payload: String,
}

impl Segment {
    /// Build a segment with a freshly computed checksum.
    pub fn new(seq: i32, ack: i32, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        Self {
            seq,
            ack,
            checksum: checksum::build_checksum(seq, ack, &payload),
            payload,
        }
    }

    /// Data segment carrying `payload`.
    pub fn data(seq: i32, payload: impl Into<String>) -> Self {
        Self::new(seq, kind::DATA, payload)
    }

    /// Cumulative acknowledgement for everything up to and including `seq`.
    pub fn ack(seq: i32) -> Self {
        Self::new(seq, kind::CONTROL, String::new())
    }

    /// `true` for [`kind::CONTROL`] segments.
    pub fn is_control(&self) -> bool {
        self.ack == kind::CONTROL
    }

    /// `true` when the fields no longer match the checksum.
    pub fn is_corrupted(&self) -> bool {
        checksum::is_corrupted(self)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seq={} ack={} check={} payload={:?}",
            self.seq, self.ack, self.checksum, self.payload
        )
    }
}
