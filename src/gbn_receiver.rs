//! Go-Back-N receive-side state machine (entity B).
//!
//! [`GbnReceiver`] implements the receiver side of Go-Back-N:
//!
//! - Only **in-order** segments are accepted (`seq == expected_seq`).  Each
//!   one is ACKed with its own sequence number and delivered upward once.
//! - A corrupted segment is answered with a NACK naming the last in-order
//!   sequence number (`expected_seq - 1`).
//! - Out-of-order and duplicate segments are **silently discarded**: no
//!   delivery and no acknowledgement.  The sender's timeout recovers.
//!
//! This module only manages state; all channel and upper-layer I/O is
//! returned to the caller as [`Action`]s.

use std::sync::Arc;

use crate::event::{Action, Event};
use crate::gbn_sender::INITIAL_SEQ;
use crate::packet::Segment;
use crate::stats::NetStats;

// ---------------------------------------------------------------------------
// GbnReceiver
// ---------------------------------------------------------------------------

/// Go-Back-N receive-side state.
#[derive(Debug)]
pub struct GbnReceiver {
    /// Next sequence number accepted for upward delivery.
    expected_seq: i32,
    stats: Arc<NetStats>,
}

impl GbnReceiver {
    /// Create a new [`GbnReceiver`] expecting the sender's first sequence
    /// number.
    pub fn new(stats: Arc<NetStats>) -> Self {
        Self {
            expected_seq: INITIAL_SEQ,
            stats,
        }
    }

    /// Next in-order sequence number.
    pub fn expected_seq(&self) -> i32 {
        self.expected_seq
    }

    /// Dispatch one event.  B has no timer and no upper-layer input, so
    /// anything other than a segment is ignored.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::Segment(seg) => self.on_segment(seg),
            other => {
                log::warn!("[B] ignoring unexpected event {other:?}");
                Vec::new()
            }
        }
    }

    /// Process an inbound segment.
    pub fn on_segment(&mut self, seg: Segment) -> Vec<Action> {
        if seg.is_corrupted() {
            self.stats.segment_corrupted();
            let nack = Segment::ack(self.expected_seq - 1);
            log::info!("[B] ← corrupt segment ({seg}); → NACK seq={}", nack.seq);
            return vec![self.transmit(nack)];
        }

        if seg.seq != self.expected_seq {
            log::debug!(
                "[B] ← DATA seq={} out of order (expected {}); discarded",
                seg.seq,
                self.expected_seq
            );
            return Vec::new();
        }

        let ack = Segment::ack(seg.seq);
        self.expected_seq = seg.seq + 1;
        self.stats.message_delivered();
        log::debug!(
            "[B] ← DATA seq={} accepted; → ACK, delivering {:?}",
            seg.seq,
            seg.payload
        );

        vec![self.transmit(ack), Action::Deliver(seg.payload)]
    }

    fn transmit(&self, seg: Segment) -> Action {
        self.stats.segment_transmitted();
        Action::Transmit(seg)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
