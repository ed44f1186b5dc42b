//! Go-Back-N send-side state machine (entity A).
//!
//! [`GbnSender`] maintains a sliding window of up to `N` in-flight segments
//! plus a bounded FIFO of messages waiting for window space.
//!
//! # Protocol contract
//!
//! - At most `window_size` segments may be in flight at once.
//! - ACKs are **cumulative**: an ACK naming `seq = K` acknowledges every
//!   segment with `seq ≤ K`.
//! - A single timer covers the oldest unacknowledged segment.  On timeout,
//!   on a corrupted inbound segment, and on a NACK, **every** in-flight
//!   segment is retransmitted (go back N).
//! - An uncorrupted ACK naming a sequence number beyond `next_seq` is a
//!   protocol violation and is returned as [`ProtocolError`].
//!
//! This module only manages state; every transmission and timer request is
//! returned to the caller as an [`Action`].

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::ProtocolConfig;
use crate::error::ProtocolError;
use crate::event::{Action, Event};
use crate::message::Message;
use crate::packet::Segment;
use crate::stats::NetStats;

/// First sequence number handed out.
pub const INITIAL_SEQ: i32 = 1;

// ---------------------------------------------------------------------------
// GbnEntry
// ---------------------------------------------------------------------------

/// A single in-flight segment occupying one slot in the retransmit window.
#[derive(Debug, Clone)]
pub struct GbnEntry {
    /// The segment exactly as first transmitted.
    pub segment: Segment,
    /// Total number of times this segment has been transmitted.
    pub tx_count: u32,
}

// ---------------------------------------------------------------------------
// GbnSender
// ---------------------------------------------------------------------------

/// Go-Back-N send-side state.
///
/// # Sequence-number layout
///
/// ```text
///    base            next_seq
///      │                  │
///  ────┼──────────────────┼──────────────────▶ seq space
///      │ <── in flight ──▶│ <── sendable ───▶
/// ```
#[derive(Debug)]
pub struct GbnSender {
    /// Sequence number of the **oldest** unacked segment (left window edge).
    base: i32,

    /// Sequence number to use for the **next** new segment.
    next_seq: i32,

    /// Maximum number of segments that may be in flight simultaneously (N).
    window_size: usize,

    /// In-flight segments ordered by sequence number (front = oldest).
    window: VecDeque<GbnEntry>,

    /// Messages that arrived while the window was full.
    pending: VecDeque<Message>,
    pending_capacity: usize,

    retransmit_timeout: f64,
    timer_running: bool,

    stats: Arc<NetStats>,
}

impl GbnSender {
    /// Create a new [`GbnSender`] with `base = next_seq = 1`.
    ///
    /// # Panics
    ///
    /// Panics if `config.window_size` is zero.
    pub fn new(config: &ProtocolConfig, stats: Arc<NetStats>) -> Self {
        assert!(config.window_size >= 1, "window_size must be at least 1");
        Self {
            base: INITIAL_SEQ,
            next_seq: INITIAL_SEQ,
            window_size: config.window_size,
            window: VecDeque::with_capacity(config.window_size),
            pending: VecDeque::with_capacity(config.pending_capacity),
            pending_capacity: config.pending_capacity,
            retransmit_timeout: config.retransmit_timeout,
            timer_running: false,
            stats,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn base(&self) -> i32 {
        self.base
    }

    pub fn next_seq(&self) -> i32 {
        self.next_seq
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// `true` when there is room for at least one more in-flight segment.
    pub fn can_send(&self) -> bool {
        self.window.len() < self.window_size
    }

    /// Number of segments currently awaiting acknowledgement.
    pub fn in_flight(&self) -> usize {
        self.window.len()
    }

    /// `true` when at least one segment is awaiting acknowledgement.
    pub fn has_unacked(&self) -> bool {
        !self.window.is_empty()
    }

    /// Number of messages waiting for window space.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether the retransmit timer is currently armed.
    pub fn timer_running(&self) -> bool {
        self.timer_running
    }

    /// Iterate over all in-flight segments from oldest to newest.
    pub fn window_entries(&self) -> impl Iterator<Item = &GbnEntry> {
        self.window.iter()
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    /// Dispatch one event to the matching handler.
    pub fn handle(&mut self, event: Event) -> Result<Vec<Action>, ProtocolError> {
        match event {
            Event::Message(msg) => Ok(self.on_message(msg)),
            Event::Segment(seg) => self.on_segment(seg),
            Event::TimerFired => Ok(self.on_timeout()),
        }
    }

    /// The upper layer has a message to send.
    ///
    /// Sent immediately when the window has room; otherwise queued, or dropped
    /// (and counted) when the queue is full as well.
    pub fn on_message(&mut self, msg: Message) -> Vec<Action> {
        self.stats.message_submitted();
        let mut actions = Vec::new();

        if self.can_send() {
            debug_assert!(self.pending.is_empty(), "window has room but messages are queued");
            self.admit(msg, &mut actions);
            // The timer covers the oldest segment; only the first one arms it.
            if self.window.len() == 1 {
                self.arm_timer(&mut actions);
            }
        } else if self.pending.len() < self.pending_capacity {
            self.pending.push_back(msg);
            log::debug!(
                "[A] window full ({}/{}); buffered message, pending={}",
                self.window.len(),
                self.window_size,
                self.pending.len()
            );
        } else {
            self.stats.message_dropped();
            log::info!("[A] pending queue full; dropping message {:?}", msg.data());
        }

        actions
    }

    /// A segment arrived from B.
    pub fn on_segment(&mut self, seg: Segment) -> Result<Vec<Action>, ProtocolError> {
        let mut actions = Vec::new();

        if seg.is_corrupted() {
            self.stats.segment_corrupted();
            log::info!("[A] ← corrupt segment ({seg}); retransmitting window");
            self.retransmit_window(&mut actions);
            return Ok(actions);
        }

        if seg.seq > self.next_seq {
            return Err(ProtocolError::AckBeyondNextSeq {
                ack: seg.seq,
                next_seq: self.next_seq,
            });
        }

        if seg.is_control() && seg.seq >= self.base {
            self.slide(seg.seq, &mut actions);
        } else {
            log::info!(
                "[A] ← NACK seq={} base={}; retransmitting window",
                seg.seq,
                self.base
            );
            self.retransmit_window(&mut actions);
        }

        Ok(actions)
    }

    /// The retransmit timer expired: resend the whole window and re-arm.
    pub fn on_timeout(&mut self) -> Vec<Action> {
        self.timer_running = false;
        let mut actions = Vec::new();

        if self.window.is_empty() {
            log::warn!("[A] timer fired with nothing in flight; ignoring");
            return actions;
        }

        self.stats.segment_lost();
        log::info!(
            "[A] timeout; retransmitting {} segment(s) from base={}",
            self.window.len(),
            self.base
        );
        self.retransmit_window(&mut actions);
        actions
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Assign the next sequence number to `msg`, place it in the window and
    /// transmit it.
    fn admit(&mut self, msg: Message, actions: &mut Vec<Action>) {
        debug_assert!(
            self.can_send(),
            "admit called on a full GBN window ({} / {})",
            self.window.len(),
            self.window_size
        );
        let seg = Segment::data(self.next_seq, msg.into_data());
        self.next_seq += 1;
        self.stats.message_transmitted();

        self.window.push_back(GbnEntry {
            segment: seg.clone(),
            tx_count: 1,
        });
        log::debug!("[A] → DATA {seg} in_flight={}", self.window.len());
        self.transmit(seg, actions);
    }

    /// Apply a cumulative ACK for `ack_seq` (already known to be ≥ `base`).
    fn slide(&mut self, ack_seq: i32, actions: &mut Vec<Action>) {
        let mut acked = 0usize;
        while let Some(front) = self.window.front() {
            if front.segment.seq <= ack_seq {
                self.window.pop_front();
                acked += 1;
            } else {
                break;
            }
        }
        self.base = self
            .window
            .front()
            .map_or(self.next_seq, |e| e.segment.seq);
        log::debug!(
            "[A] ← ACK seq={ack_seq} (slid {acked} seg); base={} next_seq={}",
            self.base,
            self.next_seq
        );

        while self.can_send() {
            match self.pending.pop_front() {
                Some(msg) => self.admit(msg, actions),
                None => break,
            }
        }

        if self.has_unacked() {
            self.arm_timer(actions);
        } else {
            self.disarm_timer(actions);
        }
    }

    /// Retransmit every in-flight segment in order under one fresh timer.
    fn retransmit_window(&mut self, actions: &mut Vec<Action>) {
        if self.window.is_empty() {
            log::debug!("[A] nothing in flight to retransmit");
            return;
        }
        for entry in self.window.iter_mut() {
            entry.tx_count += 1;
            self.stats.segment_transmitted();
            log::debug!("[A] ⟲ DATA {} tx={}", entry.segment, entry.tx_count);
            actions.push(Action::Transmit(entry.segment.clone()));
        }
        self.arm_timer(actions);
    }

    fn transmit(&self, seg: Segment, actions: &mut Vec<Action>) {
        self.stats.segment_transmitted();
        actions.push(Action::Transmit(seg));
    }

    /// (Re)start the single timer.  A running timer is stopped first so the
    /// driver never sees two armed at once.
    fn arm_timer(&mut self, actions: &mut Vec<Action>) {
        if self.timer_running {
            actions.push(Action::StopTimer);
        }
        actions.push(Action::StartTimer(self.retransmit_timeout));
        self.timer_running = true;
    }

    fn disarm_timer(&mut self, actions: &mut Vec<Action>) {
        if self.timer_running {
            actions.push(Action::StopTimer);
            self.timer_running = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
