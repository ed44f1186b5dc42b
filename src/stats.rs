//! Run statistics.
//!
//! [`NetStats`] is owned by whoever drives the run and shared with both
//! entities as an `Arc<NetStats>`.  The entities only ever increment; nothing
//! they read back influences a protocol decision.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters updated by entity A and entity B.
#[derive(Debug, Default)]
pub struct NetStats {
    messages_submitted: AtomicU64,
    messages_transmitted: AtomicU64,
    messages_dropped: AtomicU64,
    messages_delivered: AtomicU64,
    segments_transmitted: AtomicU64,
    segments_lost: AtomicU64,
    segments_corrupted: AtomicU64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl NetStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// The upper layer handed a message to A.
    pub fn message_submitted(&self) {
        bump(&self.messages_submitted);
    }

    /// A message was assigned a sequence number.
    pub fn message_transmitted(&self) {
        bump(&self.messages_transmitted);
    }

    /// A message was dropped because the pending queue was full.
    pub fn message_dropped(&self) {
        bump(&self.messages_dropped);
    }

    /// B delivered a payload upward.
    pub fn message_delivered(&self) {
        bump(&self.messages_delivered);
    }

    /// Any segment (first send or retransmission) was handed to the channel.
    pub fn segment_transmitted(&self) {
        bump(&self.segments_transmitted);
    }

    /// A's retransmit timer expired.
    pub fn segment_lost(&self) {
        bump(&self.segments_lost);
    }

    /// A corrupted segment was detected at either end.
    pub fn segment_corrupted(&self) {
        bump(&self.segments_corrupted);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            messages_submitted: get(&self.messages_submitted),
            messages_transmitted: get(&self.messages_transmitted),
            messages_dropped: get(&self.messages_dropped),
            messages_delivered: get(&self.messages_delivered),
            segments_transmitted: get(&self.segments_transmitted),
            segments_lost: get(&self.segments_lost),
            segments_corrupted: get(&self.segments_corrupted),
        }
    }
}

/// Plain copy of [`NetStats`] for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub messages_submitted: u64,
    pub messages_transmitted: u64,
    pub messages_dropped: u64,
    pub messages_delivered: u64,
    pub segments_transmitted: u64,
    pub segments_lost: u64,
    pub segments_corrupted: u64,
}

impl StatsSnapshot {
    /// Timeouts as a percentage of all transmitted segments.
    pub fn percent_lost(&self) -> f64 {
        percent(self.segments_lost, self.segments_transmitted)
    }

    /// Corrupted segments as a percentage of the segments not lost.
    pub fn percent_corrupted(&self) -> f64 {
        percent(
            self.segments_corrupted,
            self.segments_transmitted.saturating_sub(self.segments_lost),
        )
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-== NET STATS ==-")?;
        writeln!(f, "Submitted messages:   {}", self.messages_submitted)?;
        writeln!(f, "Transmitted messages: {}", self.messages_transmitted)?;
        writeln!(f, "Dropped messages:     {}", self.messages_dropped)?;
        writeln!(f, "Delivered messages:   {}", self.messages_delivered)?;
        writeln!(f, "Total segments:       {}", self.segments_transmitted)?;
        writeln!(f, "Lost segments:        {}", self.segments_lost)?;
        writeln!(f, "Corrupted segments:   {}", self.segments_corrupted)?;
        writeln!(f, "Percent lost:         {:.2}", self.percent_lost())?;
        write!(f, "Percent corrupted:    {:.2}", self.percent_corrupted())
    }
}
