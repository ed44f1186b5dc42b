//! Events fed into the state machines and actions they ask the driver to take.
//!
//! Neither [`crate::gbn_sender::GbnSender`] nor
//! [`crate::gbn_receiver::GbnReceiver`] performs any I/O.  A driver (the
//! discrete-event [`crate::simulator`] or the tokio [`crate::gbn_session`])
//! delivers one [`Event`] at a time and carries out the returned [`Action`]s
//! in order.

use std::fmt;

use crate::message::Message;
use crate::packet::Segment;

/// The two endpoints of the exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Sender side.
    A,
    /// Receiver side.
    B,
}

impl Entity {
    /// The other endpoint.
    pub fn peer(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Index usable for per-entity arrays.
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Something that happened to an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The upper layer wants a message sent (entity A only).
    Message(Message),
    /// A segment arrived from the channel.
    Segment(Segment),
    /// The entity's single timer expired.
    TimerFired,
}

/// Something an entity wants done.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Hand a segment to the channel.
    Transmit(Segment),
    /// Pass a payload to the upper layer.
    Deliver(String),
    /// Arm the entity's timer for the given number of time units, replacing
    /// any timer already running.
    StartTimer(f64),
    /// Disarm the entity's timer.  No-op when it is not running.
    StopTimer,
}
