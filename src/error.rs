//! Error types.
//!
//! Channel faults (loss, corruption, out-of-order arrival) are not errors and
//! never show up here; they are absorbed by the protocol and only visible
//! through [`crate::stats::NetStats`].

/// A message payload was rejected and replaced by an empty one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("message payload is missing")]
    Missing,

    #[error("message payload has {len} characters (max {max})")]
    TooLong { len: usize, max: usize },
}

/// A protocol invariant was broken.  This points at a bug in the peer or the
/// harness, never at a network condition, so the run must stop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("ACK for seq {ack} but next_seq is only {next_seq}")]
    AckBeyondNextSeq { ack: i32, next_seq: i32 },
}

/// Errors that abort a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("protocol violation at t={time:.3}: {source}")]
    Protocol {
        time: f64,
        #[source]
        source: ProtocolError,
    },

    #[error("invalid simulator configuration: {0}")]
    Config(String),
}

/// Errors ending a real-time [`crate::gbn_session::GbnSession`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("invalid session configuration: {0}")]
    Config(String),

    #[error("gave up after {0} consecutive timeouts without progress")]
    MaxRetriesExceeded(u32),

    #[error("session task is no longer running")]
    Closed,

    #[error("session task failed: {0}")]
    Task(String),
}
