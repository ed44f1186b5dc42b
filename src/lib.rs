//! `gbn-rdt`: Go-Back-N reliable data transfer over a simulated unreliable
//! channel.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────┐   DATA segments   ┌──────────────┐
//!  │  GbnSender   │──────────────────▶│ GbnReceiver  │
//!  │  (entity A)  │                   │  (entity B)  │
//!  └──────┬───────┘                   └──────┬───────┘
//!         │          ACK / NACK              │
//!         │◀─────────────────────────────────┘
//!         │
//!  ┌──────▼────────────────────────────────────────┐
//!  │  driver: Simulator (discrete-event)           │
//!  │       or GbnSession (tokio, real time)        │
//!  │  delivers Events, executes Actions            │
//!  └──────┬────────────────────────────────────────┘
//!         │ segments
//!  ┌──────▼──────┐
//!  │  Channel    │  (loss, corruption, delay)
//!  └─────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`message`]       : application datagrams and payload bounds
//! - [`packet`]        : protocol segments
//! - [`checksum`]      : complement-sum integrity code
//! - [`event`]         : events in, actions out
//! - [`config`]        : protocol parameters
//! - [`stats`]         : shared run counters
//! - [`error`]         : error types
//! - [`gbn_sender`]    : GBN sliding-window sender (entity A)
//! - [`gbn_receiver`]  : GBN in-order receiver (entity B)
//! - [`channel`]       : fault model for the link
//! - [`simulator`]     : discrete-event driver
//! - [`gbn_session`]   : tokio real-time driver

pub mod channel;
pub mod checksum;
pub mod config;
pub mod error;
pub mod event;
pub mod gbn_receiver;
pub mod gbn_sender;
pub mod gbn_session;
pub mod message;
pub mod packet;
pub mod simulator;
pub mod stats;

pub use config::ProtocolConfig;
pub use error::{PayloadError, ProtocolError, SessionError, SimError};
pub use event::{Action, Entity, Event};
pub use message::{Message, MAX_PAYLOAD};
pub use packet::Segment;
pub use stats::{NetStats, StatsSnapshot};
