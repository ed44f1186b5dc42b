//! Real-time Go-Back-N session on the tokio runtime.
//!
//! # Architecture
//!
//! ```text
//!  Application
//!      │  send(msg) / recv()
//!      ▼
//!  GbnSession ── app_tx (mpsc) ──▶ ┌───────────────────────────────────┐
//!             ◀─ deliver (mpsc) ── │ event_loop task                   │
//!                                  │  ├── GbnSender   (entity A)       │
//!                                  │  ├── GbnReceiver (entity B)       │
//!                                  │  ├── Channel + per-direction FIFO │
//!                                  │  └── one retransmit Sleep         │
//!                                  └───────────────────────────────────┘
//! ```
//!
//! The event loop multiplexes application messages, segment arrivals and the
//! sender's retransmit timer with `tokio::select!`, handing exactly one event
//! at a time to one state machine.  One protocol time unit lasts
//! [`SessionConfig::time_unit`] of wall-clock (or paused test) time.
//!
//! # Shutdown
//!
//! [`GbnSession::close`] drops the send side; the loop finishes once the
//! sender has nothing queued or in flight, or gives up after
//! [`SessionConfig::max_retries`] consecutive timeouts without progress.
//! Either way the payloads already delivered at B are handed back in the
//! [`SessionOutcome`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::channel::{Channel, ChannelConfig, LossyChannel};
use crate::config::ProtocolConfig;
use crate::error::SessionError;
use crate::event::{Action, Entity, Event};
use crate::gbn_receiver::GbnReceiver;
use crate::gbn_sender::GbnSender;
use crate::message::Message;
use crate::packet::Segment;
use crate::stats::{NetStats, StatsSnapshot};

/// Capacity of the application → sender queue.
const APP_QUEUE: usize = 64;

/// Real-time session parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub protocol: ProtocolConfig,
    pub channel: ChannelConfig,
    /// Wall-clock length of one protocol time unit.
    pub time_unit: Duration,
    /// Consecutive timeouts without the window advancing before giving up.
    pub max_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            channel: ChannelConfig::default(),
            time_unit: Duration::from_millis(1),
            max_retries: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// GbnSession: application handle
// ---------------------------------------------------------------------------

/// Handle to a running session.
pub struct GbnSession {
    send_tx: mpsc::Sender<Message>,
    recv_rx: mpsc::UnboundedReceiver<String>,
    stats: Arc<NetStats>,
    handle: JoinHandle<Result<(), SessionError>>,
}

impl GbnSession {
    /// Start a session over a seeded [`LossyChannel`].
    pub fn spawn(config: SessionConfig) -> Result<Self, SessionError> {
        config.channel.validate().map_err(SessionError::Config)?;
        let channel = LossyChannel::new(config.channel.clone());
        Self::spawn_with_channel(config, channel)
    }

    /// Start a session over any [`Channel`].
    pub fn spawn_with_channel<C>(config: SessionConfig, channel: C) -> Result<Self, SessionError>
    where
        C: Channel + Send + 'static,
    {
        config.protocol.validate().map_err(SessionError::Config)?;
        if config.time_unit.is_zero() {
            return Err(SessionError::Config("time_unit must be non-zero".into()));
        }

        let stats = Arc::new(NetStats::new());
        let (send_tx, send_rx) = mpsc::channel(APP_QUEUE);
        let (recv_tx, recv_rx) = mpsc::unbounded_channel();

        let event_loop = EventLoop {
            sender: GbnSender::new(&config.protocol, Arc::clone(&stats)),
            receiver: GbnReceiver::new(Arc::clone(&stats)),
            channel,
            time_unit: config.time_unit,
            max_retries: config.max_retries,
            transit: [VecDeque::new(), VecDeque::new()],
            last_arrival: [Instant::now(); 2],
        };
        let handle = tokio::spawn(event_loop.run(send_rx, recv_tx));

        Ok(Self {
            send_tx,
            recv_rx,
            stats,
            handle,
        })
    }

    /// Hand a message to entity A.  Waits only if the application queue is
    /// full, never for the network.
    pub async fn send(&self, msg: Message) -> Result<(), SessionError> {
        self.send_tx.send(msg).await.map_err(|_| SessionError::Closed)
    }

    /// Next payload delivered at entity B, or `None` once the session ended
    /// and everything delivered has been read.
    pub async fn recv(&mut self) -> Option<String> {
        self.recv_rx.recv().await
    }

    /// Counters so far.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting messages, wait for the sender to drain, and collect
    /// every payload delivered but not yet read through [`GbnSession::recv`].
    ///
    /// Deliveries and counters are returned even when the session ended with
    /// an error.
    pub async fn close(mut self) -> SessionOutcome {
        drop(self.send_tx);
        let error = match self.handle.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(e) => Some(SessionError::Task(e.to_string())),
        };

        let mut delivered = Vec::new();
        while let Ok(payload) = self.recv_rx.try_recv() {
            delivered.push(payload);
        }
        SessionOutcome {
            delivered,
            stats: self.stats.snapshot(),
            error,
        }
    }
}

/// What a closed session leaves behind.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Payloads delivered at B that the application had not read yet.
    pub delivered: Vec<String>,
    pub stats: StatsSnapshot,
    /// Why the session ended early, if it did.
    pub error: Option<SessionError>,
}

impl SessionOutcome {
    /// `Ok` with the deliveries for a clean shutdown, otherwise the error.
    pub fn into_result(self) -> Result<Vec<String>, SessionError> {
        match self.error {
            None => Ok(self.delivered),
            Some(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Background event loop
// ---------------------------------------------------------------------------

struct EventLoop<C> {
    sender: GbnSender,
    receiver: GbnReceiver,
    channel: C,
    time_unit: Duration,
    max_retries: u32,
    /// Segments in flight on the wire, indexed by destination entity.
    transit: [VecDeque<(Instant, Segment)>; 2],
    last_arrival: [Instant; 2],
}

impl<C: Channel> EventLoop<C> {
    async fn run(
        mut self,
        mut app_rx: mpsc::Receiver<Message>,
        deliver_tx: mpsc::UnboundedSender<String>,
    ) -> Result<(), SessionError> {
        // A disarmed timer sleeps "forever"; the `timer_armed` guard keeps
        // select! from acting on it.
        let far_future = Duration::from_secs(365 * 24 * 3600);
        let timer = tokio::time::sleep(far_future);
        tokio::pin!(timer);
        let mut timer_armed = false;
        let mut app_open = true;
        let mut retries = 0u32;

        loop {
            if !app_open && !self.sender.has_unacked() && self.sender.pending() == 0 {
                log::debug!("[session] application closed and window drained");
                return Ok(());
            }

            let next_arrival = self.next_arrival();
            let deadline = next_arrival.map_or_else(|| Instant::now() + far_future, |(_, at)| at);

            let (to, event) = tokio::select! {
                maybe_msg = app_rx.recv(), if app_open => match maybe_msg {
                    Some(msg) => (Entity::A, Event::Message(msg)),
                    None => {
                        app_open = false;
                        continue;
                    }
                },

                _ = tokio::time::sleep_until(deadline), if next_arrival.is_some() => {
                    let Some((to, _)) = next_arrival else { continue };
                    let Some((_, seg)) = self.transit[to.index()].pop_front() else { continue };
                    (to, Event::Segment(seg))
                },

                _ = &mut timer, if timer_armed => {
                    timer_armed = false;
                    retries += 1;
                    if retries > self.max_retries {
                        log::warn!("[session] {} timeouts without progress; giving up", retries - 1);
                        return Err(SessionError::MaxRetriesExceeded(self.max_retries));
                    }
                    (Entity::A, Event::TimerFired)
                },

                else => return Ok(()),
            };

            let base_before = self.sender.base();
            let actions = match to {
                Entity::A => self.sender.handle(event)?,
                Entity::B => self.receiver.handle(event),
            };
            if self.sender.base() != base_before {
                retries = 0;
            }

            for action in actions {
                match action {
                    Action::Transmit(seg) => self.put_on_wire(to, seg),
                    Action::Deliver(payload) => {
                        // The application may have stopped reading; that is its call.
                        let _ = deliver_tx.send(payload);
                    }
                    Action::StartTimer(units) => {
                        timer.as_mut().reset(Instant::now() + self.time_unit.mul_f64(units));
                        timer_armed = true;
                    }
                    Action::StopTimer => timer_armed = false,
                }
            }
        }
    }

    /// Run `seg` through the channel and queue it for FIFO arrival.
    fn put_on_wire(&mut self, from: Entity, seg: Segment) {
        let Some((delay, seg)) = self.channel.carry(from, seg) else {
            return;
        };
        let to = from.peer();
        let at = (Instant::now() + self.time_unit.mul_f64(delay)).max(self.last_arrival[to.index()]);
        self.last_arrival[to.index()] = at;
        self.transit[to.index()].push_back((at, seg));
    }

    /// Destination and time of the earliest segment on the wire.
    fn next_arrival(&self) -> Option<(Entity, Instant)> {
        [Entity::A, Entity::B]
            .into_iter()
            .filter_map(|e| self.transit[e.index()].front().map(|(at, _)| (e, *at)))
            .min_by_key(|(_, at)| *at)
    }
}
