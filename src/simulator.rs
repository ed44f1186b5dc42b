//! Discrete-event network simulator.
//!
//! The [`Simulator`] owns both entities, a [`Channel`], the shared
//! [`NetStats`] and a time-ordered event queue.  Events are handed to A or B
//! one at a time; the [`Action`]s each handler returns are carried out before
//! the next event is popped, so neither state machine is ever re-entered.
//!
//! ```text
//!   upper layer ──Message──▶ A ──Transmit──▶ channel ──Segment──▶ B ──Deliver──▶ upper layer
//!                            ▲                                    │
//!                            └──Segment── channel ◀──Transmit─────┘
//! ```
//!
//! The link is FIFO in each direction: a segment never arrives before one
//! sent earlier in the same direction.  Each entity has one timer; a stopped
//! timer's pending expiry is recognised by its generation token and skipped.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::channel::{Channel, ChannelConfig, LossyChannel};
use crate::config::ProtocolConfig;
use crate::error::SimError;
use crate::event::{Action, Entity, Event};
use crate::gbn_receiver::GbnReceiver;
use crate::gbn_sender::GbnSender;
use crate::message::{Message, MAX_PAYLOAD};
use crate::packet::Segment;
use crate::stats::{NetStats, StatsSnapshot};

/// Workload and stopping parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// How many messages the upper layer at A generates.
    pub num_messages: usize,
    /// Mean time between generated messages.  Gaps are uniform in
    /// `[0, 2 × avg_message_interval)`.
    pub avg_message_interval: f64,
    /// The run stops once the clock would pass this point.
    pub max_time: f64,
    /// Seed for the message generator.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            num_messages: 10,
            avg_message_interval: 100.0,
            max_time: 1_000_000.0,
            seed: 1,
        }
    }
}

impl SimulatorConfig {
    fn validate(&self) -> Result<(), SimError> {
        if !(self.avg_message_interval.is_finite() && self.avg_message_interval >= 0.0) {
            return Err(SimError::Config(format!(
                "avg_message_interval must be non-negative and finite, got {}",
                self.avg_message_interval
            )));
        }
        if !(self.max_time >= 0.0) {
            return Err(SimError::Config(format!(
                "max_time must be non-negative, got {}",
                self.max_time
            )));
        }
        Ok(())
    }
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct SimReport {
    /// Payloads handed to A, in submission order.
    pub submitted: Vec<String>,
    /// Payloads delivered upward at B, in delivery order.
    pub delivered: Vec<String>,
    pub stats: StatsSnapshot,
    /// Clock value when the run stopped.
    pub end_time: f64,
    /// Segments still unacknowledged at A when the run stopped.
    pub unacked: usize,
    /// Messages still queued at A when the run stopped.
    pub pending: usize,
}

// ---------------------------------------------------------------------------
// Event queue
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Pending {
    /// Upper layer at A produces its next generated message.
    Generate,
    /// Scripted message for A.
    Message(Message),
    /// Segment arriving from the channel.
    Arrival(Segment),
    /// Timer expiry tagged with the generation that armed it.
    Timer(u64),
}

#[derive(Debug)]
struct Scheduled {
    time: f64,
    /// Insertion order; breaks ties so equal-time events stay FIFO.
    order: u64,
    to: Entity,
    kind: Pending,
}

// Reversed so the max-heap pops the earliest event first.
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Drives one sender and one receiver over a [`Channel`].
pub struct Simulator<C: Channel = LossyChannel> {
    config: SimulatorConfig,
    channel: C,
    sender: GbnSender,
    receiver: GbnReceiver,
    stats: Arc<NetStats>,

    queue: BinaryHeap<Scheduled>,
    clock: f64,
    next_order: u64,
    /// Latest scheduled arrival per destination, for FIFO delivery.
    last_arrival: [f64; 2],
    /// Generation of the armed timer per entity, `None` when stopped.
    timers: [Option<u64>; 2],
    timer_generation: u64,

    rng: StdRng,
    generated: usize,
    submitted: Vec<String>,
    delivered: Vec<String>,
}

impl Simulator<LossyChannel> {
    /// Simulator over a seeded [`LossyChannel`].
    pub fn new(
        protocol: &ProtocolConfig,
        config: SimulatorConfig,
        channel: ChannelConfig,
    ) -> Result<Self, SimError> {
        channel.validate().map_err(SimError::Config)?;
        Self::with_channel(protocol, config, LossyChannel::new(channel))
    }
}

impl<C: Channel> Simulator<C> {
    /// Simulator over any [`Channel`] implementation.
    pub fn with_channel(
        protocol: &ProtocolConfig,
        config: SimulatorConfig,
        channel: C,
    ) -> Result<Self, SimError> {
        config.validate()?;
        protocol.validate().map_err(SimError::Config)?;

        let stats = Arc::new(NetStats::new());
        let mut sim = Self {
            rng: StdRng::seed_from_u64(config.seed),
            sender: GbnSender::new(protocol, Arc::clone(&stats)),
            receiver: GbnReceiver::new(Arc::clone(&stats)),
            stats,
            channel,
            queue: BinaryHeap::new(),
            clock: 0.0,
            next_order: 0,
            last_arrival: [0.0; 2],
            timers: [None; 2],
            timer_generation: 0,
            generated: 0,
            submitted: Vec::new(),
            delivered: Vec::new(),
            config,
        };
        if sim.config.num_messages > 0 {
            let gap = sim.next_gap();
            sim.schedule(gap, Entity::A, Pending::Generate);
        }
        Ok(sim)
    }

    /// Inject a message for A at absolute time `at`.
    pub fn schedule_message(&mut self, at: f64, msg: Message) {
        self.schedule(at, Entity::A, Pending::Message(msg));
    }

    /// Inject a segment arriving at `to` at absolute time `at`, bypassing the
    /// channel.
    pub fn schedule_segment(&mut self, at: f64, to: Entity, segment: Segment) {
        self.schedule(at, to, Pending::Arrival(segment));
    }

    /// Current simulation time.
    pub fn now(&self) -> f64 {
        self.clock
    }

    /// Shared counters.
    pub fn stats(&self) -> Arc<NetStats> {
        Arc::clone(&self.stats)
    }

    pub fn sender(&self) -> &GbnSender {
        &self.sender
    }

    pub fn receiver(&self) -> &GbnReceiver {
        &self.receiver
    }

    /// Payloads delivered at B so far.
    pub fn delivered(&self) -> &[String] {
        &self.delivered
    }

    /// Process events until the queue is empty or the horizon is reached.
    ///
    /// Stops early with [`SimError::Protocol`] if A reports a protocol
    /// violation.
    pub fn run(&mut self) -> Result<SimReport, SimError> {
        while self.step()? {}
        Ok(self.report())
    }

    /// Process a single event.  Returns `false` once there is nothing left
    /// to do before the horizon.
    pub fn step(&mut self) -> Result<bool, SimError> {
        let Some(next) = self.queue.pop() else {
            return Ok(false);
        };
        if let Pending::Timer(generation) = &next.kind {
            if self.timers[next.to.index()] != Some(*generation) {
                // Stopped or superseded.
                return Ok(true);
            }
        }
        if next.time > self.config.max_time {
            log::info!(
                "t={:.3} horizon reached with {} event(s) outstanding",
                self.config.max_time,
                self.queue.len() + 1
            );
            self.queue.clear();
            self.clock = self.config.max_time;
            return Ok(false);
        }
        self.clock = next.time;

        let event = match next.kind {
            Pending::Generate => Event::Message(self.generate()),
            Pending::Message(msg) => Event::Message(msg),
            Pending::Arrival(seg) => Event::Segment(seg),
            Pending::Timer(_) => {
                self.timers[next.to.index()] = None;
                Event::TimerFired
            }
        };

        if let Event::Message(msg) = &event {
            self.submitted.push(msg.data().to_owned());
        }
        self.dispatch(next.to, event)?;
        Ok(true)
    }

    /// Snapshot of the run so far.
    pub fn report(&self) -> SimReport {
        SimReport {
            submitted: self.submitted.clone(),
            delivered: self.delivered.clone(),
            stats: self.stats.snapshot(),
            end_time: self.clock,
            unacked: self.sender.in_flight(),
            pending: self.sender.pending(),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn dispatch(&mut self, to: Entity, event: Event) -> Result<(), SimError> {
        log::trace!("t={:.3} {to} ← {event:?}", self.clock);
        let actions = match to {
            Entity::A => self.sender.handle(event).map_err(|source| SimError::Protocol {
                time: self.clock,
                source,
            })?,
            Entity::B => self.receiver.handle(event),
        };
        for action in actions {
            self.apply(to, action);
        }
        Ok(())
    }

    fn apply(&mut self, from: Entity, action: Action) {
        match action {
            Action::Transmit(seg) => {
                let Some((delay, seg)) = self.channel.carry(from, seg) else {
                    return;
                };
                let to = from.peer();
                let arrival = (self.clock + delay).max(self.last_arrival[to.index()]);
                self.last_arrival[to.index()] = arrival;
                self.schedule(arrival, to, Pending::Arrival(seg));
            }
            Action::Deliver(payload) => {
                log::info!("t={:.3} {from} delivered {payload:?}", self.clock);
                self.delivered.push(payload);
            }
            Action::StartTimer(duration) => {
                let idx = from.index();
                if self.timers[idx].is_some() {
                    log::warn!("t={:.3} {from} started a running timer; replacing it", self.clock);
                }
                self.timer_generation += 1;
                self.timers[idx] = Some(self.timer_generation);
                let generation = self.timer_generation;
                self.schedule(self.clock + duration, from, Pending::Timer(generation));
            }
            Action::StopTimer => {
                self.timers[from.index()] = None;
            }
        }
    }

    fn schedule(&mut self, time: f64, to: Entity, kind: Pending) {
        self.next_order += 1;
        self.queue.push(Scheduled {
            time,
            order: self.next_order,
            to,
            kind,
        });
    }

    fn next_gap(&mut self) -> f64 {
        let mean = self.config.avg_message_interval;
        if mean > 0.0 {
            self.rng.gen_range(0.0..2.0 * mean)
        } else {
            0.0
        }
    }

    /// Produce the next generated message and schedule the one after it.
    fn generate(&mut self) -> Message {
        let letter = char::from(b'a' + (self.generated % 26) as u8);
        self.generated += 1;
        if self.generated < self.config.num_messages {
            let at = self.clock + self.next_gap();
            self.schedule(at, Entity::A, Pending::Generate);
        }
        Message::new(Some(&letter.to_string().repeat(MAX_PAYLOAD)))
    }
}
