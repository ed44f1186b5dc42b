//! Fault model for the point-to-point link between A and B.
//!
//! A [`Channel`] decides the fate of every transmitted segment: lost, or
//! delivered after some delay, possibly corrupted on the way.  Keeping the
//! link FIFO is the driver's job, not the channel's.
//!
//! | Fault       | Description                                               |
//! |-------------|-----------------------------------------------------------|
//! | Loss        | Drop a segment with probability `loss_prob`.              |
//! | Corruption  | With probability `corrupt_prob`, mangle one field:        |
//! |             | 3/4 first payload char → `'?'`, 1/8 `seq`, 1/8 `ack`.     |
//! | Delay       | Uniform in `[min_delay, max_delay)` time units.           |

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::event::Entity;
use crate::packet::Segment;

/// Value written into a mangled header field.
const CORRUPT_FIELD_VALUE: i32 = 999_999;

/// Something that carries segments from one entity to the other.
pub trait Channel {
    /// Decide what happens to `segment` sent by `from`.
    ///
    /// Returns `None` if the segment is lost, otherwise the propagation delay
    /// and the segment as it will arrive.
    fn carry(&mut self, from: Entity, segment: Segment) -> Option<(f64, Segment)>;
}

/// Fault-injection parameters.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Probability that any given segment is silently dropped.
    pub loss_prob: f64,
    /// Probability that a segment that was not dropped is corrupted.
    pub corrupt_prob: f64,
    /// Lower bound of the propagation delay.
    pub min_delay: f64,
    /// Upper bound (exclusive) of the propagation delay.
    pub max_delay: f64,
    /// RNG seed; equal seeds give identical runs.
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        // No faults by default: the channel is a transparent pass-through.
        Self {
            loss_prob: 0.0,
            corrupt_prob: 0.0,
            min_delay: 1.0,
            max_delay: 10.0,
            seed: 1,
        }
    }
}

impl ChannelConfig {
    /// Reject probabilities outside `[0, 1]` and inverted delay bounds.
    pub fn validate(&self) -> Result<(), String> {
        for (name, p) in [("loss_prob", self.loss_prob), ("corrupt_prob", self.corrupt_prob)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{name} must be within [0, 1], got {p}"));
            }
        }
        if !(self.min_delay.is_finite() && self.max_delay.is_finite()) {
            return Err(format!(
                "delay bounds must be finite, got [{}, {})",
                self.min_delay, self.max_delay
            ));
        }
        if !(self.min_delay >= 0.0 && self.min_delay <= self.max_delay) {
            return Err(format!(
                "delay bounds must satisfy 0 <= min <= max, got [{}, {})",
                self.min_delay, self.max_delay
            ));
        }
        Ok(())
    }
}

/// Seeded random [`Channel`].
#[derive(Debug)]
pub struct LossyChannel {
    config: ChannelConfig,
    rng: StdRng,
}

impl LossyChannel {
    pub fn new(config: ChannelConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    fn corrupt(&mut self, segment: &mut Segment) {
        let roll: f64 = self.rng.gen();
        if roll < 0.75 {
            let rest: String = segment.payload.chars().skip(1).collect();
            segment.payload = format!("?{rest}");
        } else if roll < 0.875 {
            segment.seq = CORRUPT_FIELD_VALUE;
        } else {
            segment.ack = CORRUPT_FIELD_VALUE;
        }
    }
}

impl Channel for LossyChannel {
    fn carry(&mut self, from: Entity, mut segment: Segment) -> Option<(f64, Segment)> {
        if self.rng.gen::<f64>() < self.config.loss_prob {
            log::debug!("[channel] {from}→{} lost: {segment}", from.peer());
            return None;
        }

        if self.rng.gen::<f64>() < self.config.corrupt_prob {
            self.corrupt(&mut segment);
            log::debug!("[channel] {from}→{} corrupted: {segment}", from.peer());
        }

        let delay = if self.config.max_delay > self.config.min_delay {
            self.rng.gen_range(self.config.min_delay..self.config.max_delay)
        } else {
            self.config.min_delay
        };
        Some((delay, segment))
    }
}
