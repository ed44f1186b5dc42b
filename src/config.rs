//! Protocol parameters fixed for the duration of a run.

/// Sender-side configuration.
///
/// `window_size = 1` turns Go-Back-N into stop-and-wait.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolConfig {
    /// Maximum number of unacknowledged segments in flight (N).
    pub window_size: usize,
    /// Capacity of the queue holding messages that found the window full.
    pub pending_capacity: usize,
    /// Retransmit timeout, in simulation time units.
    pub retransmit_timeout: f64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            pending_capacity: 50,
            retransmit_timeout: 500.0,
        }
    }
}

impl ProtocolConfig {
    /// Stop-and-wait (alternating-bit style) configuration.
    pub fn stop_and_wait() -> Self {
        Self {
            window_size: 1,
            ..Self::default()
        }
    }

    /// Reject an empty window and a timeout that is not a positive, finite
    /// number of time units.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be at least 1".into());
        }
        if !(self.retransmit_timeout.is_finite() && self.retransmit_timeout > 0.0) {
            return Err(format!(
                "retransmit_timeout must be positive and finite, got {}",
                self.retransmit_timeout
            ));
        }
        Ok(())
    }
}
