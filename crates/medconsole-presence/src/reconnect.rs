//! Redial policy for the presence socket.

use std::time::Duration;

use rand::Rng;

/// How the channel redials after the socket drops on its own.
///
/// Disabled by default (`max_attempts == 0`): a dropped socket stays down
/// until the caller connects again. An explicit
/// [`disconnect`](crate::PresenceChannel::disconnect) never triggers a redial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Redials allowed in a row before giving up. Reset once the server
    /// accepts a connection.
    pub max_attempts: u32,

    /// Delay before the first redial. Doubles on every further attempt.
    pub initial_delay: Duration,

    /// Upper bound on the exponential delay, before jitter.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never redials.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Exponential backoff with the default delays.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// `min(initial_delay * 2^attempt, max_delay)`, without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// The delay before redial number `attempt` (zero-based): the base delay
    /// plus up to a fifth of it in random jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let spread = base.as_millis().min(u128::from(u32::MAX)) as u64 / 5;
        let jitter = if spread > 0 {
            Duration::from_millis(rand::rng().random_range(0..=spread))
        } else {
            Duration::ZERO
        };
        base + jitter
    }
}
