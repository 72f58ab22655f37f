use std::time::Duration;

use crate::config::ReconnectPolicy;

/// Reconnect delay state
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    policy: ReconnectPolicy,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            current: Self::initial(policy),
        }
    }

    fn initial(policy: ReconnectPolicy) -> Duration {
        match policy {
            ReconnectPolicy::Fixed(delay) => delay,
            ReconnectPolicy::Exponential { initial, max } => initial.min(max),
        }
    }

    /// Delay before the next attempt, grows the following one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;

        if let ReconnectPolicy::Exponential { initial, max } = self.policy {
            self.current = self.current.saturating_mul(2).clamp(initial.min(max), max);
        }

        delay
    }

    /// Back to the first delay, after a stream was opened
    pub fn reset(&mut self) {
        self.current = Self::initial(self.policy);
    }
}
