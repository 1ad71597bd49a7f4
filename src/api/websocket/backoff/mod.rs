use std::time::Duration;

#[cfg(test)]
mod tests;

/// Exponential reconnect delay, doubling from `min` up to `max`.
#[derive(Debug, Clone)]
pub(crate) struct ReconnectBackoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl ReconnectBackoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);

        Self {
            min,
            max,
            current: min,
        }
    }

    /// Returns the delay to apply before the next attempt and advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Restarts the sequence after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.min;
    }
}
