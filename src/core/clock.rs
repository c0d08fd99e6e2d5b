use std::thread;
use std::time::{Duration, Instant};

/// Fixed-rate tick pacing.
///
/// After an overrun the next deadline is measured from now, so late ticks are
/// never followed by a burst of catch-up ticks.
pub struct Clock {
    period: Duration,
    next_deadline: Instant,
}

impl Clock {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / tick_rate.max(1),
            next_deadline: Instant::now(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the next tick is due. Returns `true` if the tick that
    /// just ran overran its slot.
    pub fn wait(&mut self) -> bool {
        self.next_deadline += self.period;
        let now = Instant::now();
        if now < self.next_deadline {
            thread::sleep(self.next_deadline - now);
            false
        } else {
            self.next_deadline = now;
            true
        }
    }
}
