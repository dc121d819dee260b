use std::{
    num::NonZeroU64,
    time::{Duration, Instant},
};

const MIN_ELAPSED: Duration = Duration::from_millis(1);

/// Running average of requests per second since the start of the run.
#[derive(Debug, Clone)]
pub struct RateReporter {
    start: Instant,
    every: NonZeroU64,
    count: u64,
}

impl RateReporter {
    pub fn new(start: Instant, every: NonZeroU64) -> Self {
        Self {
            start,
            every,
            count: 0,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// Records one issued request. Returns the whole-number rate on every
    /// `every`-th request and `None` otherwise.
    pub fn record(&mut self, now: Instant) -> Option<u64> {
        self.count += 1;
        if self.count % self.every.get() != 0 {
            return None;
        }
        let secs = self.elapsed(now).max(MIN_ELAPSED).as_secs_f64();
        Some((self.count as f64 / secs).floor() as u64)
    }
}
