//! Timing for runs, scenarios, steps, hooks and requests
//!
//! Durations come from the monotonic clock; the wall-clock start is kept
//! alongside for report timestamps.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Timer {
    label: String,
    started_at: DateTime<Utc>,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started_at: Utc::now(),
            start: Instant::now(),
        }
    }

    /// Wall-clock time the timer was started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Stop and return the elapsed time, tracing it under the label
    pub fn stop(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::trace!("{} took {}ms", self.label, elapsed.as_millis());
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timer_measures_and_stamps() {
        let before = Utc::now();
        let timer = Timer::start("step");
        sleep(Duration::from_millis(10));

        assert!(timer.started_at() >= before);
        assert!(timer.started_at() <= Utc::now());
        assert!(timer.elapsed_ms() >= 10);
        assert!(timer.stop() >= Duration::from_millis(10));
    }
}
