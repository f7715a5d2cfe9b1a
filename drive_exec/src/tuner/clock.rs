//! Trial clocks, which decide when a tuning trial is over.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of trial boundaries.
///
/// `poll` is called once per sample and must not block.
pub trait TrialClock {
    /// Returns true if the current trial has ended, in which case the clock restarts for the next
    /// trial.
    fn poll(&mut self) -> bool;

    /// Start timing a new trial from now.
    fn restart(&mut self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Ends trials after a fixed wall clock duration.
#[derive(Debug, Clone)]
pub struct WallClock {
    start: Instant,
    duration: Duration,
}

/// Ends trials after a fixed number of samples.
#[derive(Debug, Clone)]
pub struct SampleClock {
    samples: u64,
    period: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WallClock {
    pub fn new(duration: Duration) -> Self {
        Self {
            start: Instant::now(),
            duration,
        }
    }

    /// Create a clock from a duration in seconds.
    ///
    /// Negative or non-finite durations give a clock which ends a trial on every poll.
    pub fn from_secs_f64(duration_s: f64) -> Self {
        let duration = if duration_s.is_finite() && duration_s > 0.0 {
            Duration::from_secs_f64(duration_s)
        } else {
            Duration::from_secs(0)
        };

        Self::new(duration)
    }
}

impl TrialClock for WallClock {
    fn poll(&mut self) -> bool {
        if self.start.elapsed() > self.duration {
            self.restart();
            true
        } else {
            false
        }
    }

    fn restart(&mut self) {
        self.start = Instant::now();
    }
}

impl SampleClock {
    /// Create a clock which ends a trial every `period` samples. A period of zero is treated as
    /// one.
    pub fn new(period: u64) -> Self {
        Self {
            samples: 0,
            period: period.max(1),
        }
    }
}

impl TrialClock for SampleClock {
    fn poll(&mut self) -> bool {
        self.samples += 1;

        if self.samples >= self.period {
            self.samples = 0;
            true
        } else {
            false
        }
    }

    fn restart(&mut self) {
        self.samples = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sample_clock() {
        let mut clock = SampleClock::new(3);

        let polls: Vec<bool> = (0..7).map(|_| clock.poll()).collect();
        assert_eq!(polls, vec![false, false, true, false, false, true, false]);

        clock.restart();
        assert!(!clock.poll());
        assert!(!clock.poll());
        assert!(clock.poll());

        let mut every = SampleClock::new(0);
        assert!(every.poll());
        assert!(every.poll());
    }

    #[test]
    fn test_wall_clock() {
        let mut long = WallClock::from_secs_f64(3600.0);
        assert!(!long.poll());

        let mut short = WallClock::from_secs_f64(0.02);
        std::thread::sleep(Duration::from_millis(40));
        assert!(short.poll());

        // Restarted by the poll above
        assert!(!short.poll());
    }
}
