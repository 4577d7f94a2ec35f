//! Per-screen frame clock

use std::time::Instant;

/// Tracks wall-clock frame time for one screen's loop.
///
/// The first tick reports a zero delta; later deltas are clamped to 250ms so
/// a debugger pause or long stall does not propagate a huge step into
/// time-based waits.
pub struct FrameClock {
    total_time: f64,
    delta_time: f64,
    last_instant: Instant,
    first_tick: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            last_instant: Instant::now(),
            first_tick: true,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock. Call once per frame.
    pub fn tick(&mut self) {
        let now = Instant::now();

        if self.first_tick {
            self.first_tick = false;
            self.last_instant = now;
            self.delta_time = 0.0;
            return;
        }

        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;

        self.delta_time = elapsed.min(0.25);
        self.total_time += self.delta_time;
    }

    /// Total elapsed time in seconds across all ticks
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Time since the previous tick in seconds
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        let clock = FrameClock::new();
        assert_eq!(clock.total_time(), 0.0);
        assert_eq!(clock.delta_time(), 0.0);
    }

    #[test]
    fn test_first_tick_zero_delta() {
        let mut clock = FrameClock::new();
        clock.tick();
        assert_eq!(clock.delta_time(), 0.0);
        assert_eq!(clock.total_time(), 0.0);
    }

    #[test]
    fn test_time_accumulates() {
        let mut clock = FrameClock::new();
        clock.tick();
        std::thread::sleep(std::time::Duration::from_millis(2));
        clock.tick();
        assert!(clock.delta_time() > 0.0);
        assert!(clock.delta_time() <= 0.25);
        assert_eq!(clock.total_time(), clock.delta_time());
    }
}
