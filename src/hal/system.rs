use embedded_hal::blocking::delay::DelayMs;
use embedded_time::{clock, rate::Fraction, Clock, Instant};
use std::time;

/// Blocking delay on the current thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl DelayMs<u32> for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(time::Duration::from_millis(ms.into()));
    }
}

/// Wall clock with microsecond ticks counted from its creation.
///
/// Ticks wrap after about 71 minutes; loop timing uses wrapping differences.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    start: time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    type T = u32;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, clock::Error> {
        let micros = self.start.elapsed().as_micros() as u32;
        Ok(Instant::new(micros))
    }
}
