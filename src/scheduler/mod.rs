//! Best-effort fixed-period loop timing.

use crate::FlightError;
use embedded_hal::blocking::delay::DelayMs;
use embedded_time::{duration::Microseconds, Clock};

/// Measures the wall-clock time between loop iterations and sleeps away the rest of each period.
///
/// There is no hard real-time guarantee: a slow iteration simply stretches the period.
#[derive(Clone, Debug)]
pub struct LoopTimer {
    loop_period_us: u32,
    loop_timer_start_us: Option<u32>,
    last_loop_time_s: f32,
}

impl LoopTimer {
    pub fn new(period_ms: u32) -> Self {
        Self {
            loop_period_us: period_ms.saturating_mul(1000).max(1),
            loop_timer_start_us: None,
            last_loop_time_s: 0.,
        }
    }

    pub fn period_s(&self) -> f32 {
        self.loop_period_us as f32 * 1.0e-6
    }

    /// Time (in seconds) between the last two ticks.
    pub fn last_loop_time_s(&self) -> f32 {
        self.last_loop_time_s
    }

    /// Forget the previous tick so the next one starts a new measurement.
    pub fn reset(&mut self) {
        self.loop_timer_start_us = None;
        self.last_loop_time_s = 0.;
    }

    /// Start an iteration and return the elapsed time `dt` (in seconds) since the previous one.
    /// The first iteration after a reset reports one nominal period.
    pub fn tick<C>(&mut self, clock: &C) -> Result<f32, FlightError>
    where
        C: Clock<T = u32>,
    {
        let sample_time_us = micros_since_epoch(clock)?;

        self.last_loop_time_s = match self.loop_timer_start_us {
            Some(start) => sample_time_us.wrapping_sub(start) as f32 * 1.0e-6,
            None => self.period_s(),
        };
        self.loop_timer_start_us = Some(sample_time_us);

        Ok(self.last_loop_time_s)
    }

    /// Sleep for whatever remains of the current period. Returns the time slept in milliseconds.
    pub fn wait<C, D>(&self, clock: &C, delay: &mut D) -> Result<u32, FlightError>
    where
        C: Clock<T = u32>,
        D: DelayMs<u32>,
    {
        let start = match self.loop_timer_start_us {
            Some(start) => start,
            None => return Ok(0),
        };

        let loop_tick_us = micros_since_epoch(clock)?.wrapping_sub(start);
        if loop_tick_us >= self.loop_period_us {
            return Ok(0);
        }

        let remaining_ms = (self.loop_period_us - loop_tick_us) / 1000;
        if remaining_ms > 0 {
            delay.delay_ms(remaining_ms);
        }
        Ok(remaining_ms)
    }
}

fn micros_since_epoch<C>(clock: &C) -> Result<u32, FlightError>
where
    C: Clock<T = u32>,
{
    let instant = clock.try_now()?;
    let micros = Microseconds::<u32>::try_from(instant.duration_since_epoch())?;
    Ok(micros.0)
}
