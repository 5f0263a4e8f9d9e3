use super::{AbortSignal, Copter, FlightStateMachine, HorizontalEstimator};
use crate::config::FlightConfig;
use crate::control::AltitudeHold;
use crate::hal::{Link, Sensors, StdDelay, SystemClock, Transport};
use crate::scheduler::LoopTimer;
use crate::FlightError;
use embedded_hal::blocking::delay::DelayMs;
use embedded_time::Clock;
use log::info;

/// Assembles a [`Copter`] session. Opening it validates the config and opens the link.
pub struct CopterBuilder<S, T, C = SystemClock, D = StdDelay> {
    sensors: S,
    transport: T,
    clock: C,
    delay: D,
    config: FlightConfig,
    abort: AbortSignal,
}

impl<S, T> CopterBuilder<S, T> {
    pub fn new(sensors: S, transport: T) -> Self {
        Self {
            sensors,
            transport,
            clock: SystemClock::new(),
            delay: StdDelay,
            config: FlightConfig::default(),
            abort: AbortSignal::new(),
        }
    }
}

impl<S, T, C, D> CopterBuilder<S, T, C, D> {
    pub fn clock<C2>(self, clock: C2) -> CopterBuilder<S, T, C2, D> {
        CopterBuilder {
            sensors: self.sensors,
            transport: self.transport,
            clock,
            delay: self.delay,
            config: self.config,
            abort: self.abort,
        }
    }

    pub fn delay<D2>(self, delay: D2) -> CopterBuilder<S, T, C, D2> {
        CopterBuilder {
            sensors: self.sensors,
            transport: self.transport,
            clock: self.clock,
            delay,
            config: self.config,
            abort: self.abort,
        }
    }

    pub fn config(mut self, config: FlightConfig) -> Self {
        self.config = config;
        self
    }

    pub fn abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }
}

impl<S, T, C, D> CopterBuilder<S, T, C, D>
where
    S: Sensors,
    T: Transport + Link,
    C: Clock<T = u32>,
    D: DelayMs<u32>,
{
    pub fn open(mut self) -> Result<Copter<S, T, C, D>, FlightError> {
        self.config.validate()?;
        self.transport.open()?;
        info!("link open");

        let config = self.config;
        Ok(Copter {
            sensors: self.sensors,
            transport: self.transport,
            clock: self.clock,
            delay: self.delay,
            flight: FlightStateMachine::new(config.timing),
            altitude: AltitudeHold::new(
                config.altitude.target,
                config.altitude.gain,
                config.altitude.throttle,
                config.height_filter.into(),
            ),
            horizontal: HorizontalEstimator::new(config.velocity_filter.into(), config.sensor_scale),
            timer: LoopTimer::new(config.timing.tick_ms),
            abort: self.abort,
            is_open: true,
            config,
        })
    }
}
