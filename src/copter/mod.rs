//! Flight session: state machine, stage plan and the control loop that drives them.

mod abort;
pub use abort::AbortSignal;

mod builder;
pub use builder::CopterBuilder;

mod horizontal;
pub use horizontal::HorizontalEstimator;

mod stage;
pub use stage::{Direction, Stage, StageGoal};

mod state;
pub use state::{FlightState, FlightStateMachine, Landing, Movement, Takeoff};

use crate::config::FlightConfig;
use crate::control::AltitudeHold;
use crate::hal::{ControlCommand, Link, Sensors, StdDelay, SystemClock, Transport};
use crate::scheduler::LoopTimer;
use crate::FlightError;
use core::fmt;
use embedded_hal::blocking::delay::DelayMs;
use embedded_time::Clock;
use log::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    /// The travel goal was reached.
    Reached,
    /// A hold ran all of its ticks.
    Completed,
    TimedOut,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StageReport {
    pub name: String,
    pub outcome: StageOutcome,
    pub ticks: u32,
    pub elapsed_s: f32,
    /// Integrated travel distance (in cm).
    pub distance: f32,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            StageOutcome::Reached => "reached",
            StageOutcome::Completed => "completed",
            StageOutcome::TimedOut => "timed out",
        };
        write!(
            f,
            "stage {} {} after {} ticks ({:.2}s), {:.1}cm travelled",
            self.name, outcome, self.ticks, self.elapsed_s, self.distance
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlanReport {
    pub stages: Vec<StageReport>,
    pub landing: Landing,
}

/// An open flight session with a vehicle.
///
/// The session lands and closes the link when it is closed or dropped, including while
/// unwinding from a panic.
pub struct Copter<S, T, C, D>
where
    S: Sensors,
    T: Transport + Link,
    C: Clock<T = u32>,
    D: DelayMs<u32>,
{
    sensors: S,
    transport: T,
    clock: C,
    delay: D,
    config: FlightConfig,
    flight: FlightStateMachine,
    altitude: AltitudeHold,
    horizontal: HorizontalEstimator,
    timer: LoopTimer,
    abort: AbortSignal,
    is_open: bool,
}

impl<S, T> Copter<S, T, SystemClock, StdDelay>
where
    S: Sensors,
    T: Transport + Link,
{
    pub fn builder(sensors: S, transport: T) -> CopterBuilder<S, T> {
        CopterBuilder::new(sensors, transport)
    }
}

impl<S, T, C, D> Copter<S, T, C, D>
where
    S: Sensors,
    T: Transport + Link,
    C: Clock<T = u32>,
    D: DelayMs<u32>,
{
    pub fn state(&self) -> FlightState {
        self.flight.state()
    }

    pub fn is_airborne(&self) -> bool {
        self.flight.is_airborne()
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    pub fn altitude(&self) -> &AltitudeHold {
        &self.altitude
    }

    pub fn horizontal(&self) -> &HorizontalEstimator {
        &self.horizontal
    }

    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Force the vehicle into a known landed state.
    pub fn initialize(&mut self) {
        self.flight.reset(&mut self.transport, &mut self.delay);
    }

    /// Measure the accelerometer rest offsets. The vehicle should be landed and still.
    pub fn calibrate(&mut self) {
        if self.is_airborne() {
            warn!("calibrating while airborne");
        }
        let calibration = self.config.calibration;
        self.horizontal.calibrate(
            &mut self.sensors,
            &mut self.delay,
            calibration.samples,
            calibration.interval_ms,
        );
    }

    pub fn take_off(&mut self) -> Result<Takeoff, FlightError> {
        self.check_abort()?;
        let takeoff = self
            .flight
            .request_takeoff(&mut self.transport, &mut self.delay)?;
        if takeoff == Takeoff::Performed {
            self.horizontal.reset();
            self.timer.reset();
        }
        Ok(takeoff)
    }

    pub fn land(&mut self) -> Landing {
        self.flight
            .request_landing(&mut self.transport, &mut self.delay)
    }

    /// Send a timed movement command, then a neutral hover for `hover_ms` once it is delivered.
    ///
    /// Nothing is sent while landed; the command is reported as [`Movement::Dropped`].
    pub fn maneuver(
        &mut self,
        command: ControlCommand,
        hover_ms: u32,
    ) -> Result<Movement, FlightError> {
        self.check_abort()?;
        let movement = self.flight.request_movement(&mut self.transport, &command);
        if movement == Movement::Sent {
            self.flight
                .request_movement(&mut self.transport, &ControlCommand::hover(hover_ms));
        }
        Ok(movement)
    }

    /// Run one stage of the control loop until its goal, tick count or timeout is reached,
    /// then arrest horizontal motion.
    ///
    /// Errors are returned without landing; use [`fly_plan`](Self::fly_plan) or
    /// [`guarded`](Self::guarded) to land on failure.
    pub fn fly_stage(&mut self, stage: &Stage) -> Result<StageReport, FlightError> {
        if !self.is_airborne() {
            return Err(FlightError::NotAirborne);
        }
        info!("stage {} started", stage.name());

        let (mut goal, tick_limit, timeout_s) = match stage {
            Stage::Travel {
                distance,
                timeout_ms,
                ..
            } => (
                Some(StageGoal::new(*distance)),
                None,
                timeout_ms.map(|ms| ms as f32 * 1.0e-3),
            ),
            Stage::Hold { ticks, .. } => (None, Some(*ticks), None),
        };
        let (roll, pitch) = stage.set_point(self.config.trim);
        let timing = self.config.timing;

        self.timer.reset();
        let mut ticks = 0;
        let mut elapsed_s = 0.;

        let (outcome, throttle) = loop {
            self.check_abort()?;
            let dt = self.timer.tick(&self.clock)?;
            ticks += 1;
            elapsed_s += dt;

            let raw_height = match self.sensors.height() {
                Ok(height) if height.is_finite() => height,
                Ok(height) => {
                    debug!("non-finite height {}, using 0", height);
                    0.
                }
                Err(error) => {
                    debug!("height: {}, using 0", error);
                    0.
                }
            };
            let throttle = self.altitude.control(raw_height);

            let mut velocity = 0.;
            if let (Stage::Travel { direction, .. }, Some(goal)) = (stage, goal.as_mut()) {
                velocity = self
                    .horizontal
                    .update(&mut self.sensors, direction.axis(), dt);
                goal.accumulate(direction.sign() * velocity * dt);
            }

            let command = ControlCommand::new(roll, pitch, 0, throttle, timing.command_ms);
            info!(
                "{} #{} dt {:.3}s height {:.1} (raw {:.1}) error {:.1} velocity {:.1} distance {:.1}/{:.1}: {}",
                stage.name(),
                ticks,
                dt,
                self.altitude.height(),
                raw_height,
                self.altitude.error(),
                velocity,
                goal.map_or(0., |goal| goal.accumulated_distance),
                goal.map_or(0., |goal| goal.target_distance),
                command
            );
            if self.flight.request_movement(&mut self.transport, &command) == Movement::Dropped {
                return Err(FlightError::NotAirborne);
            }

            if goal.map_or(false, |goal| goal.is_reached()) {
                break (StageOutcome::Reached, throttle);
            }
            if tick_limit.map_or(false, |limit| ticks >= limit) {
                break (StageOutcome::Completed, throttle);
            }
            if timeout_s.map_or(false, |timeout| elapsed_s >= timeout) {
                warn!("stage {} timed out after {:.2}s", stage.name(), elapsed_s);
                break (StageOutcome::TimedOut, throttle);
            }

            self.timer.wait(&self.clock, &mut self.delay)?;
        };

        // Neutral roll and pitch, keeping the last altitude correction
        let stop = ControlCommand::new(0, 0, 0, throttle, timing.stop_ms);
        self.flight.request_movement(&mut self.transport, &stop);
        self.delay.delay_ms(timing.stop_settle_ms);

        let report = StageReport {
            name: stage.name().to_owned(),
            outcome,
            ticks,
            elapsed_s,
            distance: goal.map_or(0., |goal| goal.accumulated_distance),
        };
        info!("{}", report);
        Ok(report)
    }

    /// Calibrate (when landed), take off, fly every stage in order and land.
    ///
    /// Any failure lands the vehicle before it is returned.
    pub fn fly_plan(&mut self, plan: &[Stage]) -> Result<PlanReport, FlightError> {
        let stages = self.guarded(|copter| {
            if !copter.is_airborne() {
                copter.calibrate();
            }
            copter.take_off()?;

            let mut stages = Vec::with_capacity(plan.len());
            for stage in plan {
                stages.push(copter.fly_stage(stage)?);
            }
            Ok(stages)
        })?;

        let landing = self.land();
        Ok(PlanReport { stages, landing })
    }

    /// Fly the plan from the session's config.
    pub fn fly_configured_plan(&mut self) -> Result<PlanReport, FlightError> {
        let plan = self.config.plan.clone();
        self.fly_plan(&plan)
    }

    /// Run `f` with this session, landing if it fails.
    pub fn guarded<R, F>(&mut self, f: F) -> Result<R, FlightError>
    where
        F: FnOnce(&mut Self) -> Result<R, FlightError>,
    {
        match f(self) {
            Ok(value) => Ok(value),
            Err(flight_error) => {
                error!("{}, landing", flight_error);
                self.land();
                Err(flight_error)
            }
        }
    }

    /// Land and close the link.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn check_abort(&self) -> Result<(), FlightError> {
        if self.abort.is_raised() {
            Err(FlightError::Aborted)
        } else {
            Ok(())
        }
    }

    fn shutdown(&mut self) {
        if !self.is_open {
            return;
        }
        self.is_open = false;

        self.land();
        self.transport.close();
        info!("link closed");
    }
}

impl<S, T, C, D> Drop for Copter<S, T, C, D>
where
    S: Sensors,
    T: Transport + Link,
    C: Clock<T = u32>,
    D: DelayMs<u32>,
{
    fn drop(&mut self) {
        if self.is_open && std::thread::panicking() {
            error!("flight panicked, landing");
        }
        self.shutdown();
    }
}
