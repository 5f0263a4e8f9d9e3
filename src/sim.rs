//! Simulated vehicle for dry runs without hardware.
//!
//! A point mass that follows commanded set-points with a first-order lag. Commands advance
//! simulated time by their hold duration, or by the wall-clock time since the previous
//! command when running in real time.

use crate::hal::{Axis, ControlCommand, Link, SensorError, Sensors, Transport, TransportError};
use nalgebra::Vector2;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimConfig {
    /// Height reached by the takeoff command (in cm).
    pub takeoff_height: f32,
    /// Climb rate per unit of throttle (in cm/s).
    pub climb_rate: f32,
    /// Horizontal speed per unit of roll or pitch (in cm/s).
    pub speed_per_power: f32,
    /// Time constant of the horizontal response (in s).
    pub response_s: f32,
    /// Raw accelerometer reading at rest.
    pub accel_bias: [f32; 2],
    /// Must match the session's sensor scale for consistent readings.
    pub accel_scale: f32,
    pub flow_scale: f32,
    /// Fail every n-th height read.
    pub height_dropout: Option<u32>,
    pub realtime: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            takeoff_height: 80.,
            climb_rate: 1.,
            speed_per_power: 1.2,
            response_s: 0.4,
            accel_bias: [15., -8.],
            accel_scale: 0.012,
            flow_scale: 0.006,
            height_dropout: None,
            realtime: false,
        }
    }
}

/// Physical state of the simulated vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimSnapshot {
    pub is_open: bool,
    pub is_airborne: bool,
    /// Height (in cm).
    pub height: f32,
    /// Position (in cm) along X and Y.
    pub position: Vector2<f32>,
    /// Velocity (in cm/s) along X and Y.
    pub velocity: Vector2<f32>,
    pub takeoffs: u32,
    pub landings: u32,
}

impl Default for SimSnapshot {
    fn default() -> Self {
        Self {
            is_open: false,
            is_airborne: false,
            height: 0.,
            position: Vector2::zeros(),
            velocity: Vector2::zeros(),
            takeoffs: 0,
            landings: 0,
        }
    }
}

#[derive(Debug)]
struct SimState {
    config: SimConfig,
    snapshot: SimSnapshot,
    acceleration: Vector2<f32>,
    height_reads: u32,
    last_command: Option<Instant>,
}

/// Shared handle to one simulated vehicle; clones drive the same vehicle.
#[derive(Clone, Debug)]
pub struct SimVehicle {
    state: Arc<Mutex<SimState>>,
}

const STEP_S: f32 = 0.01;

impl SimVehicle {
    pub fn new(config: SimConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                config,
                snapshot: SimSnapshot::default(),
                acceleration: Vector2::zeros(),
                height_reads: 0,
                last_command: None,
            })),
        }
    }

    pub fn snapshot(&self) -> SimSnapshot {
        self.lock().snapshot
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // Vehicle state stays consistent even if a holder panicked
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn connected(&self) -> Result<MutexGuard<'_, SimState>, TransportError> {
        let state = self.lock();
        if state.snapshot.is_open {
            Ok(state)
        } else {
            Err(TransportError::Disconnected)
        }
    }
}

impl Default for SimVehicle {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimState {
    fn hold(&mut self, command: &ControlCommand) {
        let mut duration_s = command.duration_ms as f32 * 1.0e-3;
        let now = Instant::now();
        if self.config.realtime {
            if let Some(last) = self.last_command {
                duration_s = duration_s.min(now.duration_since(last).as_secs_f32());
            }
        }
        self.last_command = Some(now);

        if !self.snapshot.is_airborne {
            return;
        }

        let target = Vector2::new(command.pitch as f32, command.roll as f32) * self.config.speed_per_power;
        let mut remaining = duration_s;
        while remaining > 0. {
            let dt = remaining.min(STEP_S);
            let response = 1. - (-dt / self.config.response_s.max(STEP_S)).exp();
            let previous = self.snapshot.velocity;
            self.snapshot.velocity += (target - previous) * response;
            self.acceleration = (self.snapshot.velocity - previous) / dt;
            self.snapshot.position += self.snapshot.velocity * dt;
            self.snapshot.height =
                (self.snapshot.height + command.throttle as f32 * self.config.climb_rate * dt).max(0.);
            remaining -= dt;
        }
    }

    fn touch_down(&mut self) {
        self.snapshot.is_airborne = false;
        self.snapshot.height = 0.;
        self.snapshot.velocity = Vector2::zeros();
        self.acceleration = Vector2::zeros();
    }
}

impl Sensors for SimVehicle {
    fn height(&mut self) -> Result<f32, SensorError> {
        let mut state = self.lock();
        if !state.snapshot.is_open {
            return Err(SensorError::Unavailable);
        }
        state.height_reads += 1;
        match state.config.height_dropout {
            Some(every) if every > 0 && state.height_reads % every == 0 => {
                Err(SensorError::Unavailable)
            }
            _ => Ok(state.snapshot.height),
        }
    }

    fn accel(&mut self, axis: Axis) -> Result<f32, SensorError> {
        let state = self.lock();
        if !state.snapshot.is_open {
            return Err(SensorError::Unavailable);
        }
        let i = axis.index();
        Ok(state.acceleration[i] / state.config.accel_scale + state.config.accel_bias[i])
    }

    fn flow_velocity(&mut self, axis: Axis) -> Result<f32, SensorError> {
        let state = self.lock();
        if !state.snapshot.is_open {
            return Err(SensorError::Unavailable);
        }
        Ok(state.snapshot.velocity[axis.index()] / state.config.flow_scale)
    }
}

impl Transport for SimVehicle {
    fn send_control(&mut self, command: &ControlCommand) -> Result<(), TransportError> {
        self.connected()?.hold(command);
        Ok(())
    }

    fn send_takeoff(&mut self) -> Result<(), TransportError> {
        let mut state = self.connected()?;
        state.snapshot.takeoffs += 1;
        if !state.snapshot.is_airborne {
            state.snapshot.is_airborne = true;
            state.snapshot.height = state.config.takeoff_height;
        }
        Ok(())
    }

    fn send_landing(&mut self) -> Result<(), TransportError> {
        let mut state = self.connected()?;
        state.snapshot.landings += 1;
        state.touch_down();
        Ok(())
    }
}

impl Link for SimVehicle {
    fn open(&mut self) -> Result<(), TransportError> {
        self.lock().snapshot.is_open = true;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.lock();
        state.touch_down();
        state.snapshot.is_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{SimConfig, SimVehicle};
    use crate::config::{FlightConfig, SensorScale};
    use crate::copter::{Copter, Direction, Stage};
    use crate::hal::{Axis, ControlCommand, Link, SensorError, Sensors, Transport, TransportError};
    use crate::test_utils::ManualClock;
    use approx::assert_relative_eq;

    fn unit_config() -> SimConfig {
        SimConfig {
            accel_bias: [0., 0.],
            accel_scale: 1.,
            flow_scale: 1.,
            ..Default::default()
        }
    }

    #[test]
    fn rejects_commands_before_open() {
        let mut vehicle = SimVehicle::default();
        assert_eq!(vehicle.send_takeoff(), Err(TransportError::Disconnected));
        assert_eq!(vehicle.height(), Err(SensorError::Unavailable));
    }

    #[test]
    fn follows_set_points_once_airborne() {
        let mut vehicle = SimVehicle::new(unit_config());
        vehicle.open().unwrap();

        // Ignored on the ground
        vehicle.send_control(&ControlCommand::pitch(25, 1000)).unwrap();
        assert_eq!(vehicle.snapshot().position.x, 0.);

        vehicle.send_takeoff().unwrap();
        assert_eq!(vehicle.height(), Ok(80.));

        vehicle.send_control(&ControlCommand::pitch(25, 3000)).unwrap();
        let snapshot = vehicle.snapshot();
        assert_relative_eq!(snapshot.velocity.x, 30., epsilon = 0.1);
        assert!(snapshot.position.x > 0.);
        assert_eq!(snapshot.position.y, 0.);
        assert_relative_eq!(vehicle.flow_velocity(Axis::X).unwrap(), snapshot.velocity.x);

        vehicle.send_landing().unwrap();
        let snapshot = vehicle.snapshot();
        assert!(!snapshot.is_airborne);
        assert_eq!(snapshot.height, 0.);
        assert_eq!(snapshot.landings, 1);
    }

    #[test]
    fn drops_every_nth_height_read() {
        let mut vehicle = SimVehicle::new(SimConfig {
            height_dropout: Some(3),
            ..unit_config()
        });
        vehicle.open().unwrap();

        let reads: Vec<_> = (0..6).map(|_| vehicle.height().is_ok()).collect();
        assert_eq!(reads, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn flies_a_plan() {
        let vehicle = SimVehicle::new(unit_config());
        let clock = ManualClock::new(0);
        let delay = clock.delay();

        let mut config = FlightConfig::default();
        config.sensor_scale = SensorScale { accel: 1., flow: 1. };
        config.timing.command_ms = config.timing.tick_ms;
        config.timing.stop_settle_ms = 0;

        let mut copter = Copter::builder(vehicle.clone(), vehicle.clone())
            .clock(clock)
            .delay(delay)
            .config(config)
            .open()
            .unwrap();
        let plan = [
            Stage::travel("forward", Direction::Forward, 50., 25),
            Stage::travel("right", Direction::Right, 50., 25),
        ];
        let report = copter.fly_plan(&plan).unwrap();
        assert_eq!(report.stages.len(), 2);

        let snapshot = vehicle.snapshot();
        assert!(snapshot.position.x > 30.);
        assert!(snapshot.position.y > 30.);
        assert!(!snapshot.is_airborne);

        copter.close();
        assert!(!vehicle.snapshot().is_open);
    }
}
