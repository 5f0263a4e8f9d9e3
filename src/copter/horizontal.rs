use crate::config::SensorScale;
use crate::filter::{Noise, VelocityKalman};
use crate::hal::{Axis, Sensors};
use embedded_hal::blocking::delay::DelayMs;
use log::{debug, info};
use nalgebra::Vector2;

/// Horizontal velocity estimate along both axes.
///
/// Each axis fuses the calibrated accelerometer (prediction) with optical flow
/// (measurement). Failed readings count as zero.
#[derive(Clone, Debug)]
pub struct HorizontalEstimator {
    filters: [VelocityKalman<f32>; 2],
    scale: SensorScale,
    /// Raw accelerometer readings at rest.
    pub accel_offset: Vector2<f32>,
}

impl HorizontalEstimator {
    pub fn new(noise: Noise<f32>, scale: SensorScale) -> Self {
        Self {
            filters: [VelocityKalman::new(noise), VelocityKalman::new(noise)],
            scale,
            accel_offset: Vector2::zeros(),
        }
    }

    /// Average `samples` accelerometer readings taken `interval_ms` apart as the rest offset.
    pub fn calibrate<S, D>(&mut self, sensors: &mut S, delay: &mut D, samples: u32, interval_ms: u32)
    where
        S: Sensors,
        D: DelayMs<u32>,
    {
        let samples = samples.max(1);
        let mut sum = Vector2::zeros();
        for sample in 0..samples {
            sum += Vector2::new(
                read_or_zero(sensors.accel(Axis::X)),
                read_or_zero(sensors.accel(Axis::Y)),
            );
            if sample + 1 < samples {
                delay.delay_ms(interval_ms);
            }
        }
        self.accel_offset = sum / samples as f32;
        info!(
            "accelerometer offset x {:.2} y {:.2}",
            self.accel_offset.x, self.accel_offset.y
        );
    }

    /// Acceleration (in cm/s^2) with the rest offset removed.
    pub fn acceleration<S: Sensors>(&self, sensors: &mut S, axis: Axis) -> f32 {
        let raw = read_or_zero(sensors.accel(axis));
        (raw - self.accel_offset[axis.index()]) * self.scale.accel
    }

    /// Fuse one tick of readings along `axis` and return the velocity estimate (in cm/s).
    pub fn update<S: Sensors>(&mut self, sensors: &mut S, axis: Axis, dt: f32) -> f32 {
        let acceleration = self.acceleration(sensors, axis);
        let observed = read_or_zero(sensors.flow_velocity(axis)) * self.scale.flow;
        self.filters[axis.index()].update(acceleration, observed, dt)
    }

    pub fn velocity(&self, axis: Axis) -> f32 {
        self.filters[axis.index()].velocity()
    }

    /// Zero both velocity estimates, keeping the calibration.
    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset(0.);
        }
    }
}

fn read_or_zero<E: core::fmt::Display>(reading: Result<f32, E>) -> f32 {
    match reading {
        Ok(value) if value.is_finite() => value,
        Ok(value) => {
            debug!("non-finite reading {}, using 0", value);
            0.
        }
        Err(error) => {
            debug!("{}, using 0", error);
            0.
        }
    }
}
