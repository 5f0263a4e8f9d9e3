use super::{AxisController, Bounds};
use crate::filter::{Noise, ScalarKalman};

/// Altitude hold: filters raw height readings and outputs a bounded throttle correction.
#[derive(Clone, Debug)]
pub struct AltitudeHold {
    /// Target altitude (in cm).
    pub target: f32,
    pub controller: AxisController<f32>,
    filter: ScalarKalman<f32>,
    last_error: f32,
}

impl AltitudeHold {
    pub fn new(target: f32, gain: f32, throttle: Bounds, noise: Noise<f32>) -> Self {
        Self {
            target,
            controller: AxisController::new(gain, throttle),
            filter: ScalarKalman::new(noise),
            last_error: 0.,
        }
    }

    /// Fuse a raw height reading (in cm) and return the throttle to command.
    pub fn control(&mut self, raw_height: f32) -> i8 {
        let height = self.filter.update(raw_height);
        self.last_error = self.target - height;
        self.controller.control(self.target, height)
    }

    /// Filtered height (in cm).
    pub fn height(&self) -> f32 {
        self.filter.estimate()
    }

    /// Error between the target and the filtered height after the last update.
    pub fn error(&self) -> f32 {
        self.last_error
    }

    pub fn filter(&self) -> &ScalarKalman<f32> {
        &self.filter
    }
}
