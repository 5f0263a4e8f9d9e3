//! Tuning constants for a flight session.
//!
//! Every section falls back to the values the vehicle was hand-tuned with, so a config file
//! only needs to list what differs:
//! ```yaml
//! altitude:
//!   target: 120
//!   throttle: { lower: -30, upper: 30 }
//! trim:
//!   roll: -2
//! plan:
//!   - kind: travel
//!     name: forward
//!     direction: forward
//!     distance: 300
//!     power: 25
//!   - kind: hold
//!     name: hover
//!     ticks: 40
//! ```

use crate::control::Bounds;
use crate::copter::Stage;
use crate::filter::Noise;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FlightConfig {
    pub altitude: AltitudeConfig,
    pub height_filter: NoiseConfig,
    pub velocity_filter: NoiseConfig,
    pub sensor_scale: SensorScale,
    pub calibration: CalibrationConfig,
    pub timing: Timing,
    pub trim: Trim,
    pub plan: Vec<Stage>,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            altitude: AltitudeConfig::default(),
            height_filter: NoiseConfig {
                process_noise: 0.15,
                measurement_noise: 1.5,
                initial: 0.,
            },
            velocity_filter: NoiseConfig {
                process_noise: 0.01,
                measurement_noise: 0.5,
                initial: 0.,
            },
            sensor_scale: SensorScale::default(),
            calibration: CalibrationConfig::default(),
            timing: Timing::default(),
            trim: Trim::default(),
            plan: Stage::default_plan(),
        }
    }
}

impl FlightConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid(message));

        if !self.altitude.throttle.is_valid() {
            return invalid(format!(
                "throttle lower bound {} exceeds upper bound {}",
                self.altitude.throttle.lower, self.altitude.throttle.upper
            ));
        }
        for (name, noise) in [
            ("height-filter", &self.height_filter),
            ("velocity-filter", &self.velocity_filter),
        ] {
            if !(noise.measurement_noise > 0.) {
                return invalid(format!("{}.measurement-noise must be positive", name));
            }
            if !(noise.process_noise >= 0.) {
                return invalid(format!("{}.process-noise must not be negative", name));
            }
        }
        if self.timing.landing_repeats < 2 {
            return invalid("timing.landing-repeats must be at least 2".into());
        }
        if self.timing.tick_ms == 0 {
            return invalid("timing.tick-ms must be positive".into());
        }
        if self.calibration.samples == 0 {
            return invalid("calibration.samples must be positive".into());
        }
        for stage in &self.plan {
            stage.validate().map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AltitudeConfig {
    /// Altitude to hold (in cm).
    pub target: f32,
    pub gain: f32,
    pub throttle: Bounds,
}

impl Default for AltitudeConfig {
    fn default() -> Self {
        Self {
            target: 150.,
            gain: 0.7,
            throttle: Bounds::new(-20, 30),
        }
    }
}

/// Both noise values are required once a filter section is present.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NoiseConfig {
    pub process_noise: f32,
    pub measurement_noise: f32,
    #[serde(default)]
    pub initial: f32,
}

impl From<NoiseConfig> for Noise<f32> {
    fn from(config: NoiseConfig) -> Self {
        Noise::new(config.process_noise, config.measurement_noise).with_initial(config.initial)
    }
}

/// Conversion from raw horizontal sensor units to cm/s^2 and cm/s.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SensorScale {
    pub accel: f32,
    pub flow: f32,
}

impl Default for SensorScale {
    fn default() -> Self {
        Self {
            accel: 0.012,
            flow: 0.006,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CalibrationConfig {
    pub samples: u32,
    pub interval_ms: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            samples: 20,
            interval_ms: 50,
        }
    }
}

/// Durations (in milliseconds) for the loop and the takeoff/landing sequences.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Timing {
    pub tick_ms: u32,
    pub command_ms: u32,
    pub takeoff_stabilize_ms: u32,
    pub takeoff_hover_ms: u32,
    pub landing_repeats: u32,
    pub landing_interval_ms: u32,
    pub reset_repeats: u32,
    pub reset_interval_ms: u32,
    pub reset_hover_ms: u32,
    pub stop_ms: u32,
    pub stop_settle_ms: u32,
    pub transport_timeout_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            command_ms: 100,
            takeoff_stabilize_ms: 2000,
            takeoff_hover_ms: 1500,
            landing_repeats: 3,
            landing_interval_ms: 500,
            reset_repeats: 3,
            reset_interval_ms: 300,
            reset_hover_ms: 500,
            stop_ms: 100,
            stop_settle_ms: 1000,
            transport_timeout_ms: 1000,
        }
    }
}

/// Fixed roll/pitch offsets countering a vehicle's drift, tuned per unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Trim {
    pub roll: i8,
    pub pitch: i8,
}
