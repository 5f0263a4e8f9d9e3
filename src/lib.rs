//! # drone-flight
//! Flight control core for a small indoor drone.
//!
//! [`filter`] contains the scalar Kalman estimators that smooth height and velocity readings.
//!
//! [`control`] contains the bounded proportional controllers.
//!
//! [`hal`] contains the sensor, transport and link contracts along with std implementations
//! of the `embedded-hal` delay and `embedded-time` clock.
//!
//! [`scheduler`] paces the control loop.
//!
//! [`Copter`] is a flight session: it gates commands through the flight state machine,
//! flies stage plans and lands on every failure.
//!
//! [`sim`] is a simulated vehicle for dry runs.

pub mod config;
pub use config::FlightConfig;

pub mod control;

pub mod copter;
pub use copter::{Copter, CopterBuilder};

mod error;
pub use error::FlightError;

pub mod filter;

pub mod hal;

pub mod scheduler;

pub mod sim;

#[cfg(test)]
mod test_utils;
