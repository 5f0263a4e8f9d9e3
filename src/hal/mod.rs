//! Collaborator contracts for the vehicle: sensors, the command transport and the link.

use thiserror::Error;

mod command;
pub use command::ControlCommand;

mod system;
pub use system::{StdDelay, SystemClock};

mod timeout;
pub use timeout::TimedTransport;

/// Horizontal body axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Forward/backward, driven by pitch.
    X,
    /// Right/left, driven by roll.
    Y,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("sensor reading unavailable")]
    Unavailable,
    #[error("sensor read timed out")]
    Timeout,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("command was not acknowledged")]
    NotAcknowledged,
    #[error("command timed out")]
    Timeout,
    #[error("transport disconnected")]
    Disconnected,
    #[error("link error: {0}")]
    Link(String),
}

/// Raw vehicle sensors.
///
/// Readings may fail; the control loop substitutes a safe default instead of propagating.
pub trait Sensors {
    /// Height above ground (in cm).
    fn height(&mut self) -> Result<f32, SensorError>;

    /// Raw accelerometer reading along a horizontal axis.
    fn accel(&mut self, axis: Axis) -> Result<f32, SensorError>;

    /// Raw optical flow velocity along a horizontal axis.
    fn flow_velocity(&mut self, axis: Axis) -> Result<f32, SensorError>;
}

/// Command transport to the vehicle.
///
/// An acknowledgment only means the command was delivered; it says nothing about the
/// physical state of the vehicle.
pub trait Transport {
    /// Hold a set-point for `command.duration_ms`.
    fn send_control(&mut self, command: &ControlCommand) -> Result<(), TransportError>;

    fn send_takeoff(&mut self) -> Result<(), TransportError>;

    fn send_landing(&mut self) -> Result<(), TransportError>;
}

/// Vehicle connection lifecycle.
pub trait Link {
    fn open(&mut self) -> Result<(), TransportError>;

    fn close(&mut self);
}

impl<T: Sensors + ?Sized> Sensors for &mut T {
    fn height(&mut self) -> Result<f32, SensorError> {
        (**self).height()
    }

    fn accel(&mut self, axis: Axis) -> Result<f32, SensorError> {
        (**self).accel(axis)
    }

    fn flow_velocity(&mut self, axis: Axis) -> Result<f32, SensorError> {
        (**self).flow_velocity(axis)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_control(&mut self, command: &ControlCommand) -> Result<(), TransportError> {
        (**self).send_control(command)
    }

    fn send_takeoff(&mut self) -> Result<(), TransportError> {
        (**self).send_takeoff()
    }

    fn send_landing(&mut self) -> Result<(), TransportError> {
        (**self).send_landing()
    }
}

impl<T: Link + ?Sized> Link for &mut T {
    fn open(&mut self) -> Result<(), TransportError> {
        (**self).open()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
