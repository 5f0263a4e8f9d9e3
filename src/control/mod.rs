//! Bounded proportional controllers producing actuator power.

mod axis;
pub use axis::{compute, AxisController, Bounds};

mod altitude;
pub use altitude::AltitudeHold;
