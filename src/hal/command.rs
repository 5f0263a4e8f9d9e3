use core::fmt;

/// Time-bounded actuator set-point.
///
/// Each power is in [-100, 100]; the transport holds the set-point for `duration_ms`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlCommand {
    pub roll: i8,
    pub pitch: i8,
    pub yaw: i8,
    pub throttle: i8,
    pub duration_ms: u32,
}

impl ControlCommand {
    pub const MAX_POWER: i8 = 100;

    pub fn new(roll: i8, pitch: i8, yaw: i8, throttle: i8, duration_ms: u32) -> Self {
        Self {
            roll: limit(roll),
            pitch: limit(pitch),
            yaw: limit(yaw),
            throttle: limit(throttle),
            duration_ms,
        }
    }

    /// Zero set-point on every axis.
    pub fn hover(duration_ms: u32) -> Self {
        Self::new(0, 0, 0, 0, duration_ms)
    }

    pub fn roll(power: i8, duration_ms: u32) -> Self {
        Self::new(power, 0, 0, 0, duration_ms)
    }

    pub fn pitch(power: i8, duration_ms: u32) -> Self {
        Self::new(0, power, 0, 0, duration_ms)
    }

    pub fn yaw(power: i8, duration_ms: u32) -> Self {
        Self::new(0, 0, power, 0, duration_ms)
    }

    pub fn throttle(power: i8, duration_ms: u32) -> Self {
        Self::new(0, 0, 0, power, duration_ms)
    }

    pub fn is_neutral(&self) -> bool {
        self.roll == 0 && self.pitch == 0 && self.yaw == 0 && self.throttle == 0
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "roll {} pitch {} yaw {} throttle {} for {}ms",
            self.roll, self.pitch, self.yaw, self.throttle, self.duration_ms
        )
    }
}

fn limit(power: i8) -> i8 {
    power.max(-ControlCommand::MAX_POWER).min(ControlCommand::MAX_POWER)
}
