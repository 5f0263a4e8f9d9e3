use crate::config::Trim;
use crate::hal::{Axis, ControlCommand};
use core::fmt;
use serde::Deserialize;

/// Horizontal travel direction.
///
/// Pitch drives the X axis and roll drives the Y axis; positive power moves forward or right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub fn axis(self) -> Axis {
        match self {
            Direction::Forward | Direction::Backward => Axis::X,
            Direction::Left | Direction::Right => Axis::Y,
        }
    }

    /// `1` along the axis' positive sense, `-1` against it.
    pub fn sign(self) -> f32 {
        match self {
            Direction::Forward | Direction::Right => 1.,
            Direction::Backward | Direction::Left => -1.,
        }
    }

    /// Roll and pitch moving in this direction with `power`, before trims.
    pub fn set_point(self, power: i8) -> (i8, i8) {
        let power = match self {
            Direction::Forward | Direction::Right => power,
            Direction::Backward | Direction::Left => power.saturating_neg(),
        };
        match self.axis() {
            Axis::X => (0, power),
            Axis::Y => (power, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// Slowest horizontal speed (in cm/s) expected per unit of power.
pub const MIN_SPEED_PER_POWER: f32 = 0.4;

/// One leg of a flight plan.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Stage {
    /// Move until the integrated distance reaches `distance` (in cm).
    #[serde(rename_all = "kebab-case")]
    Travel {
        name: String,
        direction: Direction,
        distance: f32,
        power: i8,
        #[serde(default)]
        timeout_ms: Option<u32>,
    },
    /// Hold altitude in place for a number of ticks.
    #[serde(rename_all = "kebab-case")]
    Hold { name: String, ticks: u32 },
}

impl Stage {
    pub fn travel(name: impl Into<String>, direction: Direction, distance: f32, power: i8) -> Self {
        Stage::Travel {
            name: name.into(),
            direction,
            distance,
            power,
            timeout_ms: None,
        }
    }

    pub fn hold(name: impl Into<String>, ticks: u32) -> Self {
        Stage::Hold {
            name: name.into(),
            ticks,
        }
    }

    /// Limit a travel stage to the time it takes at the slowest expected speed
    /// (`MIN_SPEED_PER_POWER` cm/s per unit of power). Hold stages are unchanged.
    pub fn with_budget(self) -> Self {
        match self {
            Stage::Travel {
                name,
                direction,
                distance,
                power,
                ..
            } => {
                let speed = f32::from(power.max(1)) * MIN_SPEED_PER_POWER;
                let timeout_ms = (distance / speed * 1000.).ceil().min(u32::MAX as f32) as u32;
                Stage::Travel {
                    name,
                    direction,
                    distance,
                    power,
                    timeout_ms: Some(timeout_ms.max(1)),
                }
            }
            hold => hold,
        }
    }

    /// The two-leg plan the vehicle was tuned on: forward, then right.
    pub fn default_plan() -> Vec<Self> {
        vec![
            Stage::travel("forward", Direction::Forward, 465., 25).with_budget(),
            Stage::travel("right", Direction::Right, 715., 25).with_budget(),
        ]
    }

    pub fn name(&self) -> &str {
        match self {
            Stage::Travel { name, .. } | Stage::Hold { name, .. } => name,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Stage::Travel {
                name,
                distance,
                power,
                timeout_ms,
                ..
            } => {
                if !(distance.is_finite() && *distance > 0.) {
                    return Err(format!("stage {}: distance must be positive", name));
                }
                if *power <= 0 || *power > ControlCommand::MAX_POWER {
                    return Err(format!(
                        "stage {}: power must be within 1..={}",
                        name,
                        ControlCommand::MAX_POWER
                    ));
                }
                if *timeout_ms == Some(0) {
                    return Err(format!("stage {}: timeout-ms must be positive", name));
                }
            }
            Stage::Hold { name, ticks } => {
                if *ticks == 0 {
                    return Err(format!("stage {}: ticks must be positive", name));
                }
            }
        }
        Ok(())
    }

    /// Roll and pitch held during this stage, trims included.
    pub fn set_point(&self, trim: Trim) -> (i8, i8) {
        let (roll, pitch) = match self {
            Stage::Travel {
                direction, power, ..
            } => direction.set_point(*power),
            Stage::Hold { .. } => (0, 0),
        };
        (roll.saturating_add(trim.roll), pitch.saturating_add(trim.pitch))
    }
}

/// Distance target of a travel stage and the progress integrated towards it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageGoal {
    /// Distance to cover (in cm).
    pub target_distance: f32,
    /// Distance integrated so far (in cm).
    pub accumulated_distance: f32,
}

impl StageGoal {
    pub fn new(target_distance: f32) -> Self {
        Self {
            target_distance,
            accumulated_distance: 0.,
        }
    }

    /// Add the progress `velocity * dt` made along the stage's direction.
    pub fn accumulate(&mut self, progress: f32) {
        if progress.is_finite() {
            self.accumulated_distance += progress;
        }
    }

    pub fn is_reached(&self) -> bool {
        self.accumulated_distance >= self.target_distance
    }

    pub fn remaining(&self) -> f32 {
        (self.target_distance - self.accumulated_distance).max(0.)
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, Stage, StageGoal};
    use crate::config::Trim;
    use crate::hal::Axis;

    #[test]
    fn directions_map_to_channels() {
        assert_eq!(Direction::Forward.set_point(25), (0, 25));
        assert_eq!(Direction::Backward.set_point(25), (0, -25));
        assert_eq!(Direction::Right.set_point(25), (25, 0));
        assert_eq!(Direction::Left.set_point(25), (-25, 0));
        assert_eq!(Direction::Left.axis(), Axis::Y);
        assert_eq!(Direction::Backward.sign(), -1.);
    }

    #[test]
    fn trims_are_added_to_the_set_point() {
        let trim = Trim { roll: -3, pitch: 2 };
        let stage = Stage::travel("forward", Direction::Forward, 100., 25);
        assert_eq!(stage.set_point(trim), (-3, 27));
        assert_eq!(Stage::hold("hover", 5).set_point(trim), (-3, 2));
    }

    #[test]
    fn goal_is_reached_once_target_distance_is_covered() {
        let mut goal = StageGoal::new(10.);
        goal.accumulate(4.);
        goal.accumulate(f32::NAN);
        assert!(!goal.is_reached());
        assert_eq!(goal.remaining(), 6.);

        goal.accumulate(-1.);
        goal.accumulate(7.);
        assert!(goal.is_reached());
        assert_eq!(goal.remaining(), 0.);
    }

    #[test]
    fn default_plan_is_time_limited() {
        let plan = Stage::default_plan();
        assert_eq!(plan.len(), 2);
        match &plan[0] {
            Stage::Travel { timeout_ms, .. } => assert_eq!(*timeout_ms, Some(46_500)),
            stage => panic!("unexpected stage {:?}", stage),
        }
        assert!(plan
            .iter()
            .all(|stage| matches!(stage, Stage::Travel { timeout_ms: Some(_), .. })));
        assert_eq!(Stage::hold("hover", 3).with_budget(), Stage::hold("hover", 3));
    }

    #[test]
    fn validates_stages() {
        assert!(Stage::default_plan().iter().all(|stage| stage.validate().is_ok()));
        assert!(Stage::travel("x", Direction::Left, 0., 20).validate().is_err());
        assert!(Stage::travel("x", Direction::Left, f32::NAN, 20).validate().is_err());
        assert!(Stage::travel("x", Direction::Left, 10., 0).validate().is_err());
        assert!(Stage::travel("x", Direction::Left, 10., -5).validate().is_err());
        assert!(Stage::hold("x", 0).validate().is_err());
    }
}
